//! Dutch stake calculator.
//!
//! Splits a total stake across every outcome in proportion to implied
//! probability so that the payout is the same whichever outcome wins.
//!
//! For prices `p_i` and stake `S`:
//!   q_i      = 1 / p_i
//!   stake_i  = S * q_i / Σq
//!   payout_i = p_i * stake_i = S / Σq
//!
//! The reported `total_profit` sums the payouts of *all* outcomes before
//! subtracting the stake. Only one outcome can win, so this overstates the
//! real result by roughly a factor of N. It is kept as the headline figure;
//! `realized_profit` gives the single-outcome result.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Precondition failures. Distinct from a match simply lacking prices.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DutchError {
    #[error("No prices supplied")]
    NoPrices,

    #[error("Invalid price at position {index}: {price} (must be positive and finite)")]
    InvalidPrice { index: usize, price: f64 },

    #[error("Invalid total stake: {0} (must be positive and finite)")]
    InvalidStake(f64),
}

/// Which profit figure decides whether a bet is reported as profitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitBasis {
    /// Σ payout_i − stake.
    #[default]
    Summed,
    /// payout_i − stake for the single winning outcome.
    Realized,
}

/// Profit classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Profitable { profit: f64 },
    NotProfitable { loss: f64 },
}

impl Verdict {
    fn from_figure(figure: f64) -> Self {
        if figure > 0.0 {
            Verdict::Profitable { profit: figure }
        } else {
            Verdict::NotProfitable { loss: figure.abs() }
        }
    }

    pub fn is_profitable(&self) -> bool {
        matches!(self, Verdict::Profitable { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Profitable { profit } => {
                write!(f, "The Dutch bet is profitable. Total profit: ${profit:.2}")
            }
            Verdict::NotProfitable { loss } => {
                write!(f, "The Dutch bet is not profitable. Total loss: ${loss:.2}")
            }
        }
    }
}

/// Result of a Dutch stake split.
#[derive(Debug, Clone, PartialEq)]
pub struct DutchBet {
    pub prices: Vec<f64>,
    pub total_stake: f64,
    /// Σ 1/price_i. Below 1.0 means a true Dutch book exists.
    pub implied_sum: f64,
    pub stakes: Vec<f64>,
    pub payouts: Vec<f64>,
    /// Σ payout_i − total_stake.
    pub total_profit: f64,
}

impl DutchBet {
    /// Payout if any one outcome wins. All payouts are equal up to rounding.
    pub fn payout(&self) -> f64 {
        self.total_stake / self.implied_sum
    }

    /// What the bettor actually ends up with after one outcome settles.
    pub fn realized_profit(&self) -> f64 {
        self.payout() - self.total_stake
    }

    /// Σq < 1: every outcome returns more than the total stake.
    pub fn is_arbitrage(&self) -> bool {
        self.implied_sum < 1.0
    }

    pub fn verdict(&self, basis: ProfitBasis) -> Verdict {
        match basis {
            ProfitBasis::Summed => Verdict::from_figure(self.total_profit),
            ProfitBasis::Realized => Verdict::from_figure(self.realized_profit()),
        }
    }
}

/// Compute the Dutch stake split for `prices` with a budget of `total_stake`.
pub fn dutch(prices: &[f64], total_stake: f64) -> Result<DutchBet, DutchError> {
    if prices.is_empty() {
        return Err(DutchError::NoPrices);
    }
    if let Some((index, &price)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p > 0.0))
    {
        return Err(DutchError::InvalidPrice { index, price });
    }
    if !(total_stake.is_finite() && total_stake > 0.0) {
        return Err(DutchError::InvalidStake(total_stake));
    }

    let implied: Vec<f64> = prices.iter().map(|p| 1.0 / p).collect();
    let implied_sum: f64 = implied.iter().sum();

    let stakes: Vec<f64> = implied
        .iter()
        .map(|q| q / implied_sum * total_stake)
        .collect();

    let payouts: Vec<f64> = prices
        .iter()
        .zip(&stakes)
        .map(|(price, stake)| price * stake)
        .collect();

    let total_profit = payouts.iter().sum::<f64>() - total_stake;

    debug!(
        outcomes = prices.len(),
        implied_sum = format!("{implied_sum:.5}"),
        total_profit = format!("{total_profit:.2}"),
        "Dutch split computed"
    );

    Ok(DutchBet {
        prices: prices.to_vec(),
        total_stake,
        implied_sum,
        stakes,
        payouts,
        total_profit,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
