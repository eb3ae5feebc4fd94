//! Strategy engine: best-price selection and Dutch stake evaluation.

pub mod dutch;
pub mod selector;

use tracing::{debug, info, warn};

use crate::types::{Match, Outcome, QuoteBook};
use dutch::{DutchBet, DutchError, ProfitBasis, Verdict};
use selector::{ExcludedMarkets, SelectedPrices};

// ---------------------------------------------------------------------------
// Per-match results
// ---------------------------------------------------------------------------

/// A match that had a full price vector and a valid Dutch split.
#[derive(Debug, Clone)]
pub struct MatchEvaluation {
    pub prices: SelectedPrices,
    pub bet: DutchBet,
    pub verdict: Verdict,
}

/// What happened to one match during an evaluation pass.
#[derive(Debug, Clone)]
pub enum Assessment {
    Evaluated(MatchEvaluation),
    /// At least one outcome had no qualifying quote. Skipped, not an error.
    Incomplete { missing: Vec<Outcome> },
    /// The calculator rejected its inputs.
    Failed(DutchError),
}

#[derive(Debug, Clone)]
pub struct MatchAssessment {
    pub fixture: Match,
    pub assessment: Assessment,
}

/// Counts over a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub profitable: usize,
    /// Matches where Σ(1/price) < 1.
    pub arbitrage: usize,
    pub incomplete: usize,
    pub failed: usize,
}

impl EvaluationSummary {
    pub fn from_assessments(assessments: &[MatchAssessment]) -> Self {
        let mut summary = Self::default();
        for a in assessments {
            match &a.assessment {
                Assessment::Evaluated(eval) => {
                    summary.evaluated += 1;
                    if eval.verdict.is_profitable() {
                        summary.profitable += 1;
                    }
                    if eval.bet.is_arbitrage() {
                        summary.arbitrage += 1;
                    }
                }
                Assessment::Incomplete { .. } => summary.incomplete += 1,
                Assessment::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Runs selection → Dutch split → classification for each match.
///
/// Holds no per-match state; one instance can evaluate any number of
/// snapshots.
pub struct Evaluator {
    total_stake: f64,
    basis: ProfitBasis,
}

impl Evaluator {
    pub fn new(total_stake: f64, basis: ProfitBasis) -> Self {
        Self { total_stake, basis }
    }

    pub fn evaluate_match(
        &self,
        book: &QuoteBook,
        fixture: &Match,
        excluded: &ExcludedMarkets,
    ) -> Assessment {
        let prices = match selector::select_prices(book, fixture, excluded) {
            Ok(prices) => prices,
            Err(missing) => {
                debug!(
                    match_id = %fixture.id,
                    fixture = %fixture,
                    missing = ?missing,
                    "Incomplete prices, skipping"
                );
                return Assessment::Incomplete { missing };
            }
        };

        match dutch::dutch(&prices.price_vector(), self.total_stake) {
            Ok(bet) => {
                let verdict = bet.verdict(self.basis);
                if bet.is_arbitrage() {
                    info!(
                        match_id = %fixture.id,
                        fixture = %fixture,
                        implied_sum = format!("{:.4}", bet.implied_sum),
                        realized = format!("${:.2}", bet.realized_profit()),
                        "Dutch book found"
                    );
                }
                Assessment::Evaluated(MatchEvaluation { prices, bet, verdict })
            }
            Err(e) => {
                warn!(match_id = %fixture.id, fixture = %fixture, error = %e, "Dutch calculation failed");
                Assessment::Failed(e)
            }
        }
    }

    /// Evaluate every match in the snapshot, in snapshot order.
    pub fn evaluate_book(
        &self,
        book: &QuoteBook,
        excluded: &ExcludedMarkets,
    ) -> Vec<MatchAssessment> {
        let assessments: Vec<MatchAssessment> = book
            .matches()
            .iter()
            .map(|fixture| MatchAssessment {
                fixture: fixture.clone(),
                assessment: self.evaluate_match(book, fixture, excluded),
            })
            .collect();

        let summary = EvaluationSummary::from_assessments(&assessments);
        info!(
            matches = assessments.len(),
            evaluated = summary.evaluated,
            profitable = summary.profitable,
            arbitrage = summary.arbitrage,
            incomplete = summary.incomplete,
            failed = summary.failed,
            "Evaluation complete"
        );

        assessments
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
