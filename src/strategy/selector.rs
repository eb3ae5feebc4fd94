//! Best-price selection.
//!
//! For each outcome of a match, picks the highest decimal price offered by
//! any bookmaker, skipping quotes from excluded markets.
//!
//! Tie-break: when several quotes share the maximum price, the earliest one
//! in insertion order (lowest quote id) wins.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::types::{Bookmaker, Match, MarketId, MatchId, Outcome, Quote, QuoteBook, QuoteId};

// ---------------------------------------------------------------------------
// Exclusion policy
// ---------------------------------------------------------------------------

/// Market ids that the selector must ignore.
///
/// Built from configured market *names* against a snapshot, because market
/// ids are assigned in insertion order and differ between databases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedMarkets(HashSet<MarketId>);

impl ExcludedMarkets {
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve market names to ids. Names the snapshot has never seen
    /// resolve to nothing.
    pub fn resolve<S: AsRef<str>>(book: &QuoteBook, names: &[S]) -> Self {
        let mut ids = HashSet::new();
        for name in names {
            match book.market_by_key(name.as_ref()) {
                Some(market) => {
                    ids.insert(market.id);
                }
                None => debug!(market = name.as_ref(), "Excluded market not present in snapshot"),
            }
        }
        Self(ids)
    }

    pub fn contains(&self, id: MarketId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MarketId> for ExcludedMarkets {
    fn from_iter<I: IntoIterator<Item = MarketId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The best available price for one outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPrice {
    pub price: f64,
    pub bookmaker: Bookmaker,
    pub market_id: MarketId,
    pub quote_id: QuoteId,
}

/// Best prices for all three outcomes, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPrices {
    pub home: BestPrice,
    pub away: BestPrice,
    pub draw: BestPrice,
}

impl SelectedPrices {
    /// `[home, away, draw]`.
    pub fn price_vector(&self) -> [f64; 3] {
        [self.home.price, self.away.price, self.draw.price]
    }

    pub fn get(&self, outcome: Outcome) -> &BestPrice {
        match outcome {
            Outcome::Home => &self.home,
            Outcome::Away => &self.away,
            Outcome::Draw => &self.draw,
        }
    }
}

/// Highest-priced quote for `outcome_label` in `match_id`, ignoring
/// excluded markets and quotes whose bookmaker is not in the snapshot.
/// `None` if no quote qualifies.
pub fn select_best(
    book: &QuoteBook,
    match_id: MatchId,
    outcome_label: &str,
    excluded: &ExcludedMarkets,
) -> Option<BestPrice> {
    let mut best: Option<(&Quote, &Bookmaker)> = None;

    for quote in book.quotes_for(match_id) {
        if quote.outcome_name != outcome_label || excluded.contains(quote.market_id) {
            continue;
        }
        let Some(bookmaker) = book.bookmaker(quote.bookmaker_id) else {
            warn!(quote_id = %quote.id, bookmaker_id = %quote.bookmaker_id, "Quote from unknown bookmaker skipped");
            continue;
        };
        // Strict comparison keeps the earliest quote on ties.
        if best.map_or(true, |(b, _)| quote.price > b.price) {
            best = Some((quote, bookmaker));
        }
    }

    let (quote, bookmaker) = best?;

    Some(BestPrice {
        price: quote.price,
        bookmaker: bookmaker.clone(),
        market_id: quote.market_id,
        quote_id: quote.id,
    })
}

/// Select the best price for every outcome of `m`.
///
/// Returns the outcomes that have no qualifying quote as the error value.
pub fn select_prices(
    book: &QuoteBook,
    m: &Match,
    excluded: &ExcludedMarkets,
) -> Result<SelectedPrices, Vec<Outcome>> {
    let picks =
        Outcome::ALL.map(|outcome| select_best(book, m.id, m.outcome_label(outcome), excluded));

    let missing: Vec<Outcome> = Outcome::ALL
        .into_iter()
        .zip(&picks)
        .filter(|(_, pick)| pick.is_none())
        .map(|(outcome, _)| outcome)
        .collect();

    match picks {
        [Some(home), Some(away), Some(draw)] => Ok(SelectedPrices { home, away, draw }),
        _ => Err(missing),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
