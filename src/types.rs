//! Shared types for DUTCHBOOK.
//!
//! These types form the data model used across all modules: matches,
//! bookmakers, markets and the quotes that tie them together. They are
//! created during ingestion and are read-only for the evaluation core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Row id of a match. Assigned by the store on insertion.
    MatchId
);
row_id!(
    /// Row id of a bookmaker. Content-addressed by title.
    BookmakerId
);
row_id!(
    /// Row id of a market. Content-addressed by key, so its value depends
    /// on insertion order and is not stable across databases.
    MarketId
);
row_id!(QuoteId);

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Outcome label used by three-way markets for a tied result.
pub const DRAW_LABEL: &str = "Draw";

/// One of the three admissible outcomes of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Away,
    Draw,
}

impl Outcome {
    /// Canonical order of the price vector: home, away, draw.
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Away, Outcome::Draw];
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Home => write!(f, "Home"),
            Outcome::Away => write!(f, "Away"),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A fixture between two teams. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
}

impl Match {
    /// The quote label that identifies `outcome` for this match.
    pub fn outcome_label(&self, outcome: Outcome) -> &str {
        match outcome {
            Outcome::Home => &self.home_team,
            Outcome::Away => &self.away_team,
            Outcome::Draw => DRAW_LABEL,
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.home_team, self.away_team)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub id: BookmakerId,
    pub title: String,
}

/// A category of outcomes offered by a bookmaker (e.g. `h2h`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub key: String,
}

/// A single decimal-odds price for one outcome, from one bookmaker, in one
/// market of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub match_id: MatchId,
    pub bookmaker_id: BookmakerId,
    pub market_id: MarketId,
    pub outcome_name: String,
    /// Decimal odds: payout multiple per unit stake. Always > 0.
    pub price: f64,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only snapshot of the quote store for one evaluation pass.
///
/// Quotes are grouped by match and kept in insertion (id) order, which the
/// best-price selector relies on for its tie-break.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    matches: Vec<Match>,
    bookmakers: HashMap<BookmakerId, Bookmaker>,
    markets: HashMap<MarketId, Market>,
    quotes: HashMap<MatchId, Vec<Quote>>,
}

impl QuoteBook {
    pub fn new(
        matches: Vec<Match>,
        bookmakers: Vec<Bookmaker>,
        markets: Vec<Market>,
        quotes: Vec<Quote>,
    ) -> Self {
        let mut by_match: HashMap<MatchId, Vec<Quote>> = HashMap::new();
        for quote in quotes {
            by_match.entry(quote.match_id).or_default().push(quote);
        }
        for list in by_match.values_mut() {
            list.sort_by_key(|q| q.id);
        }

        Self {
            matches,
            bookmakers: bookmakers.into_iter().map(|b| (b.id, b)).collect(),
            markets: markets.into_iter().map(|m| (m.id, m)).collect(),
            quotes: by_match,
        }
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn get_match(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn bookmaker(&self, id: BookmakerId) -> Option<&Bookmaker> {
        self.bookmakers.get(&id)
    }

    pub fn market(&self, id: MarketId) -> Option<&Market> {
        self.markets.get(&id)
    }

    /// Look up a market by its key. Keys are unique in the store.
    pub fn market_by_key(&self, key: &str) -> Option<&Market> {
        self.markets.values().find(|m| m.key == key)
    }

    /// All quotes recorded for a match, oldest first.
    pub fn quotes_for(&self, match_id: MatchId) -> &[Quote] {
        self.quotes.get(&match_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
