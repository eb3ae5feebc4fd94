//! Odds data providers.
//!
//! Defines the `OddsProvider` trait and the wire types for events with
//! bookmaker quotes. The Odds API v4 client lives in `odds_api`.

pub mod odds_api;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Wire types (The Odds API v4 JSON → Rust)
// ---------------------------------------------------------------------------

/// Entry of `/v4/sports`. We only deserialize the fields we need.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SportInfo {
    pub key: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub active: bool,
}

/// One fixture with all bookmaker prices, from `/v4/sports/{sport}/odds`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OddsEvent {
    pub id: String,
    #[serde(default)]
    pub sport_key: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<BookmakerOdds>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BookmakerOdds {
    #[serde(default)]
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub markets: Vec<MarketOdds>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarketOdds {
    /// Market key, e.g. `h2h` or `h2h_lay`.
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomePrice>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutcomePrice {
    pub name: String,
    pub price: f64,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Abstraction over remote odds sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// List the sports the provider currently covers.
    async fn fetch_sports(&self) -> Result<Vec<SportInfo>>;

    /// Fetch upcoming events with bookmaker quotes for the configured sport.
    async fn fetch_events(&self) -> Result<Vec<OddsEvent>>;
}
