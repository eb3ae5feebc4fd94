//! In-memory odds provider for integration tests.
//!
//! Serves a fixed list of events and can be switched into an error mode to
//! exercise failure handling without touching the network.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

use dutchbook::data::{BookmakerOdds, MarketOdds, OddsEvent, OddsProvider, OutcomePrice, SportInfo};

pub struct MockProvider {
    sport: String,
    events: Arc<Mutex<Vec<OddsEvent>>>,
    force_error: Arc<Mutex<Option<String>>>,
    event_calls: Arc<Mutex<u32>>,
}

impl MockProvider {
    pub fn new(sport: &str, events: Vec<OddsEvent>) -> Self {
        Self {
            sport: sport.to_string(),
            events: Arc::new(Mutex::new(events)),
            force_error: Arc::new(Mutex::new(None)),
            event_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Replace the events served by the next fetch.
    pub fn set_events(&self, events: Vec<OddsEvent>) {
        *self.events.lock().unwrap() = events;
    }

    /// Make every subsequent call fail with `msg`.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn event_calls(&self) -> u32 {
        *self.event_calls.lock().unwrap()
    }
}

#[async_trait]
impl OddsProvider for MockProvider {
    async fn fetch_sports(&self) -> Result<Vec<SportInfo>> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(vec![SportInfo {
            key: self.sport.clone(),
            group: "Soccer".into(),
            title: "Mock League".into(),
            active: true,
        }])
    }

    async fn fetch_events(&self) -> Result<Vec<OddsEvent>> {
        *self.event_calls.lock().unwrap() += 1;
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(self.events.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// An `h2h`-style market with prices in home, away, draw order.
pub fn market(key: &str, home: &str, away: &str, prices: [f64; 3]) -> MarketOdds {
    MarketOdds {
        key: key.into(),
        outcomes: vec![
            OutcomePrice { name: home.into(), price: prices[0] },
            OutcomePrice { name: away.into(), price: prices[1] },
            OutcomePrice { name: "Draw".into(), price: prices[2] },
        ],
    }
}

pub fn bookmaker(title: &str, markets: Vec<MarketOdds>) -> BookmakerOdds {
    BookmakerOdds {
        key: title.to_lowercase().replace(' ', "_"),
        title: title.into(),
        markets,
    }
}

pub fn event(id: &str, home: &str, away: &str, bookmakers: Vec<BookmakerOdds>) -> OddsEvent {
    OddsEvent {
        id: id.into(),
        sport_key: "soccer_epl".into(),
        commence_time: Utc.with_ymd_and_hms(2026, 3, 14, 15, 0, 0).unwrap(),
        home_team: home.into(),
        away_team: away.into(),
        bookmakers,
    }
}

/// A weekend of fixtures covering the interesting cases:
///
/// * Arsenal v Chelsea: back prices across two bookmakers form a Dutch
///   book; Betfair's lay market would win every outcome if not excluded.
/// * Liverpool v Everton: ordinary overround, no Dutch book.
/// * Leeds v Burnley: nobody prices the away side.
/// * Fulham v Brentford: one zero price that must be rejected at ingest.
pub fn weekend_events() -> Vec<OddsEvent> {
    vec![
        event(
            "evt-ars-che",
            "Arsenal",
            "Chelsea",
            vec![
                bookmaker("Unibet", vec![market("h2h", "Arsenal", "Chelsea", [2.1, 3.6, 3.4])]),
                bookmaker(
                    "Betfair",
                    vec![
                        market("h2h", "Arsenal", "Chelsea", [2.0, 3.9, 4.1]),
                        market("h2h_lay", "Arsenal", "Chelsea", [9.0, 9.0, 9.0]),
                    ],
                ),
            ],
        ),
        event(
            "evt-liv-eve",
            "Liverpool",
            "Everton",
            vec![
                bookmaker("Unibet", vec![market("h2h", "Liverpool", "Everton", [1.5, 6.0, 4.2])]),
                bookmaker("Pinnacle", vec![market("h2h", "Liverpool", "Everton", [1.52, 5.8, 4.3])]),
            ],
        ),
        event(
            "evt-lee-bur",
            "Leeds",
            "Burnley",
            vec![bookmaker(
                "Unibet",
                vec![MarketOdds {
                    key: "h2h".into(),
                    outcomes: vec![
                        OutcomePrice { name: "Leeds".into(), price: 2.2 },
                        OutcomePrice { name: "Draw".into(), price: 3.3 },
                    ],
                }],
            )],
        ),
        event(
            "evt-ful-bre",
            "Fulham",
            "Brentford",
            vec![
                bookmaker("Unibet", vec![market("h2h", "Fulham", "Brentford", [0.0, 3.2, 3.5])]),
                bookmaker("Pinnacle", vec![market("h2h", "Fulham", "Brentford", [2.4, 3.1, 3.4])]),
            ],
        ),
    ]
}
