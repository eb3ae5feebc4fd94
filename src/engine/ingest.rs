//! Ingestion of fetched events into the quote store.
//!
//! Every event becomes a new match row; each bookmaker/market/outcome price
//! becomes a quote row. Prices that are not positive and finite are
//! rejected here, before they can reach evaluation. Each event is written
//! in its own transaction, so a database error never leaves a match with
//! only part of its quotes.

use tracing::{debug, info, warn};

use crate::data::{MarketOdds, OddsEvent};
use crate::storage::{NewQuote, QuoteStore, StoreError, StoreResult};
use crate::types::{BookmakerId, MarketId, MatchId};

/// What one ingestion pass wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub matches: usize,
    pub quotes: usize,
    pub rejected: usize,
    /// Ids of the matches created by this pass, in event order.
    pub match_ids: Vec<MatchId>,
}

pub async fn ingest(store: &mut QuoteStore, events: &[OddsEvent]) -> StoreResult<IngestSummary> {
    let mut summary = IngestSummary::default();

    for event in events {
        // Lookup rows first: the transaction below holds a connection.
        let mut markets: Vec<(&str, BookmakerId, MarketId, &MarketOdds)> = Vec::new();
        for bookmaker in &event.bookmakers {
            let bookmaker_id = store.bookmaker_id(&bookmaker.title).await?;
            for market in &bookmaker.markets {
                let market_id = store.market_id(&market.key).await?;
                markets.push((&bookmaker.title, bookmaker_id, market_id, market));
            }
        }

        let mut tx = store.begin().await?;
        let match_id = tx
            .insert_match(&event.home_team, &event.away_team, event.commence_time)
            .await?;
        let mut quotes = 0;
        let mut rejected = 0;

        for (title, bookmaker_id, market_id, market) in markets {
            for outcome in &market.outcomes {
                let quote = NewQuote {
                    match_id,
                    bookmaker_id,
                    market_id,
                    outcome_name: &outcome.name,
                    price: outcome.price,
                };
                match tx.insert_quote(quote).await {
                    Ok(_) => quotes += 1,
                    Err(StoreError::InvalidPrice { outcome: name, price }) => {
                        warn!(
                            event_id = %event.id,
                            bookmaker = %title,
                            market = %market.key,
                            outcome = %name,
                            price,
                            "Rejected quote with invalid price"
                        );
                        rejected += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tx.commit().await?;
        summary.matches += 1;
        summary.quotes += quotes;
        summary.rejected += rejected;
        summary.match_ids.push(match_id);

        debug!(event_id = %event.id, match_id = %match_id, "Event ingested");
    }

    info!(
        matches = summary.matches,
        quotes = summary.quotes,
        rejected = summary.rejected,
        "Ingestion complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
