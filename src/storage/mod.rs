//! Persistence layer.
//!
//! SQLite quote store. Matches and quotes are append-only; bookmakers and
//! markets are lookup tables keyed by name, filled on first sighting.
//!
//! A `QuoteStore` is an explicit handle: open it for a run, pass it to
//! whatever needs it, and `close` it when the run is over. Match and quote
//! writes go through a `QuoteTx`, so a fixture is stored whole or not at all.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteExecutor, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

use crate::types::{
    Bookmaker, BookmakerId, Market, MarketId, Match, MatchId, Quote, QuoteBook, QuoteId,
};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS Matches (
        match_id INTEGER PRIMARY KEY,
        home_team TEXT NOT NULL,
        away_team TEXT NOT NULL,
        commence_time TIMESTAMP NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS Bookmakers (
        bookmaker_id INTEGER PRIMARY KEY,
        title TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS Markets (
        market_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS Outcomes (
        outcome_id INTEGER PRIMARY KEY,
        match_id INTEGER NOT NULL,
        bookmaker_id INTEGER NOT NULL,
        market_id INTEGER NOT NULL,
        outcome_name TEXT NOT NULL,
        price REAL NOT NULL CHECK (price > 0),
        FOREIGN KEY (match_id) REFERENCES Matches(match_id),
        FOREIGN KEY (bookmaker_id) REFERENCES Bookmakers(bookmaker_id),
        FOREIGN KEY (market_id) REFERENCES Markets(market_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_outcomes_match ON Outcomes (match_id, outcome_name)",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid price {price} for outcome '{outcome}' (must be positive and finite)")]
    InvalidPrice { outcome: String, price: f64 },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct MatchRow {
    match_id: i64,
    home_team: String,
    away_team: String,
    commence_time: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BookmakerRow {
    bookmaker_id: i64,
    title: String,
}

#[derive(sqlx::FromRow)]
struct MarketRow {
    market_id: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct QuoteRow {
    outcome_id: i64,
    match_id: i64,
    bookmaker_id: i64,
    market_id: i64,
    outcome_name: String,
    price: f64,
}

/// A quote about to be stored.
#[derive(Debug, Clone)]
pub struct NewQuote<'a> {
    pub match_id: MatchId,
    pub bookmaker_id: BookmakerId,
    pub market_id: MarketId,
    pub outcome_name: &'a str,
    pub price: f64,
}

/// Which matches `load_book` returns.
#[derive(Debug, Clone, Copy)]
pub enum BookScope<'a> {
    All,
    Matches(&'a [MatchId]),
}

// ---------------------------------------------------------------------------
// Name lookup tables
// ---------------------------------------------------------------------------

/// Name → id table with an in-memory cache in front of the database.
struct LookupTable {
    insert_sql: &'static str,
    select_sql: &'static str,
    cache: HashMap<String, i64>,
}

impl LookupTable {
    fn new(insert_sql: &'static str, select_sql: &'static str) -> Self {
        Self {
            insert_sql,
            select_sql,
            cache: HashMap::new(),
        }
    }

    /// Id for `name`, inserting a row the first time the name is seen.
    async fn get_or_create(&mut self, pool: &SqlitePool, name: &str) -> StoreResult<i64> {
        if let Some(id) = self.cache.get(name) {
            return Ok(*id);
        }

        sqlx::query(self.insert_sql).bind(name).execute(pool).await?;
        let id: i64 = sqlx::query_scalar(self.select_sql)
            .bind(name)
            .fetch_one(pool)
            .await?;

        self.cache.insert(name.to_string(), id);
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct QuoteStore {
    pool: SqlitePool,
    bookmakers: LookupTable,
    markets: LookupTable,
}

impl QuoteStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn open(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection.
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 4 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!(url, "Quote store opened");

        Ok(Self {
            pool,
            bookmakers: LookupTable::new(
                "INSERT OR IGNORE INTO Bookmakers (title) VALUES (?)",
                "SELECT bookmaker_id FROM Bookmakers WHERE title = ?",
            ),
            markets: LookupTable::new(
                "INSERT OR IGNORE INTO Markets (name) VALUES (?)",
                "SELECT market_id FROM Markets WHERE name = ?",
            ),
        })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Release all connections. The handle is consumed.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Quote store closed");
    }

    /// Start a write transaction for matches and quotes.
    ///
    /// Resolve bookmaker and market ids before calling this: on an
    /// in-memory database the transaction holds the only connection.
    pub async fn begin(&self) -> StoreResult<QuoteTx<'_>> {
        Ok(QuoteTx {
            tx: self.pool.begin().await?,
        })
    }

    pub async fn bookmaker_id(&mut self, title: &str) -> StoreResult<BookmakerId> {
        self.bookmakers
            .get_or_create(&self.pool, title)
            .await
            .map(BookmakerId)
    }

    pub async fn market_id(&mut self, name: &str) -> StoreResult<MarketId> {
        self.markets
            .get_or_create(&self.pool, name)
            .await
            .map(MarketId)
    }

    /// Load a read-only snapshot for evaluation.
    pub async fn load_book(&self, scope: BookScope<'_>) -> StoreResult<QuoteBook> {
        let bookmakers: Vec<BookmakerRow> =
            sqlx::query_as("SELECT bookmaker_id, title FROM Bookmakers")
                .fetch_all(&self.pool)
                .await?;
        let markets: Vec<MarketRow> = sqlx::query_as("SELECT market_id, name FROM Markets")
            .fetch_all(&self.pool)
            .await?;

        let mut matches_q = QueryBuilder::<Sqlite>::new(
            "SELECT match_id, home_team, away_team, commence_time FROM Matches",
        );
        let mut quotes_q = QueryBuilder::<Sqlite>::new(
            "SELECT outcome_id, match_id, bookmaker_id, market_id, outcome_name, price FROM Outcomes",
        );

        if let BookScope::Matches(ids) = scope {
            if ids.is_empty() {
                return Ok(QuoteBook::new(
                    Vec::new(),
                    bookmakers.into_iter().map(Into::into).collect(),
                    markets.into_iter().map(Into::into).collect(),
                    Vec::new(),
                ));
            }
            for qb in [&mut matches_q, &mut quotes_q] {
                qb.push(" WHERE match_id IN (");
                let mut list = qb.separated(", ");
                for id in ids {
                    list.push_bind(id.0);
                }
                list.push_unseparated(")");
            }
        }
        matches_q.push(" ORDER BY match_id");
        quotes_q.push(" ORDER BY outcome_id");

        let matches: Vec<MatchRow> = matches_q.build_query_as().fetch_all(&self.pool).await?;
        let quotes: Vec<QuoteRow> = quotes_q.build_query_as().fetch_all(&self.pool).await?;

        debug!(
            matches = matches.len(),
            quotes = quotes.len(),
            bookmakers = bookmakers.len(),
            markets = markets.len(),
            "Snapshot loaded"
        );

        Ok(QuoteBook::new(
            matches.into_iter().map(Into::into).collect(),
            bookmakers.into_iter().map(Into::into).collect(),
            markets.into_iter().map(Into::into).collect(),
            quotes.into_iter().map(Into::into).collect(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Write transaction
// ---------------------------------------------------------------------------

/// Pending match and quote writes. Dropping it without `commit` rolls
/// everything back.
pub struct QuoteTx<'s> {
    tx: Transaction<'s, Sqlite>,
}

impl QuoteTx<'_> {
    pub async fn insert_match(
        &mut self,
        home_team: &str,
        away_team: &str,
        commence_time: DateTime<Utc>,
    ) -> StoreResult<MatchId> {
        insert_match(&mut *self.tx, home_team, away_team, commence_time).await
    }

    pub async fn insert_quote(&mut self, quote: NewQuote<'_>) -> StoreResult<QuoteId> {
        insert_quote(&mut *self.tx, quote).await
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn insert_match<'e>(
    executor: impl SqliteExecutor<'e>,
    home_team: &str,
    away_team: &str,
    commence_time: DateTime<Utc>,
) -> StoreResult<MatchId> {
    let result = sqlx::query(
        "INSERT INTO Matches (home_team, away_team, commence_time) VALUES (?, ?, ?)",
    )
    .bind(home_team)
    .bind(away_team)
    .bind(commence_time)
    .execute(executor)
    .await?;

    Ok(MatchId(result.last_insert_rowid()))
}

async fn insert_quote<'e>(
    executor: impl SqliteExecutor<'e>,
    quote: NewQuote<'_>,
) -> StoreResult<QuoteId> {
    if !(quote.price.is_finite() && quote.price > 0.0) {
        return Err(StoreError::InvalidPrice {
            outcome: quote.outcome_name.to_string(),
            price: quote.price,
        });
    }

    let result = sqlx::query(
        "INSERT INTO Outcomes (match_id, bookmaker_id, market_id, outcome_name, price)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(quote.match_id.0)
    .bind(quote.bookmaker_id.0)
    .bind(quote.market_id.0)
    .bind(quote.outcome_name)
    .bind(quote.price)
    .execute(executor)
    .await?;

    Ok(QuoteId(result.last_insert_rowid()))
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Match {
            id: MatchId(row.match_id),
            home_team: row.home_team,
            away_team: row.away_team,
            commence_time: row.commence_time,
        }
    }
}

impl From<BookmakerRow> for Bookmaker {
    fn from(row: BookmakerRow) -> Self {
        Bookmaker {
            id: BookmakerId(row.bookmaker_id),
            title: row.title,
        }
    }
}

impl From<MarketRow> for Market {
    fn from(row: MarketRow) -> Self {
        Market {
            id: MarketId(row.market_id),
            key: row.name,
        }
    }
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Quote {
            id: QuoteId(row.outcome_id),
            match_id: MatchId(row.match_id),
            bookmaker_id: BookmakerId(row.bookmaker_id),
            market_id: MarketId(row.market_id),
            outcome_name: row.outcome_name,
            price: row.price,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
