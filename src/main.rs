//! DUTCHBOOK — best-price Dutch book scanner.
//!
//! Entry point. Loads configuration, initialises structured logging, opens
//! the quote store, and runs one fetch→ingest→evaluate→report cycle (or a
//! loop of them, with graceful shutdown).

use anyhow::Result;
use tracing::{error, info};

use dutchbook::config::{self, AppConfig};
use dutchbook::data::odds_api::OddsApiClient;
use dutchbook::engine;
use dutchbook::storage::QuoteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("DUTCHBOOK_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        agent_name = %cfg.agent.name,
        sport = %cfg.odds_api.sport,
        total_stake = cfg.evaluation.total_stake,
        profit_basis = ?cfg.evaluation.profit_basis,
        scope = ?cfg.evaluation.scope,
        "DUTCHBOOK starting up"
    );

    let provider = OddsApiClient::new(cfg.odds_api.clone(), cfg.odds_api_key()?)?;

    // The store handle lives for the whole run and is closed on every path.
    let mut store = QuoteStore::open(&cfg.storage.database_url).await?;
    let outcome = engine::run(&provider, &mut store, &cfg, shutdown_signal()).await;
    store.close().await;

    if let Err(e) = &outcome {
        error!(error = %e, "DUTCHBOOK stopped with an error");
    }
    outcome
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dutchbook=info"));

    let json_logging = std::env::var("DUTCHBOOK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
