//! Core engine: one fetch → ingest → evaluate → report cycle.

pub mod ingest;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, EvaluationScope};
use crate::data::OddsProvider;
use crate::report;
use crate::storage::{BookScope, QuoteStore};
use crate::strategy::selector::ExcludedMarkets;
use crate::strategy::{EvaluationSummary, Evaluator, MatchAssessment};
use ingest::IngestSummary;

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a complete cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub run_id: Uuid,
    /// Whether the provider lists the sport as active. `None` if the sports
    /// listing could not be fetched.
    pub sport_active: Option<bool>,
    pub ingest: IngestSummary,
    pub summary: EvaluationSummary,
    pub assessments: Vec<MatchAssessment>,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run {}: ingested={} quotes={} rejected={} evaluated={} profitable={} arbitrage={} incomplete={} failed={}",
            self.run_id,
            self.ingest.matches,
            self.ingest.quotes,
            self.ingest.rejected,
            self.summary.evaluated,
            self.summary.profitable,
            self.summary.arbitrage,
            self.summary.incomplete,
            self.summary.failed,
        )
    }
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// Run a single fetch → ingest → evaluate → report cycle.
pub async fn run_cycle(
    provider: &dyn OddsProvider,
    store: &mut QuoteStore,
    cfg: &AppConfig,
) -> Result<CycleReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("cycle", run_id = %run_id);
    run_cycle_inner(run_id, provider, store, cfg)
        .instrument(span)
        .await
}

async fn run_cycle_inner(
    run_id: Uuid,
    provider: &dyn OddsProvider,
    store: &mut QuoteStore,
    cfg: &AppConfig,
) -> Result<CycleReport> {
    let sport = &cfg.odds_api.sport;
    info!(sport = %sport, "Starting cycle");

    // 1. Check the sport is covered. Informational only.
    let sport_active = match provider.fetch_sports().await {
        Ok(sports) => {
            let active = sports.iter().any(|s| &s.key == sport && s.active);
            if !active {
                warn!(sport = %sport, "Sport not listed as active by provider");
            }
            Some(active)
        }
        Err(e) => {
            warn!(error = %e, "Sports listing failed, continuing");
            None
        }
    };

    // 2. Fetch and store quotes
    let events = provider.fetch_events().await.context("Failed to fetch odds")?;
    let ingested = ingest::ingest(store, &events)
        .await
        .context("Failed to store fetched odds")?;

    // 3. Snapshot
    let scope = match cfg.evaluation.scope {
        EvaluationScope::All => BookScope::All,
        EvaluationScope::Cycle => BookScope::Matches(&ingested.match_ids),
    };
    let book = store.load_book(scope).await.context("Failed to load quote snapshot")?;

    // 4. Evaluate
    let excluded = ExcludedMarkets::resolve(&book, &cfg.evaluation.excluded_markets);
    info!(
        configured = ?cfg.evaluation.excluded_markets,
        resolved = excluded.len(),
        "Market exclusions resolved"
    );
    let evaluator = Evaluator::new(cfg.evaluation.total_stake, cfg.evaluation.profit_basis);
    let assessments = evaluator.evaluate_book(&book, &excluded);
    let summary = EvaluationSummary::from_assessments(&assessments);

    // 5. Report
    report::write_report(&cfg.report.path, &report::render(&assessments))?;

    Ok(CycleReport {
        run_id,
        sport_active,
        ingest: ingested,
        summary,
        assessments,
        timestamp: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Run cycles until `shutdown` resolves.
///
/// With `scan_interval_secs = 0` a single cycle runs and its error is
/// returned. Otherwise cycles repeat on the interval and a failed cycle is
/// logged. Shutdown interrupts a cycle in progress; its uncommitted writes
/// roll back.
pub async fn run<F>(
    provider: &dyn OddsProvider,
    store: &mut QuoteStore,
    cfg: &AppConfig,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if cfg.agent.scan_interval_secs == 0 {
        tokio::select! {
            result = run_cycle(provider, store, cfg) => {
                log_cycle_report(&result?, &cfg.report.path);
            }
            _ = &mut shutdown => info!("Shutdown signal received, cycle abandoned."),
        }
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.agent.scan_interval_secs));
    info!(
        interval_secs = cfg.agent.scan_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }

        tokio::select! {
            result = run_cycle(provider, store, cfg) => match result {
                Ok(report) => log_cycle_report(&report, &cfg.report.path),
                Err(e) => error!(error = %e, "Cycle failed, continuing to next"),
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received, cycle abandoned.");
                break;
            }
        }
    }

    Ok(())
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport, report_path: &str) {
    info!(
        run_id = %report.run_id,
        sport_active = ?report.sport_active,
        ingested = report.ingest.matches,
        quotes = report.ingest.quotes,
        rejected = report.ingest.rejected,
        evaluated = report.summary.evaluated,
        profitable = report.summary.profitable,
        arbitrage = report.summary.arbitrage,
        incomplete = report.summary.incomplete,
        failed = report.summary.failed,
        report = %report_path,
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
