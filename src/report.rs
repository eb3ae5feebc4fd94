//! Plain-text evaluation report.
//!
//! One block per match: best prices with their bookmakers, the Dutch stake
//! split, and the profit verdict. Incomplete and failed matches get a short
//! block of their own so nothing is silently dropped.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

use crate::strategy::{Assessment, MatchAssessment, MatchEvaluation};
use crate::types::Outcome;

/// Render all assessments into the report text.
pub fn render(assessments: &[MatchAssessment]) -> String {
    let mut out = String::new();
    for a in assessments {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", a.fixture);
        match &a.assessment {
            Assessment::Evaluated(eval) => render_evaluation(&mut out, eval),
            Assessment::Incomplete { missing } => {
                let names: Vec<String> = missing.iter().map(Outcome::to_string).collect();
                let _ = writeln!(out, "Incomplete prices, missing: {}", names.join(", "));
            }
            Assessment::Failed(e) => {
                let _ = writeln!(out, "Calculation failed: {e}");
            }
        }
        out.push('\n');
    }
    out
}

fn render_evaluation(out: &mut String, eval: &MatchEvaluation) {
    let prices = &eval.prices;
    let _ = writeln!(
        out,
        "Max Home Price: {} (Bookmaker: {}), Max Draw Price: {} (Bookmaker: {}), Max Away Price: {} (Bookmaker: {})",
        prices.home.price,
        prices.home.bookmaker.title,
        prices.draw.price,
        prices.draw.bookmaker.title,
        prices.away.price,
        prices.away.bookmaker.title,
    );

    let _ = writeln!(out, "Stakes:");
    for (outcome, stake) in Outcome::ALL.iter().zip(&eval.bet.stakes) {
        let _ = writeln!(out, "Stake on {outcome}: ${stake:.2}");
    }

    let bet = &eval.bet;
    let _ = writeln!(
        out,
        "Payout per outcome: ${:.2} (implied probability sum {:.4})",
        bet.payout(),
        bet.implied_sum
    );
    let _ = writeln!(out, "{}", eval.verdict);

    let realized = bet.realized_profit();
    let sign = if realized < 0.0 { "-" } else { "" };
    let label = if bet.is_arbitrage() { "Dutch book" } else { "no Dutch book" };
    let _ = writeln!(out, "Single-outcome result: {sign}${:.2} ({label})", realized.abs());
}

/// Write the report, replacing any previous one.
pub fn write_report(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "Report written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
