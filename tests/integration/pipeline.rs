//! End-to-end cycles: provider → store → evaluation → report file.

use uuid::Uuid;

use dutchbook::config::AppConfig;
use dutchbook::engine::run_cycle;
use dutchbook::storage::{BookScope, QuoteStore};
use dutchbook::strategy::Assessment;
use dutchbook::types::Outcome;

use crate::mock_provider::{bookmaker, event, market, weekend_events, MockProvider};

fn temp_report() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("dutchbook_it_{}.txt", Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

fn config(report_path: &str, extra_evaluation: &str) -> AppConfig {
    let text = format!(
        r#"
        [agent]
        name = "DUTCHBOOK-IT"

        [odds_api]
        api_key_env = "UNUSED"
        sport = "soccer_epl"

        [storage]
        database_url = "sqlite::memory:"

        [evaluation]
        total_stake = 100.0
        {extra_evaluation}

        [report]
        path = '{report_path}'
        "#
    );
    AppConfig::parse(&text).unwrap()
}

async fn open_store(cfg: &AppConfig) -> QuoteStore {
    QuoteStore::open(&cfg.storage.database_url).await.unwrap()
}

#[tokio::test]
async fn test_weekend_cycle() {
    let provider = MockProvider::new("soccer_epl", weekend_events());
    let path = temp_report();
    let cfg = config(&path, "");
    let mut store = open_store(&cfg).await;

    let report = run_cycle(&provider, &mut store, &cfg).await.unwrap();

    assert_eq!(report.sport_active, Some(true));
    assert_eq!(report.ingest.matches, 4);
    assert_eq!(report.ingest.quotes, 22);
    assert_eq!(report.ingest.rejected, 1);

    assert_eq!(report.summary.evaluated, 3);
    assert_eq!(report.summary.incomplete, 1);
    assert_eq!(report.summary.failed, 0);
    // Only Arsenal v Chelsea is a real Dutch book; the summed figure calls
    // all three evaluated matches profitable.
    assert_eq!(report.summary.arbitrage, 1);
    assert_eq!(report.summary.profitable, 3);

    let fixtures: Vec<String> = report.assessments.iter().map(|a| a.fixture.to_string()).collect();
    assert_eq!(
        fixtures,
        vec!["Arsenal - Chelsea", "Liverpool - Everton", "Leeds - Burnley", "Fulham - Brentford"]
    );

    // Lay market excluded, so no 9.0 prices.
    let Assessment::Evaluated(ars) = &report.assessments[0].assessment else {
        panic!("expected Arsenal - Chelsea to be evaluated");
    };
    assert_eq!(ars.prices.price_vector(), [2.1, 3.9, 4.1]);
    assert_eq!(ars.prices.get(Outcome::Home).bookmaker.title, "Unibet");
    assert_eq!(ars.prices.get(Outcome::Away).bookmaker.title, "Betfair");
    assert!(ars.bet.realized_profit() > 0.0);

    let Assessment::Incomplete { missing } = &report.assessments[2].assessment else {
        panic!("expected Leeds - Burnley to be incomplete");
    };
    assert_eq!(missing, &vec![Outcome::Away]);

    // The rejected 0.0 never competes; Pinnacle supplies the home price.
    let Assessment::Evaluated(ful) = &report.assessments[3].assessment else {
        panic!("expected Fulham - Brentford to be evaluated");
    };
    assert_eq!(ful.prices.price_vector(), [2.4, 3.2, 3.5]);
    assert_eq!(ful.prices.home.bookmaker.title, "Pinnacle");
    assert!(!ful.bet.is_arbitrage());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(
        "Max Home Price: 2.1 (Bookmaker: Unibet), Max Draw Price: 4.1 (Bookmaker: Betfair), Max Away Price: 3.9 (Bookmaker: Betfair)"
    ));
    assert!(text.contains("Incomplete prices, missing: Away"));
    assert_eq!(text.matches("The Dutch bet is profitable.").count(), 3);
    assert_eq!(text.matches("(Dutch book)").count(), 1);

    store.close().await;
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_realized_basis_only_flags_real_books() {
    let provider = MockProvider::new("soccer_epl", weekend_events());
    let path = temp_report();
    let cfg = config(&path, r#"profit_basis = "realized""#);
    let mut store = open_store(&cfg).await;

    let report = run_cycle(&provider, &mut store, &cfg).await.unwrap();
    assert_eq!(report.summary.evaluated, 3);
    assert_eq!(report.summary.profitable, 1);
    assert_eq!(report.summary.arbitrage, 1);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("The Dutch bet is not profitable.").count(), 2);

    store.close().await;
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_empty_exclusion_list_admits_lay_prices() {
    let provider = MockProvider::new("soccer_epl", weekend_events());
    let path = temp_report();
    let cfg = config(&path, "excluded_markets = []");
    let mut store = open_store(&cfg).await;

    let report = run_cycle(&provider, &mut store, &cfg).await.unwrap();
    let Assessment::Evaluated(ars) = &report.assessments[0].assessment else {
        panic!("expected Arsenal - Chelsea to be evaluated");
    };
    assert_eq!(ars.prices.price_vector(), [9.0, 9.0, 9.0]);

    store.close().await;
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_scope_all_vs_cycle_across_runs() {
    let provider = MockProvider::new("soccer_epl", weekend_events());
    let path = temp_report();
    let all_cfg = config(&path, "");
    let cycle_cfg = config(&path, r#"scope = "cycle""#);
    let mut store = open_store(&all_cfg).await;

    run_cycle(&provider, &mut store, &all_cfg).await.unwrap();

    // Second run only sees a fresh Arsenal v Chelsea.
    provider.set_events(vec![event(
        "evt-ars-che",
        "Arsenal",
        "Chelsea",
        vec![bookmaker("Unibet", vec![market("h2h", "Arsenal", "Chelsea", [2.2, 3.5, 3.3])])],
    )]);

    let cycle_report = run_cycle(&provider, &mut store, &cycle_cfg).await.unwrap();
    assert_eq!(cycle_report.ingest.matches, 1);
    assert_eq!(cycle_report.assessments.len(), 1);
    let Assessment::Evaluated(eval) = &cycle_report.assessments[0].assessment else {
        panic!("expected evaluation");
    };
    // Each fetch creates a new match row; earlier quotes don't leak in.
    assert_eq!(eval.prices.price_vector(), [2.2, 3.5, 3.3]);

    provider.set_events(Vec::new());
    let all_report = run_cycle(&provider, &mut store, &all_cfg).await.unwrap();
    assert_eq!(all_report.ingest.matches, 0);
    assert_eq!(all_report.assessments.len(), 5);
    assert_eq!(provider.event_calls(), 3);

    // Bookmakers and markets are stored once however often they appear.
    let book = store.load_book(BookScope::All).await.unwrap();
    assert_eq!(book.matches().len(), 5);
    assert!(book.market_by_key("h2h").is_some());
    assert!(book.market_by_key("h2h_lay").is_some());

    store.close().await;
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_provider_failure_keeps_previous_report() {
    let provider = MockProvider::new("soccer_epl", weekend_events());
    let path = temp_report();
    let cfg = config(&path, "");
    let mut store = open_store(&cfg).await;

    run_cycle(&provider, &mut store, &cfg).await.unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    provider.set_error("HTTP 429 Too Many Requests");
    let err = run_cycle(&provider, &mut store, &cfg).await.unwrap_err();
    assert!(format!("{err:#}").contains("429"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);

    provider.clear_error();
    provider.set_events(Vec::new());
    let report = run_cycle(&provider, &mut store, &cfg).await.unwrap();
    assert_eq!(report.ingest.matches, 0);
    // Earlier matches are still in the store.
    assert_eq!(report.summary.evaluated, 3);

    store.close().await;
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_empty_fetch_writes_empty_report() {
    let provider = MockProvider::new("soccer_epl", Vec::new());
    let path = temp_report();
    let cfg = config(&path, "");
    let mut store = open_store(&cfg).await;

    let report = run_cycle(&provider, &mut store, &cfg).await.unwrap();
    assert!(report.assessments.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

    store.close().await;
    std::fs::remove_file(&path).unwrap();
}
