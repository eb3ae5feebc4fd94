//! The Odds API v4 client.
//!
//! API docs: https://the-odds-api.com/liveapi/guides/v4/
//! Base URL: https://api.the-odds-api.com/v4
//! Auth: `apiKey` query parameter. Every odds request costs quota; the
//! remaining balance is reported in the `x-requests-remaining` header.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{OddsEvent, OddsProvider, SportInfo};
use crate::config::OddsApiConfig;

const USER_AGENT: &str = "DUTCHBOOK/0.1.0";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OddsApiClient {
    http: Client,
    api_key: SecretString,
    config: OddsApiConfig,
}

impl OddsApiClient {
    pub fn new(config: OddsApiConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for The Odds API")?;

        Ok(Self { http, api_key, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// URL of the odds endpoint, without the API key.
    fn odds_url(&self) -> String {
        format!(
            "{}/sports/{}/odds?regions={}&markets={}&oddsFormat={}&dateFormat={}",
            self.base(),
            urlencoding::encode(&self.config.sport),
            urlencoding::encode(&self.config.regions),
            urlencoding::encode(&self.config.markets),
            urlencoding::encode(&self.config.odds_format),
            urlencoding::encode(&self.config.date_format),
        )
    }

    fn sports_url(&self) -> String {
        format!("{}/sports", self.base())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!(url = %url, "Fetching {what}");

        let resp = self
            .http
            .get(url)
            .query(&[("apiKey", self.api_key.expose_secret().as_str())])
            .send()
            .await
            .with_context(|| format!("Odds API request for {what} failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Odds API error {status}: {body}");
        }

        log_quota(&resp);

        resp.json()
            .await
            .with_context(|| format!("Failed to parse Odds API {what} response"))
    }
}

fn log_quota(resp: &Response) {
    let header = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    if let Some(remaining) = header("x-requests-remaining") {
        info!(
            remaining = %remaining,
            used = %header("x-requests-used").unwrap_or_default(),
            "Odds API quota"
        );
    }
}

// ---------------------------------------------------------------------------
// OddsProvider trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl OddsProvider for OddsApiClient {
    async fn fetch_sports(&self) -> Result<Vec<SportInfo>> {
        self.get_json(&self.sports_url(), "sports").await
    }

    async fn fetch_events(&self) -> Result<Vec<OddsEvent>> {
        let events: Vec<OddsEvent> = self.get_json(&self.odds_url(), "odds").await?;
        info!(sport = %self.config.sport, events = events.len(), "Odds fetched");
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
