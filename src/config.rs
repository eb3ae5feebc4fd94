//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the odds API key) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::strategy::dutch::ProfitBasis;

/// Default config path, overridable with `DUTCHBOOK_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub odds_api: OddsApiConfig,
    pub storage: StorageConfig,
    pub evaluation: EvaluationConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// 0 runs a single pass and exits.
    #[serde(default)]
    pub scan_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OddsApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key_env: String,
    pub sport: String,
    #[serde(default = "default_regions")]
    pub regions: String,
    #[serde(default = "default_markets")]
    pub markets: String,
    #[serde(default = "default_odds_format")]
    pub odds_format: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub database_url: String,
}

/// Which matches a cycle evaluates.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationScope {
    /// Every match in the store, including earlier runs.
    #[default]
    All,
    /// Only matches ingested by the current cycle.
    Cycle,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluationConfig {
    pub total_stake: f64,
    /// Market keys never used for best-price selection.
    #[serde(default = "default_excluded_markets")]
    pub excluded_markets: Vec<String>,
    #[serde(default)]
    pub profit_basis: ProfitBasis,
    #[serde(default)]
    pub scope: EvaluationScope,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    pub path: String,
}

fn default_base_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_regions() -> String {
    "eu".to_string()
}

fn default_markets() -> String {
    "h2h".to_string()
}

fn default_odds_format() -> String {
    "decimal".to_string()
}

fn default_date_format() -> String {
    "iso".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_excluded_markets() -> Vec<String> {
    vec!["h2h_lay".to_string()]
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let stake = self.evaluation.total_stake;
        if !(stake.is_finite() && stake > 0.0) {
            bail!("evaluation.total_stake must be positive, got {stake}");
        }
        if self.odds_api.sport.trim().is_empty() {
            bail!("odds_api.sport must not be empty");
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The odds API key, read from the env var named in the config.
    pub fn odds_api_key(&self) -> Result<SecretString> {
        Self::resolve_env(&self.odds_api.api_key_env).map(SecretString::new)
    }
}
