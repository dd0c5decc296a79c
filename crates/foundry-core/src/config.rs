//! Pipeline configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults,
//! `FOUNDRY_*` environment variables, then explicit overrides applied by the
//! caller (the CLI flags).
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `FOUNDRY_DAYS` | `days` | `365` |
//! | `FOUNDRY_COIN_ID` | `coin_id` | `bitcoin` |
//! | `FOUNDRY_VS_CURRENCY` | `vs_currency` | `usd` |
//! | `FOUNDRY_API_BASE_URL` | `api_base_url` | `https://api.coingecko.com/api/v3` |
//! | `FOUNDRY_API_KEY` | `api_key` | unset |
//! | `FOUNDRY_TIMEOUT_MS` | `request_timeout_ms` | `10000` |
//! | `FOUNDRY_CSV_PATH` | `csv_path` | `data/input.csv` |
//! | `FOUNDRY_DB_PATH` | `db_path` | `foundry.duckdb` |
//! | `FOUNDRY_TABLE` | `table_name` | `raw_data` |
//! | `FOUNDRY_DBT_BIN` | `dbt.program` | `dbt` |
//! | `FOUNDRY_DBT_PROJECT_DIR` | `dbt.project_dir` | `./dbt_project` |
//! | `FOUNDRY_DBT_PROFILES_DIR` | `dbt.profiles_dir` | `./dbt_project` |
//! | `FOUNDRY_VALIDATION` | `validation` | `assertions` |

use std::path::PathBuf;

use thiserror::Error;

use crate::adapters::coingecko::{DEFAULT_BASE_URL, DEFAULT_COIN_ID, DEFAULT_VS_CURRENCY};
use crate::data_source::DEFAULT_DAYS;
use crate::transform::DbtConfig;
use crate::validation::ValidationProfile;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("invalid table name '{0}': use letters, digits and underscores, not starting with a digit")]
    InvalidTableName(String),
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub days: u32,
    pub coin_id: String,
    pub vs_currency: String,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub dbt: DbtConfig,
    pub validation: ValidationProfile,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            coin_id: String::from(DEFAULT_COIN_ID),
            vs_currency: String::from(DEFAULT_VS_CURRENCY),
            api_base_url: String::from(DEFAULT_BASE_URL),
            api_key: None,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            csv_path: PathBuf::from("data/input.csv"),
            db_path: PathBuf::from("foundry.duckdb"),
            table_name: String::from("raw_data"),
            dbt: DbtConfig::default(),
            validation: ValidationProfile::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each
    /// `FOUNDRY_*` key. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(value) = get("FOUNDRY_DAYS") {
            config.days = parse_number("FOUNDRY_DAYS", &value)?;
        }
        if let Some(value) = get("FOUNDRY_COIN_ID") {
            config.coin_id = value;
        }
        if let Some(value) = get("FOUNDRY_VS_CURRENCY") {
            config.vs_currency = value;
        }
        if let Some(value) = get("FOUNDRY_API_BASE_URL") {
            config.api_base_url = value;
        }
        if let Some(value) = get("FOUNDRY_API_KEY") {
            config.api_key = Some(value);
        }
        if let Some(value) = get("FOUNDRY_TIMEOUT_MS") {
            config.request_timeout_ms = parse_number("FOUNDRY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = get("FOUNDRY_CSV_PATH") {
            config.csv_path = PathBuf::from(value);
        }
        if let Some(value) = get("FOUNDRY_DB_PATH") {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = get("FOUNDRY_TABLE") {
            config.table_name = value;
        }
        if let Some(value) = get("FOUNDRY_DBT_BIN") {
            config.dbt.program = value;
        }
        if let Some(value) = get("FOUNDRY_DBT_PROJECT_DIR") {
            config.dbt.project_dir = PathBuf::from(value);
        }
        if let Some(value) = get("FOUNDRY_DBT_PROFILES_DIR") {
            config.dbt.profiles_dir = PathBuf::from(value);
        }
        if let Some(value) = get("FOUNDRY_VALIDATION") {
            config.validation =
                value
                    .parse()
                    .map_err(|e: crate::ValidationError| ConfigError::InvalidValue {
                        key: "FOUNDRY_VALIDATION",
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
        }

        Ok(config)
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::NotPositive { field: "days" });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "request_timeout_ms",
            });
        }
        foundry_warehouse::validate_table_name(&self.table_name)
            .map_err(|_| ConfigError::InvalidTableName(self.table_name.clone()))?;
        Ok(())
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
        reason: e.to_string(),
    })
}
