//! CLI argument definitions for foundry.
//!
//! Running `foundry` with no arguments executes the whole pipeline once with
//! the configured defaults. Every flag is optional and overrides the matching
//! `FOUNDRY_*` environment variable.
//!
//! # Options
//!
//! | Option | Environment | Default |
//! |--------|-------------|---------|
//! | `--days` | `FOUNDRY_DAYS` | `365` |
//! | `--csv-path` | `FOUNDRY_CSV_PATH` | `data/input.csv` |
//! | `--db-path` | `FOUNDRY_DB_PATH` | `foundry.duckdb` |
//! | `--table` | `FOUNDRY_TABLE` | `raw_data` |
//! | `--dbt-bin` | `FOUNDRY_DBT_BIN` | `dbt` |
//! | `--dbt-project-dir` | `FOUNDRY_DBT_PROJECT_DIR` | `./dbt_project` |
//! | `--validation` | `FOUNDRY_VALIDATION` | `assertions` |
//! | `--timeout-ms` | `FOUNDRY_TIMEOUT_MS` | `10000` |
//!
//! # Examples
//!
//! ```bash
//! # Full run with defaults
//! foundry
//!
//! # Last 90 days, stricter rules, verbose logs
//! RUST_LOG=debug foundry --days 90 --validation schema
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use foundry_core::{PipelineConfig, ValidationProfile};

/// Fetch Bitcoin market data, validate it, load it into DuckDB and run dbt.
#[derive(Debug, Parser)]
#[command(name = "foundry", author, version, about)]
pub struct Cli {
    /// Trailing window of daily data points to fetch.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: Option<u32>,

    /// Destination of the CSV snapshot.
    #[arg(long)]
    pub csv_path: Option<PathBuf>,

    /// DuckDB database file.
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Table replaced on every run.
    #[arg(long)]
    pub table: Option<String>,

    /// dbt executable.
    #[arg(long)]
    pub dbt_bin: Option<String>,

    /// dbt project directory, also used as the profiles directory.
    #[arg(long)]
    pub dbt_project_dir: Option<PathBuf>,

    /// Rule set applied before anything is written.
    #[arg(long, value_enum)]
    pub validation: Option<ValidationSelector>,

    /// HTTP request timeout in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValidationSelector {
    /// Null, price floor and unique-date checks.
    Assertions,
    /// Assertion checks plus positive market cap.
    Schema,
}

impl From<ValidationSelector> for ValidationProfile {
    fn from(value: ValidationSelector) -> Self {
        match value {
            ValidationSelector::Assertions => Self::Assertions,
            ValidationSelector::Schema => Self::Schema,
        }
    }
}

impl Cli {
    /// Layer the flags that were given over `config`.
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(days) = self.days {
            config.days = days;
        }
        if let Some(path) = &self.csv_path {
            config.csv_path = path.clone();
        }
        if let Some(path) = &self.db_path {
            config.db_path = path.clone();
        }
        if let Some(table) = &self.table {
            config.table_name = table.clone();
        }
        if let Some(bin) = &self.dbt_bin {
            config.dbt.program = bin.clone();
        }
        if let Some(dir) = &self.dbt_project_dir {
            config.dbt.project_dir = dir.clone();
            config.dbt.profiles_dir = dir.clone();
        }
        if let Some(selector) = self.validation {
            config.validation = selector.into();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
        config
    }
}
