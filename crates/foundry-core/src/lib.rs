//! # Foundry Core
//!
//! Fetch, validation, persistence and transformation stages for the
//! DataFoundry Bitcoin market pipeline.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | CoinGecko `market_chart` adapter |
//! | [`config`] | Pipeline configuration and `FOUNDRY_*` overrides |
//! | [`data_source`] | Data source trait, request and error types |
//! | [`domain`] | Snapshot date, row and table types |
//! | [`error`] | Validation errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`persist`] | CSV and DuckDB writers |
//! | [`pipeline`] | Sequential stage driver |
//! | [`transform`] | dbt run/test invocation |
//! | [`validation`] | Table rules and profiles |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use foundry_core::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::from_config(PipelineConfig::from_env()?)?;
//!     let report = pipeline.run().await?;
//!     println!("{} rows loaded into {}", report.rows, report.table_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌────────────────┐   ┌────────────┐
//! │ CoinGecko    │──▶│ Validation │──▶│ CSV + DuckDB   │──▶│ dbt run /  │
//! │ (HttpClient) │   │ (profile)  │   │ (warehouse)    │   │ dbt test   │
//! └──────────────┘   └────────────┘   └────────────────┘   └────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod persist;
pub mod pipeline;
pub mod transform;
pub mod validation;

pub use adapters::{parse_market_chart, CoinGeckoAdapter};
pub use config::{ConfigError, PipelineConfig};
pub use data_source::{MarketChartRequest, MarketDataSource, SourceError, SourceErrorKind};
pub use domain::{MarketSnapshotRow, MarketTable, SnapshotDate, COLUMNS};
pub use error::ValidationError;
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use persist::{read_csv_table, Persister};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, PipelineStage, StageError};
pub use transform::{
    CommandExecutor, DbtConfig, DbtRunner, DbtStep, ProcessCommand, ProcessOutput,
    TokioCommandExecutor, TransformError,
};
pub use validation::{validate, Rule, ValidationProfile, PRICE_FLOOR};

pub use foundry_warehouse::WarehouseError;
