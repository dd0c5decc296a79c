//! Sequential driver for one pipeline run.
//!
//! ```text
//! FETCHING -> VALIDATING -> SAVING -> LOADING -> TRANSFORMING -> TESTING -> DONE
//!     \____________\___________\_________\____________\______________\--> FAILED
//! ```
//!
//! Each stage runs only after the previous one succeeded. The first error
//! ends the run; nothing is retried and nothing written by earlier stages is
//! rolled back.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use foundry_warehouse::WarehouseError;
use thiserror::Error;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::adapters::CoinGeckoAdapter;
use crate::config::{ConfigError, PipelineConfig};
use crate::data_source::{MarketChartRequest, MarketDataSource, SourceError};
use crate::persist::Persister;
use crate::transform::{CommandExecutor, DbtRunner, TokioCommandExecutor, TransformError};
use crate::validation::validate;
use crate::ValidationError;

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Fetching,
    Validating,
    Saving,
    Loading,
    Transforming,
    Testing,
    Done,
    Failed,
}

impl PipelineStage {
    /// Working stages in execution order.
    pub const SEQUENCE: [Self; 6] = [
        Self::Fetching,
        Self::Validating,
        Self::Saving,
        Self::Loading,
        Self::Transforming,
        Self::Testing,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetching => "FETCHING",
            Self::Validating => "VALIDATING",
            Self::Saving => "SAVING",
            Self::Loading => "LOADING",
            Self::Transforming => "TRANSFORMING",
            Self::Testing => "TESTING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a failed stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] SourceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persist(#[from] WarehouseError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// A run that ended in [`PipelineStage::Failed`] instead of
/// [`PipelineStage::Done`].
#[derive(Debug, Error)]
#[error("run {run_id} failed during {stage}: {source}")]
pub struct PipelineError {
    run_id: Uuid,
    stage: PipelineStage,
    completed: Vec<PipelineStage>,
    source: StageError,
}

impl PipelineError {
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Terminal state of the run, always [`PipelineStage::Failed`].
    pub const fn state(&self) -> PipelineStage {
        PipelineStage::Failed
    }

    /// Stage that was executing when the run failed.
    pub const fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Stages that finished before the failure, in order.
    pub fn completed(&self) -> &[PipelineStage] {
        &self.completed
    }

    pub const fn cause(&self) -> &StageError {
        &self.source
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub rows: usize,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub stages: Vec<PipelineStage>,
}

/// Stage bookkeeping for a single run.
struct Progress {
    run_id: Uuid,
    current: PipelineStage,
    completed: Vec<PipelineStage>,
}

impl Progress {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            current: PipelineStage::Fetching,
            completed: Vec::with_capacity(PipelineStage::SEQUENCE.len()),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!(stage = %stage, "entering stage");
        self.current = stage;
    }

    fn finish(&mut self) {
        self.completed.push(self.current);
    }

    fn fail(&self, source: impl Into<StageError>) -> PipelineError {
        let source = source.into();
        error!("❌ Pipeline failed during {}: {source}", self.current);
        debug!(stage = %PipelineStage::Failed, failed_during = %self.current, "entering stage");
        PipelineError {
            run_id: self.run_id,
            stage: self.current,
            completed: self.completed.clone(),
            source,
        }
    }
}

/// Fetch, validate, persist and transform, in that order.
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn MarketDataSource>,
    persister: Persister,
    dbt: DbtRunner,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn MarketDataSource>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let persister = Persister::new(
            config.csv_path.clone(),
            config.db_path.clone(),
            config.table_name.clone(),
        );
        let dbt = DbtRunner::new(config.dbt.clone(), executor);
        Self {
            config,
            source,
            persister,
            dbt,
        }
    }

    /// Production wiring: CoinGecko over reqwest and dbt through
    /// `tokio::process`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut adapter = CoinGeckoAdapter::default()
            .with_base_url(config.api_base_url.clone())
            .with_coin(config.coin_id.clone())
            .with_vs_currency(config.vs_currency.clone())
            .with_timeout_ms(config.request_timeout_ms);
        if let Some(api_key) = &config.api_key {
            adapter = adapter.with_api_key(api_key.clone());
        }

        Ok(Self::new(
            config,
            Arc::new(adapter),
            Arc::new(TokioCommandExecutor),
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute every stage once under a fresh run id.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid) -> Result<PipelineReport, PipelineError> {
        let mut progress = Progress::new(run_id);
        info!(
            source = self.source.name(),
            days = self.config.days,
            "🚀 Starting pipeline run"
        );

        progress.enter(PipelineStage::Fetching);
        let request = MarketChartRequest::new(self.config.days).map_err(|e| progress.fail(e))?;
        let table = self
            .source
            .market_chart(request)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.finish();

        progress.enter(PipelineStage::Validating);
        let table = validate(table, self.config.validation).map_err(|e| progress.fail(e))?;
        progress.finish();

        progress.enter(PipelineStage::Saving);
        self.persister
            .save_csv(&table)
            .map_err(|e| progress.fail(e))?;
        progress.finish();

        progress.enter(PipelineStage::Loading);
        self.persister
            .load_duckdb(&table)
            .map_err(|e| progress.fail(e))?;
        progress.finish();

        progress.enter(PipelineStage::Transforming);
        self.dbt.run_models().await.map_err(|e| progress.fail(e))?;
        progress.finish();

        progress.enter(PipelineStage::Testing);
        self.dbt.test_models().await.map_err(|e| progress.fail(e))?;
        progress.finish();

        progress.enter(PipelineStage::Done);
        info!("✅ Pipeline finished: {} rows processed.", table.len());

        Ok(PipelineReport {
            run_id,
            rows: table.len(),
            csv_path: self.config.csv_path.clone(),
            db_path: self.config.db_path.clone(),
            table_name: self.config.table_name.clone(),
            stages: progress.completed,
        })
    }
}
