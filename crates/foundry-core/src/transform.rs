//! dbt build and test invocation.
//!
//! The runner shells out to the dbt binary twice, `run` then `test`, and
//! treats any nonzero exit as failure. Output is captured and logged but
//! never parsed.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

/// External program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl Display for ProcessCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Runs external commands to completion.
pub trait CommandExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        command: ProcessCommand,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<ProcessOutput>> + Send + 'a>>;
}

/// Production executor backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandExecutor;

impl CommandExecutor for TokioCommandExecutor {
    fn execute<'a>(
        &'a self,
        command: ProcessCommand,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<ProcessOutput>> + Send + 'a>> {
        Box::pin(async move {
            let output = tokio::process::Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await?;

            Ok(ProcessOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// dbt subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbtStep {
    Run,
    Test,
}

impl DbtStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Test => "test",
        }
    }

    const fn failure_message(self) -> &'static str {
        match self {
            Self::Run => "dbt run failed",
            Self::Test => "dbt tests failed",
        }
    }
}

impl Display for DbtStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the external transformation tool.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to start '{program}' for dbt {step}: {source}")]
    Spawn {
        step: DbtStep,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{} (exit code {})", step.failure_message(), exit_code_label(*exit_code))]
    Failed {
        step: DbtStep,
        exit_code: Option<i32>,
    },
}

impl TransformError {
    pub const fn step(&self) -> DbtStep {
        match self {
            Self::Spawn { step, .. } | Self::Failed { step, .. } => *step,
        }
    }
}

fn exit_code_label(exit_code: Option<i32>) -> String {
    exit_code.map_or_else(|| String::from("none"), |code| code.to_string())
}

/// Where and how to invoke dbt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbtConfig {
    pub program: String,
    pub project_dir: PathBuf,
    pub profiles_dir: PathBuf,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            program: String::from("dbt"),
            project_dir: PathBuf::from("./dbt_project"),
            profiles_dir: PathBuf::from("./dbt_project"),
        }
    }
}

/// Runs dbt models and their tests through a [`CommandExecutor`].
#[derive(Clone)]
pub struct DbtRunner {
    config: DbtConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl DbtRunner {
    pub fn new(config: DbtConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &DbtConfig {
        &self.config
    }

    /// Command line for `step`.
    pub fn command(&self, step: DbtStep) -> ProcessCommand {
        ProcessCommand::new(&self.config.program)
            .arg(step.as_str())
            .arg("--profiles-dir")
            .arg(self.config.profiles_dir.to_string_lossy())
            .arg("--project-dir")
            .arg(self.config.project_dir.to_string_lossy())
    }

    /// `dbt run`: rebuild the models.
    pub async fn run_models(&self) -> Result<ProcessOutput, TransformError> {
        info!("⚙️ Running dbt run...");
        let output = self.execute(DbtStep::Run).await?;
        info!("✅ dbt run completed.");
        Ok(output)
    }

    /// `dbt test`: run the model tests.
    pub async fn test_models(&self) -> Result<ProcessOutput, TransformError> {
        info!("🧪 Running dbt tests...");
        let output = self.execute(DbtStep::Test).await?;
        info!("✅ dbt tests passed.");
        Ok(output)
    }

    /// Build then test; tests are skipped when the build fails.
    pub async fn run_and_test(&self) -> Result<(), TransformError> {
        self.run_models().await?;
        self.test_models().await?;
        Ok(())
    }

    async fn execute(&self, step: DbtStep) -> Result<ProcessOutput, TransformError> {
        let command = self.command(step);
        let program = command.program.clone();
        let output = self
            .executor
            .execute(command)
            .await
            .map_err(|source| TransformError::Spawn {
                step,
                program,
                source,
            })?;

        if !output.stdout.trim().is_empty() {
            info!("[dbt] {}", output.stdout.trim_end());
        }
        if !output.stderr.trim().is_empty() {
            warn!("[dbt] {}", output.stderr.trim_end());
        }

        if output.success() {
            Ok(output)
        } else {
            let error = TransformError::Failed {
                step,
                exit_code: output.exit_code,
            };
            warn!("❌ {error}");
            Err(error)
        }
    }
}
