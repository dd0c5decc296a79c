use foundry_core::{ConfigError, PipelineError, StageError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Pipeline(error) => match error.cause() {
                StageError::Fetch(_) => 3,
                StageError::Validation(_) => 4,
                StageError::Persist(_) => 5,
                StageError::Transform(_) => 6,
            },
        }
    }
}
