mod cli;
mod error;

use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foundry_core::{Pipeline, PipelineConfig};

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = cli.apply(PipelineConfig::from_env()?);

    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline.run().await?;

    info!(
        run_id = %report.run_id,
        rows = report.rows,
        csv = %report.csv_path.display(),
        table = %report.table_name,
        "pipeline complete"
    );
    Ok(())
}
