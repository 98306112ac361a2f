//! # Batchline Runner
//!
//! Runs a chunk job over generated example records and prints the final
//! execution context as JSON. Exits non-zero when the run fails.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use batchline_core::config::ConfigManager;
use batchline_core::logging;
use batchline_core::{
    ExampleRecord, InMemoryPagedSource, Job, JobLauncher, JobParameters, JobState,
    LoggingChunkWriter, LoggingListener,
};

#[derive(Parser)]
#[command(name = "batchline")]
#[command(about = "Run a chunk-oriented batch job over generated records")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Number of example records in the source
    #[arg(short, long, default_value_t = 250)]
    records: usize,

    /// Configuration file (default: $BATCHLINE_CONFIG or config/batchline.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Job name to register and run
    #[arg(long, default_value = "exampleJob")]
    job_name: String,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long)]
    throttle_limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path),
        None => ConfigManager::load(),
    }
    .context("failed to load configuration")?;
    let config = manager.config();
    logging::init_with_config(&config.logging);

    let mut parameters = JobParameters::from_config(config);
    if let Some(chunk_size) = cli.chunk_size {
        parameters = parameters.with_chunk_size(chunk_size);
    }
    if let Some(page_size) = cli.page_size {
        parameters = parameters.with_page_size(page_size);
    }
    if let Some(throttle_limit) = cli.throttle_limit {
        parameters = parameters.with_throttle_limit(throttle_limit);
    }

    let source = Arc::new(InMemoryPagedSource::new(
        "example",
        ExampleRecord::sequence(cli.records),
    ));
    let job = Job::<ExampleRecord>::builder(&cli.job_name)
        .source(source)
        .writer(Arc::new(LoggingChunkWriter::default()))
        .listener(Arc::new(LoggingListener))
        .sort_key(&config.job.sort_key)
        .worker_name_prefix(&config.executor.worker_name_prefix)
        .build()?;

    let launcher = JobLauncher::new();
    launcher.register(job)?;

    info!(
        job_name = %cli.job_name,
        records = cli.records,
        environment = %manager.environment(),
        "Launching job"
    );
    let context = launcher
        .run_job(&cli.job_name, parameters)
        .await
        .with_context(|| format!("job '{}' could not be run", cli.job_name))?;

    println!("{}", serde_json::to_string_pretty(&context)?);

    Ok(if context.status() == JobState::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
