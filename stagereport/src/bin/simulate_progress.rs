//! Runs a simulated job through the reporter and prints its final status.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use stagereport::config::{SimulationConfig, SinkKind};
use stagereport::core::JobId;
use stagereport::events::ConfiguredSink;
use stagereport::observability::{init_tracing, LogFormat};
use stagereport::progress::ProgressReporter;
use stagereport::simulation::run_simulation;

/// Simulate a staged job and report its progress.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Job id. Generated when omitted.
    #[arg(long)]
    job_id: Option<String>,

    /// Sink receiving progress.
    #[arg(long, value_enum, ignore_case = true)]
    sink: Option<SinkKind>,

    /// Endpoint for the http sink.
    #[arg(long)]
    endpoint: Option<String>,

    /// Pause between steps in milliseconds, applied to every stage.
    #[arg(long)]
    step_delay_ms: Option<u64>,

    /// JSON simulation config. Flags override its values.
    #[arg(long, env = "STAGEREPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, ignore_case = true)]
    log_format: Option<LogFormat>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,

    /// Route the sink through the ordered background queue.
    #[arg(long)]
    queued: bool,
}

impl Args {
    fn into_config(self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(job_id) = self.job_id {
            config = config.with_job_id(job_id);
        }
        if let Some(delay) = self.step_delay_ms {
            config = config.with_step_delay_ms(delay);
        }

        let reporter = &mut config.reporter;
        if let Some(sink) = self.sink {
            reporter.sink = sink;
        }
        if let Some(endpoint) = self.endpoint {
            reporter.endpoint = Some(endpoint);
        }
        if let Some(format) = self.log_format {
            reporter.log_format = format;
        }
        if let Some(level) = self.log_level {
            reporter.log_level = level;
        }
        reporter.queued |= self.queued;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    init_tracing(&config.reporter.log_level, config.reporter.log_format)
        .context("initializing tracing")?;

    let configured = ConfiguredSink::build(&config.reporter).context("building sink")?;
    let reporter = ProgressReporter::shared(configured.sink());

    let job_id = config
        .job_id
        .clone()
        .map_or_else(JobId::generate, JobId::from);
    let job = reporter.job(job_id);

    let outcome = run_simulation(&job, &config).await;
    configured.shutdown().await;
    let summary = outcome.context("simulation rejected by reporter")?;

    info!(
        job_id = %summary.job_id,
        events = summary.events,
        elapsed_ms = summary.elapsed_ms,
        sink = ?config.reporter.sink,
        "Done"
    );

    if let Some(snapshot) = job.snapshot() {
        println!("{}", snapshot.render());
    }
    Ok(())
}
