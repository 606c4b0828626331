//! Walks a job through a [`SimulationConfig`] plan.
//!
//! Each stage is entered with a bare marker, then, when it has a total,
//! reported from `0/total` to `total/total`. Pacing comes only from the
//! configured step delay.

use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};

use crate::config::{SimulationConfig, StagePlan};
use crate::core::ProgressEvent;
use crate::errors::ProgressError;
use crate::observability::SpanTimer;
use crate::progress::JobHandle;

/// What a finished simulation reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    /// The simulated job.
    pub job_id: String,
    /// Accepted progress events.
    pub events: u64,
    /// Wall time in milliseconds.
    pub elapsed_ms: f64,
}

/// Registers the plan's stages on `job` and reports every step.
///
/// # Errors
///
/// Returns the first [`ProgressError`] the reporter raises, e.g. when the
/// job already has stages registered.
pub async fn run_simulation(
    job: &JobHandle,
    config: &SimulationConfig,
) -> Result<SimulationSummary, ProgressError> {
    let span = info_span!(
        "simulation",
        job_id = %job.job_id(),
        job_name = %config.job_name
    );
    run(job, config).instrument(span).await
}

async fn run(job: &JobHandle, config: &SimulationConfig) -> Result<SimulationSummary, ProgressError> {
    let timer = SpanTimer::start("simulation");
    job.register_stages(config.stage_names())?;

    let mut events = 0;
    for plan in &config.stages {
        events += run_stage(job, plan).await?;
    }

    let summary = SimulationSummary {
        job_id: job.job_id().to_string(),
        events,
        elapsed_ms: timer.finish(),
    };
    info!(events, elapsed_ms = summary.elapsed_ms, "Simulation finished");
    Ok(summary)
}

async fn run_stage(job: &JobHandle, plan: &StagePlan) -> Result<u64, ProgressError> {
    let timer = SpanTimer::start(plan.name.clone());
    job.report_event(&ProgressEvent::entered(plan.name.as_str()))?;
    let mut events = 1;

    if let Some(total) = plan.total {
        let total = i64::try_from(total).map_err(|_| ProgressError::MalformedFraction {
            job_id: job.job_id().to_string(),
            stage: plan.name.clone(),
            numerator: None,
            denominator: None,
        })?;

        for step in 0..=total {
            if step > 0 && plan.step_delay_ms > 0 {
                tokio::time::sleep(plan.step_delay()).await;
            }
            job.report_event(&ProgressEvent::fraction(plan.name.as_str(), step, total))?;
            events += 1;
        }
    }

    debug!(
        stage = %timer.name(),
        events,
        elapsed_ms = timer.elapsed_ms(),
        "Stage finished"
    );
    Ok(events)
}
