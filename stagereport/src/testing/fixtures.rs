//! Reporter and job fixtures.

use std::sync::Arc;

use crate::core::JobId;
use crate::events::CollectingProgressSink;
use crate::progress::{JobHandle, ProgressReporter};

/// The stage names of the bundled demo recipe.
pub const THREE_STAGES: [&str; 3] = ["Stage One", "Stage Two", "Stage Three"];

/// Creates a reporter that records everything it forwards.
#[must_use]
pub fn collecting_reporter() -> (Arc<ProgressReporter>, Arc<CollectingProgressSink>) {
    let sink = Arc::new(CollectingProgressSink::new());
    let reporter = ProgressReporter::shared(sink.clone());
    (reporter, sink)
}

/// Creates a job with [`THREE_STAGES`] registered and nothing reported yet.
///
/// # Panics
///
/// Panics if registration fails, which it cannot for a fresh reporter.
#[must_use]
pub fn three_stage_job() -> (JobHandle, Arc<CollectingProgressSink>) {
    let (reporter, sink) = collecting_reporter();
    let job = reporter.job(JobId::generate());
    job.register_stages(THREE_STAGES)
        .expect("fresh reporter accepts registration");
    (job, sink)
}
