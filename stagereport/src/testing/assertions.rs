//! Test assertions for reporting results.

use crate::core::{ProgressUpdate, StageStatus};
use crate::errors::ProgressError;
use crate::progress::JobHandle;

/// Asserts that a report was rejected with the given error kind.
pub fn assert_rejected(result: &Result<ProgressUpdate, ProgressError>, kind: &str) {
    match result {
        Err(e) => assert_eq!(
            e.kind(),
            kind,
            "Expected rejection '{}', got '{}': {}",
            kind,
            e.kind(),
            e
        ),
        Ok(update) => panic!(
            "Expected rejection '{}', but report was accepted: {:?}",
            kind, update
        ),
    }
}

/// Asserts the observer-side status of a stage.
pub fn assert_stage_status(job: &JobHandle, stage: &str, expected: StageStatus) {
    let snapshot = job
        .snapshot()
        .unwrap_or_else(|| panic!("Job '{}' has no registered stages", job.job_id()));
    let actual = snapshot
        .stage(stage)
        .unwrap_or_else(|| panic!("Job '{}' has no stage '{}'", job.job_id(), stage))
        .status;
    assert_eq!(
        actual, expected,
        "Expected stage '{}' to be {:?}, got {:?}",
        stage, expected, actual
    );
}
