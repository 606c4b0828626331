//! Job handle passed explicitly to reporting code.

use std::sync::Arc;

use super::{JobSnapshot, ProgressReporter};
use crate::core::{JobId, ProgressEvent, ProgressUpdate};
use crate::errors::ProgressError;
use crate::stages::StageSet;

/// A job's view of the reporter.
///
/// Constructed by the caller and handed to the code doing the work; there
/// is no ambient job context. Cloning the handle shares the same job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job_id: JobId,
    reporter: Arc<ProgressReporter>,
}

impl JobHandle {
    /// Binds a job id to a reporter.
    #[must_use]
    pub fn new(job_id: JobId, reporter: Arc<ProgressReporter>) -> Self {
        Self { job_id, reporter }
    }

    /// Returns the job identity.
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Returns the reporter behind this handle.
    #[must_use]
    pub fn reporter(&self) -> &Arc<ProgressReporter> {
        &self.reporter
    }

    /// Declares the job's ordered stages. Must be called once, first.
    pub fn register_stages<I, S>(&self, names: I) -> Result<Arc<StageSet>, ProgressError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reporter.register_stages(&self.job_id, names)
    }

    /// Reports progress as `(current, total)`, or `None` for a bare marker.
    pub fn report_progress(
        &self,
        stage: &str,
        progress: Option<(i64, i64)>,
    ) -> Result<ProgressUpdate, ProgressError> {
        let (numerator, denominator) = progress.unzip();
        self.reporter
            .report(&self.job_id, stage, numerator, denominator)
    }

    /// Reports a prepared [`ProgressEvent`].
    pub fn report_event(&self, event: &ProgressEvent) -> Result<ProgressUpdate, ProgressError> {
        self.reporter.report_event(&self.job_id, event)
    }

    /// Marks a stage as entered without a known total.
    pub fn enter_stage(&self, stage: &str) -> Result<ProgressUpdate, ProgressError> {
        self.report_progress(stage, None)
    }

    /// Reports `current` out of `total` units done in a stage.
    pub fn report_fraction(
        &self,
        stage: &str,
        current: i64,
        total: i64,
    ) -> Result<ProgressUpdate, ProgressError> {
        self.report_progress(stage, Some((current, total)))
    }

    /// Returns an observer view of this job.
    #[must_use]
    pub fn snapshot(&self) -> Option<JobSnapshot> {
        self.reporter.snapshot(&self.job_id)
    }

    /// Forgets this job in the reporter.
    pub fn release(&self) -> bool {
        self.reporter.release(&self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingProgressSink;

    #[test]
    fn test_handle_reports_through_reporter() {
        let sink = Arc::new(CollectingProgressSink::new());
        let reporter = ProgressReporter::shared(sink.clone());
        let job = reporter.job("job-1");

        job.register_stages(["A", "B"]).unwrap();
        job.enter_stage("A").unwrap();
        job.report_fraction("A", 2, 4).unwrap();

        let updates = sink.updates_for(job.job_id());
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].numerator, Some(2));
        assert_eq!(updates[1].denominator, Some(4));
    }

    #[test]
    fn test_clones_share_the_job() {
        let reporter = ProgressReporter::shared(Arc::new(CollectingProgressSink::new()));
        let job = reporter.job("job-1");
        let clone = job.clone();

        job.register_stages(["A", "B"]).unwrap();
        clone.enter_stage("B").unwrap();

        assert_eq!(job.snapshot().unwrap().current_stage, Some(1));
        assert!(job.report_progress("A", None).is_err());
    }

    #[test]
    fn test_report_event() {
        let sink = Arc::new(CollectingProgressSink::new());
        let reporter = ProgressReporter::shared(sink.clone());
        let job = reporter.job("job-1");
        job.register_stages(["A", "B"]).unwrap();

        job.report_event(&ProgressEvent::fraction("B", 1, 3)).unwrap();
        let err = job.report_event(&ProgressEvent::entered("A")).unwrap_err();

        assert!(matches!(err, ProgressError::StageRegression { .. }));
        assert_eq!(sink.updates_for(job.job_id())[0].stage_ordinal, 1);
    }

    #[test]
    fn test_release() {
        let reporter = ProgressReporter::shared(Arc::new(CollectingProgressSink::new()));
        let job = reporter.job("job-1");
        job.register_stages(["A"]).unwrap();

        assert!(job.release());
        assert!(job.snapshot().is_none());
    }
}
