//! The validating progress reporter.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn, Level};

use super::{JobHandle, JobProgressState, JobSnapshot};
use crate::core::{Fraction, JobId, ProgressEvent, ProgressUpdate};
use crate::errors::ProgressError;
use crate::events::{NoOpProgressSink, ProgressSink};
use crate::observability::ProgressSpanAttributes;
use crate::stages::{StageRegistry, StageSet};

struct JobEntry {
    stages: Arc<StageSet>,
    state: JobProgressState,
}

/// Validates progress events and forwards accepted ones to a sink.
///
/// All state is keyed by job, and each job's state sits behind its own
/// mutex, so one reporter can serve many concurrent jobs. Calls for the same
/// job must be serialized by the caller.
pub struct ProgressReporter {
    registry: StageRegistry,
    jobs: DashMap<JobId, Arc<Mutex<JobEntry>>>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    /// Creates a reporter forwarding to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            registry: StageRegistry::new(),
            jobs: DashMap::new(),
            sink,
        }
    }

    /// Creates a shared reporter, ready to hand out [`JobHandle`]s.
    #[must_use]
    pub fn shared(sink: Arc<dyn ProgressSink>) -> Arc<Self> {
        Arc::new(Self::new(sink))
    }

    /// Returns a handle bound to `job_id`.
    #[must_use]
    pub fn job(self: &Arc<Self>, job_id: impl Into<JobId>) -> JobHandle {
        JobHandle::new(job_id.into(), Arc::clone(self))
    }

    /// Returns the sink this reporter forwards to.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ProgressSink> {
        &self.sink
    }

    /// Registers the ordered stage list of a job.
    ///
    /// On success the job enters the registered state (no current stage)
    /// and the sink is told about the stage list.
    pub fn register_stages<I, S>(&self, job_id: &JobId, names: I) -> Result<Arc<StageSet>, ProgressError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages = self.registry.register(job_id, names)?;

        // The job becomes reportable only once the sink has seen its stages.
        if let Err(e) = self.sink.on_stage_set_registered(job_id, &stages.names()) {
            warn!(job_id = %job_id, error = %e, "Sink rejected stage registration");
        }

        let entry = JobEntry {
            state: JobProgressState::new(stages.len()),
            stages: Arc::clone(&stages),
        };
        self.jobs.insert(job_id.clone(), Arc::new(Mutex::new(entry)));

        Ok(stages)
    }

    /// Reports progress for a stage.
    ///
    /// Pass both `numerator` and `denominator` for fractional progress, or
    /// neither for a bare "stage entered" marker. Checks run in order:
    /// unknown stage, stage regression, malformed fraction, fraction
    /// regression. A rejected call leaves the job's state unchanged.
    ///
    /// Sink failures are logged and do not fail the call.
    pub fn report(
        &self,
        job_id: &JobId,
        stage: &str,
        numerator: Option<i64>,
        denominator: Option<i64>,
    ) -> Result<ProgressUpdate, ProgressError> {
        let result = self.report_inner(job_id, stage, numerator, denominator);
        if tracing::enabled!(Level::DEBUG) {
            match result {
                Ok(ref update) => debug!(
                    attributes = ?ProgressSpanAttributes::from_update(update).to_otel_attributes(),
                    "Progress accepted"
                ),
                Err(ref e) => debug!(
                    attributes = ?ProgressSpanAttributes::new(job_id.as_str())
                        .with_stage(stage)
                        .with_outcome(e.kind())
                        .to_otel_attributes(),
                    code = e.code(),
                    error = %e,
                    "Progress rejected"
                ),
            }
        }
        result
    }

    /// Reports a [`ProgressEvent`]. Same checks and effects as [`report`](Self::report).
    pub fn report_event(
        &self,
        job_id: &JobId,
        event: &ProgressEvent,
    ) -> Result<ProgressUpdate, ProgressError> {
        self.report(job_id, &event.stage, event.numerator, event.denominator)
    }

    fn report_inner(
        &self,
        job_id: &JobId,
        stage: &str,
        numerator: Option<i64>,
        denominator: Option<i64>,
    ) -> Result<ProgressUpdate, ProgressError> {
        let unknown = || ProgressError::UnknownStage {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        };

        let entry = self.entry(job_id).ok_or_else(unknown)?;
        let mut entry = entry.lock();

        let ordinal = entry.stages.ordinal_of(stage).ok_or_else(unknown)?;

        entry
            .state
            .check_stage(ordinal)
            .map_err(|current_ordinal| ProgressError::StageRegression {
                job_id: job_id.to_string(),
                stage: stage.to_string(),
                ordinal,
                current_ordinal,
            })?;

        let fraction = Fraction::from_parts(numerator, denominator).map_err(|()| {
            ProgressError::MalformedFraction {
                job_id: job_id.to_string(),
                stage: stage.to_string(),
                numerator,
                denominator,
            }
        })?;

        entry
            .state
            .check_fraction(ordinal, fraction)
            .map_err(|last| ProgressError::FractionRegression {
                job_id: job_id.to_string(),
                stage: stage.to_string(),
                numerator: numerator.unwrap_or_default(),
                denominator: denominator.unwrap_or_default(),
                last_numerator: last.numerator(),
                last_denominator: last.denominator(),
            })?;

        let previous = entry.state.current_stage_ordinal();
        entry.state.apply(ordinal, fraction);

        if previous != Some(ordinal) {
            debug!(
                job_id = %job_id,
                stage,
                ordinal,
                previous = ?previous,
                "Entered stage"
            );
        }

        let update = ProgressUpdate::new(
            job_id.clone(),
            stage,
            ordinal,
            entry.stages.len(),
            fraction,
        );

        if let Err(e) = self.sink.on_progress(&update) {
            warn!(
                job_id = %job_id,
                stage,
                error = %e,
                "Sink rejected progress update"
            );
        }

        Ok(update)
    }

    /// Returns a copy of the job's progress state.
    #[must_use]
    pub fn state(&self, job_id: &JobId) -> Option<JobProgressState> {
        self.entry(job_id).map(|entry| {
            let entry = entry.lock();
            entry.state.clone()
        })
    }

    /// Returns the job's stage set.
    #[must_use]
    pub fn stages(&self, job_id: &JobId) -> Option<Arc<StageSet>> {
        self.registry.get(job_id)
    }

    /// Returns an observer view of the job.
    #[must_use]
    pub fn snapshot(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.entry(job_id).map(|entry| {
            let entry = entry.lock();
            JobSnapshot::build(job_id.clone(), &entry.stages, &entry.state)
        })
    }

    fn entry(&self, job_id: &JobId) -> Option<Arc<Mutex<JobEntry>>> {
        self.jobs.get(job_id).map(|e| Arc::clone(e.value()))
    }

    /// Forgets a job. Returns true if it was known.
    ///
    /// The job id may be registered again afterwards.
    pub fn release(&self, job_id: &JobId) -> bool {
        let removed = self.jobs.remove(job_id).is_some();
        self.registry.remove(job_id);
        if removed {
            debug!(job_id = %job_id, "Released job");
        }
        removed
    }

    /// Returns the number of registered jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(Arc::new(NoOpProgressSink))
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("jobs", &self.jobs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{RegistrationProblem, SinkError};
    use crate::events::{CollectingProgressSink, MockProgressSink};
    use mockall::Sequence;

    fn setup(names: &[&str]) -> (ProgressReporter, Arc<CollectingProgressSink>, JobId) {
        let sink = Arc::new(CollectingProgressSink::new());
        let reporter = ProgressReporter::new(sink.clone());
        let job = JobId::new("job-1");
        reporter.register_stages(&job, names.iter().copied()).unwrap();
        (reporter, sink, job)
    }

    #[test]
    fn test_register_notifies_sink() {
        let (_reporter, sink, job) = setup(&["A", "B"]);
        assert_eq!(
            sink.registrations(),
            vec![(job, vec!["A".to_string(), "B".to_string()])]
        );
    }

    #[test]
    fn test_register_twice_fails() {
        let (reporter, sink, job) = setup(&["A"]);
        let err = reporter.register_stages(&job, ["A"]).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::InvalidRegistration {
                problem: RegistrationProblem::AlreadyRegistered,
                ..
            }
        ));
        assert_eq!(sink.registrations().len(), 1);
    }

    #[test]
    fn test_first_stage_zero_then_complete() {
        let (reporter, _sink, job) = setup(&["A", "B"]);
        reporter.report(&job, "A", Some(0), Some(7)).unwrap();
        reporter.report(&job, "A", Some(7), Some(7)).unwrap();

        let state = reporter.state(&job).unwrap();
        assert_eq!(state.current_stage_ordinal(), Some(0));
        assert!(state.current_fraction().unwrap().is_complete());
    }

    #[test]
    fn test_report_before_registration_is_unknown_stage() {
        let reporter = ProgressReporter::default();
        let err = reporter
            .report(&JobId::new("ghost"), "A", None, None)
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownStage { .. }));
    }

    #[test]
    fn test_unknown_stage_wins_over_malformed_fraction() {
        let (reporter, _sink, job) = setup(&["A"]);
        let err = reporter.report(&job, "X", Some(5), None).unwrap_err();
        assert!(matches!(err, ProgressError::UnknownStage { .. }));
    }

    #[test]
    fn test_stage_regression_wins_over_malformed_fraction() {
        let (reporter, _sink, job) = setup(&["A", "B"]);
        reporter.report(&job, "B", None, None).unwrap();
        let err = reporter.report(&job, "A", Some(-1), Some(0)).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::StageRegression {
                ordinal: 0,
                current_ordinal: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_fractions() {
        let (reporter, _sink, job) = setup(&["A"]);
        for (n, d) in [
            (Some(5), None),
            (None, Some(5)),
            (Some(1), Some(0)),
            (Some(0), Some(-3)),
            (Some(-1), Some(3)),
            (Some(4), Some(3)),
        ] {
            let err = reporter.report(&job, "A", n, d).unwrap_err();
            assert!(
                matches!(err, ProgressError::MalformedFraction { .. }),
                "expected MalformedFraction for {n:?}/{d:?}, got {err:?}"
            );
        }
        assert_eq!(reporter.state(&job).unwrap().current_stage_ordinal(), None);
    }

    #[test]
    fn test_fraction_regression_and_equal_fraction() {
        let (reporter, _sink, job) = setup(&["A"]);
        reporter.report(&job, "A", Some(5), Some(10)).unwrap();
        reporter.report(&job, "A", Some(1), Some(2)).unwrap();

        let err = reporter.report(&job, "A", Some(4), Some(10)).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::FractionRegression {
                last_numerator: 1,
                last_denominator: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_rejected_call_leaves_state_unchanged() {
        let (reporter, sink, job) = setup(&["A", "B"]);
        reporter.report(&job, "B", Some(3), Some(4)).unwrap();
        let before = reporter.state(&job).unwrap();
        let forwarded = sink.updates().len();

        assert!(reporter.report(&job, "A", None, None).is_err());
        assert!(reporter.report(&job, "B", Some(1), Some(4)).is_err());
        assert!(reporter.report(&job, "B", Some(1), None).is_err());
        assert!(reporter.report(&job, "C", None, None).is_err());

        assert_eq!(reporter.state(&job).unwrap(), before);
        assert_eq!(sink.updates().len(), forwarded);
    }

    #[test]
    fn test_update_carries_ordinal_and_count() {
        let (reporter, sink, job) = setup(&["A", "B", "C"]);
        let update = reporter.report(&job, "C", Some(1), Some(3)).unwrap();

        assert_eq!(update.stage_ordinal, 2);
        assert_eq!(update.stage_count, 3);
        assert_eq!(sink.updates(), vec![update]);
    }

    #[test]
    fn test_sink_failure_does_not_fail_report() {
        let mut mock = MockProgressSink::new();
        mock.expect_on_stage_set_registered()
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_on_progress()
            .times(2)
            .returning(|_| Err(SinkError::Transport("down".to_string())));

        let reporter = ProgressReporter::new(Arc::new(mock));
        let job = JobId::new("job-1");
        reporter.register_stages(&job, ["A"]).unwrap();

        assert!(reporter.report(&job, "A", None, None).is_ok());
        assert!(reporter.report(&job, "A", Some(1), Some(1)).is_ok());
        assert!(reporter.state(&job).unwrap().current_fraction().unwrap().is_complete());
    }

    #[test]
    fn test_sink_called_once_per_accepted_event() {
        let mut mock = MockProgressSink::new();
        mock.expect_on_stage_set_registered()
            .withf(|job, stages| {
                job.as_str() == "job-1" && stages.len() == 2 && stages[0] == "A"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_on_progress()
            .withf(|u| u.stage == "A" && u.stage_count == 2)
            .times(1)
            .returning(|_| Ok(()));

        let reporter = ProgressReporter::new(Arc::new(mock));
        let job = JobId::new("job-1");
        reporter.register_stages(&job, ["A", "B"]).unwrap();
        reporter.report(&job, "A", None, None).unwrap();
        assert!(reporter.report(&job, "Z", None, None).is_err());
    }

    #[test]
    fn test_report_event_matches_report() {
        let (reporter, sink, job) = setup(&["A", "B"]);

        let marker = reporter.report_event(&job, &ProgressEvent::entered("A")).unwrap();
        let step = reporter
            .report_event(&job, &ProgressEvent::fraction("A", 2, 8))
            .unwrap();
        assert_eq!((marker.numerator, marker.denominator), (None, None));
        assert_eq!(step.fraction(), Fraction::new(1, 4));

        let err = reporter
            .report_event(&job, &ProgressEvent::fraction("A", 1, 8))
            .unwrap_err();
        assert!(matches!(err, ProgressError::FractionRegression { .. }));

        let parsed: ProgressEvent = serde_json::from_str(r#"{"stage":"B"}"#).unwrap();
        reporter.report_event(&job, &parsed).unwrap();
        assert_eq!(sink.updates().len(), 3);
        assert_eq!(reporter.state(&job).unwrap().current_stage_ordinal(), Some(1));
    }

    #[test]
    fn test_registration_reaches_sink_before_progress() {
        let mut seq = Sequence::new();
        let mut mock = MockProgressSink::new();
        mock.expect_on_stage_set_registered()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock.expect_on_progress()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let reporter = ProgressReporter::new(Arc::new(mock));
        let job = JobId::new("job-1");
        reporter.register_stages(&job, ["A"]).unwrap();
        assert_eq!(reporter.job_count(), 1);
        reporter.report(&job, "A", Some(0), Some(1)).unwrap();
    }

    #[test]
    fn test_failed_registration_notice_still_registers() {
        let mut mock = MockProgressSink::new();
        mock.expect_on_stage_set_registered()
            .times(1)
            .returning(|_, _| Err(SinkError::Transport("down".to_string())));
        mock.expect_on_progress().times(1).returning(|_| Ok(()));

        let reporter = ProgressReporter::new(Arc::new(mock));
        let job = JobId::new("job-1");
        reporter.register_stages(&job, ["A"]).unwrap();

        assert!(reporter.report(&job, "A", None, None).is_ok());
        assert_eq!(reporter.stages(&job).unwrap().names(), vec!["A"]);
    }

    #[test]
    fn test_release_forgets_job() {
        let (reporter, _sink, job) = setup(&["A"]);
        assert_eq!(reporter.job_count(), 1);
        assert!(reporter.release(&job));
        assert!(!reporter.release(&job));
        assert!(reporter.state(&job).is_none());
        assert!(reporter.stages(&job).is_none());

        reporter.register_stages(&job, ["B"]).unwrap();
        assert_eq!(reporter.stages(&job).unwrap().names(), vec!["B"]);
    }
}
