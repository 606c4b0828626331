//! End-to-end tests of the reporting protocol.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::core::{Fraction, JobId, StageStatus};
    use crate::errors::{ProgressError, RegistrationProblem};
    use crate::events::{CollectingProgressSink, QueuedProgressSink};
    use crate::progress::ProgressReporter;
    use crate::testing::{assert_rejected, assert_stage_status, three_stage_job};

    const STAGES: [&str; 3] = ["Stage One", "Stage Two", "Stage Three"];

    #[test]
    fn first_stage_from_zero_to_total() {
        for stages in [vec!["only"], vec!["a", "b"], STAGES.to_vec()] {
            for total in [1, 7, 100] {
                let reporter = ProgressReporter::shared(Arc::new(CollectingProgressSink::new()));
                let job = reporter.job(JobId::generate());
                job.register_stages(stages.clone()).unwrap();

                job.report_fraction(stages[0], 0, total).unwrap();
                job.report_fraction(stages[0], total, total).unwrap();

                let state = reporter.state(job.job_id()).unwrap();
                assert_eq!(state.current_stage_ordinal(), Some(0));
                assert_eq!(state.current_fraction(), Fraction::new(1, 1));
            }
        }
    }

    #[test]
    fn registering_twice_always_fails() {
        let (job, _sink) = three_stage_job();
        for names in [vec!["Stage One"], vec!["x", "y"], Vec::new()] {
            let err = job.register_stages(names).unwrap_err();
            assert!(matches!(
                err,
                ProgressError::InvalidRegistration {
                    problem: RegistrationProblem::AlreadyRegistered,
                    ..
                }
            ));
        }
    }

    #[test]
    fn unknown_stage_regardless_of_state() {
        let (job, _sink) = three_stage_job();
        let check = || {
            assert_rejected(&job.report_progress("Stage Four", Some((1, 2))), "UnknownStage");
            assert_rejected(&job.enter_stage("stage one"), "UnknownStage");
        };

        check();
        job.report_fraction("Stage One", 50, 100).unwrap();
        check();
        job.enter_stage("Stage Three").unwrap();
        check();
    }

    #[test]
    fn stage_regression_and_forward_skip() {
        let reporter = ProgressReporter::shared(Arc::new(CollectingProgressSink::new()));
        let job = reporter.job("abc");
        job.register_stages(["A", "B", "C"]).unwrap();

        job.enter_stage("B").unwrap();
        let err = job.report_fraction("A", 1, 1).unwrap_err();
        assert!(matches!(err, ProgressError::StageRegression { .. }));

        job.enter_stage("C").unwrap();
        assert_eq!(job.snapshot().unwrap().current_stage, Some(2));
        assert_stage_status(&job, "A", StageStatus::Skipped);
        assert_stage_status(&job, "B", StageStatus::Done);
        assert_stage_status(&job, "C", StageStatus::Running);
    }

    #[test]
    fn fraction_regression_within_stage() {
        let (job, _sink) = three_stage_job();
        job.report_fraction("Stage One", 30, 100).unwrap();

        // equal fraction, different denominator
        job.report_fraction("Stage One", 3, 10).unwrap();

        for (current, total) in [(29, 100), (0, 1), (2, 10)] {
            assert_rejected(
                &job.report_fraction("Stage One", current, total),
                "FractionRegression",
            );
        }
    }

    #[test]
    fn half_specified_fraction_is_malformed() {
        let (job, _sink) = three_stage_job();
        let reporter = job.reporter();

        for (n, d) in [(Some(5), None), (None, Some(5))] {
            let err = reporter
                .report(job.job_id(), "Stage One", n, d)
                .unwrap_err();
            assert!(matches!(err, ProgressError::MalformedFraction { .. }));
        }
    }

    #[test]
    fn three_stage_scenario() {
        let (job, sink) = three_stage_job();

        job.enter_stage("Stage One").unwrap();
        let state = job.reporter().state(job.job_id()).unwrap();
        assert_eq!(state.current_stage_ordinal(), Some(0));
        assert!(state.current_fraction().is_none());

        let mut last = None;
        for i in 0..=100 {
            let update = job.report_fraction("Stage One", i, 100).unwrap();
            let fraction = update.fraction();
            assert!(fraction >= last);
            last = fraction;
        }

        job.enter_stage("Stage Two").unwrap();
        let state = job.reporter().state(job.job_id()).unwrap();
        assert_eq!(state.current_stage_ordinal(), Some(1));
        assert!(state.current_fraction().is_none());

        let err = job.report_fraction("Stage One", 50, 100).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::StageRegression {
                ordinal: 0,
                current_ordinal: 1,
                ..
            }
        ));

        assert_eq!(sink.registrations().len(), 1);
        assert_eq!(sink.updates().len(), 1 + 101 + 1);
    }

    #[test]
    fn entering_later_stage_allows_fresh_fraction() {
        let (job, _sink) = three_stage_job();
        job.report_fraction("Stage One", 100, 100).unwrap();
        job.report_fraction("Stage Two", 0, 10).unwrap();
        job.report_fraction("Stage Two", 1, 10).unwrap();

        let err = job.report_fraction("Stage Two", 0, 10).unwrap_err();
        assert!(matches!(err, ProgressError::FractionRegression { .. }));
    }

    #[test]
    fn bare_marker_on_current_stage_keeps_fraction() {
        let (job, sink) = three_stage_job();
        job.report_fraction("Stage One", 30, 100).unwrap();

        let marker = job.enter_stage("Stage One").unwrap();
        assert_eq!(marker.stage_ordinal, 0);
        assert_eq!(marker.numerator, None);
        assert_eq!(marker.denominator, None);

        let forwarded = sink.updates_for(job.job_id());
        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded[1], marker);

        let state = job.reporter().state(job.job_id()).unwrap();
        assert_eq!(state.current_stage_ordinal(), Some(0));
        assert_eq!(state.current_fraction(), Fraction::new(30, 100));

        assert_rejected(&job.report_fraction("Stage One", 20, 100), "FractionRegression");
        job.report_fraction("Stage One", 30, 100).unwrap();
        assert_stage_status(&job, "Stage One", StageStatus::Running);
    }

    #[test]
    fn sink_sees_events_in_call_order() {
        let (job, sink) = three_stage_job();
        job.enter_stage("Stage One").unwrap();
        for i in 0..=10 {
            job.report_fraction("Stage One", i, 10).unwrap();
        }
        job.enter_stage("Stage Three").unwrap();

        let ordinals: Vec<_> = sink.updates().iter().map(|u| u.stage_ordinal).collect();
        assert_eq!(ordinals.first(), Some(&0));
        assert_eq!(ordinals.last(), Some(&2));
        assert!(ordinals.windows(2).all(|w| w[0] <= w[1]));
        assert!(sink.updates().iter().all(|u| u.stage_count == 3));
    }

    #[test]
    fn jobs_do_not_see_each_other() {
        let reporter = ProgressReporter::shared(Arc::new(CollectingProgressSink::new()));
        let a = reporter.job("a");
        let b = reporter.job("b");
        a.register_stages(STAGES).unwrap();
        b.register_stages(STAGES).unwrap();

        a.enter_stage("Stage Three").unwrap();
        b.report_fraction("Stage One", 1, 2).unwrap();

        assert_eq!(a.snapshot().unwrap().current_stage, Some(2));
        assert_eq!(b.snapshot().unwrap().current_stage, Some(0));
        assert!(b.report_fraction("Stage One", 2, 2).is_ok());
    }

    #[test]
    fn concurrent_jobs_keep_their_own_order() {
        let sink = Arc::new(CollectingProgressSink::new());
        let reporter = ProgressReporter::shared(sink.clone());

        let workers: Vec<_> = (0..8)
            .map(|n| {
                let job = reporter.job(format!("job-{n}"));
                std::thread::spawn(move || {
                    job.register_stages(STAGES).unwrap();
                    for stage in STAGES {
                        job.enter_stage(stage).unwrap();
                        for i in 0..=20 {
                            job.report_fraction(stage, i, 20).unwrap();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(reporter.job_count(), 8);
        for n in 0..8 {
            let updates = sink.updates_for(&JobId::new(format!("job-{n}")));
            assert_eq!(updates.len(), 3 * 22);
            let values: Vec<_> = updates
                .iter()
                .map(|u| (u.stage_ordinal, u.fraction()))
                .collect();
            let mut sorted = values.clone();
            sorted.sort();
            assert_eq!(values, sorted);
        }
    }

    #[tokio::test]
    async fn queued_sink_preserves_order() {
        let downstream = Arc::new(CollectingProgressSink::new());
        let queue = QueuedProgressSink::forwarding(downstream.clone());
        queue.start();

        let reporter = ProgressReporter::shared(queue.clone());
        let job = reporter.job("queued");
        job.register_stages(STAGES).unwrap();
        job.enter_stage("Stage One").unwrap();
        for i in 0..=100 {
            job.report_fraction("Stage One", i, 100).unwrap();
        }
        job.enter_stage("Stage Two").unwrap();

        queue.shutdown().await;

        assert_eq!(downstream.registrations().len(), 1);
        let updates = downstream.updates();
        assert_eq!(updates.len(), 103);
        assert!(updates[0].fraction().is_none());
        assert_eq!(updates[101].numerator, Some(100));
        assert_eq!(updates[102].stage, "Stage Two");
        assert_eq!(queue.metrics().delivered(), 104);
    }
}
