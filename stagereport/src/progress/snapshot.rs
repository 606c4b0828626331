//! Observer-side view of a job's progress.

use serde::{Deserialize, Serialize};

use super::JobProgressState;
use crate::core::{Fraction, JobId, StageStatus};
use crate::stages::StageSet;

/// One stage as seen by an observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// The stage name.
    pub name: String,
    /// 0-based position of the stage.
    pub ordinal: usize,
    /// Where the stage stands.
    pub status: StageStatus,
    /// Last recorded fraction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<Fraction>,
}

impl StageSnapshot {
    /// `processed/total`, or `Unknown` when no fraction was reported.
    #[must_use]
    pub fn progress_label(&self) -> String {
        self.fraction
            .map_or_else(|| "Unknown".to_owned(), |f| f.to_string())
    }
}

/// A point-in-time view of a job's stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// The job identity.
    pub job_id: JobId,
    /// Ordinal of the current stage.
    pub current_stage: Option<usize>,
    /// All stages in ordinal order.
    pub stages: Vec<StageSnapshot>,
}

impl JobSnapshot {
    /// Builds a snapshot from registry and reporter state.
    #[must_use]
    pub fn build(job_id: JobId, stages: &StageSet, state: &JobProgressState) -> Self {
        let current = state.current_stage_ordinal();
        let stages = stages
            .iter()
            .map(|stage| StageSnapshot {
                name: stage.name.clone(),
                ordinal: stage.ordinal,
                status: StageStatus::derive(stage.ordinal, current, state.was_entered(stage.ordinal)),
                fraction: state.last_fraction(stage.ordinal),
            })
            .collect();

        Self {
            job_id,
            current_stage: current,
            stages,
        }
    }

    /// Returns the current stage, if one was entered.
    #[must_use]
    pub fn current(&self) -> Option<&StageSnapshot> {
        self.current_stage.and_then(|ordinal| self.stages.get(ordinal))
    }

    /// Returns the stage with the given name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns true once the job has entered its last stage.
    #[must_use]
    pub fn in_last_stage(&self) -> bool {
        self.current_stage
            .is_some_and(|ordinal| ordinal + 1 == self.stages.len())
    }

    /// One-word summary: `pending` or `running: <stage>`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.current()
            .map_or_else(|| "pending".to_owned(), |s| format!("running: {}", s.name))
    }

    /// Renders the snapshot as a plain-text tree.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![format!("┌ {}", self.job_id)];
        for stage in &self.stages {
            lines.push("│".to_string());
            lines.push(format!("{} {}", stage.status.icon(), stage.name));
            if matches!(stage.status, StageStatus::Running | StageStatus::Done) {
                lines.push(format!("│ {}", stage.progress_label()));
            }
        }
        lines.push("│".to_string());
        lines.push(format!("└ {}", self.summary()));
        lines.join("\n")
    }
}
