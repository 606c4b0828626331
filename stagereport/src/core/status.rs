//! Observer-side stage status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a stage stands from an observer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage has not been entered yet.
    Pending,
    /// The stage is the job's current stage.
    Running,
    /// The stage was entered and the job has moved past it.
    Done,
    /// The job moved past the stage without ever entering it.
    Skipped,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Derives the status of `ordinal` given the job's current stage.
    #[must_use]
    pub fn derive(ordinal: usize, current: Option<usize>, entered: bool) -> Self {
        match current {
            Some(current) if ordinal == current => Self::Running,
            Some(current) if ordinal < current => {
                if entered {
                    Self::Done
                } else {
                    Self::Skipped
                }
            }
            _ => Self::Pending,
        }
    }

    /// Single-character icon used by the text renderer.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "○",
            Self::Running => "◐",
            Self::Done => "●",
            Self::Skipped => "⊘",
        }
    }
}
