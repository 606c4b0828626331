//! Ordered, immutable stage sets.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::errors::RegistrationProblem;

/// A named phase of a job, with its position in the registered sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stage {
    /// The stage name, unique within a job.
    pub name: String,
    /// 0-based position in the registered sequence.
    pub ordinal: usize,
}

/// The ordered stage list of one job.
///
/// Invariant: non-empty, no duplicate names, no blank names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSet {
    stages: Vec<Stage>,
    by_name: HashMap<String, usize>,
}

impl StageSet {
    /// Builds a stage set, assigning ordinals by position.
    ///
    /// On failure returns the problem and, where relevant, the offending name.
    pub fn new<I, S>(names: I) -> Result<Self, (RegistrationProblem, Option<String>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stages = Vec::new();
        let mut by_name = HashMap::new();
        let mut seen = HashSet::new();

        for (ordinal, name) in names.into_iter().enumerate() {
            let name = name.into();
            if name.trim().is_empty() {
                return Err((RegistrationProblem::BlankName, Some(name)));
            }
            if !seen.insert(name.clone()) {
                return Err((RegistrationProblem::DuplicateName, Some(name)));
            }
            by_name.insert(name.clone(), ordinal);
            stages.push(Stage { name, ordinal });
        }

        if stages.is_empty() {
            return Err((RegistrationProblem::Empty, None));
        }

        Ok(Self { stages, by_name })
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; a stage set is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.by_name.get(name).map(|&ordinal| &self.stages[ordinal])
    }

    /// Returns the ordinal of a stage name.
    #[must_use]
    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Returns the stage at an ordinal.
    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&Stage> {
        self.stages.get(ordinal)
    }

    /// Returns the stage names in ordinal order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name.clone()).collect()
    }

    /// Iterates over the stages in ordinal order.
    pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
        self.stages.iter()
    }

    /// Returns the last stage.
    #[must_use]
    pub fn last(&self) -> Option<&Stage> {
        self.stages.last()
    }
}

impl<'a> IntoIterator for &'a StageSet {
    type Item = &'a Stage;
    type IntoIter = std::slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}
