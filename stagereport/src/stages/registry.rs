//! Per-job stage registry.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use super::StageSet;
use crate::core::JobId;
use crate::errors::{ProgressError, RegistrationProblem};

/// Holds the stage set of each job, set once per job lifetime.
#[derive(Debug, Default)]
pub struct StageRegistry {
    sets: DashMap<JobId, Arc<StageSet>>,
}

impl StageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the ordered stage list of a job.
    ///
    /// Fails with `InvalidRegistration` if the list is empty, has duplicate
    /// or blank names, or the job already has a stage set.
    pub fn register<I, S>(&self, job_id: &JobId, names: I) -> Result<Arc<StageSet>, ProgressError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invalid = |problem: RegistrationProblem, detail: Option<String>| {
            ProgressError::InvalidRegistration {
                job_id: job_id.to_string(),
                problem,
                detail,
            }
        };

        match self.sets.entry(job_id.clone()) {
            Entry::Occupied(_) => Err(invalid(RegistrationProblem::AlreadyRegistered, None)),
            Entry::Vacant(slot) => {
                let set = StageSet::new(names).map_err(|(problem, detail)| invalid(problem, detail))?;
                let set = Arc::new(set);
                slot.insert(Arc::clone(&set));
                info!(
                    job_id = %job_id,
                    stage_count = set.len(),
                    "Registered stages"
                );
                Ok(set)
            }
        }
    }

    /// Returns the stage set of a job.
    #[must_use]
    pub fn get(&self, job_id: &JobId) -> Option<Arc<StageSet>> {
        self.sets.get(job_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true if the job has registered its stages.
    #[must_use]
    pub fn contains(&self, job_id: &JobId) -> bool {
        self.sets.contains_key(job_id)
    }

    /// Removes a job's stage set.
    pub fn remove(&self, job_id: &JobId) -> Option<Arc<StageSet>> {
        self.sets.remove(job_id).map(|(_, set)| set)
    }

    /// Returns the number of registered jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns true if no job is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
