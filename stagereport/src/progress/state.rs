//! Per-job progress state.

use serde::{Deserialize, Serialize};

use crate::core::Fraction;

/// Progress state of one job, mutated only by accepted events.
///
/// `current_stage_ordinal` is `None` between registration and the first
/// accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgressState {
    current_stage_ordinal: Option<usize>,
    last_fractions: Vec<Option<Fraction>>,
    entered: Vec<bool>,
}

impl JobProgressState {
    /// Creates the state of a freshly registered job.
    #[must_use]
    pub fn new(stage_count: usize) -> Self {
        Self {
            current_stage_ordinal: None,
            last_fractions: vec![None; stage_count],
            entered: vec![false; stage_count],
        }
    }

    /// Returns the ordinal of the current stage.
    #[must_use]
    pub const fn current_stage_ordinal(&self) -> Option<usize> {
        self.current_stage_ordinal
    }

    /// Returns the last fraction recorded for a stage.
    #[must_use]
    pub fn last_fraction(&self, ordinal: usize) -> Option<Fraction> {
        self.last_fractions.get(ordinal).copied().flatten()
    }

    /// Returns the last fraction recorded for the current stage.
    #[must_use]
    pub fn current_fraction(&self) -> Option<Fraction> {
        self.current_stage_ordinal
            .and_then(|ordinal| self.last_fraction(ordinal))
    }

    /// Returns true if the stage was ever entered.
    #[must_use]
    pub fn was_entered(&self, ordinal: usize) -> bool {
        self.entered.get(ordinal).copied().unwrap_or(false)
    }

    /// Returns the number of stages tracked.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.entered.len()
    }

    /// Checks that `ordinal` does not precede the current stage.
    ///
    /// On failure returns the current ordinal.
    pub fn check_stage(&self, ordinal: usize) -> Result<(), usize> {
        match self.current_stage_ordinal {
            Some(current) if ordinal < current => Err(current),
            _ => Ok(()),
        }
    }

    /// Checks that a fraction on the current stage does not go backwards.
    ///
    /// Events that enter a later stage always pass. On failure returns the
    /// last recorded fraction.
    pub fn check_fraction(&self, ordinal: usize, fraction: Option<Fraction>) -> Result<(), Fraction> {
        let Some(fraction) = fraction else {
            return Ok(());
        };
        if self.current_stage_ordinal != Some(ordinal) {
            return Ok(());
        }
        match self.last_fraction(ordinal) {
            Some(last) if fraction < last => Err(last),
            _ => Ok(()),
        }
    }

    /// Applies an accepted event.
    ///
    /// Entering a later stage resets its fraction. A bare marker on the
    /// current stage changes nothing.
    pub fn apply(&mut self, ordinal: usize, fraction: Option<Fraction>) {
        let enters = self
            .current_stage_ordinal
            .map_or(true, |current| ordinal > current);

        if enters {
            self.current_stage_ordinal = Some(ordinal);
            self.last_fractions[ordinal] = None;
            self.entered[ordinal] = true;
        }
        if let Some(fraction) = fraction {
            self.last_fractions[ordinal] = Some(fraction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> Option<Fraction> {
        Fraction::new(n, d)
    }

    #[test]
    fn test_new_state_is_registered() {
        let state = JobProgressState::new(3);
        assert_eq!(state.current_stage_ordinal(), None);
        assert_eq!(state.stage_count(), 3);
        assert!(state.current_fraction().is_none());
        assert!(state.check_stage(0).is_ok());
    }

    #[test]
    fn test_apply_enters_and_records() {
        let mut state = JobProgressState::new(3);
        state.apply(0, None);
        assert_eq!(state.current_stage_ordinal(), Some(0));
        assert!(state.current_fraction().is_none());

        state.apply(0, frac(1, 2));
        assert_eq!(state.current_fraction(), frac(1, 2));
        assert!(state.was_entered(0));
    }

    #[test]
    fn test_skip_forward_leaves_gap_unentered() {
        let mut state = JobProgressState::new(3);
        state.apply(0, None);
        state.apply(2, frac(1, 4));

        assert_eq!(state.current_stage_ordinal(), Some(2));
        assert!(!state.was_entered(1));
        assert_eq!(state.check_stage(1), Err(2));
    }

    #[test]
    fn test_fraction_check_only_on_current_stage() {
        let mut state = JobProgressState::new(2);
        state.apply(0, frac(9, 10));

        assert_eq!(state.check_fraction(0, frac(1, 10)), Err(Fraction::new(9, 10).unwrap()));
        assert!(state.check_fraction(0, frac(90, 100)).is_ok());
        assert!(state.check_fraction(0, None).is_ok());
        assert!(state.check_fraction(1, frac(0, 10)).is_ok());
    }

    #[test]
    fn test_bare_marker_on_current_stage_keeps_fraction() {
        let mut state = JobProgressState::new(2);
        state.apply(0, frac(3, 10));
        state.apply(0, None);
        assert_eq!(state.current_fraction(), frac(3, 10));
    }

    #[test]
    fn test_entering_stage_resets_fraction() {
        let mut state = JobProgressState::new(2);
        state.apply(0, frac(10, 10));
        state.apply(1, None);

        assert!(state.current_fraction().is_none());
        assert_eq!(state.last_fraction(0), frac(10, 10));
    }
}
