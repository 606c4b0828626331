//! Fractional progress within a stage.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A validated `numerator/denominator` pair.
///
/// Invariant: `denominator > 0` and `0 <= numerator <= denominator`.
/// Equality and ordering compare rational values, so `50/100 == 1/2`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "FractionParts")]
pub struct Fraction {
    numerator: i64,
    denominator: i64,
}

#[derive(Deserialize)]
struct FractionParts {
    numerator: i64,
    denominator: i64,
}

impl TryFrom<FractionParts> for Fraction {
    type Error = String;

    fn try_from(parts: FractionParts) -> Result<Self, Self::Error> {
        Self::new(parts.numerator, parts.denominator).ok_or_else(|| {
            format!(
                "fraction {}/{} is out of range",
                parts.numerator, parts.denominator
            )
        })
    }
}

impl Fraction {
    /// Creates a fraction, returning `None` when the pair is out of range.
    #[must_use]
    pub fn new(numerator: i64, denominator: i64) -> Option<Self> {
        if denominator <= 0 || numerator < 0 || numerator > denominator {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// Validates an optional pair as reported by a job.
    ///
    /// `Ok(None)` means a bare stage marker (both absent). `Err(())` means
    /// the pair is malformed.
    #[allow(clippy::result_unit_err)]
    pub fn from_parts(numerator: Option<i64>, denominator: Option<i64>) -> Result<Option<Self>, ()> {
        match (numerator, denominator) {
            (None, None) => Ok(None),
            (Some(n), Some(d)) => Self::new(n, d).map(Some).ok_or(()),
            _ => Err(()),
        }
    }

    /// Returns the numerator.
    #[must_use]
    pub const fn numerator(&self) -> i64 {
        self.numerator
    }

    /// Returns the denominator.
    #[must_use]
    pub const fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Returns true when the numerator equals the denominator.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.numerator == self.denominator
    }

    /// Approximate value in `[0.0, 1.0]`, for display only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    fn cross(&self, other: &Self) -> (i128, i128) {
        (
            i128::from(self.numerator) * i128::from(other.denominator),
            i128::from(other.numerator) * i128::from(self.denominator),
        )
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        let (lhs, rhs) = self.cross(other);
        lhs == rhs
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs) = self.cross(other);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
