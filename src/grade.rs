#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Turning recorded outcomes into a grade.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{error::GradingError, outcome::GroupedResults};

/// Grade scale used when none is configured.
pub const DEFAULT_MAX_GRADE: f64 = 20.0;

/// Raw and rescaled grade of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeSummary {
    /// Points earned.
    pub raw_points:  u32,
    /// Points available across every counted test.
    pub raw_max:     u32,
    /// Top of the grade scale.
    pub max_grade:   f64,
    /// `max_grade / raw_max`
    pub coefficient: f64,
    /// `raw_points * coefficient`, rounded to one decimal.
    pub grade:       f64,
}

impl Display for GradeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1}/{} ({}/{} pts)",
            self.grade, self.max_grade, self.raw_points, self.raw_max
        )
    }
}

/// Rounds to one decimal place.
#[inline]
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Sums awarded and maximum points and rescales them onto `max_grade`.
///
/// Skipped tests are left out of both sums. A run worth 0 points is a broken
/// grading setup and fails with [`GradingError::NoPoints`]; one worth more
/// than `u32::MAX` fails with [`GradingError::TooManyPoints`].
pub fn compute_grade(
    results: &GroupedResults,
    max_grade: f64,
) -> Result<GradeSummary, GradingError> {
    let (raw_points, raw_max) = results
        .outcomes()
        .filter(|o| o.counts_toward_total())
        .fold((0u64, 0u64), |(points, max), o| {
            (
                points + u64::from(o.points_awarded()),
                max + u64::from(o.max_points()),
            )
        });

    if raw_max == 0 {
        return Err(GradingError::NoPoints);
    }
    let raw_max = u32::try_from(raw_max).map_err(|_| GradingError::TooManyPoints(raw_max))?;
    // awarded points never exceed the maximum
    let raw_points = u32::try_from(raw_points).unwrap_or(raw_max);

    let coefficient = max_grade / f64::from(raw_max);
    Ok(GradeSummary {
        raw_points,
        raw_max,
        max_grade,
        coefficient,
        grade: round1(f64::from(raw_points) * coefficient),
    })
}
