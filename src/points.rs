#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Point values declared for suites and tests.

use std::collections::HashMap;

use crate::{error::GradingError, types::TestId};

/// Largest point value one suite or test may declare.
pub const MAX_POINTS: u32 = 1_000_000;

/// Which level a point value is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointTarget {
    /// A whole suite, keyed by `module.Class`.
    Suite,
    /// A single test, keyed by `module.Class.method`.
    Test,
}

/// Maps suite and test identifiers to their point values.
///
/// Owned by one grading run; nothing here is process-wide.
#[derive(Debug, Clone, Default)]
pub struct PointRegistry {
    /// Suite-level points by `module.Class`.
    suites: HashMap<String, u32>,
    /// Test-level points by `module.Class.method`.
    tests:  HashMap<String, u32>,
}

impl PointRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `points` for `qualified_name`. Registering the same key again
    /// overwrites it.
    pub fn register(
        &mut self,
        target: PointTarget,
        qualified_name: impl Into<String>,
        points: i64,
    ) -> Result<(), GradingError> {
        let qualified_name = qualified_name.into();
        let points = match u32::try_from(points) {
            Ok(p) if (1..=MAX_POINTS).contains(&p) => p,
            _ => {
                return Err(GradingError::InvalidPoints {
                    target: qualified_name,
                    value:  points.to_string(),
                });
            }
        };

        let dst = match target {
            PointTarget::Suite => &mut self.suites,
            PointTarget::Test => &mut self.tests,
        };
        if let Some(previous) = dst.insert(qualified_name.clone(), points)
            && previous != points
        {
            tracing::debug!("Re-registered {qualified_name}: {previous} -> {points}");
        }
        Ok(())
    }

    /// Test-level points plus the enclosing suite's points; an absent level
    /// counts as 0. Both levels are capped at [`MAX_POINTS`], so the sum
    /// always fits.
    pub fn lookup(&self, test: &TestId) -> u32 {
        let own = self.tests.get(&test.qualified()).copied().unwrap_or(0);
        let suite = self.suites.get(&test.suite_key()).copied().unwrap_or(0);
        own + suite
    }

    /// Sum of [`PointRegistry::lookup`] over `tests`.
    pub fn total<'a>(&self, tests: impl IntoIterator<Item = &'a TestId>) -> u64 {
        tests.into_iter().map(|t| u64::from(self.lookup(t))).sum()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty() && self.tests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_points() {
        let mut registry = PointRegistry::new();
        assert!(matches!(
            registry.register(PointTarget::Test, "m.C.t", 0),
            Err(GradingError::InvalidPoints { .. })
        ));
        assert!(registry.register(PointTarget::Suite, "m.C", -3).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_values_beyond_the_cap() {
        let mut registry = PointRegistry::new();
        assert!(
            registry
                .register(PointTarget::Test, "m.C.t", i64::from(u32::MAX) + 1)
                .is_err()
        );
        assert!(
            registry
                .register(PointTarget::Suite, "m.C", i64::from(MAX_POINTS) + 1)
                .is_err()
        );
        registry
            .register(PointTarget::Suite, "m.C", i64::from(MAX_POINTS))
            .unwrap();
        registry
            .register(PointTarget::Test, "m.C.t", i64::from(MAX_POINTS))
            .unwrap();
        assert_eq!(registry.lookup(&TestId::new("m", "C", "t")), 2 * MAX_POINTS);
    }
}
