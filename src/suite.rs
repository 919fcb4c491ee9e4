#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Declaring correction suites and their point weights.

use serde::{Deserialize, Serialize};

use crate::{
    error::GradingError,
    points::{PointRegistry, PointTarget},
    types::TestId,
};

/// A test declared inside a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Test method name.
    pub method: String,
    /// Test-level points, if declared.
    pub points: Option<i64>,
}

/// A test case class with its tests in declaration order.
///
/// ```
/// use pointgrade::suite::SuiteSpec;
///
/// let suite = SuiteSpec::new("correction", "TestCalc")
///     .points(2)
///     .test("test_add", 3)
///     .test("test_div", 7);
/// assert_eq!(suite.tests.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSpec {
    /// Module the class lives in.
    pub module: String,
    /// Class name.
    pub name:   String,
    /// Suite-level points, added to every test of this suite.
    pub points: Option<i64>,
    /// Declared tests, in order.
    pub tests:  Vec<TestSpec>,
}

impl SuiteSpec {
    /// Starts a suite with no tests and no suite-level points.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name:   name.into(),
            points: None,
            tests:  Vec::new(),
        }
    }

    /// Sets the suite-level points.
    pub fn points(mut self, points: i64) -> Self {
        self.points = Some(points);
        self
    }

    /// Declares a test worth `points`.
    pub fn test(mut self, method: impl Into<String>, points: i64) -> Self {
        self.tests.push(TestSpec {
            method: method.into(),
            points: Some(points),
        });
        self
    }

    /// Declares a test with no points of its own.
    pub fn unweighted(mut self, method: impl Into<String>) -> Self {
        self.tests.push(TestSpec {
            method: method.into(),
            points: None,
        });
        self
    }

    /// `module.Class`
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    /// Ids of the declared tests, in order.
    pub fn test_ids(&self) -> impl Iterator<Item = TestId> + '_ {
        self.tests
            .iter()
            .map(|t| TestId::new(&self.module, &self.name, &t.method))
    }
}

/// Every suite a correction declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDefinition {
    /// Suites in declaration order.
    pub suites: Vec<SuiteSpec>,
}

impl SuiteDefinition {
    /// Wraps a list of suites.
    pub fn new(suites: Vec<SuiteSpec>) -> Self {
        Self { suites }
    }

    /// Appends a suite.
    pub fn with_suite(mut self, suite: SuiteSpec) -> Self {
        self.suites.push(suite);
        self
    }

    /// Appends every suite of `other`.
    pub fn extend(&mut self, other: SuiteDefinition) {
        self.suites.extend(other.suites);
    }

    /// Registers every declared point value, stopping at the first invalid
    /// one.
    pub fn register_points(&self, registry: &mut PointRegistry) -> Result<(), GradingError> {
        for suite in &self.suites {
            if let Some(points) = suite.points {
                registry.register(PointTarget::Suite, suite.key(), points)?;
            }
            for (test, id) in suite.tests.iter().zip(suite.test_ids()) {
                if let Some(points) = test.points {
                    registry.register(PointTarget::Test, id.qualified(), points)?;
                }
            }
        }
        Ok(())
    }

    /// All declared test ids, suite by suite.
    pub fn test_ids(&self) -> Vec<TestId> {
        self.suites.iter().flat_map(SuiteSpec::test_ids).collect()
    }

    /// Declaration position of a suite, by `module.Class`.
    pub fn suite_position(&self, key: &str) -> Option<usize> {
        self.suites.iter().position(|s| s.key() == key)
    }

    /// Declaration position of a test within its suite.
    pub fn test_position(&self, id: &TestId) -> Option<usize> {
        let suite = self.suites.get(self.suite_position(&id.suite_key())?)?;
        suite.tests.iter().position(|t| t.method == id.method)
    }

    /// Whether no suites were declared.
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
