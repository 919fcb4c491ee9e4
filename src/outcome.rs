#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Recording test outcomes with their point values.

use std::{collections::HashSet, fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    points::PointRegistry,
    suite::SuiteDefinition,
    types::{Frame, TestId},
};

/// Message given to declared tests that never reported.
pub const NO_OUTCOME_MESSAGE: &str = "no outcome was reported for this test";

/// How a test finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The test passed.
    Success,
    /// An assertion failed.
    Failure,
    /// The test raised something other than an assertion failure.
    Error,
    /// The test was skipped.
    Skip,
}

impl Status {
    /// All statuses, in report order.
    pub const ALL: [Status; 4] = [Status::Success, Status::Failure, Status::Error, Status::Skip];

    /// Badge class used by the report template.
    pub fn tag(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failure => "danger",
            Status::Error => "warning",
            Status::Skip => "info",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Success => "Success",
            Status::Failure => "Failure",
            Status::Error => "Error",
            Status::Skip => "Skip",
        };
        f.write_str(s)
    }
}

/// Message and backtrace of a failed or errored test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestError {
    /// Exception message.
    pub message:   String,
    /// Stack frames, outermost first.
    pub backtrace: Vec<Frame>,
}

impl TestError {
    /// An error with a message and no backtrace.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message:   message.into(),
            backtrace: Vec::new(),
        }
    }
}

/// The recorded result of one test. Never changes once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    /// Qualified test id.
    id:             TestId,
    /// Display name.
    name:           String,
    /// How it finished.
    status:         Status,
    /// Failure, error or skip message; empty on success.
    message:        String,
    /// Failure backtrace.
    backtrace:      Vec<Frame>,
    /// Time the test took.
    elapsed:        Duration,
    /// Points awarded: `max_points` on success, 0 otherwise.
    points_awarded: u32,
    /// Points the test is worth.
    max_points:     u32,
}

impl TestOutcome {
    /// Builds an outcome; the awarded points follow from `status`.
    pub fn new(
        id: TestId,
        status: Status,
        error: TestError,
        elapsed: Duration,
        max_points: u32,
    ) -> Self {
        let points_awarded = if status == Status::Success { max_points } else { 0 };
        Self {
            name: id.method.clone(),
            id,
            status,
            message: error.message,
            backtrace: error.backtrace,
            elapsed,
            points_awarded,
            max_points,
        }
    }

    /// Qualified test id.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the test finished.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Failure, error or skip message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure backtrace.
    pub fn backtrace(&self) -> &[Frame] {
        &self.backtrace
    }

    /// Time the test took.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Points awarded.
    pub fn points_awarded(&self) -> u32 {
        self.points_awarded
    }

    /// Points the test is worth.
    pub fn max_points(&self) -> u32 {
        self.max_points
    }

    /// Skipped tests stay out of the point totals.
    pub fn counts_toward_total(&self) -> bool {
        self.status != Status::Skip
    }
}

/// Callbacks a test driver reports outcomes through.
pub trait ResultObserver: Send {
    /// The test passed.
    fn add_success(&mut self, test: &TestId, elapsed: Duration);

    /// An assertion failed.
    fn add_failure(&mut self, test: &TestId, err: TestError, elapsed: Duration);

    /// The test raised.
    fn add_error(&mut self, test: &TestId, err: TestError, elapsed: Duration);

    /// The test was skipped.
    fn add_skip(&mut self, test: &TestId, reason: &str, elapsed: Duration);

    /// Something outside any single test went wrong for `scope`, a module
    /// (`correction`) or a suite (`correction.TestCalc`). Typical causes are
    /// a correction that fails to import or a failing `setUpClass`.
    fn add_setup_outcome(&mut self, scope: &str, status: Status, err: TestError) {
        tracing::warn!("{status} while setting up {scope}: {}", err.message);
    }
}

/// Outcomes of one suite class, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteResults {
    /// Module of the suite.
    pub module:   String,
    /// Suite class name.
    pub name:     String,
    /// Outcomes of its tests.
    pub outcomes: Vec<TestOutcome>,
}

impl SuiteResults {
    /// `module.Class`
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    /// Number of outcomes with `status`.
    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Sum of the elapsed times.
    pub fn duration(&self) -> Duration {
        self.outcomes.iter().map(|o| o.elapsed).sum()
    }
}

/// Every outcome of a run, grouped by suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedResults {
    /// Suites in declaration order.
    pub suites: Vec<SuiteResults>,
}

impl GroupedResults {
    /// All outcomes, suite by suite.
    pub fn outcomes(&self) -> impl Iterator<Item = &TestOutcome> {
        self.suites.iter().flat_map(|s| s.outcomes.iter())
    }

    /// Number of outcomes with `status`, across suites.
    pub fn count(&self, status: Status) -> usize {
        self.suites.iter().map(|s| s.count(status)).sum()
    }

    /// Sum of the elapsed times, across suites.
    pub fn duration(&self) -> Duration {
        self.suites.iter().map(SuiteResults::duration).sum()
    }

    /// The outcome of `test`, if it has one.
    pub fn outcome(&self, test: &TestId) -> Option<&TestOutcome> {
        self.outcomes().find(|o| &o.id == test)
    }

    /// Whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.suites.iter().all(|s| s.outcomes.is_empty())
    }
}

/// Collects outcomes for one suite run, pricing each with the registry.
#[derive(Debug)]
pub struct ResultRecorder<'r> {
    /// Where point values come from.
    registry: &'r PointRegistry,
    /// Outcomes in the order they arrived.
    outcomes: Vec<TestOutcome>,
    /// Qualified ids already recorded.
    seen:     HashSet<TestId>,
    /// Module or suite level outcomes, by scope.
    setup:    Vec<(String, Status, TestError)>,
}

impl<'r> ResultRecorder<'r> {
    /// A recorder with no outcomes yet.
    pub fn new(registry: &'r PointRegistry) -> Self {
        Self {
            registry,
            outcomes: Vec::new(),
            seen: HashSet::new(),
            setup: Vec::new(),
        }
    }

    /// Outcomes recorded so far, in arrival order.
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    /// Records one outcome; a test that already has one is left alone.
    fn record(&mut self, test: &TestId, status: Status, error: TestError, elapsed: Duration) {
        if !self.seen.insert(test.clone()) {
            tracing::debug!("Ignoring second outcome ({status}) for {test}");
            return;
        }
        let max_points = self.registry.lookup(test);
        tracing::debug!("{test}: {status} ({max_points} pts)");
        self.outcomes
            .push(TestOutcome::new(test.clone(), status, error, elapsed, max_points));
    }

    /// Groups the outcomes by suite in declaration order.
    ///
    /// Declared tests without an outcome become errors, so every run of the
    /// same suite yields the same tests. They take the status and message of
    /// a setup outcome covering their suite or module when there is one.
    /// Undeclared tests and suites follow the declared ones in arrival order.
    pub fn finish(mut self, definition: &SuiteDefinition) -> GroupedResults {
        for id in definition.test_ids() {
            if self.seen.contains(&id) {
                continue;
            }
            let (status, err) = match self.setup_for(&id) {
                Some((status, err)) => (status, err.clone()),
                None => (Status::Error, TestError::message(NO_OUTCOME_MESSAGE)),
            };
            self.record(&id, status, err, Duration::ZERO);
        }

        let rank = |o: &TestOutcome| {
            let suite = definition
                .suite_position(&o.id.suite_key())
                .unwrap_or(usize::MAX);
            let test = definition.test_position(&o.id).unwrap_or(usize::MAX);
            (suite, test)
        };

        let mut indexed: Vec<(usize, TestOutcome)> =
            self.outcomes.into_iter().enumerate().collect();
        indexed.sort_by_key(|(arrival, o)| (rank(o), *arrival));

        let mut grouped = GroupedResults::default();
        for (_, outcome) in indexed {
            let key = outcome.id.suite_key();
            match grouped.suites.iter_mut().find(|s| s.key() == key) {
                Some(suite) => suite.outcomes.push(outcome),
                None => grouped.suites.push(SuiteResults {
                    module:   outcome.id.module.clone(),
                    name:     outcome.id.class.clone(),
                    outcomes: vec![outcome],
                }),
            }
        }
        grouped
    }
}

impl ResultRecorder<'_> {
    /// The setup outcome for `test`, preferring its suite over its module.
    fn setup_for(&self, test: &TestId) -> Option<(Status, &TestError)> {
        let suite = test.suite_key();
        let find = |scope: &str| {
            self.setup
                .iter()
                .find(|(s, _, _)| s == scope)
                .map(|(_, status, err)| (*status, err))
        };
        find(&suite).or_else(|| find(&test.module))
    }
}

impl ResultObserver for ResultRecorder<'_> {
    fn add_success(&mut self, test: &TestId, elapsed: Duration) {
        self.record(test, Status::Success, TestError::default(), elapsed);
    }

    fn add_failure(&mut self, test: &TestId, err: TestError, elapsed: Duration) {
        self.record(test, Status::Failure, err, elapsed);
    }

    fn add_error(&mut self, test: &TestId, err: TestError, elapsed: Duration) {
        self.record(test, Status::Error, err, elapsed);
    }

    fn add_skip(&mut self, test: &TestId, reason: &str, elapsed: Duration) {
        self.record(test, Status::Skip, TestError::message(reason), elapsed);
    }

    fn add_setup_outcome(&mut self, scope: &str, status: Status, err: TestError) {
        if status == Status::Success {
            return;
        }
        tracing::debug!("{scope}: setup {status}: {}", err.message);
        self.setup.push((scope.to_string(), status, err));
    }
}
