#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    time::Instant,
};

use anyhow::Result;
use async_trait::async_trait;

use super::TestDriver;
use crate::{
    outcome::{ResultObserver, TestError},
    python::LoadedUnit,
    types::TestId,
    workspace::Workspace,
};

/// Why a native test case did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFailure {
    /// An expectation about the submission did not hold.
    Failed(String),
    /// The case could not evaluate the submission.
    Errored(String),
    /// The case chose not to run.
    Skipped(String),
}

/// What a native test case returns.
pub type CaseResult = Result<(), CaseFailure>;

/// A test case body.
type CaseFn = Box<dyn Fn(&LoadedUnit) -> CaseResult + Send + Sync>;

/// Runs Rust closures as test cases against a loaded submission.
///
/// Cases run in registration order, in process. A panicking case is
/// reported as an error carrying the panic message.
#[derive(Default)]
pub struct NativeDriver {
    /// Registered cases.
    cases: Vec<(TestId, CaseFn)>,
}

impl std::fmt::Debug for NativeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDriver")
            .field("cases", &self.cases.iter().map(|(id, _)| id).collect::<Vec<_>>())
            .finish()
    }
}

impl NativeDriver {
    /// A driver with no cases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a case reported under `id`.
    pub fn case<F>(mut self, id: TestId, body: F) -> Self
    where
        F: Fn(&LoadedUnit) -> CaseResult + Send + Sync + 'static,
    {
        self.cases.push((id, Box::new(body)));
        self
    }
}

/// Text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test case panicked".to_string()
    }
}

#[async_trait]
impl TestDriver for NativeDriver {
    async fn run(
        &self,
        _workspace: &Workspace,
        unit: &LoadedUnit,
        observer: &mut dyn ResultObserver,
    ) -> Result<()> {
        for (id, body) in &self.cases {
            let start = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| body(unit)));
            let elapsed = start.elapsed();

            match result {
                Ok(Ok(())) => observer.add_success(id, elapsed),
                Ok(Err(CaseFailure::Failed(msg))) => {
                    observer.add_failure(id, TestError::message(msg), elapsed)
                }
                Ok(Err(CaseFailure::Errored(msg))) => {
                    observer.add_error(id, TestError::message(msg), elapsed)
                }
                Ok(Err(CaseFailure::Skipped(reason))) => observer.add_skip(id, &reason, elapsed),
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    observer.add_error(id, TestError::message(msg), elapsed)
                }
            }
        }
        Ok(())
    }
}
