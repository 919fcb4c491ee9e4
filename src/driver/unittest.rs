#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{ffi::OsString, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::TestDriver;
use crate::{
    outcome::{ResultObserver, Status, TestError},
    process,
    python::LoadedUnit,
    types::{Frame, TestId},
    workspace::Workspace,
};

/// File name of the bundled harness inside the workspace.
pub const HARNESS_FILE: &str = "pointgrade_harness.py";

/// File name of the `point` decorator shim inside the workspace.
pub const POINTS_SHIM_FILE: &str = "points.py";

/// File the harness writes its events to.
pub const EVENTS_FILE: &str = "pointgrade_events.jsonl";

/// Harness source.
const HARNESS_SOURCE: &str = include_str!("assets/harness.py");

/// Decorator shim source.
const POINTS_SHIM_SOURCE: &str = include_str!("assets/points.py");

/// What a harness line reports on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventKind {
    /// A single test method.
    #[default]
    Test,
    /// A module import or a class or module fixture.
    Setup,
}

/// One line written by the harness.
#[derive(Debug, Deserialize)]
struct HarnessEvent {
    /// unittest id: `module.Class.method` for tests, the placeholder's id for
    /// setup events.
    id:        String,
    /// Test or setup event.
    #[serde(default)]
    kind:      EventKind,
    /// Outcome kind.
    status:    Status,
    /// Seconds the test took.
    #[serde(default)]
    elapsed:   f64,
    /// Exception or skip message.
    #[serde(default)]
    message:   String,
    /// Traceback frames.
    #[serde(default)]
    backtrace: Vec<Frame>,
}

/// Id prefix unittest gives a module or name that failed to load.
const FAILED_IMPORT_PREFIX: &str = "unittest.loader._FailedTest.";

/// Module or suite a unittest placeholder id stands for.
///
/// `unittest.loader._FailedTest.correction` and `setUpModule (correction)`
/// give `correction`; `setUpClass (correction.TestCalc)` gives
/// `correction.TestCalc`.
pub fn placeholder_scope(id: &str) -> Option<&str> {
    if let Some(scope) = id.strip_prefix(FAILED_IMPORT_PREFIX) {
        return Some(scope);
    }
    let (_, rest) = id.split_once(" (")?;
    rest.strip_suffix(')')
}

/// Forwards harness events to `observer`, returning how many test outcomes
/// were read.
///
/// Blank lines are ignored. Setup events, and unittest's placeholders for a
/// module that failed to import, go to
/// [`ResultObserver::add_setup_outcome`] and are not counted. Other events
/// whose id is not `module.Class.method` are logged and skipped.
pub fn replay_events(events: &str, observer: &mut dyn ResultObserver) -> Result<usize> {
    let mut replayed = 0;
    for (n, line) in events.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: HarnessEvent = serde_json::from_str(line)
            .with_context(|| format!("Malformed harness event on line {}", n + 1))?;
        let err = TestError {
            message:   event.message,
            backtrace: event.backtrace,
        };

        let setup_scope = match event.kind {
            EventKind::Setup => Some(placeholder_scope(&event.id).unwrap_or(&event.id)),
            EventKind::Test => event.id.strip_prefix(FAILED_IMPORT_PREFIX),
        };
        if let Some(scope) = setup_scope {
            observer.add_setup_outcome(scope, event.status, err);
            continue;
        }

        let id = match TestId::parse(&event.id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("{e}: {}", err.message);
                continue;
            }
        };
        let elapsed = Duration::try_from_secs_f64(event.elapsed).unwrap_or_default();

        match event.status {
            Status::Success => observer.add_success(&id, elapsed),
            Status::Failure => observer.add_failure(&id, err, elapsed),
            Status::Error => observer.add_error(&id, err, elapsed),
            Status::Skip => observer.add_skip(&id, &err.message, elapsed),
        }
        replayed += 1;
    }
    Ok(replayed)
}

/// Runs a Python correction module with `unittest` in a fresh interpreter.
#[derive(Debug, Clone)]
pub struct UnittestDriver {
    /// Interpreter to run.
    python:            PathBuf,
    /// Correction module name, as imported from the workspace.
    correction_module: String,
    /// Time limit for one student's run.
    timeout:           Option<Duration>,
}

impl UnittestDriver {
    /// Creates a driver for `correction_module`.
    pub fn new(python: PathBuf, correction_module: impl Into<String>) -> Self {
        Self {
            python,
            correction_module: correction_module.into(),
            timeout: None,
        }
    }

    /// Sets a time limit for each run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TestDriver for UnittestDriver {
    fn prepare(&self, workspace: &Workspace) -> Result<()> {
        workspace.write(HARNESS_FILE, HARNESS_SOURCE)?;
        workspace.write(POINTS_SHIM_FILE, POINTS_SHIM_SOURCE)?;
        Ok(())
    }

    async fn run(
        &self,
        workspace: &Workspace,
        unit: &LoadedUnit,
        observer: &mut dyn ResultObserver,
    ) -> Result<()> {
        workspace.remove(EVENTS_FILE)?;

        let args: Vec<OsString> = vec![
            HARNESS_FILE.into(),
            self.correction_module.clone().into(),
            EVENTS_FILE.into(),
        ];
        let env: Vec<(OsString, OsString)> = vec![
            ("PYTHONDONTWRITEBYTECODE".into(), "1".into()),
            ("POINTGRADE_NAMESPACE".into(), unit.namespace().into()),
        ];

        tracing::debug!(
            "Running {} {} for {}",
            self.python.display(),
            self.correction_module,
            unit.id()
        );
        let collected = process::run_collect(
            &self.python,
            &args,
            Some(workspace.root()),
            &env,
            self.timeout,
        )
        .await
        .with_context(|| format!("Running correction {} failed", self.correction_module))?;

        let events = std::fs::read_to_string(workspace.path(EVENTS_FILE)).unwrap_or_default();
        let replayed = replay_events(&events, observer)?;

        if !collected.status.success() {
            if replayed == 0 {
                bail!(
                    "Correction {} did not run ({}):\n{}",
                    self.correction_module,
                    collected.status,
                    collected.stderr_lossy()
                );
            }
            tracing::warn!(
                "Harness exited with {} after {replayed} outcomes",
                collected.status
            );
        }
        Ok(())
    }

    fn scratch_files(&self) -> Vec<String> {
        vec![EVENTS_FILE.to_string()]
    }
}
