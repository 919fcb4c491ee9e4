#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Running the correction suite against a loaded submission.

/// In-process Rust test cases.
pub mod native;
/// Python `unittest` through a subprocess harness.
pub mod unittest;

use anyhow::Result;
use async_trait::async_trait;

pub use self::{
    native::{CaseFailure, CaseResult, NativeDriver},
    unittest::UnittestDriver,
};
use crate::{outcome::ResultObserver, python::LoadedUnit, workspace::Workspace};

/// Executes the correction suite and reports every outcome to an observer.
#[async_trait]
pub trait TestDriver: Send + Sync {
    /// Stages whatever the driver needs in the workspace, once per batch.
    fn prepare(&self, _workspace: &Workspace) -> Result<()> {
        Ok(())
    }

    /// Runs the suite against `unit`.
    ///
    /// An `Err` means the run as a whole broke down; individual test
    /// failures are reported through `observer` instead.
    async fn run(
        &self,
        workspace: &Workspace,
        unit: &LoadedUnit,
        observer: &mut dyn ResultObserver,
    ) -> Result<()>;

    /// Per-student files the driver leaves in the workspace.
    fn scratch_files(&self) -> Vec<String> {
        Vec::new()
    }
}
