//! # pointgrade
//!
//! A batch autograder: a point-weighted correction suite runs against every
//! student's submission, and each student gets an HTML report, a row in a
//! CSV ledger and, optionally, the report by mail.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Batch settings and environment configuration
pub mod config;
/// Running the correction suite against a submission
pub mod driver;
/// Typed errors
pub mod error;
/// Writing the available points of test modules
pub mod export;
/// Turning outcomes into a grade
pub mod grade;
/// Mailing reports
pub mod mail;
/// Grading a whole batch of students
pub mod orchestrator;
/// Recording test outcomes
pub mod outcome;
/// Point values of suites and tests
pub mod points;
/// Subprocess helpers
pub mod process;
/// Python sources: parsing, loading and scanning
pub mod python;
/// HTML reports and the CSV ledger
pub mod report;
/// Declaring suites and their points
pub mod suite;
/// Shared identifier types
pub mod types;
/// Utility functions for convenience
pub mod util;
/// The scratch directory submissions are graded in
pub mod workspace;

pub use config::CorrectionConfig;
pub use error::{GradingError, MailError};
pub use grade::{GradeSummary, compute_grade};
pub use orchestrator::{BatchSummary, CorrectionOrchestrator};
pub use points::{PointRegistry, PointTarget};
pub use suite::{SuiteDefinition, SuiteSpec};
pub use types::TestId;

/// Defined for convenience
pub type Dict = std::collections::HashMap<String, String>;
