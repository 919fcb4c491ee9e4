#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Typed errors for a broken grading setup and for mail delivery.

use thiserror::Error;

/// Errors that mean the grading setup itself is broken.
///
/// These are never a per-student problem; the batch stops as soon as one is
/// raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GradingError {
    /// A point annotation was declared without a value.
    #[error("You need to define a point value for `{target}`")]
    MissingPoints {
        /// Qualified name of the suite or test.
        target: String,
    },

    /// A point annotation could not be read as a positive integer.
    #[error("Point value for `{target}` needs to be a positive integer, got `{value}`")]
    InvalidPoints {
        /// Qualified name of the suite or test.
        target: String,
        /// The value as it was written.
        value:  String,
    },

    /// No point-annotated test contributed to the maximum.
    #[error("The correction suite is worth 0 points; annotate at least one test or suite")]
    NoPoints,

    /// A test identifier did not have the `module.Class.method` shape.
    #[error("Malformed test id `{0}`, expected `module.Class.method`")]
    MalformedTestId(String),

    /// The declared points add up to more than can be counted.
    #[error("The correction suite is worth {0} points, more than can be graded")]
    TooManyPoints(u64),
}

impl GradingError {
    /// Looks through an `anyhow` chain for a configuration error.
    pub fn find_in(err: &anyhow::Error) -> Option<&GradingError> {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<GradingError>())
    }
}

/// Errors raised while composing or sending a report mail.
#[derive(Error, Debug)]
pub enum MailError {
    /// The sender or recipient address did not parse.
    #[error("Invalid mail address `{address}`: {source}")]
    Address {
        /// The address as given.
        address: String,
        /// Underlying parse error.
        #[source]
        source:  lettre::address::AddressError,
    },

    /// The message could not be assembled.
    #[error("Could not build the mail message: {0}")]
    Build(#[from] lettre::error::Error),

    /// The report attachment could not be read.
    #[error("Could not read attachment {path}: {source}")]
    Attachment {
        /// Path of the report file.
        path:   String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transport refused or failed to deliver the message.
    #[error("Mail transport failed: {0}")]
    Transport(String),
}
