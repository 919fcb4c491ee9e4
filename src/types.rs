#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::GradingError;

/// One stack frame of a failure backtrace.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// The file name associated with the frame.
    #[serde(rename = "file")]
    pub file_name:   String,
    /// The line number within the file.
    #[serde(rename = "line")]
    pub line_number: usize,
    /// Enclosing function, when known.
    #[serde(default)]
    pub function:    String,
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.function.is_empty() {
            write!(f, "{}:{}", self.file_name, self.line_number)
        } else {
            write!(f, "{}:{} in {}", self.file_name, self.line_number, self.function)
        }
    }
}

/// Fully qualified identifier of a single test: `module.Class.method`.
#[derive(Debug, Hash, PartialEq, Eq, Clone, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId {
    /// Module the suite lives in; may itself be dotted.
    pub module: String,
    /// Suite (test case class) name.
    pub class:  String,
    /// Test method name.
    pub method: String,
}

impl TestId {
    /// Creates an id from its three parts.
    pub fn new(
        module: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            class:  class.into(),
            method: method.into(),
        }
    }

    /// Parses a dotted id, splitting off the last two segments.
    pub fn parse(dotted: &str) -> Result<Self, GradingError> {
        let mut parts = dotted.rsplitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(class), Some(module))
                if !method.is_empty() && !class.is_empty() && !module.is_empty() =>
            {
                Ok(Self::new(module, class, method))
            }
            _ => Err(GradingError::MalformedTestId(dotted.to_string())),
        }
    }

    /// `module.Class.method`
    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.module, self.class, self.method)
    }

    /// `module.Class`, the key suite-level points are registered under.
    pub fn suite_key(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }

    /// Last segment of the id.
    pub fn short_name(&self) -> &str {
        &self.method
    }
}

impl Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.class, self.method)
    }
}
