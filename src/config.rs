#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Batch settings, and the parts of the configuration read from the
//! environment.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bon::Builder;

use crate::{
    grade::DEFAULT_MAX_GRADE,
    report::ReportRenderer,
    workspace::WORKING_FOLDER,
};

/// Default directory reports are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// Default report title.
pub const DEFAULT_REPORT_TITLE: &str = "Report";

/// Settings of one correction batch.
#[derive(Debug, Clone, Builder)]
pub struct CorrectionConfig {
    /// Folder with one subfolder per student.
    #[builder(into)]
    input_folder:        PathBuf,
    /// File name of the submission inside each student folder.
    #[builder(into)]
    exercise_name:       String,
    /// Correction module run against every submission.
    #[builder(into)]
    exercise_correction: PathBuf,
    /// Sender address; no mail is sent without one.
    #[builder(into)]
    sending_email:       Option<String>,
    /// Where reports and the ledger go.
    #[builder(into, default = PathBuf::from(DEFAULT_OUTPUT_DIR))]
    output_dir:          PathBuf,
    /// Report title.
    #[builder(into, default = DEFAULT_REPORT_TITLE.to_string())]
    report_title:        String,
    /// Base name of report files.
    #[builder(into)]
    report_name:         Option<String>,
    /// Top of the grade scale.
    #[builder(default = DEFAULT_MAX_GRADE)]
    max_grade:           f64,
    /// Custom report template.
    #[builder(into)]
    template:            Option<PathBuf>,
    /// One report per student rather than one per suite.
    #[builder(default = true)]
    combine_reports:     bool,
    /// Timestamp report file names.
    #[builder(default = true)]
    add_timestamp:       bool,
    /// Scratch workspace.
    #[builder(into, default = PathBuf::from(WORKING_FOLDER))]
    workspace_dir:       PathBuf,
}

impl CorrectionConfig {
    /// Folder with one subfolder per student.
    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }

    /// Submission file name.
    pub fn exercise_name(&self) -> &str {
        &self.exercise_name
    }

    /// Exercise name without its extension, used in mail subjects.
    pub fn exercise_label(&self) -> &str {
        Path::new(&self.exercise_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.exercise_name)
    }

    /// Correction module path.
    pub fn exercise_correction(&self) -> &Path {
        &self.exercise_correction
    }

    /// Sender address.
    pub fn sending_email(&self) -> Option<&str> {
        self.sending_email.as_deref()
    }

    /// Base name of report files.
    pub fn report_name(&self) -> Option<&str> {
        self.report_name.as_deref()
    }

    /// Top of the grade scale.
    pub fn max_grade(&self) -> f64 {
        self.max_grade
    }

    /// Scratch workspace.
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// A renderer for these settings.
    pub fn renderer(&self) -> ReportRenderer {
        ReportRenderer::builder()
            .output_dir(self.output_dir.clone())
            .title(self.report_title.clone())
            .maybe_report_name(self.report_name.clone())
            .maybe_template(self.template.clone())
            .combine_reports(self.combine_reports)
            .add_timestamp(self.add_timestamp)
            .build()
    }
}

/// A trimmed, non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Parses a positive number of seconds; anything else means no limit.
pub fn parse_timeout_secs(value: Option<&str>) -> Option<Duration> {
    let value = value?;
    match value.trim().parse::<f64>() {
        Ok(secs) if secs > 0.0 => match Duration::try_from_secs_f64(secs) {
            Ok(timeout) => Some(timeout),
            Err(e) => {
                tracing::warn!("Ignoring test timeout `{value}`: {e}");
                None
            }
        },
        _ => {
            tracing::warn!(
                "Ignoring test timeout `{value}`, expected a positive number of seconds"
            );
            None
        }
    }
}

/// Reads an on/off switch, `default` when unset or unrecognised.
pub fn parse_switch(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Settings of the Python test run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSettings {
    /// Interpreter to prefer over the one on `PATH`.
    pub python:       Option<String>,
    /// Time limit for one student's test run.
    pub test_timeout: Option<Duration>,
}

impl RunSettings {
    /// Reads `POINTGRADE_PYTHON` and `POINTGRADE_TEST_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let timeout = env_var("POINTGRADE_TEST_TIMEOUT_SECS");
        Self {
            python:       env_var("POINTGRADE_PYTHON"),
            test_timeout: parse_timeout_secs(timeout.as_deref()),
        }
    }
}

/// SMTP server settings.
#[derive(Clone, PartialEq)]
pub struct SmtpEnv {
    /// Server host.
    pub host:     String,
    /// Port; the transport default when absent.
    pub port:     Option<u16>,
    /// Login user.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Use STARTTLS.
    pub tls:      bool,
}

impl std::fmt::Debug for SmtpEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEnv")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

impl SmtpEnv {
    /// Reads the `POINTGRADE_SMTP_*` variables; `None` when no host is set.
    pub fn from_env() -> Option<Self> {
        let host = env_var("POINTGRADE_SMTP_HOST")?;
        let port = env_var("POINTGRADE_SMTP_PORT").and_then(|p| match p.parse::<u16>() {
            Ok(port) => Some(port),
            Err(e) => {
                tracing::warn!("Ignoring POINTGRADE_SMTP_PORT `{p}`: {e}");
                None
            }
        });

        Some(Self {
            host,
            port,
            username: env_var("POINTGRADE_SMTP_USERNAME"),
            password: env_var("POINTGRADE_SMTP_PASSWORD"),
            tls: parse_switch(env_var("POINTGRADE_SMTP_TLS").as_deref(), true),
        })
    }
}
