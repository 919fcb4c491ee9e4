#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! HTML reports and the CSV ledger.

/// Append-only CSV ledger.
pub mod ledger;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use bon::Builder;
use chrono::{DateTime, Local};
use itertools::Itertools;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub use self::ledger::{LEDGER_FILE_NAME, append_csv, ledger_headers, ledger_row};
use crate::{
    grade::GradeSummary,
    outcome::{GroupedResults, Status, SuiteResults, TestOutcome},
    types::TestId,
};

/// Template used when no custom template is given or it cannot be read.
pub const DEFAULT_TEMPLATE: &str = include_str!("template.html");

/// File name prefix used when the caller gives no report name.
pub const DEFAULT_REPORT_PREFIX: &str = "Test_";

/// Extra variables echoed into the template, such as `id` and `mail`.
pub type TemplateArgs = BTreeMap<String, String>;

/// When the run started and how long it took.
#[derive(Debug, Clone, Copy)]
pub struct RunTiming {
    /// Start of the run.
    pub start:   DateTime<Local>,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl RunTiming {
    /// A run starting now that has not taken any time yet.
    pub fn starting_now() -> Self {
        Self {
            start:   Local::now(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Reads `template`, falling back to [`DEFAULT_TEMPLATE`] when it is absent,
/// unreadable or empty.
pub fn load_template(template: Option<&Path>) -> String {
    let Some(path) = template else {
        return DEFAULT_TEMPLATE.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(source) if !source.trim().is_empty() => source,
        Ok(_) => {
            tracing::warn!("Template {} is empty, loading default template", path.display());
            DEFAULT_TEMPLATE.to_string()
        }
        Err(e) => {
            tracing::error!(
                "Your template {} wasn't loaded ({e}), loading default template",
                path.display()
            );
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

/// Formats a duration the way the report shows it.
fn format_duration(d: Duration) -> String {
    format!("{:.3} s", d.as_secs_f64())
}

/// Per-status counts for a set of outcomes.
#[derive(Serialize)]
struct StatusCounts {
    /// Number of tests.
    total:    usize,
    /// Passed tests.
    success:  usize,
    /// Failed tests.
    failure:  usize,
    /// Errored tests.
    error:    usize,
    /// Skipped tests.
    skip:     usize,
    /// Summed test time.
    duration: String,
}

impl StatusCounts {
    /// Counts `outcomes`.
    fn of<'a>(outcomes: impl IntoIterator<Item = &'a TestOutcome>) -> Self {
        let mut counts = Self {
            total:    0,
            success:  0,
            failure:  0,
            error:    0,
            skip:     0,
            duration: String::new(),
        };
        let mut duration = Duration::ZERO;
        for outcome in outcomes {
            counts.total += 1;
            duration += outcome.elapsed();
            match outcome.status() {
                Status::Success => counts.success += 1,
                Status::Failure => counts.failure += 1,
                Status::Error => counts.error += 1,
                Status::Skip => counts.skip += 1,
            }
        }
        counts.duration = format_duration(duration);
        counts
    }

    /// `Success 1, Failure 2` style line, skipping zero counts.
    fn status_line(&self) -> String {
        let line = [
            ("Success", self.success),
            ("Failure", self.failure),
            ("Error", self.error),
            ("Skip", self.skip),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{label} {n}"))
        .join(", ");
        if line.is_empty() { "No tests".to_string() } else { line }
    }
}

/// One test row as the template sees it.
#[derive(Serialize)]
struct TestView<'a> {
    /// Qualified id.
    id:         String,
    /// Display name.
    name:       &'a str,
    /// Status label.
    status:     String,
    /// Badge class.
    tag:        &'static str,
    /// Failure message.
    message:    &'a str,
    /// Formatted frames.
    backtrace:  Vec<String>,
    /// Points awarded.
    points:     u32,
    /// Points available.
    max_points: u32,
    /// Formatted test time.
    elapsed:    String,
}

impl<'a> From<&'a TestOutcome> for TestView<'a> {
    fn from(o: &'a TestOutcome) -> Self {
        Self {
            id:         o.id().qualified(),
            name:       o.name(),
            status:     o.status().to_string(),
            tag:        o.status().tag(),
            message:    o.message(),
            backtrace:  o.backtrace().iter().map(ToString::to_string).collect(),
            points:     o.points_awarded(),
            max_points: o.max_points(),
            elapsed:    format_duration(o.elapsed()),
        }
    }
}

/// One suite as the template sees it.
#[derive(Serialize)]
struct SuiteView<'a> {
    /// Suite class name.
    name:    &'a str,
    /// `module.Class`
    key:     String,
    /// Per-status counts.
    summary: StatusCounts,
    /// Test rows.
    tests:   Vec<TestView<'a>>,
}

/// Renders reports into an output directory.
#[derive(Debug, Clone, Builder)]
pub struct ReportRenderer {
    /// Where reports and the ledger are written.
    #[builder(into)]
    output_dir:      PathBuf,
    /// Report title.
    #[builder(into, default = "Report".to_string())]
    title:           String,
    /// Base file name; derived from the suite names when absent.
    #[builder(into)]
    report_name:     Option<String>,
    /// Custom template path.
    #[builder(into)]
    template:        Option<PathBuf>,
    /// One report for every suite, instead of one per suite.
    #[builder(default = false)]
    combine_reports: bool,
    /// Append the start time to report file names.
    #[builder(default = true)]
    add_timestamp:   bool,
}

impl ReportRenderer {
    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// A copy of this renderer writing files under `name`.
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            report_name: Some(name.into()),
            ..self.clone()
        }
    }

    /// Path of the CSV ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(LEDGER_FILE_NAME)
    }

    /// Renders `results` into HTML.
    pub fn render(
        &self,
        results: &GroupedResults,
        grade: &GradeSummary,
        timing: &RunTiming,
        template_args: &TemplateArgs,
    ) -> Result<String> {
        let source = load_template(self.template.as_deref());
        let context = self.context(results, grade, timing, template_args);

        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.render_str(&source, context)
            .context("Could not render the report template")
    }

    /// Builds the template context; caller variables never replace built-in
    /// keys.
    fn context(
        &self,
        results: &GroupedResults,
        grade: &GradeSummary,
        timing: &RunTiming,
        template_args: &TemplateArgs,
    ) -> Value {
        let overall = StatusCounts::of(results.outcomes());
        let all_results: Vec<SuiteView<'_>> = results
            .suites
            .iter()
            .map(|suite| SuiteView {
                name:    &suite.name,
                key:     suite.key(),
                summary: StatusCounts::of(&suite.outcomes),
                tests:   suite.outcomes.iter().map(TestView::from).collect(),
            })
            .collect();

        let statuses: Vec<Value> = Status::ALL
            .iter()
            .map(|s| {
                json!({
                    "key": s.to_string().to_lowercase(),
                    "label": s.to_string(),
                    "tag": s.tag(),
                })
            })
            .collect();
        let status_tags: Map<String, Value> = Status::ALL
            .iter()
            .map(|s| (s.to_string(), Value::from(s.tag())))
            .collect();

        let mut context = Map::new();
        context.insert("title".into(), Value::from(self.title.as_str()));
        context.insert(
            "header_info".into(),
            json!({
                "start_time": timing.start.format("%Y-%m-%d %H:%M:%S").to_string(),
                "duration": format_duration(timing.elapsed),
                "status": overall.status_line(),
            }),
        );
        context.insert("all_results".into(), json!(all_results));
        context.insert("summaries".into(), json!(overall));
        context.insert("statuses".into(), Value::from(statuses));
        context.insert("status_tags".into(), Value::from(status_tags));
        context.insert("grade".into(), json!(grade.grade));
        context.insert("raw_grade".into(), json!(grade.raw_points));
        context.insert("max_raw_grade".into(), json!(grade.raw_max));
        context.insert("max_grade".into(), json!(grade.max_grade));
        context.insert("coefficient".into(), json!(grade.coefficient));

        for (key, value) in template_args {
            if context.contains_key(key) {
                tracing::warn!("Template variable `{key}` is reserved, ignoring caller value");
                continue;
            }
            context.insert(key.clone(), Value::from(value.as_str()));
        }
        Value::Object(context)
    }

    /// Renders and writes the HTML report(s), returning the written paths.
    pub fn generate(
        &self,
        results: &GroupedResults,
        grade: &GradeSummary,
        timing: &RunTiming,
        template_args: &TemplateArgs,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Could not create output directory {}", self.output_dir.display())
        })?;
        let timestamp = self
            .add_timestamp
            .then(|| timing.start.format("%Y-%m-%d_%H-%M-%S").to_string());

        let mut written = Vec::new();
        if self.combine_reports {
            let body = match &self.report_name {
                Some(name) => name.clone(),
                None => format!(
                    "{DEFAULT_REPORT_PREFIX}{}",
                    results.suites.iter().map(|s| s.name.as_str()).join("_")
                ),
            };
            let html = self.render(results, grade, timing, template_args)?;
            written.push(self.write_report(&body, timestamp.as_deref(), &html)?);
        } else {
            for suite in &results.suites {
                let body = match &self.report_name {
                    Some(name) => format!("{name}_{}", suite.name),
                    None => format!("{DEFAULT_REPORT_PREFIX}{}", suite.name),
                };
                let single = single_suite(suite);
                let html = self.render(&single, grade, timing, template_args)?;
                written.push(self.write_report(&body, timestamp.as_deref(), &html)?);
            }
        }
        Ok(written)
    }

    /// Appends this run's row to the CSV ledger, with one column per test in
    /// `tests`.
    pub fn append_ledger(
        &self,
        id: &str,
        mail: &str,
        tests: &[TestId],
        results: &GroupedResults,
        grade: &GradeSummary,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Could not create output directory {}", self.output_dir.display())
        })?;
        let path = self.ledger_path();
        append_csv(
            &path,
            &ledger_headers(tests),
            &ledger_row(id, mail, tests, results, grade),
        )?;
        tracing::info!("Report generated: {}", path.display());
        Ok(path)
    }

    /// Writes one HTML file.
    fn write_report(&self, body: &str, timestamp: Option<&str>, html: &str) -> Result<PathBuf> {
        let file_name = match timestamp {
            Some(ts) => format!("{body}_{ts}.html"),
            None => format!("{body}.html"),
        };
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, html)
            .with_context(|| format!("Could not write report {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// A copy of `results` holding only `suite`.
fn single_suite(suite: &SuiteResults) -> GroupedResults {
    GroupedResults {
        suites: vec![suite.clone()],
    }
}
