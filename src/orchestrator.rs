#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grading every student folder of a batch, one after the other.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result, bail};
use tabled::{Table, Tabled, settings::Style};

use crate::{
    config::CorrectionConfig,
    driver::TestDriver,
    error::GradingError,
    grade::{GradeSummary, compute_grade},
    mail::{MailTransport, compose_report_mail},
    outcome::ResultRecorder,
    points::PointRegistry,
    python::load_submission,
    report::{ReportRenderer, RunTiming, TemplateArgs},
    suite::SuiteDefinition,
    workspace::Workspace,
};

/// Report name prefix of a student's reports, followed by the student id.
pub const STUDENT_REPORT_PREFIX: &str = "Report_Student_";

/// Steps each student goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Copying the submission into the workspace.
    Setup,
    /// Parsing the submission and reading its identity.
    LoadModule,
    /// Running the correction suite.
    RunTests,
    /// Grading and writing the report and ledger row.
    RenderReport,
    /// Mailing the report.
    SendEmail,
    /// Clearing the workspace for the next student.
    Cleanup,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Setup => "setup",
            Stage::LoadModule => "load module",
            Stage::RunTests => "run tests",
            Stage::RenderReport => "render report",
            Stage::SendEmail => "send email",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// What happened to a student's report mail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MailStatus {
    /// No sender, transport or recipient, so nothing was sent.
    #[default]
    NotSent,
    /// Delivered to the transport.
    Sent,
    /// The transport or message assembly failed.
    Failed(String),
}

impl Display for MailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailStatus::NotSent => f.write_str("-"),
            MailStatus::Sent => f.write_str("sent"),
            MailStatus::Failed(_) => f.write_str("failed"),
        }
    }
}

/// How one student's run went.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    /// Student folder name.
    pub folder:       String,
    /// Student id; the folder name until the module is loaded.
    pub id:           String,
    /// Student mail address.
    pub mail:         Option<String>,
    /// Grade, once computed.
    pub grade:        Option<GradeSummary>,
    /// HTML reports written.
    pub reports:      Vec<PathBuf>,
    /// Mail outcome.
    pub mail_status:  MailStatus,
    /// Stage that failed, if any.
    pub failed_stage: Option<Stage>,
}

impl StudentRecord {
    /// A record for a student nothing has happened to yet.
    fn new(folder: &str) -> Self {
        Self {
            folder:       folder.to_string(),
            id:           folder.to_string(),
            mail:         None,
            grade:        None,
            reports:      Vec::new(),
            mail_status:  MailStatus::NotSent,
            failed_stage: None,
        }
    }
}

/// Table row for the CLI summary.
#[derive(Tabled)]
struct SummaryRow {
    /// Student folder.
    #[tabled(rename = "Student")]
    folder:  String,
    /// Student id.
    #[tabled(rename = "Id")]
    id:      String,
    /// Grade or a dash.
    #[tabled(rename = "Grade")]
    grade:   String,
    /// Number of reports.
    #[tabled(rename = "Reports")]
    reports: usize,
    /// Mail outcome.
    #[tabled(rename = "Mail")]
    mail:    String,
    /// Failed stage or `ok`.
    #[tabled(rename = "Status")]
    status:  String,
}

impl From<&StudentRecord> for SummaryRow {
    fn from(r: &StudentRecord) -> Self {
        Self {
            folder:  r.folder.clone(),
            id:      r.id.clone(),
            grade:   r
                .grade
                .map(|g| g.to_string())
                .unwrap_or_else(|| "-".to_string()),
            reports: r.reports.len(),
            mail:    r.mail_status.to_string(),
            status:  r
                .failed_stage
                .map(|s| format!("failed: {s}"))
                .unwrap_or_else(|| "ok".to_string()),
        }
    }
}

/// Every student of a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Records in processing order.
    pub records: Vec<StudentRecord>,
}

impl BatchSummary {
    /// Students that got a grade.
    pub fn graded(&self) -> usize {
        self.records.iter().filter(|r| r.grade.is_some()).count()
    }

    /// Number of HTML reports written across students.
    pub fn reports_written(&self) -> usize {
        self.records.iter().map(|r| r.reports.len()).sum()
    }

    /// Record for the student in `folder`.
    pub fn record(&self, folder: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.folder == folder)
    }

    /// The summary as a text table.
    pub fn table(&self) -> String {
        Table::new(self.records.iter().map(SummaryRow::from))
            .with(Style::modern())
            .to_string()
    }
}

/// Runs one correction suite against every student folder.
pub struct CorrectionOrchestrator {
    /// Batch settings.
    config:     CorrectionConfig,
    /// Suites and their declared tests.
    definition: SuiteDefinition,
    /// Point values of the suites and tests.
    registry:   PointRegistry,
    /// Report writer.
    renderer:   ReportRenderer,
    /// Runs the suite.
    driver:     Box<dyn TestDriver>,
    /// Mails reports, when configured.
    mailer:     Option<Box<dyn MailTransport>>,
}

impl std::fmt::Debug for CorrectionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionOrchestrator")
            .field("config", &self.config)
            .field("definition", &self.definition)
            .field("mailer", &self.mailer.is_some())
            .finish_non_exhaustive()
    }
}

impl CorrectionOrchestrator {
    /// Registers the suite's points and checks they add up to something.
    pub fn new(
        config: CorrectionConfig,
        definition: SuiteDefinition,
        driver: impl TestDriver + 'static,
    ) -> Result<Self, GradingError> {
        let mut registry = PointRegistry::new();
        definition.register_points(&mut registry)?;
        match registry.total(&definition.test_ids()) {
            0 => return Err(GradingError::NoPoints),
            total if total > u64::from(u32::MAX) => {
                return Err(GradingError::TooManyPoints(total));
            }
            _ => {}
        }

        Ok(Self {
            renderer: config.renderer(),
            config,
            definition,
            registry,
            driver: Box::new(driver),
            mailer: None,
        })
    }

    /// Mails reports through `mailer`.
    pub fn with_mailer(mut self, mailer: impl MailTransport + 'static) -> Self {
        self.mailer = Some(Box::new(mailer));
        self
    }

    /// The point registry of this batch.
    pub fn registry(&self) -> &PointRegistry {
        &self.registry
    }

    /// Grades every student folder in sorted order.
    ///
    /// A configuration error stops the batch and is returned; any other
    /// failure is logged and only ends that student's run.
    pub async fn run_corrections(&self) -> Result<BatchSummary> {
        let students = student_folders(self.config.input_folder())?;
        tracing::info!(
            "Grading {} student(s) from {}",
            students.len(),
            self.config.input_folder().display()
        );

        let workspace = Workspace::create(self.config.workspace_dir())?;
        let correction = self.config.exercise_correction();
        let correction_name = correction
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid correction path {}", correction.display()))?;
        workspace.stage(correction, correction_name)?;
        self.driver.prepare(&workspace)?;

        let mut scratch = self.driver.scratch_files();
        scratch.push(self.config.exercise_name().to_string());

        let mut summary = BatchSummary::default();
        for (folder, dir) in students {
            let mut record = StudentRecord::new(&folder);
            let mut stage = Stage::Setup;

            let graded = self
                .grade_student(&workspace, &dir, &mut record, &mut stage)
                .await;

            if let Err(e) = workspace.clear(scratch.iter().map(String::as_str)) {
                tracing::error!("[{}] {} failed: {e:?}", record.id, Stage::Cleanup);
                if graded.is_ok() {
                    record.failed_stage = Some(Stage::Cleanup);
                }
            }

            if let Err(e) = graded {
                if GradingError::find_in(&e).is_some() {
                    tracing::error!("[{}] aborting the batch during {stage}", record.id);
                    return Err(e);
                }
                tracing::error!("[{}] {stage} failed: {e:?}", record.id);
                record.failed_stage = Some(stage);
            }
            summary.records.push(record);
        }

        tracing::info!(
            "Graded {}/{} student(s), {} report(s) written",
            summary.graded(),
            summary.records.len(),
            summary.reports_written()
        );
        Ok(summary)
    }

    /// Runs every stage for the student in `dir`, keeping `stage` on the
    /// step in progress.
    async fn grade_student(
        &self,
        workspace: &Workspace,
        dir: &Path,
        record: &mut StudentRecord,
        stage: &mut Stage,
    ) -> Result<()> {
        *stage = Stage::Setup;
        let exercise = self.config.exercise_name();
        let submission = dir.join(exercise);
        if !submission.is_file() {
            bail!("No submission {} in {}", exercise, dir.display());
        }
        let staged = workspace.stage(&submission, exercise)?;

        *stage = Stage::LoadModule;
        let unit = load_submission(&staged, &record.folder)?;
        record.id = unit.id().to_string();
        record.mail = unit.mail().map(str::to_string);

        *stage = Stage::RunTests;
        let mut timing = RunTiming::starting_now();
        let started = Instant::now();
        let mut recorder = ResultRecorder::new(&self.registry);
        self.driver.run(workspace, &unit, &mut recorder).await?;
        let results = recorder.finish(&self.definition);
        timing.elapsed = started.elapsed();

        *stage = Stage::RenderReport;
        // Total points are checked up front, so zero here means every test
        // was skipped.
        let grade = match compute_grade(&results, self.config.max_grade()) {
            Err(GradingError::NoPoints) => {
                bail!("{} (every test was skipped)", GradingError::NoPoints)
            }
            graded => graded?,
        };
        tracing::info!("[{}] {grade}", record.id);

        let mut args = TemplateArgs::new();
        args.insert("id".into(), record.id.clone());
        args.insert("mail".into(), record.mail.clone().unwrap_or_default());
        let report_name = match self.config.report_name() {
            Some(base) => format!("{base}_{}", record.id),
            None => format!("{STUDENT_REPORT_PREFIX}{}", record.id),
        };
        let renderer = self.renderer.named(report_name);
        record.reports = renderer.generate(&results, &grade, &timing, &args)?;
        renderer.append_ledger(
            &record.id,
            record.mail.as_deref().unwrap_or_default(),
            &self.definition.test_ids(),
            &results,
            &grade,
        )?;
        record.grade = Some(grade);

        *stage = Stage::SendEmail;
        if let (Some(from), Some(to), Some(mailer)) =
            (self.config.sending_email(), record.mail.as_deref(), self.mailer.as_deref())
        {
            let label = self.config.exercise_label();
            let sent = match compose_report_mail(from, to, label, &record.reports) {
                Ok(message) => mailer.send(from, to, message).await,
                Err(e) => Err(e),
            };
            record.mail_status = match sent {
                Ok(()) => {
                    tracing::info!("[{}] Report mailed to {to}", record.id);
                    MailStatus::Sent
                }
                Err(e) => {
                    tracing::error!("[{}] Could not mail the report to {to}: {e}", record.id);
                    MailStatus::Failed(e.to_string())
                }
            };
        }

        Ok(())
    }
}

/// Student subfolders of `input`, sorted by name.
fn student_folders(input: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(input)
        .with_context(|| format!("Could not list input folder {}", input.display()))?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Could not list {}", input.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        folders.push((name, path));
    }
    folders.sort();
    Ok(folders)
}
