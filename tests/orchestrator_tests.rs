//! End-to-end tests of a grading batch, run in-process with native cases.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use lettre::Message;
use pointgrade::{
    CorrectionConfig, CorrectionOrchestrator, GradingError, MailError, SuiteDefinition, SuiteSpec,
    TestId,
    driver::{CaseFailure, NativeDriver, TestDriver},
    mail::MailTransport,
    orchestrator::{BatchSummary, MailStatus, Stage, StudentRecord},
    outcome::ResultObserver,
    points::MAX_POINTS,
    python::LoadedUnit,
    report::ledger::LEDGER_FILE_NAME,
    workspace::Workspace,
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

const SENDER: &str = "grader@example.com";

/// A batch laid out on disk.
struct Batch {
    root:  PathBuf,
    input: PathBuf,
    out:   PathBuf,
    work:  PathBuf,
}

impl Batch {
    /// Creates the input folder with one subfolder per student; `None`
    /// leaves the folder without a submission.
    fn new(students: &[(&str, Option<&str>)]) -> Self {
        let root = std::env::temp_dir().join(format!("pointgrade-batch-{}", Uuid::new_v4()));
        let input = root.join("students");
        std::fs::create_dir_all(&input).unwrap();
        for (folder, source) in students {
            let dir = input.join(folder);
            std::fs::create_dir_all(&dir).unwrap();
            if let Some(source) = source {
                std::fs::write(dir.join("exercise.py"), source).unwrap();
            }
        }
        std::fs::write(input.join("notes.txt"), "not a student").unwrap();
        std::fs::write(root.join("correction.py"), "import unittest\n").unwrap();

        Self {
            out: root.join("out"),
            work: root.join("work"),
            input,
            root,
        }
    }

    fn config(&self) -> CorrectionConfig {
        CorrectionConfig::builder()
            .input_folder(self.input.clone())
            .exercise_name("exercise.py")
            .exercise_correction(self.root.join("correction.py"))
            .sending_email(SENDER)
            .output_dir(self.out.clone())
            .workspace_dir(self.work.clone())
            .add_timestamp(false)
            .build()
    }

    fn report(&self, id: &str) -> PathBuf {
        self.out.join(format!("Report_Student_{id}.html"))
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

fn calc_definition() -> SuiteDefinition {
    SuiteDefinition::default().with_suite(
        SuiteSpec::new("correction", "TestCalc")
            .points(2)
            .test("test_add", 3)
            .test("test_div", 7),
    )
}

fn calc_id(method: &str) -> TestId {
    TestId::new("correction", "TestCalc", method)
}

/// `test_add` wants `ANSWER = 42`; `test_div` raises when `CRASH` is set.
fn calc_driver() -> NativeDriver {
    NativeDriver::new()
        .case(calc_id("test_add"), |unit| match unit.attribute("ANSWER") {
            Some("42") => Ok(()),
            _ => Err(CaseFailure::Failed("wrong answer".into())),
        })
        .case(calc_id("test_div"), |unit| {
            if unit.attribute("CRASH").is_some() {
                panic!("ZeroDivisionError: division by zero");
            }
            Ok(())
        })
}

/// Keeps every message it is asked to send.
#[derive(Clone, Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<(String, String, String)>>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, from: &str, to: &str, message: Message) -> Result<(), MailError> {
        let body = String::from_utf8_lossy(&message.formatted()).into_owned();
        self.sent
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string(), body));
        Ok(())
    }
}

/// Refuses every message.
struct DownTransport;

#[async_trait]
impl MailTransport for DownTransport {
    async fn send(&self, _from: &str, _to: &str, _message: Message) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".into()))
    }
}

const ALICE: &str = "ID = 'alice'\nMAIL = 'alice@example.com'\nANSWER = 42\n";
const BOB: &str = "ID = 'bob'\nANSWER = 41\n";
const ERIN: &str = "ID = 'erin'\nMAIL = 'erin@example.com'\nCRASH = True\n";

#[tokio::test]
async fn one_student_failing_does_not_stop_the_batch() {
    let batch = Batch::new(&[
        ("alice", Some(ALICE)),
        ("bob", Some(BOB)),
        ("carol", None),
        ("dave", Some("def broken(:\n    pass\n")),
        ("erin", Some(ERIN)),
    ]);
    let mailer = RecordingTransport::default();
    let orchestrator = CorrectionOrchestrator::new(batch.config(), calc_definition(), calc_driver())
        .unwrap()
        .with_mailer(mailer.clone());

    let summary = orchestrator.run_corrections().await.unwrap();

    let folders: Vec<&str> = summary.records.iter().map(|r| r.folder.as_str()).collect();
    assert_eq!(folders, vec!["alice", "bob", "carol", "dave", "erin"]);

    // everyone but the Setup and LoadModule failures gets a report
    assert_eq!(summary.reports_written(), 3);
    for id in ["alice", "bob", "erin"] {
        assert!(batch.report(id).is_file(), "missing report for {id}");
    }
    assert_eq!(summary.record("carol").unwrap().failed_stage, Some(Stage::Setup));
    assert_eq!(summary.record("dave").unwrap().failed_stage, Some(Stage::LoadModule));

    let grades: Vec<(&str, f64)> = summary
        .records
        .iter()
        .filter_map(|r| r.grade.map(|g| (r.id.as_str(), g.grade)))
        .collect();
    assert_eq!(grades, vec![("alice", 20.0), ("bob", 12.9), ("erin", 0.0)]);

    let erin_report = std::fs::read_to_string(batch.report("erin")).unwrap();
    assert!(erin_report.contains("ZeroDivisionError: division by zero"));

    let ledger = std::fs::read_to_string(batch.out.join(LEDGER_FILE_NAME)).unwrap();
    let rows: Vec<&str> = ledger.lines().collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[1].starts_with("alice,alice@example.com,20.0,14"));
    assert!(rows[2].starts_with("bob,,12.9,9"));
    assert!(rows[3].starts_with("erin,erin@example.com,0.0,0"));

    // bob declares no MAIL
    let sent = mailer.sent.lock().unwrap();
    let recipients: Vec<&str> = sent.iter().map(|(_, to, _)| to.as_str()).collect();
    assert_eq!(recipients, vec!["alice@example.com", "erin@example.com"]);
    let (from, _, message) = &sent[0];
    assert_eq!(from, SENDER);
    assert!(message.contains("Subject: Automatic correction exercise"));
    assert!(message.contains("Report_Student_alice.html"));
    assert_eq!(summary.record("alice").unwrap().mail_status, MailStatus::Sent);
    assert_eq!(summary.record("bob").unwrap().mail_status, MailStatus::NotSent);

    assert!(!batch.work.exists());
}

/// Fails the whole run for one student, or with a configuration error.
struct BrokenDriver {
    inner:         NativeDriver,
    broken_id:     &'static str,
    configuration: bool,
}

#[async_trait]
impl TestDriver for BrokenDriver {
    async fn run(
        &self,
        workspace: &Workspace,
        unit: &LoadedUnit,
        observer: &mut dyn ResultObserver,
    ) -> Result<()> {
        if unit.id() != self.broken_id {
            return self.inner.run(workspace, unit, observer).await;
        }
        if self.configuration {
            return Err(GradingError::MalformedTestId("TestCalc".into()).into());
        }
        Err(anyhow!("interpreter exited with signal 9"))
    }
}

#[tokio::test]
async fn driver_failures_only_cost_that_student() {
    let batch = Batch::new(&[("alice", Some(ALICE)), ("bob", Some(BOB))]);
    let driver = BrokenDriver {
        inner:         calc_driver(),
        broken_id:     "alice",
        configuration: false,
    };
    let orchestrator =
        CorrectionOrchestrator::new(batch.config(), calc_definition(), driver).unwrap();

    let summary = orchestrator.run_corrections().await.unwrap();
    assert_eq!(summary.record("alice").unwrap().failed_stage, Some(Stage::RunTests));
    assert!(summary.record("alice").unwrap().grade.is_none());
    assert!(!batch.report("alice").exists());
    assert!(batch.report("bob").is_file());
    assert_eq!(summary.graded(), 1);
}

#[tokio::test]
async fn configuration_errors_abort_the_batch() {
    let batch = Batch::new(&[("alice", Some(ALICE)), ("bob", Some(BOB))]);
    let driver = BrokenDriver {
        inner:         calc_driver(),
        broken_id:     "alice",
        configuration: true,
    };
    let orchestrator =
        CorrectionOrchestrator::new(batch.config(), calc_definition(), driver).unwrap();

    let err = orchestrator.run_corrections().await.unwrap_err();
    assert!(matches!(GradingError::find_in(&err), Some(GradingError::MalformedTestId(_))));
    assert!(!batch.report("bob").exists());
    assert!(!batch.work.exists());
}

#[tokio::test]
async fn mail_failures_keep_the_report() {
    let batch = Batch::new(&[("alice", Some(ALICE))]);
    let orchestrator = CorrectionOrchestrator::new(batch.config(), calc_definition(), calc_driver())
        .unwrap()
        .with_mailer(DownTransport);

    let summary = orchestrator.run_corrections().await.unwrap();
    let alice = summary.record("alice").unwrap();
    assert!(matches!(alice.mail_status, MailStatus::Failed(_)));
    assert_eq!(alice.failed_stage, None);
    assert!(batch.report("alice").is_file());
}

#[test]
fn a_suite_worth_nothing_is_refused() {
    let batch = Batch::new(&[]);
    let definition = SuiteDefinition::default()
        .with_suite(SuiteSpec::new("correction", "TestCalc").unweighted("test_add"));

    let err = CorrectionOrchestrator::new(batch.config(), definition, calc_driver()).unwrap_err();
    assert_eq!(err, GradingError::NoPoints);
}

#[test]
fn a_suite_worth_too_much_is_refused() {
    let batch = Batch::new(&[]);
    let suite = (0..4300).fold(SuiteSpec::new("correction", "TestHuge"), |suite, n| {
        suite.test(format!("test_{n}"), i64::from(MAX_POINTS))
    });
    let definition = SuiteDefinition::default().with_suite(suite);

    let err = CorrectionOrchestrator::new(batch.config(), definition, calc_driver()).unwrap_err();
    assert_eq!(err, GradingError::TooManyPoints(4300 * u64::from(MAX_POINTS)));
}

#[tokio::test]
async fn an_occupied_workspace_is_left_alone() {
    let batch = Batch::new(&[("alice", Some(ALICE))]);
    std::fs::create_dir_all(&batch.work).unwrap();
    std::fs::write(batch.work.join("precious.txt"), "keep me").unwrap();

    let orchestrator =
        CorrectionOrchestrator::new(batch.config(), calc_definition(), calc_driver()).unwrap();
    assert!(orchestrator.run_corrections().await.is_err());
    assert!(batch.work.join("precious.txt").exists());
    assert!(!batch.report("alice").exists());
}

#[test]
fn summary_table_lists_every_student() {
    let record = |folder: &str, stage: Option<Stage>| StudentRecord {
        folder:       folder.into(),
        id:           folder.into(),
        mail:         None,
        grade:        None,
        reports:      Vec::new(),
        mail_status:  MailStatus::NotSent,
        failed_stage: stage,
    };
    let summary = BatchSummary {
        records: vec![record("alice", None), record("bob", Some(Stage::LoadModule))],
    };

    let table = summary.table();
    assert!(table.contains("alice"));
    assert!(table.contains("failed: load module"));
}
