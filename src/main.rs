#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # pointgrade
//!
//! Grades a folder of student submissions against a Python `unittest`
//! correction whose tests carry `@point(N)` weights.
//!
//! `pointgrade grade --input students --exercise exercise.py --correction
//! exercise_test.py` writes one HTML report per student and a `rapport.csv`
//! ledger into `out/`. Set `POINTGRADE_SMTP_HOST` and pass `--from` to mail
//! every student their report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use pointgrade::{
    CorrectionConfig, CorrectionOrchestrator,
    config::{DEFAULT_OUTPUT_DIR, DEFAULT_REPORT_TITLE, RunSettings, SmtpEnv},
    driver::UnittestDriver,
    export::{AVAILABLE_POINTS_FILE, TEST_FILE_PATTERN, export_available_points},
    grade::DEFAULT_MAX_GRADE,
    mail::SmtpTransport,
    python::{scan_correction, util::python_path},
    workspace::WORKING_FOLDER,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Arguments of `pointgrade grade`.
#[derive(Debug, Clone)]
struct GradeArgs {
    /// Folder with one subfolder per student.
    input:        PathBuf,
    /// Submission file name inside each student folder.
    exercise:     String,
    /// Correction module.
    correction:   PathBuf,
    /// Sender address for report mails.
    from:         Option<String>,
    /// Output directory.
    output:       PathBuf,
    /// Report title.
    title:        String,
    /// Base name of report files.
    name:         Option<String>,
    /// Top of the grade scale.
    max_grade:    f64,
    /// Custom report template.
    template:     Option<PathBuf>,
    /// One report per suite.
    per_suite:    bool,
    /// No timestamp in report file names.
    no_timestamp: bool,
    /// Scratch workspace.
    workspace:    PathBuf,
}

/// Arguments of `pointgrade points`.
#[derive(Debug, Clone)]
struct PointsArgs {
    /// Directory searched for test modules.
    root:    PathBuf,
    /// File name pattern of test modules.
    pattern: String,
    /// JSON file written.
    output:  PathBuf,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade a batch of students
    Grade(GradeArgs),
    /// Export the available points
    Points(PointsArgs),
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// Debug logging.
    verbose: bool,
    /// Command to run.
    cmd:     Cmd,
}

/// Parse the command line arguments and return the `Options`
fn options() -> Options {
    /// parses the arguments of `grade`
    fn grade_args() -> impl Parser<GradeArgs> {
        let input = long("input")
            .short('i')
            .help("Folder holding one subfolder per student")
            .argument::<PathBuf>("DIR");
        let exercise = long("exercise")
            .short('e')
            .help("Submission file name inside each student folder")
            .argument::<String>("FILE");
        let correction = long("correction")
            .short('c')
            .help("Correction module with the point-weighted tests")
            .argument::<PathBuf>("FILE");
        let from = long("from")
            .help("Sender address; reports are mailed only when set")
            .argument::<String>("ADDR")
            .optional();
        let output = long("output")
            .short('o')
            .help("Directory reports and the ledger are written to")
            .argument::<PathBuf>("DIR")
            .fallback(PathBuf::from(DEFAULT_OUTPUT_DIR));
        let title = long("title")
            .help("Report title")
            .argument::<String>("TEXT")
            .fallback(DEFAULT_REPORT_TITLE.to_string());
        let name = long("name")
            .help("Base name of report files")
            .argument::<String>("NAME")
            .optional();
        let max_grade = long("max-grade")
            .help("Top of the grade scale")
            .argument::<f64>("N")
            .fallback(DEFAULT_MAX_GRADE);
        let template = long("template")
            .help("Custom report template")
            .argument::<PathBuf>("PATH")
            .optional();
        let per_suite = long("per-suite")
            .help("Write one report per suite instead of one per student")
            .switch();
        let no_timestamp = long("no-timestamp")
            .help("Do not add the start time to report file names")
            .switch();
        let workspace = long("workspace")
            .help("Scratch directory submissions are graded in")
            .argument::<PathBuf>("DIR")
            .fallback(PathBuf::from(WORKING_FOLDER));

        construct!(GradeArgs {
            input,
            exercise,
            correction,
            from,
            output,
            title,
            name,
            max_grade,
            template,
            per_suite,
            no_timestamp,
            workspace
        })
    }

    /// parses the arguments of `points`
    fn points_args() -> impl Parser<PointsArgs> {
        let root = long("root")
            .help("Directory searched for test modules")
            .argument::<PathBuf>("DIR")
            .fallback(PathBuf::from("."));
        let pattern = long("pattern")
            .help("File name pattern of test modules")
            .argument::<String>("GLOB")
            .fallback(TEST_FILE_PATTERN.to_string());
        let output = long("output")
            .short('o')
            .help("JSON file to write")
            .argument::<PathBuf>("FILE")
            .fallback(PathBuf::from(AVAILABLE_POINTS_FILE));

        construct!(PointsArgs {
            root,
            pattern,
            output
        })
    }

    let verbose = short('v')
        .long("verbose")
        .help("Print debug logs")
        .switch();

    let grade = grade_args()
        .to_options()
        .command("grade")
        .help("Grade every student folder and write their reports")
        .map(Cmd::Grade);

    let points = points_args()
        .to_options()
        .command("points")
        .help("Write the points every test is worth as JSON")
        .map(Cmd::Points);

    let cmd = construct!([grade, points]);

    construct!(Options { verbose, cmd })
        .to_options()
        .descr("Point-weighted autograder")
        .run()
}

/// Grades a batch and prints its summary.
async fn grade(args: GradeArgs) -> Result<()> {
    let settings = RunSettings::from_env();
    let definition = scan_correction(&args.correction)?;
    let module = args
        .correction
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid correction path {}", args.correction.display()))?
        .to_string();
    let python = python_path(settings.python.as_deref())?;
    tracing::debug!("Using {}", python.display());
    let driver = UnittestDriver::new(python, module).with_timeout(settings.test_timeout);

    let config = CorrectionConfig::builder()
        .input_folder(args.input)
        .exercise_name(args.exercise)
        .exercise_correction(args.correction)
        .maybe_sending_email(args.from)
        .output_dir(args.output)
        .report_title(args.title)
        .maybe_report_name(args.name)
        .max_grade(args.max_grade)
        .maybe_template(args.template)
        .combine_reports(!args.per_suite)
        .add_timestamp(!args.no_timestamp)
        .workspace_dir(args.workspace)
        .build();
    let wants_mail = config.sending_email().is_some();

    let mut orchestrator = CorrectionOrchestrator::new(config, definition, driver)?;
    match SmtpEnv::from_env() {
        Some(env) => match SmtpTransport::from_env(&env) {
            Ok(transport) => orchestrator = orchestrator.with_mailer(transport),
            Err(e) => tracing::warn!("Mail disabled: {e}"),
        },
        None if wants_mail => {
            tracing::warn!("--from was given but POINTGRADE_SMTP_HOST is unset, no mail is sent")
        }
        None => {}
    }

    let summary = orchestrator.run_corrections().await?;
    println!("{}", summary.table());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let level = if opts.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt)
        .with(LevelFilter::from_level(level))
        .init();

    match opts.cmd {
        Cmd::Grade(args) => grade(args).await?,
        Cmd::Points(args) => {
            let points = export_available_points(&args.root, &args.pattern, &args.output)?;
            println!("{} test(s) written to {}", points.len(), args.output.display());
        }
    }

    Ok(())
}
