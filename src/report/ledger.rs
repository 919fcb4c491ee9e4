#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fs::OpenOptions, path::Path};

use anyhow::{Context, Result, bail};

use crate::{grade::GradeSummary, outcome::GroupedResults, types::TestId};

/// File name of the ledger inside the output directory.
pub const LEDGER_FILE_NAME: &str = "rapport.csv";

/// Leading ledger columns, before one column per test.
pub const LEDGER_FIXED_HEADERS: [&str; 4] = ["id", "mail", "note", "raw_grade"];

/// `id, mail, note, raw_grade`, then the short name of each declared test
/// in declaration order.
pub fn ledger_headers(tests: &[TestId]) -> Vec<String> {
    LEDGER_FIXED_HEADERS
        .iter()
        .map(ToString::to_string)
        .chain(tests.iter().map(|t| t.short_name().to_string()))
        .collect()
}

/// The row matching [`ledger_headers`] for one student: the rescaled grade,
/// the raw points, then the points awarded for each of `tests`. Outcomes of
/// tests outside `tests` are left out.
pub fn ledger_row(
    id: &str,
    mail: &str,
    tests: &[TestId],
    results: &GroupedResults,
    grade: &GradeSummary,
) -> Vec<String> {
    [
        id.to_string(),
        mail.to_string(),
        format!("{:.1}", grade.grade),
        grade.raw_points.to_string(),
    ]
    .into_iter()
    .chain(tests.iter().map(|t| {
        results
            .outcome(t)
            .map_or(0, |o| o.points_awarded())
            .to_string()
    }))
    .collect()
}

/// Number of columns in the header of an existing ledger.
fn existing_width(path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Could not read ledger {}", path.display()))?;
    let mut header = csv::StringRecord::new();
    reader
        .read_record(&mut header)
        .with_context(|| format!("Could not read ledger header of {}", path.display()))?;
    Ok(header.len())
}

/// Appends `row` to the CSV at `path`, writing `headers` first only when the
/// file does not exist yet.
///
/// A row whose width differs from the header already on disk is refused.
pub fn append_csv(path: &Path, headers: &[String], row: &[String]) -> Result<()> {
    if row.len() != headers.len() {
        bail!(
            "Ledger row has {} columns but the header has {}",
            row.len(),
            headers.len()
        );
    }
    let is_new = !path.exists();
    if !is_new {
        let width = existing_width(path)?;
        if width != row.len() {
            bail!(
                "Ledger {} has {width} columns, refusing a row with {}",
                path.display(),
                row.len()
            );
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open ledger {}", path.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    if is_new {
        writer
            .write_record(headers)
            .with_context(|| format!("Could not write ledger header to {}", path.display()))?;
    }
    writer
        .write_record(row)
        .with_context(|| format!("Could not append to ledger {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Could not flush ledger {}", path.display()))?;
    Ok(())
}
