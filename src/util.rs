#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Finds files under `root_dir` whose name matches `file_pattern`, at any
/// depth, sorted by path.
///
/// * `file_pattern`: a glob for the file name, such as `*test.py`
/// * `root_dir`: the root directory where search starts
pub fn find_files(file_pattern: &str, root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern = root_dir.to_path_buf();
    pattern.push("**");
    pattern.push(file_pattern);
    let pattern = pattern
        .to_str()
        .context("Could not convert root_dir to string")?
        .to_string();

    let mut files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Could not create glob {pattern}"))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}
