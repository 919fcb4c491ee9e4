#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Locating the Python toolchain.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use which::which;

/// Discovers the Python interpreter.
///
/// `preferred` (usually `POINTGRADE_PYTHON`) wins when set; otherwise
/// `python3` and then `python` are looked up on `PATH`, then common install
/// locations are checked.
pub fn python_path(preferred: Option<&str>) -> Result<PathBuf> {
    if let Some(preferred) = preferred {
        let candidate = Path::new(preferred);
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        return which(preferred)
            .map_err(|e| anyhow!("Configured Python interpreter `{preferred}` not found: {e}"));
    }

    for name in ["python3", "python"] {
        if let Ok(path) = which(name) {
            return Ok(path);
        }
    }

    let common_paths = [
        "/usr/bin/python3",
        "/usr/local/bin/python3",
        "/opt/homebrew/bin/python3",
    ];

    for path in common_paths {
        if Path::new(path).exists() {
            return Ok(PathBuf::from(path));
        }
    }

    Err(anyhow!(
        "Could not find Python interpreter. Please ensure python3 is installed or set \
         POINTGRADE_PYTHON."
    ))
}
