#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Writing the points every discovered test is worth.

use std::{
    collections::BTreeMap,
    path::{Component, Path},
};

use anyhow::{Context, Result};

use crate::{points::PointRegistry, python::scan_correction_as, util::find_files};

/// Default output file of the export.
pub const AVAILABLE_POINTS_FILE: &str = ".available_points.json";

/// Default file pattern of test modules.
pub const TEST_FILE_PATTERN: &str = "*test.py";

/// Dotted module name of `file` relative to `root`: `pkg/sub/a_test.py`
/// becomes `pkg.sub.a_test`.
fn module_name(root: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(root).unwrap_or(file).with_extension("");
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        anyhow::bail!("Cannot derive a module name from {}", file.display());
    }
    Ok(parts.join("."))
}

/// Collects `module.Class.method -> points` for every test in files under
/// `root` matching `pattern`.
pub fn available_points(root: &Path, pattern: &str) -> Result<BTreeMap<String, u32>> {
    let mut points = BTreeMap::new();
    for file in find_files(pattern, root)? {
        let module = module_name(root, &file)?;
        let definition = scan_correction_as(&file, &module)?;
        let mut registry = PointRegistry::new();
        definition.register_points(&mut registry)?;

        for id in definition.test_ids() {
            points.insert(id.qualified(), registry.lookup(&id));
        }
        tracing::debug!("Scanned {} as {module}", file.display());
    }
    Ok(points)
}

/// Runs [`available_points`] and writes the map to `output` as JSON.
pub fn export_available_points(
    root: &Path,
    pattern: &str,
    output: &Path,
) -> Result<BTreeMap<String, u32>> {
    let points = available_points(root, pattern)?;
    let json = serde_json::to_string(&points).context("Could not serialize available points")?;
    std::fs::write(output, json)
        .with_context(|| format!("Could not write {}", output.display()))?;
    tracing::info!("Wrote {} test(s) to {}", points.len(), output.display());
    Ok(points)
}
