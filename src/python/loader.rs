#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Loading one student's submission as a fresh code unit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use super::{literal_value, parser::Parser, queries::MODULE_ASSIGNMENT_QUERY};
use crate::Dict;

/// Module attribute holding the student's identifier.
pub const ID_ATTRIBUTE: &str = "ID";

/// Module attribute holding the student's mail address.
pub const MAIL_ATTRIBUTE: &str = "MAIL";

/// A student submission, parsed and ready to be graded.
///
/// Every call to [`load_submission`] produces a new unit with its own
/// namespace token; units are never cached or reused between students.
#[derive(Debug, Clone)]
pub struct LoadedUnit {
    /// Name of the folder the submission came from.
    folder:      String,
    /// Importable module name (the file stem).
    module_name: String,
    /// Unique namespace token for this load.
    namespace:   String,
    /// Where the submission was loaded from.
    path:        PathBuf,
    /// Student identifier.
    id:          String,
    /// Student mail address, if declared.
    mail:        Option<String>,
    /// Literal module-level assignments, by name.
    attributes:  Dict,
    /// Parsed source.
    parser:      Parser,
}

impl LoadedUnit {
    /// Folder the submission came from.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Importable module name.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Namespace token unique to this load.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path the unit was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Student identifier; the folder name when the module declares none.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Student mail address.
    pub fn mail(&self) -> Option<&str> {
        self.mail.as_deref()
    }

    /// Value of a module-level assignment, with string quotes removed.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Parsed source of the submission.
    pub fn parser(&self) -> &Parser {
        &self.parser
    }
}

/// Loads the submission at `path`, taken from the student folder `folder`.
///
/// Fails when the file cannot be read or does not parse.
pub fn load_submission(path: &Path, folder: &str) -> Result<LoadedUnit> {
    let module_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Cannot derive a module name from {}", path.display()))?
        .to_string();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read submission {}", path.display()))?;

    let parser = Parser::new(source)?;
    if let Some(line) = parser.first_error_line() {
        bail!(
            "Submission {} does not parse (syntax error near line {line})",
            path.display()
        );
    }

    let mut attributes = Dict::new();
    for assignment in parser.query(MODULE_ASSIGNMENT_QUERY)? {
        if let (Some(name), Some(value)) = (assignment.get("name"), assignment.get("value")) {
            attributes.insert(name.clone(), literal_value(value).to_string());
        }
    }

    let id = match attributes.get(ID_ATTRIBUTE) {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            tracing::warn!("{} declares no {ID_ATTRIBUTE}, using folder name", path.display());
            folder.to_string()
        }
    };
    let mail = attributes
        .get(MAIL_ATTRIBUTE)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let namespace = format!("{module_name}_{}", Uuid::new_v4().simple());
    tracing::info!("Loaded module {module_name} for {id} as {namespace}");

    Ok(LoadedUnit {
        folder: folder.to_string(),
        module_name,
        namespace,
        path: path.to_path_buf(),
        id,
        mail,
        attributes,
        parser,
    })
}
