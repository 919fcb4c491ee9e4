//! Tree-sitter query strings used when loading submissions.

/// Tree-sitter query that returns module-level assignments.
/// * `name`: assigned identifier
/// * `value`: right-hand side expression
pub const MODULE_ASSIGNMENT_QUERY: &str = include_str!("module_assignment.scm");
