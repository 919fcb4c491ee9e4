#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Python corrections and submissions, read through tree-sitter.

/// Loading submissions as fresh code units.
pub mod loader;
/// Tree-sitter parser wrapper.
pub mod parser;
/// Tree-sitter queries.
pub mod queries;
/// `@point(N)` scanning of correction files.
pub mod scan;
/// Toolchain discovery.
pub mod util;

pub use loader::{LoadedUnit, load_submission};
pub use parser::Parser;
pub use scan::{scan_correction, scan_correction_as, scan_source};

/// Strips string prefixes and quotes from a Python literal; anything that is
/// not a string literal is returned unchanged.
pub fn literal_value(text: &str) -> &str {
    let body = text.trim_start_matches(|c: char| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B'));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len()
            && body.starts_with(quote)
            && body.ends_with(quote)
        {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    text
}
