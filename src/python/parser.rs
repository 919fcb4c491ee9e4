#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-sitter parser wrapper for Python source code.

use std::fmt::Formatter;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator, Tree};

use crate::Dict;

/// A struct that wraps a tree-sitter parse tree and its source code.
#[derive(Clone)]
pub struct Parser {
    /// The source code being parsed.
    code: String,
    /// The parse tree.
    tree: Tree,
    /// The tree-sitter Python grammar language.
    lang: tree_sitter::Language,
}

/// Returns the compiled tree-sitter Python language.
fn python_language() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("lines", &self.line_count())
            .finish_non_exhaustive()
    }
}

impl Parser {
    /// Parses `source_code`.
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language = python_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load Python grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing Python code"))?;

        Ok(Self {
            code: source_code,
            tree,
            lang: language,
        })
    }

    /// A getter for parser's source code.
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the parse tree's root node.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> Result<&str> {
        node.utf8_text(self.code.as_bytes())
            .context("Cannot map node to source text")
    }

    /// 1-based line of the first syntax error, if any.
    pub fn first_error_line(&self) -> Option<usize> {
        let root = self.root_node();
        if !root.has_error() {
            return None;
        }

        let mut cursor = root.walk();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                return Some(node.start_position().row + 1);
            }
            let mut children: Vec<_> = node.children(&mut cursor).collect();
            children.reverse();
            stack.extend(children.into_iter().filter(|c| c.has_error()));
        }
        Some(root.start_position().row + 1)
    }

    /// Applies a tree sitter query and returns the result as a collection of
    /// HashMaps.
    ///
    /// * `q`: the tree-sitter query to be applied
    pub fn query(&self, q: &str) -> Result<Vec<Dict>> {
        let mut results = vec![];

        let query = Query::new(&self.lang, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, self.tree.root_node(), self.code.as_bytes());
        let mut capture_indices = Vec::new();

        for name in query.capture_names() {
            let index = query
                .capture_index_for_name(name)
                .ok_or_else(|| anyhow!("Capture name {name} has no index associated."))?;
            capture_indices.push((index, name.to_string()));
        }

        while let Some(m) = matches.next() {
            let mut result = Dict::new();

            for (index, name) in &capture_indices {
                let value = match m.captures.iter().find(|c| c.index == *index) {
                    Some(v) => v,
                    None => continue,
                };

                let value = value
                    .node
                    .utf8_text(self.code.as_bytes())
                    .with_context(|| {
                        format!(
                            "Cannot match query result indices with source code for capture name: \
                             {name}."
                        )
                    })?;

                result.insert(name.clone(), value.to_string());
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Returns the total number of lines in the source code.
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}
