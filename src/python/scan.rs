#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Reads `@point(N)` declarations out of Python correction files.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tree_sitter::Node;

use super::parser::Parser;
use crate::{
    error::GradingError,
    suite::{SuiteDefinition, SuiteSpec},
};

/// Name of the decorator that carries point values.
const POINT_DECORATOR: &str = "point";

/// Prefix unittest uses to collect test methods.
const TEST_METHOD_PREFIX: &str = "test";

/// Scans a correction file, using its file stem as the module name.
pub fn scan_correction(path: &Path) -> Result<SuiteDefinition> {
    let module = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Cannot derive a module name from {}", path.display()))?;
    scan_correction_as(path, module)
}

/// Scans a correction file under an explicit (possibly dotted) module name.
pub fn scan_correction_as(path: &Path, module: &str) -> Result<SuiteDefinition> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read correction file {}", path.display()))?;
    scan_source(module, source).with_context(|| format!("While scanning {}", path.display()))
}

/// Builds the suite definition declared by `source`.
///
/// Every top-level class with at least one `test*` method is a suite.
pub fn scan_source(module: &str, source: String) -> Result<SuiteDefinition> {
    let parser = Parser::new(source)?;
    if let Some(line) = parser.first_error_line() {
        bail!("Syntax error in correction module `{module}` near line {line}");
    }

    let mut definition = SuiteDefinition::default();
    let root = parser.root_node();
    let mut cursor = root.walk();

    for item in root.named_children(&mut cursor) {
        let Some((decorators, class)) = unwrap_decorated(item, "class_definition") else {
            continue;
        };
        let name = field_text(&parser, class, "name")?;
        let suite_key = format!("{module}.{name}");

        let mut suite = SuiteSpec::new(module, name);
        if let Some(points) = point_value(&parser, &decorators, &suite_key)? {
            suite = suite.points(points);
        }

        let Some(body) = class.child_by_field_name("body") else {
            continue;
        };
        let mut body_cursor = body.walk();
        for member in body.named_children(&mut body_cursor) {
            let Some((decorators, function)) = unwrap_decorated(member, "function_definition")
            else {
                continue;
            };
            let method = field_text(&parser, function, "name")?;
            if !method.starts_with(TEST_METHOD_PREFIX) {
                continue;
            }
            let test_key = format!("{suite_key}.{method}");
            suite = match point_value(&parser, &decorators, &test_key)? {
                Some(points) => suite.test(method, points),
                None => suite.unweighted(method),
            };
        }

        if suite.tests.is_empty() {
            tracing::debug!("Skipping class {suite_key}: no test methods");
            continue;
        }
        definition = definition.with_suite(suite);
    }

    Ok(definition)
}

/// Splits an optional `decorated_definition` into its decorators and the
/// wrapped definition, if the definition is of `kind`.
fn unwrap_decorated<'t>(node: Node<'t>, kind: &str) -> Option<(Vec<Node<'t>>, Node<'t>)> {
    if node.kind() == kind {
        return Some((Vec::new(), node));
    }
    if node.kind() != "decorated_definition" {
        return None;
    }

    let definition = node.child_by_field_name("definition")?;
    if definition.kind() != kind {
        return None;
    }
    let mut cursor = node.walk();
    let decorators = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .collect();
    Some((decorators, definition))
}

/// Text of a named field, as an owned string.
fn field_text(parser: &Parser, node: Node<'_>, field: &str) -> Result<String> {
    let child = node
        .child_by_field_name(field)
        .with_context(|| format!("`{}` node without a `{field}`", node.kind()))?;
    Ok(parser.text(child)?.to_string())
}

/// Finds the `@point(...)` decorator among `decorators` and coerces its
/// argument.
fn point_value(parser: &Parser, decorators: &[Node<'_>], target: &str) -> Result<Option<i64>> {
    for decorator in decorators {
        let Some(expr) = decorator.named_child(0) else {
            continue;
        };

        match expr.kind() {
            "call" => {
                let Some(function) = expr.child_by_field_name("function") else {
                    continue;
                };
                if !is_point_callee(parser.text(function)?) {
                    continue;
                }
                let argument = expr
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0));
                return coerce_points(parser, argument, target)
                    .map(Some)
                    .map_err(Into::into);
            }
            "identifier" | "attribute" if is_point_callee(parser.text(expr)?) => {
                return Err(GradingError::MissingPoints {
                    target: target.to_string(),
                }
                .into());
            }
            _ => {}
        }
    }
    Ok(None)
}

/// `point` or any `something.point`.
fn is_point_callee(text: &str) -> bool {
    text.rsplit('.').next() == Some(POINT_DECORATOR)
}

/// Reads a decorator argument the way Python's `int()` would.
fn coerce_points(
    parser: &Parser,
    argument: Option<Node<'_>>,
    target: &str,
) -> Result<i64, GradingError> {
    let Some(argument) = argument else {
        return Err(GradingError::MissingPoints {
            target: target.to_string(),
        });
    };
    let text = parser.text(argument).unwrap_or_default();
    let invalid = || GradingError::InvalidPoints {
        target: target.to_string(),
        value:  text.to_string(),
    };

    let digits: String = text.chars().filter(|c| *c != '_' && !c.is_whitespace()).collect();
    match argument.kind() {
        "integer" | "unary_operator" => digits.parse::<i64>().map_err(|_| invalid()),
        "float" => {
            let value = digits.parse::<f64>().map_err(|_| invalid())?;
            if value.is_finite() {
                Ok(value.trunc() as i64)
            } else {
                Err(invalid())
            }
        }
        "string" => super::literal_value(text)
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
