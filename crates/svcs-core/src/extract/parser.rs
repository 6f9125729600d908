//! Language parsing wrapper used by the extraction passes.
//!
//! Python is the only supported grammar. tree-sitter always produces a tree,
//! recovering from syntax errors with `ERROR` and `MISSING` nodes, so a
//! recovered tree is rejected here and reported as a parse error.

use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{SvcsError, SvcsResult};

const SUPPORTED_EXTENSIONS: &[&str] = &["py"];

/// A parsed source unit. Holds the source so node text can be sliced out.
pub struct ParsedUnit<'s> {
    pub source: &'s str,
    pub tree: Tree,
}

impl<'s> ParsedUnit<'s> {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`. Node boundaries always fall on UTF-8
    /// boundaries of the input, so the slice cannot fail for nodes of this
    /// tree.
    pub fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }
}

/// Whether `path` names a file in the supported source grammar.
pub fn is_supported_source(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn parse_python(source: &str) -> SvcsResult<ParsedUnit<'_>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SvcsError::Parse {
            line: 0,
            column: 0,
            message: format!("failed to load Python grammar: {e}"),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| SvcsError::Parse {
        line: 0,
        column: 0,
        message: "parser returned no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let culprit = first_error(root).unwrap_or(root);
        let position = culprit.start_position();
        let message = if culprit.is_missing() {
            format!("missing `{}`", culprit.kind())
        } else {
            let snippet: String = source[culprit.byte_range()]
                .chars()
                .take(40)
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            format!("invalid syntax near `{snippet}`")
        };
        return Err(SvcsError::Parse {
            line: position.row + 1,
            column: position.column + 1,
            message,
        });
    }

    Ok(ParsedUnit { source, tree })
}

/// Depth-first search for the first `ERROR` or `MISSING` node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}
