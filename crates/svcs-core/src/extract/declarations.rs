//! Turns top-level syntax nodes into [`Declaration`]s.
//!
//! Only module-level statements are classified. Class bodies are read one
//! level deep for methods; function bodies are only scanned for `return`
//! statements.

use std::collections::BTreeMap;

use tree_sitter::Node;

use crate::errors::{SvcsError, SvcsResult};
use crate::extract::fingerprint::{fingerprint, value_category};
use crate::extract::parser::ParsedUnit;
use crate::models::{
    ClassDecl, Declaration, FunctionDecl, ImportDecl, Parameter, VariableDecl,
};

/// Scopes that own their own `return` statements.
const NESTED_SCOPES: &[&str] = &[
    "function_definition",
    "class_definition",
    "decorated_definition",
    "lambda",
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Node text with all whitespace removed (`a . b` -> `a.b`).
fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn unsupported(node: Node<'_>) -> SvcsError {
    SvcsError::UnsupportedCategory {
        kind: node.kind().to_string(),
        line: line_of(node),
    }
}

fn field_text<'s>(unit: &ParsedUnit<'s>, node: Node<'_>, field: &str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| unit.text(n))
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify one top-level statement.
///
/// Returns an empty list for statements that carry no declaration but are
/// routinely present (docstrings, `pass`, bare annotations). Anything else
/// without a declaration shape is `UnsupportedCategory`.
pub fn classify(unit: &ParsedUnit<'_>, node: Node<'_>) -> SvcsResult<Vec<Declaration>> {
    match node.kind() {
        "function_definition" => Ok(vec![Declaration::Function(function_decl(unit, node))]),
        "class_definition" => Ok(vec![Declaration::Class(class_decl(unit, node))]),
        "decorated_definition" => match node.child_by_field_name("definition") {
            Some(definition) => classify(unit, definition),
            None => Err(unsupported(node)),
        },
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            Ok(vec![Declaration::Import(import_decl(unit, node))])
        }
        "expression_statement" => expression_statement(unit, node),
        "pass_statement" => Ok(vec![]),
        _ => Err(unsupported(node)),
    }
}

fn expression_statement(unit: &ParsedUnit<'_>, node: Node<'_>) -> SvcsResult<Vec<Declaration>> {
    let mut cursor = node.walk();
    let inner: Vec<Node<'_>> = node
        .named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect();
    match inner.as_slice() {
        [assignment] if assignment.kind() == "assignment" => assignment_decls(unit, *assignment),
        [docstring] if matches!(docstring.kind(), "string" | "concatenated_string") => Ok(vec![]),
        [other] => Err(unsupported(*other)),
        _ => Err(unsupported(node)),
    }
}

/// Variables bound by a (possibly chained) assignment with plain-name
/// targets. `a = b = 1` binds both names to the final value.
fn assignment_decls(unit: &ParsedUnit<'_>, node: Node<'_>) -> SvcsResult<Vec<Declaration>> {
    let mut targets = Vec::new();
    let mut current = node;
    let value = loop {
        if let Some(left) = current.child_by_field_name("left") {
            targets.push(left);
        }
        match current.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => current = right,
            Some(right) => break Some(right),
            None => break None,
        }
    };

    // `x: int` declares a type without binding a value.
    let Some(value) = value else {
        return Ok(vec![]);
    };

    let names: Vec<&str> = targets
        .iter()
        .filter(|t| t.kind() == "identifier")
        .map(|t| unit.text(*t))
        .collect();
    if names.is_empty() {
        return Err(unsupported(targets.first().copied().unwrap_or(node)));
    }

    let rendered = fingerprint(unit, value);
    let category = value_category(value);
    Ok(names
        .into_iter()
        .map(|name| {
            Declaration::Variable(VariableDecl {
                name: name.to_string(),
                value: rendered.clone(),
                category,
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

pub fn function_decl(unit: &ParsedUnit<'_>, node: Node<'_>) -> FunctionDecl {
    let name = field_text(unit, node, "name").unwrap_or_default().to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| parameters(unit, p))
        .unwrap_or_default();
    let mut returns = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        collect_returns(unit, body, &mut returns);
    }
    FunctionDecl {
        name,
        params,
        returns,
    }
}

fn parameters(unit: &ParsedUnit<'_>, node: Node<'_>) -> Vec<Parameter> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .map(|param| match param.kind() {
            "identifier" => Parameter::new(unit.text(param), false),
            "default_parameter" | "typed_default_parameter" => {
                let name = field_text(unit, param, "name").unwrap_or_else(|| unit.text(param));
                Parameter::new(compact(name), true)
            }
            // The bound name of a typed parameter is its first named child;
            // it may itself be a splat pattern.
            "typed_parameter" => {
                let name = param
                    .named_child(0)
                    .map(|n| unit.text(n))
                    .unwrap_or_else(|| unit.text(param));
                Parameter::new(compact(name), false)
            }
            _ => Parameter::new(compact(unit.text(param)), false),
        })
        .collect()
}

fn collect_returns(unit: &ParsedUnit<'_>, node: Node<'_>, out: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.is_extra() || NESTED_SCOPES.contains(&child.kind()) {
            continue;
        }
        if child.kind() == "return_statement" {
            let mut inner = child.walk();
            let value = child.named_children(&mut inner).find(|c| !c.is_extra());
            out.push(match value {
                Some(expr) => fingerprint(unit, expr),
                None => "none".to_string(),
            });
            continue;
        }
        collect_returns(unit, child, out);
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

pub fn class_decl(unit: &ParsedUnit<'_>, node: Node<'_>) -> ClassDecl {
    let name = field_text(unit, node, "name").unwrap_or_default().to_string();

    let mut bases = Vec::new();
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for base in superclasses.named_children(&mut cursor) {
            if base.is_extra() {
                continue;
            }
            bases.push(match base.kind() {
                "identifier" | "attribute" => compact(unit.text(base)),
                _ => fingerprint(unit, base),
            });
        }
    }

    let mut methods = BTreeMap::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for item in body.named_children(&mut cursor) {
            let definition = match item.kind() {
                "function_definition" => Some(item),
                "decorated_definition" => item
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition"),
                _ => None,
            };
            if let Some(definition) = definition {
                let method = function_decl(unit, definition);
                methods.insert(method.name.clone(), method);
            }
        }
    }

    ClassDecl {
        name,
        bases,
        methods,
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

fn imported_name(unit: &ParsedUnit<'_>, node: Node<'_>) -> String {
    if node.kind() == "aliased_import" {
        let name = field_text(unit, node, "name").map(compact).unwrap_or_default();
        let alias = field_text(unit, node, "alias").map(compact).unwrap_or_default();
        return format!("{name} as {alias}");
    }
    compact(unit.text(node))
}

/// Canonical statement text: `import a.b as c, d` or `from m import x, y as z`.
pub fn import_decl(unit: &ParsedUnit<'_>, node: Node<'_>) -> ImportDecl {
    let mut cursor = node.walk();
    let mut names: Vec<String> = node
        .children_by_field_name("name", &mut cursor)
        .map(|n| imported_name(unit, n))
        .collect();

    let statement = match node.kind() {
        "import_statement" => format!("import {}", names.join(", ")),
        kind => {
            let module = if kind == "future_import_statement" {
                "__future__".to_string()
            } else {
                field_text(unit, node, "module_name")
                    .map(compact)
                    .unwrap_or_default()
            };
            let mut wildcard_cursor = node.walk();
            if node
                .named_children(&mut wildcard_cursor)
                .any(|c| c.kind() == "wildcard_import")
            {
                names = vec!["*".to_string()];
            }
            format!("from {module} import {}", names.join(", "))
        }
    };
    ImportDecl { statement }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parser::parse_python;
    use crate::models::ValueCategory;

    fn classify_first(source: &str) -> SvcsResult<Vec<Declaration>> {
        let unit = parse_python(source).unwrap();
        let node = unit.root().named_child(0).unwrap();
        classify(&unit, node)
    }

    fn only(source: &str) -> Declaration {
        let mut decls = classify_first(source).unwrap();
        assert_eq!(decls.len(), 1, "expected one declaration in {source:?}");
        decls.remove(0)
    }

    #[test]
    fn test_function_parameters() {
        let Declaration::Function(f) =
            only("def f(a, b=1, *args, c: int, d: int = 2, **kw):\n    pass\n")
        else {
            panic!("expected function");
        };
        assert_eq!(f.name, "f");
        let names: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "*args", "c", "d", "**kw"]);
        let defaults: Vec<bool> = f.params.iter().map(|p| p.has_default).collect();
        assert_eq!(defaults, vec![false, true, false, false, true, false]);
    }

    #[test]
    fn test_keyword_separator_recorded() {
        let Declaration::Function(f) = only("def f(a, *, b):\n    pass\n") else {
            panic!("expected function");
        };
        let names: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "*", "b"]);
    }

    #[test]
    fn test_returns_skip_nested_scopes() {
        let source = "def outer(x):\n    def inner():\n        return 99\n    if x:\n        return x\n    return\n";
        let Declaration::Function(f) = only(source) else {
            panic!("expected function");
        };
        assert_eq!(f.returns, vec!["identifier:x".to_string(), "none".to_string()]);
    }

    #[test]
    fn test_function_without_return() {
        let Declaration::Function(f) = only("def f():\n    print(1)\n") else {
            panic!("expected function");
        };
        assert!(f.returns.is_empty());
    }

    #[test]
    fn test_decorated_function_unwrapped() {
        let Declaration::Function(f) = only("@cache\ndef f():\n    return 1\n") else {
            panic!("expected function");
        };
        assert_eq!(f.name, "f");
    }

    #[test]
    fn test_class_bases_and_methods() {
        let source = "class A(Base, abc.ABC, metaclass=Meta):\n    def run(self):\n        return 1\n    @property\n    def size(self):\n        return 2\n    x = 3\n";
        let Declaration::Class(c) = only(source) else {
            panic!("expected class");
        };
        assert_eq!(c.bases[0], "Base");
        assert_eq!(c.bases[1], "abc.ABC");
        assert_eq!(c.bases.len(), 3);
        assert_eq!(c.methods.keys().collect::<Vec<_>>(), vec!["run", "size"]);
    }

    #[test]
    fn test_chained_assignment() {
        let decls = classify_first("a = b = 1\n").unwrap();
        assert_eq!(decls.len(), 2);
        for decl in decls {
            let Declaration::Variable(v) = decl else {
                panic!("expected variable");
            };
            assert_eq!(v.category, ValueCategory::Constant);
            assert_eq!(v.value, "integer:1");
        }
    }

    #[test]
    fn test_annotated_assignment() {
        let Declaration::Variable(v) = only("limit: int = other\n") else {
            panic!("expected variable");
        };
        assert_eq!(v.name, "limit");
        assert_eq!(v.category, ValueCategory::Name);
        assert!(classify_first("limit: int\n").unwrap().is_empty());
    }

    #[test]
    fn test_tuple_target_unsupported() {
        let err = classify_first("a, b = 1, 2\n").unwrap_err();
        assert!(matches!(err, SvcsError::UnsupportedCategory { line: 1, .. }));
    }

    #[test]
    fn test_import_canonical_forms() {
        let cases = [
            ("import os\n", "import os"),
            ("import os.path as p, sys\n", "import os.path as p, sys"),
            ("from collections import (OrderedDict,\n    defaultdict as dd)\n", "from collections import OrderedDict, defaultdict as dd"),
            ("from . import sibling\n", "from . import sibling"),
            ("from ..pkg import *\n", "from ..pkg import *"),
            ("from __future__ import annotations\n", "from __future__ import annotations"),
        ];
        for (source, expected) in cases {
            let Declaration::Import(i) = only(source) else {
                panic!("expected import for {source:?}");
            };
            assert_eq!(i.statement, expected);
        }
    }

    #[test]
    fn test_docstring_and_pass_ignored() {
        assert!(classify_first("\"\"\"Module docs.\"\"\"\n").unwrap().is_empty());
        assert!(classify_first("pass\n").unwrap().is_empty());
    }

    #[test]
    fn test_control_flow_unsupported() {
        let err = classify_first("if __name__ == '__main__':\n    main()\n").unwrap_err();
        match err {
            SvcsError::UnsupportedCategory { kind, line } => {
                assert_eq!(kind, "if_statement");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
