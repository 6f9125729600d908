//! Shared typed models used across extraction, diffing, and storage layers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A single parameter of a function or method, in declaration order.
///
/// Variadic and separator parameters keep their sigils in `name`
/// (`*args`, `**kwargs`, `*`, `/`) so reordering them shows up as a
/// signature change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub has_default: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, has_default: bool) -> Self {
        Self {
            name: name.into(),
            has_default,
        }
    }
}

/// A function (or method) descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    /// Canonical fingerprints of every `return` in the body, in source order.
    pub returns: Vec<String>,
}

/// A class descriptor. Methods are unique only within their class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub bases: Vec<String>,
    pub methods: BTreeMap<String, FunctionDecl>,
}

/// Coarse shape of an assigned value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCategory {
    Constant,
    Name,
    Expression,
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueCategory::Constant => "Constant",
            ValueCategory::Name => "Name",
            ValueCategory::Expression => "Expression",
        };
        f.write_str(label)
    }
}

/// A top-level variable binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub value: String,
    pub category: ValueCategory,
}

/// An import statement, identified by its canonical text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub statement: String,
}

/// Closed set of declaration shapes the extractor produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    Function(FunctionDecl),
    Class(ClassDecl),
    Variable(VariableDecl),
    Import(ImportDecl),
}

impl Declaration {
    pub fn category(&self) -> Category {
        match self {
            Declaration::Function(_) => Category::Function,
            Declaration::Class(_) => Category::Class,
            Declaration::Variable(_) => Category::Variable,
            Declaration::Import(_) => Category::Import,
        }
    }

    /// Key under which this declaration is stored in a [`Snapshot`].
    pub fn key(&self) -> &str {
        match self {
            Declaration::Function(f) => &f.name,
            Declaration::Class(c) => &c.name,
            Declaration::Variable(v) => &v.name,
            Declaration::Import(i) => &i.statement,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Categorized top-level declarations of one version of one source file.
///
/// All maps are ordered so serialization is canonical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub functions: BTreeMap<String, FunctionDecl>,
    pub classes: BTreeMap<String, ClassDecl>,
    pub variables: BTreeMap<String, VariableDecl>,
    pub imports: BTreeMap<String, ImportDecl>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration, replacing any earlier one with the same key in
    /// its category. Returns `true` when an earlier entry was replaced.
    pub fn insert(&mut self, declaration: Declaration) -> bool {
        match declaration {
            Declaration::Function(f) => self.functions.insert(f.name.clone(), f).is_some(),
            Declaration::Class(c) => self.classes.insert(c.name.clone(), c).is_some(),
            Declaration::Variable(v) => self.variables.insert(v.name.clone(), v).is_some(),
            Declaration::Import(i) => self.imports.insert(i.statement.clone(), i).is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.variables.is_empty()
            && self.imports.is_empty()
    }

    /// Number of top-level declarations across all categories.
    pub fn len(&self) -> usize {
        self.functions.len() + self.classes.len() + self.variables.len() + self.imports.len()
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Declaration category. The derive order is the output order of the diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Import,
    Function,
    Class,
    Variable,
    /// Only used for records nested under a class.
    Method,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Import => "import",
            Category::Function => "function",
            Category::Class => "class",
            Category::Variable => "variable",
            Category::Method => "method",
        };
        f.write_str(label)
    }
}

/// Kind of semantic change. The derive order is the output order within a
/// category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    ModifiedSignature,
    ModifiedReturn,
    ModifiedInheritance,
    ModifiedMethods,
    ModifiedValue,
}

/// One reported semantic difference between two snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub category: Category,
    pub kind: ChangeKind,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<ChangeRecord>,
    pub description: String,
}

impl ChangeRecord {
    pub fn new(
        category: Category,
        kind: ChangeKind,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            kind,
            subject: subject.into(),
            nested: Vec::new(),
            description: description.into(),
        }
    }

    pub fn with_nested(mut self, nested: Vec<ChangeRecord>) -> Self {
        self.nested = nested;
        self
    }

    /// Sort key implementing the category -> kind -> subject ordering.
    pub(crate) fn order_key(&self) -> (Category, ChangeKind, &str) {
        (self.category, self.kind, self.subject.as_str())
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

/// The hashed part of a commit. Field names are the canonical JSON keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitBody {
    pub parent: Option<String>,
    pub path: String,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: Snapshot,
    pub changes: Vec<ChangeRecord>,
}

/// An immutable, content-addressed revision of one tracked path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub address: String,
    pub body: CommitBody,
}

impl Commit {
    pub fn parent(&self) -> Option<&str> {
        self.body.parent.as_deref()
    }

    /// First 8 hex digits of the address, for display.
    pub fn short_address(&self) -> &str {
        &self.address[..self.address.len().min(8)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            params: vec![],
            returns: vec![],
        }
    }

    #[test]
    fn test_snapshot_insert_replaces_same_name() {
        let mut snapshot = Snapshot::new();
        assert!(!snapshot.insert(Declaration::Function(function("f"))));
        let mut redefined = function("f");
        redefined.returns.push("integer:1".to_string());
        assert!(snapshot.insert(Declaration::Function(redefined.clone())));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.functions["f"], redefined);
    }

    #[test]
    fn test_same_name_in_different_categories() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(Declaration::Function(function("x")));
        snapshot.insert(Declaration::Variable(VariableDecl {
            name: "x".to_string(),
            value: "integer:1".to_string(),
            category: ValueCategory::Constant,
        }));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_category_order_matches_output_order() {
        let mut categories = vec![
            Category::Variable,
            Category::Class,
            Category::Import,
            Category::Function,
        ];
        categories.sort();
        assert_eq!(
            categories,
            vec![
                Category::Import,
                Category::Function,
                Category::Class,
                Category::Variable
            ]
        );
    }

    #[test]
    fn test_change_record_serializes_snake_case() {
        let record = ChangeRecord::new(
            Category::Function,
            ChangeKind::ModifiedReturn,
            "foo",
            "Function `foo` modified (return value changed)",
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "modified_return");
        assert_eq!(json["category"], "function");
        assert!(json.get("nested").is_none());
    }

    #[test]
    fn test_short_address() {
        let commit = Commit {
            address: "0123456789abcdef".to_string(),
            body: CommitBody {
                parent: None,
                path: "a.py".to_string(),
                author: "user".to_string(),
                message: String::new(),
                timestamp: Utc::now(),
                snapshot: Snapshot::new(),
                changes: vec![],
            },
        };
        assert_eq!(commit.short_address(), "01234567");
        assert_eq!(commit.parent(), None);
    }
}
