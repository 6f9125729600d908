//! Per-category comparison passes.
//!
//! Each pass runs a set-difference over names followed by a field-by-field
//! comparison of the names present on both sides. Output order within a
//! pass is not significant; the caller sorts.

use std::collections::BTreeMap;

use crate::diff::sort_records;
use crate::models::{
    Category, ChangeKind, ChangeRecord, ClassDecl, FunctionDecl, ImportDecl, Parameter,
    VariableDecl,
};

/// Names split into added, removed, and present-on-both-sides.
struct Partition<'a, T> {
    added: Vec<&'a str>,
    removed: Vec<&'a str>,
    common: Vec<(&'a T, &'a T)>,
}

fn partition<'a, T>(old: &'a BTreeMap<String, T>, new: &'a BTreeMap<String, T>) -> Partition<'a, T> {
    let added = new
        .keys()
        .filter(|k| !old.contains_key(*k))
        .map(String::as_str)
        .collect();
    let mut removed = Vec::new();
    let mut common = Vec::new();
    for (name, before) in old {
        match new.get(name) {
            Some(after) => common.push((before, after)),
            None => removed.push(name.as_str()),
        }
    }
    Partition {
        added,
        removed,
        common,
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

pub fn imports(
    old: &BTreeMap<String, ImportDecl>,
    new: &BTreeMap<String, ImportDecl>,
) -> Vec<ChangeRecord> {
    let split = partition(old, new);
    let mut records = Vec::new();
    for statement in split.added {
        records.push(ChangeRecord::new(
            Category::Import,
            ChangeKind::Added,
            statement,
            format!("Import added: {statement}"),
        ));
    }
    for statement in split.removed {
        records.push(ChangeRecord::new(
            Category::Import,
            ChangeKind::Removed,
            statement,
            format!("Import removed: {statement}"),
        ));
    }
    records
}

// ---------------------------------------------------------------------------
// Functions and methods
// ---------------------------------------------------------------------------

/// Compare functions. With `class` set, the maps are that class's methods and
/// records use [`Category::Method`].
pub fn functions(
    old: &BTreeMap<String, FunctionDecl>,
    new: &BTreeMap<String, FunctionDecl>,
    class: Option<&str>,
) -> Vec<ChangeRecord> {
    let category = if class.is_some() {
        Category::Method
    } else {
        Category::Function
    };
    let split = partition(old, new);
    let mut records = Vec::new();

    for name in split.added {
        let description = match class {
            Some(class) => format!("Method `{name}` added to class `{class}`"),
            None => format!("Function `{name}` added"),
        };
        records.push(ChangeRecord::new(category, ChangeKind::Added, name, description));
    }
    for name in split.removed {
        let description = match class {
            Some(class) => format!("Method `{name}` removed from class `{class}`"),
            None => format!("Function `{name}` removed"),
        };
        records.push(ChangeRecord::new(category, ChangeKind::Removed, name, description));
    }

    for (before, after) in split.common {
        let label = match class {
            Some(class) => format!("Method `{class}.{}`", after.name),
            None => format!("Function `{}`", after.name),
        };
        if let Some(qualifier) = signature_change(&before.params, &after.params) {
            records.push(ChangeRecord::new(
                category,
                ChangeKind::ModifiedSignature,
                after.name.as_str(),
                format!("{label} signature modified ({qualifier})"),
            ));
        }
        if let Some(qualifier) = return_change(&before.returns, &after.returns) {
            records.push(ChangeRecord::new(
                category,
                ChangeKind::ModifiedReturn,
                after.name.as_str(),
                format!("{label} modified ({qualifier})"),
            ));
        }
    }
    records
}

/// Qualifier for a parameter-list change, or `None` if the lists are equal.
pub fn signature_change(old: &[Parameter], new: &[Parameter]) -> Option<&'static str> {
    if old == new {
        return None;
    }
    if new.len() > old.len() {
        return Some("arguments added");
    }
    if new.len() < old.len() {
        return Some("arguments removed");
    }
    let same_names = old.iter().zip(new).all(|(a, b)| a.name == b.name);
    Some(if same_names {
        "defaults changed"
    } else {
        "arguments changed"
    })
}

/// Qualifier for a change in return fingerprints, or `None` if equal.
pub fn return_change(old: &[String], new: &[String]) -> Option<&'static str> {
    if old == new {
        return None;
    }
    Some(match (old.is_empty(), new.is_empty()) {
        (true, false) => "return statement added",
        (false, true) => "return statement removed",
        _ => "return value changed",
    })
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

pub fn classes(
    old: &BTreeMap<String, ClassDecl>,
    new: &BTreeMap<String, ClassDecl>,
) -> Vec<ChangeRecord> {
    let split = partition(old, new);
    let mut records = Vec::new();

    for name in split.added {
        records.push(ChangeRecord::new(
            Category::Class,
            ChangeKind::Added,
            name,
            format!("Class `{name}` added"),
        ));
    }
    for name in split.removed {
        records.push(ChangeRecord::new(
            Category::Class,
            ChangeKind::Removed,
            name,
            format!("Class `{name}` removed"),
        ));
    }

    for (before, after) in split.common {
        let name = after.name.as_str();
        // Base order matters for the MRO.
        if before.bases != after.bases {
            records.push(ChangeRecord::new(
                Category::Class,
                ChangeKind::ModifiedInheritance,
                name,
                format!("Class `{name}` inheritance modified"),
            ));
        }
        let mut nested = functions(&before.methods, &after.methods, Some(name));
        if !nested.is_empty() {
            sort_records(&mut nested);
            records.push(
                ChangeRecord::new(
                    Category::Class,
                    ChangeKind::ModifiedMethods,
                    name,
                    format!("Class `{name}` methods modified"),
                )
                .with_nested(nested),
            );
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

pub fn variables(
    old: &BTreeMap<String, VariableDecl>,
    new: &BTreeMap<String, VariableDecl>,
) -> Vec<ChangeRecord> {
    let split = partition(old, new);
    let mut records = Vec::new();

    for name in split.added {
        let category = new[name].category;
        records.push(ChangeRecord::new(
            Category::Variable,
            ChangeKind::Added,
            name,
            format!("Variable `{name}` assigned ({category})"),
        ));
    }
    for name in split.removed {
        records.push(ChangeRecord::new(
            Category::Variable,
            ChangeKind::Removed,
            name,
            format!("Variable `{name}` removed"),
        ));
    }

    for (before, after) in split.common {
        let name = after.name.as_str();
        let description = if before.category != after.category {
            format!(
                "Variable `{name}` value changed ({} -> {})",
                before.category, after.category
            )
        } else if before.value != after.value {
            format!("Variable `{name}` assigned new value ({})", after.category)
        } else {
            continue;
        };
        records.push(ChangeRecord::new(
            Category::Variable,
            ChangeKind::ModifiedValue,
            name,
            description,
        ));
    }
    records
}
