//! Semantic diff between two snapshots.
//!
//! Output order is fixed: category (import, function, class, variable), then
//! kind (added, removed, modified-*), then subject name. The result depends
//! only on the two snapshots, never on source declaration order.

pub mod compare;

use crate::models::{ChangeKind, ChangeRecord, Snapshot};

/// Compare `old` against `new`. Never fails on well-formed snapshots.
///
/// Method-level changes are not listed at the top level: each class with
/// changed methods yields one `ModifiedMethods` record whose `nested` list
/// holds the per-method records (category `Method`). Use [`surface`] for the
/// flat display form.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    records.extend(compare::imports(&old.imports, &new.imports));
    records.extend(compare::functions(&old.functions, &new.functions, None));
    records.extend(compare::classes(&old.classes, &new.classes));
    records.extend(compare::variables(&old.variables, &new.variables));
    sort_records(&mut records);
    records
}

pub(crate) fn sort_records(records: &mut [ChangeRecord]) {
    records.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    debug_assert!(
        records
            .windows(2)
            .all(|pair| pair[0].order_key() != pair[1].order_key()),
        "duplicate change record in diff output"
    );
}

/// Flatten records into display lines. Method-level changes are surfaced in
/// place of their class's `ModifiedMethods` record.
pub fn surface(records: &[ChangeRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    for record in records {
        if record.kind == ChangeKind::ModifiedMethods {
            lines.extend(record.nested.iter().map(|r| r.description.clone()));
        } else {
            lines.push(record.description.clone());
        }
    }
    lines
}
