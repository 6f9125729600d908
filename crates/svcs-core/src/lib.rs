//! Semantic version control core.
//!
//! Source files are parsed into a [`models::Snapshot`] of their top-level
//! declarations, snapshots are compared into ordered [`models::ChangeRecord`]s,
//! and each revision is stored as an immutable, content-addressed
//! [`models::Commit`] on a per-path history line.
//!
//! Argument parsing, repository discovery, and terminal formatting belong to
//! callers; everything here takes an explicit [`Repository`] handle.

pub mod diff;
pub mod errors;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod store;

pub use diff::{diff, surface};
pub use errors::{SvcsError, SvcsResult};
pub use extract::{extract, extract_strict, is_supported_source};
pub use models::{ChangeKind, ChangeRecord, Commit, Declaration, Snapshot};
pub use store::repository::Repository;
