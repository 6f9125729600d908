//! End-to-end revision recording: extract -> last snapshot -> diff -> commit.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use crate::diff::diff;
use crate::errors::{SvcsError, SvcsResult};
use crate::extract::{extract, is_supported_source};
use crate::models::{ChangeRecord, Commit};
use crate::store::repository::Repository;

/// Extract both texts and diff them.
pub fn diff_sources(old: &str, new: &str) -> SvcsResult<Vec<ChangeRecord>> {
    Ok(diff(&extract(old)?, &extract(new)?))
}

/// Record `source` as the next revision of the tracked path `path`.
///
/// The first commit on a path reports every declaration as added.
pub fn commit_source(
    repo: &Repository,
    path: &str,
    source: &str,
    message: &str,
    author: Option<&str>,
) -> SvcsResult<Commit> {
    let started = Instant::now();
    let snapshot = extract(source)?;
    debug!(
        "Extracted {} declarations from {} in {:?}",
        snapshot.len(),
        path,
        started.elapsed()
    );

    let previous = repo.last_snapshot(path)?;
    let changes = diff(&previous, &snapshot);
    let author = repo.config().resolve_author(author);
    repo.commit(path, snapshot, changes, message, &author)
}

fn resolve(repo: &Repository, file: &Path) -> PathBuf {
    match repo.root() {
        Some(root) if file.is_relative() => root.join(file),
        _ => file.to_path_buf(),
    }
}

/// Read a source file, rejecting anything outside the supported grammar.
pub fn read_source(file: &Path) -> SvcsResult<String> {
    if !is_supported_source(file) {
        return Err(SvcsError::UnsupportedSource(file.to_path_buf()));
    }
    Ok(std::fs::read_to_string(file)?)
}

/// Commit the current contents of `file`. Relative paths are taken from the
/// repository root.
pub fn commit_file(
    repo: &Repository,
    file: &Path,
    message: &str,
    author: Option<&str>,
) -> SvcsResult<Commit> {
    let absolute = resolve(repo, file);
    let source = read_source(&absolute)?;
    let tracked = repo.normalize_path(&absolute);
    commit_source(repo, &tracked, &source, message, author)
}

/// Changes in `file` relative to its last commit, without committing.
pub fn pending_changes(repo: &Repository, file: &Path) -> SvcsResult<Vec<ChangeRecord>> {
    let absolute = resolve(repo, file);
    let source = read_source(&absolute)?;
    let tracked = repo.normalize_path(&absolute);
    Ok(diff(&repo.last_snapshot(&tracked)?, &extract(&source)?))
}
