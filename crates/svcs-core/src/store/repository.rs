//! Repository handle: layout, commit creation, and history traversal.
//!
//! Every tracked path has its own linear history line under the current
//! branch (`refs/heads/<branch>/<path-key>`). `HEAD` names the branch.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::{SvcsError, SvcsResult};
use crate::models::{ChangeRecord, Commit, CommitBody, Snapshot};
use crate::store::canonical::{canonical_bytes, content_address, path_key};
use crate::store::config::RepoConfig;
use crate::store::objects::{
    FsObjectStore, MemoryObjectStore, ObjectStore, COMMITS_DIR, HEAD_REF, REFS_DIR,
};

/// Name of the metadata directory at the repository root.
pub const REPO_DIR: &str = ".svcs";

const HEAD_PREFIX: &str = "ref: heads/";

pub struct Repository {
    root: Option<PathBuf>,
    store: Box<dyn ObjectStore>,
    config: RepoConfig,
}

impl Repository {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Create a new repository at `root`.
    pub fn init(root: &Path) -> SvcsResult<Self> {
        let root = fs::canonicalize(root)?;
        let dir = root.join(REPO_DIR);
        if dir.exists() {
            return Err(SvcsError::AlreadyInitialized(root));
        }
        fs::create_dir_all(dir.join(COMMITS_DIR))?;
        fs::create_dir_all(dir.join(REFS_DIR).join("heads"))?;

        let config = RepoConfig::default();
        config.save(&dir)?;
        let store = FsObjectStore::new(&dir);
        store.write_ref(HEAD_REF, &format!("{HEAD_PREFIX}{}", config.branch))?;

        info!("Initialized empty svcs repository in {}", dir.display());
        Ok(Self {
            root: Some(root),
            store: Box::new(store),
            config,
        })
    }

    /// Open the repository whose root is exactly `root`.
    pub fn open(root: &Path) -> SvcsResult<Self> {
        let dir = root.join(REPO_DIR);
        if !dir.is_dir() {
            return Err(SvcsError::NotARepository(root.to_path_buf()));
        }
        let config =
            RepoConfig::load(&dir)?.ok_or_else(|| SvcsError::NotARepository(root.to_path_buf()))?;
        let root = fs::canonicalize(root)?;
        debug!("Opened svcs repository at {}", root.display());
        Ok(Self {
            store: Box::new(FsObjectStore::new(root.join(REPO_DIR))),
            root: Some(root),
            config,
        })
    }

    /// A repository with no on-disk presence.
    pub fn in_memory() -> Self {
        Self::with_store(Box::new(MemoryObjectStore::new()), RepoConfig::default())
    }

    /// A root-less repository over an arbitrary backend.
    pub fn with_store(store: Box<dyn ObjectStore>, config: RepoConfig) -> Self {
        Self {
            root: None,
            store,
            config,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Branch named by `HEAD`, falling back to the configured branch.
    pub fn current_branch(&self) -> SvcsResult<String> {
        let head = self.store.read_ref(HEAD_REF)?;
        Ok(head
            .as_deref()
            .and_then(|h| h.strip_prefix(HEAD_PREFIX))
            .map(str::to_string)
            .unwrap_or_else(|| self.config.branch.clone()))
    }

    fn branch_prefix(&self) -> SvcsResult<String> {
        Ok(format!("heads/{}", self.current_branch()?))
    }

    fn path_ref(&self, path: &str) -> SvcsResult<String> {
        Ok(format!("{}/{}", self.branch_prefix()?, path_key(path)))
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    /// Tracked-path form of `path`: root-relative with `/` separators when
    /// inside the repository, absolute otherwise. Relative inputs are taken
    /// as relative to the root.
    pub fn normalize_path(&self, path: &Path) -> String {
        let absolute = match self.root.as_deref() {
            Some(root) if path.is_relative() => root.join(path),
            None if path.is_relative() => return clean_relative(path),
            _ => path.to_path_buf(),
        };
        let resolved = fs::canonicalize(&absolute).unwrap_or_else(|_| lexical(&absolute));
        match self.root.as_deref().map(|root| resolved.strip_prefix(root)) {
            Some(Ok(relative)) => clean_relative(relative),
            _ => resolved.to_string_lossy().replace('\\', "/"),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Address of the newest commit on `path`'s history line.
    pub fn head(&self, path: &str) -> SvcsResult<Option<String>> {
        self.store.read_ref(&self.path_ref(path)?)
    }

    /// Load and verify a commit object.
    pub fn load_commit(&self, address: &str) -> SvcsResult<Option<Commit>> {
        let Some(bytes) = self.store.get_object(address)? else {
            return Ok(None);
        };
        let actual = content_address(&bytes);
        if actual != address {
            return Err(SvcsError::CorruptObject {
                address: address.to_string(),
                actual,
            });
        }
        let body: CommitBody = serde_json::from_slice(&bytes)?;
        Ok(Some(Commit {
            address: address.to_string(),
            body,
        }))
    }

    /// Snapshot of the newest commit on `path`, or an empty snapshot.
    pub fn last_snapshot(&self, path: &str) -> SvcsResult<Snapshot> {
        let ref_name = self.path_ref(path)?;
        let Some(address) = self.store.read_ref(&ref_name)? else {
            return Ok(Snapshot::new());
        };
        match self.load_commit(&address)? {
            Some(commit) => Ok(commit.body.snapshot),
            None => Err(SvcsError::BrokenHistory {
                missing: address,
                referenced_by: ref_name,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    pub fn commit(
        &self,
        path: &str,
        snapshot: Snapshot,
        changes: Vec<ChangeRecord>,
        message: &str,
        author: &str,
    ) -> SvcsResult<Commit> {
        self.commit_at(path, snapshot, changes, message, author, Utc::now())
    }

    /// Append a commit to `path`'s history line with an explicit timestamp.
    ///
    /// The object is persisted before the reference moves, so a crash in
    /// between leaves an unreferenced object and an intact reference.
    pub fn commit_at(
        &self,
        path: &str,
        snapshot: Snapshot,
        changes: Vec<ChangeRecord>,
        message: &str,
        author: &str,
        timestamp: DateTime<Utc>,
    ) -> SvcsResult<Commit> {
        let _lock = self.store.lock()?;

        let ref_name = self.path_ref(path)?;
        let parent = self.store.read_ref(&ref_name)?;
        if let Some(parent) = &parent {
            if self.store.get_object(parent)?.is_none() {
                return Err(SvcsError::BrokenHistory {
                    missing: parent.clone(),
                    referenced_by: ref_name,
                });
            }
        }

        let body = CommitBody {
            parent,
            path: path.to_string(),
            author: author.to_string(),
            message: message.to_string(),
            timestamp,
            snapshot,
            changes,
        };
        let bytes = canonical_bytes(&body)?;
        let address = content_address(&bytes);

        if !self.store.put_object(&address, &bytes)? {
            debug!("Commit object {address} already stored; reusing it");
        }
        self.store.write_ref(&ref_name, &address)?;

        let commit = Commit { address, body };
        info!(
            "Committed {} as {} ({} changes)",
            path,
            commit.short_address(),
            commit.body.changes.len()
        );
        Ok(commit)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Walk `path`'s history from its head, newest first.
    pub fn walk(&self, path: &str) -> SvcsResult<HistoryWalk<'_>> {
        let ref_name = self.path_ref(path)?;
        let next = self.store.read_ref(&ref_name)?;
        Ok(HistoryWalk {
            repo: self,
            next,
            referenced_by: ref_name,
        })
    }

    /// Up to `limit` commits of `path`, newest first.
    pub fn history(&self, path: &str, limit: Option<usize>) -> SvcsResult<Vec<Commit>> {
        self.walk(path)?
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Every path with at least one commit on the current branch, sorted.
    pub fn tracked_paths(&self) -> SvcsResult<Vec<String>> {
        let prefix = self.branch_prefix()?;
        let mut paths = Vec::new();
        for key in self.store.list_refs(&prefix)? {
            let ref_name = format!("{prefix}/{key}");
            let Some(address) = self.store.read_ref(&ref_name)? else {
                continue;
            };
            match self.load_commit(&address)? {
                Some(commit) => paths.push(commit.body.path),
                None => {
                    return Err(SvcsError::BrokenHistory {
                        missing: address,
                        referenced_by: ref_name,
                    })
                }
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Commits of all tracked paths merged newest first.
    pub fn log(&self, limit: Option<usize>) -> SvcsResult<Vec<Commit>> {
        let mut commits = Vec::new();
        for path in self.tracked_paths()? {
            commits.extend(self.history(&path, limit)?);
        }
        commits.sort_by(|a, b| {
            b.body
                .timestamp
                .cmp(&a.body.timestamp)
                .then_with(|| a.address.cmp(&b.address))
        });
        if let Some(limit) = limit {
            commits.truncate(limit);
        }
        Ok(commits)
    }
}

/// Lexically normalized, `/`-separated form of a relative path. Leading `..`
/// components are kept.
fn clean_relative(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push("..".to_string()),
            },
            _ => {}
        }
    }
    parts.join("/")
}

/// Resolve `.` and `..` in an absolute path without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// One-shot iterator over a history line. Stops after the first error.
pub struct HistoryWalk<'r> {
    repo: &'r Repository,
    next: Option<String>,
    referenced_by: String,
}

impl Iterator for HistoryWalk<'_> {
    type Item = SvcsResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let address = self.next.take()?;
        match self.repo.load_commit(&address) {
            Ok(Some(commit)) => {
                self.next = commit.body.parent.clone();
                self.referenced_by = address;
                Some(Ok(commit))
            }
            Ok(None) => Some(Err(SvcsError::BrokenHistory {
                missing: address,
                referenced_by: std::mem::take(&mut self.referenced_by),
            })),
            Err(e) => Some(Err(e)),
        }
    }
}
