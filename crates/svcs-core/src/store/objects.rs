//! Commit-object and reference storage backends.
//!
//! [`FsObjectStore`] is the on-disk layout under `.svcs/`;
//! [`MemoryObjectStore`] is the in-process substitute used by tests and
//! benchmarks. Object writes are create-only; reference writes replace the
//! previous value atomically.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard, RwLock};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{SvcsError, SvcsResult};

pub const COMMITS_DIR: &str = "commits";
pub const REFS_DIR: &str = "refs";
pub const HEAD_REF: &str = "HEAD";
pub const LOCK_FILE: &str = "LOCK";

/// Storage for content-addressed commit objects and named references.
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `address` unless it already exists. Returns
    /// `true` when a new object was written.
    fn put_object(&self, address: &str, bytes: &[u8]) -> SvcsResult<bool>;

    fn get_object(&self, address: &str) -> SvcsResult<Option<Vec<u8>>>;

    fn read_ref(&self, name: &str) -> SvcsResult<Option<String>>;

    /// Point `name` at `target`, replacing the previous value atomically.
    fn write_ref(&self, name: &str, target: &str) -> SvcsResult<()>;

    /// Names of the references directly under `prefix`, sorted.
    fn list_refs(&self, prefix: &str) -> SvcsResult<Vec<String>>;

    /// Take the advisory lock guarding read-ref -> write-object -> write-ref.
    fn lock(&self) -> SvcsResult<StoreLock<'_>>;
}

// ---------------------------------------------------------------------------
// Lock guard
// ---------------------------------------------------------------------------

/// Held for the duration of a commit. Released on drop.
pub struct StoreLock<'a> {
    file: Option<PathBuf>,
    _guard: Option<MutexGuard<'a, ()>>,
}

impl Drop for StoreLock<'_> {
    fn drop(&mut self) {
        if let Some(path) = self.file.take() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to release lock {}: {e}", path.display());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// Backend rooted at a repository's `.svcs` directory.
pub struct FsObjectStore {
    dir: PathBuf,
}

impl FsObjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn object_path(&self, address: &str) -> PathBuf {
        self.dir.join(COMMITS_DIR).join(format!("{address}.json"))
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        if name == HEAD_REF {
            self.dir.join(HEAD_REF)
        } else {
            self.dir.join(REFS_DIR).join(name)
        }
    }
}

fn staged_in(dir: &Path, bytes: &[u8]) -> SvcsResult<NamedTempFile> {
    fs::create_dir_all(dir)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

impl ObjectStore for FsObjectStore {
    fn put_object(&self, address: &str, bytes: &[u8]) -> SvcsResult<bool> {
        let path = self.object_path(address);
        if path.exists() {
            return Ok(false);
        }
        let parent = path.parent().unwrap_or(self.dir.as_path());
        let staged = staged_in(parent, bytes)?;
        match staged.persist_noclobber(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        }
    }

    fn get_object(&self, address: &str) -> SvcsResult<Option<Vec<u8>>> {
        match fs::read(self.object_path(address)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_ref(&self, name: &str) -> SvcsResult<Option<String>> {
        match fs::read_to_string(self.ref_path(name)) {
            Ok(content) => {
                let value = content.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_ref(&self, name: &str, target: &str) -> SvcsResult<()> {
        let path = self.ref_path(name);
        let parent = path.parent().unwrap_or(self.dir.as_path());
        let staged = staged_in(parent, format!("{target}\n").as_bytes())?;
        staged.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> SvcsResult<Vec<String>> {
        let dir = self.dir.join(REFS_DIR).join(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Staged temp files are dot-prefixed.
            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn lock(&self) -> SvcsResult<StoreLock<'_>> {
        let path = self.dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                debug!("Acquired repository lock {}", path.display());
                // Dropping the guard on a failed write releases the file.
                let guard = StoreLock {
                    file: Some(path),
                    _guard: None,
                };
                writeln!(file, "{}", std::process::id())?;
                Ok(guard)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!("Repository lock {} is already held", path.display());
                Err(SvcsError::Locked { path })
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    refs: RwLock<BTreeMap<String, String>>,
    commit_lock: Mutex<()>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(&self, address: &str, bytes: &[u8]) -> SvcsResult<bool> {
        let mut objects = self.objects.write();
        if objects.contains_key(address) {
            return Ok(false);
        }
        objects.insert(address.to_string(), bytes.to_vec());
        Ok(true)
    }

    fn get_object(&self, address: &str) -> SvcsResult<Option<Vec<u8>>> {
        Ok(self.objects.read().get(address).cloned())
    }

    fn read_ref(&self, name: &str) -> SvcsResult<Option<String>> {
        Ok(self.refs.read().get(name).cloned())
    }

    fn write_ref(&self, name: &str, target: &str) -> SvcsResult<()> {
        self.refs
            .write()
            .insert(name.to_string(), target.to_string());
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> SvcsResult<Vec<String>> {
        let scope = format!("{prefix}/");
        Ok(self
            .refs
            .read()
            .keys()
            .filter_map(|k| k.strip_prefix(&scope))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn lock(&self) -> SvcsResult<StoreLock<'_>> {
        Ok(StoreLock {
            file: None,
            _guard: Some(self.commit_lock.lock()),
        })
    }
}
