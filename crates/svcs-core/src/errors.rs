//! Error types for the semantic VCS core.

use std::path::PathBuf;

/// Top-level error enum for the svcs core library.
#[derive(Debug, thiserror::Error)]
pub enum SvcsError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Not an svcs repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("Repository already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Broken history: commit {missing} referenced by {referenced_by} is missing")]
    BrokenHistory {
        missing: String,
        referenced_by: String,
    },

    #[error("Unsupported top-level statement `{kind}` at line {line}")]
    UnsupportedCategory { kind: String, line: usize },

    #[error("Corrupt commit object {address}: content hash is {actual}")]
    CorruptObject { address: String, actual: String },

    #[error("Repository is locked ({}); remove the file if no other svcs process is running", .path.display())]
    Locked { path: PathBuf },

    #[error("Unsupported source file: {}", .0.display())]
    UnsupportedSource(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SvcsResult<T> = Result<T, SvcsError>;
