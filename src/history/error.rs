//! History layer error types
//!
//! All errors that can occur while reading the local source history.
//! Every one of them is fatal for a sync.

use std::path::PathBuf;

use thiserror::Error;

/// the main error type for history operations
#[derive(Debug, Error)]
pub enum HistoryError {
    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// no git repository contains the given path
    #[error("not inside a git repository: {0}")]
    NotARepository(PathBuf),

    /// the repository has no working directory to resolve paths against
    #[error("repository has no working directory: {0}")]
    BareRepository(PathBuf),

    /// the entrega directory is not below the repository root
    #[error("{path} is outside the repository at {root}")]
    OutsideRepository { path: PathBuf, root: PathBuf },

    /// a candidate revision does not contain the scoped subdirectory
    #[error("subdirectory '{subdir}' does not exist at commit {commit}")]
    SubdirMissing { subdir: String, commit: String },

    /// the repository has no commits
    #[error("repository is empty: no commits found")]
    EmptyRepository,

    /// a commit date that cannot be represented
    #[error("commit {commit} has an out-of-range date: {seconds}")]
    InvalidDate { commit: String, seconds: i64 },

    /// the tree entry has an unexpected type
    #[error("unexpected entry type at {path}: expected {expected}, found {found}")]
    UnexpectedEntryType {
        path: String,
        expected: String,
        found: String,
    },

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HistoryError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HistoryError::NotARepository(_)
                | HistoryError::SubdirMissing { .. }
                | HistoryError::EmptyRepository
        )
    }
}

/// result type alias for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;
