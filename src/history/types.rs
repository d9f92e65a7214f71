//! core type-safe wrappers around git primitives for the history layer.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use git2::Oid;

use crate::history::error::{HistoryError, HistoryResult};

/// This makes sure we don't accidentally pass a tree ID where a commit ID
/// is expected. The inner Oid is only accessible within the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// parse CommitId from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, git2::Error> {
        Oid::from_str(hex).map(CommitId)
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub(crate) Oid);

impl TreeId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One historical change of the source history, scoped to a subdirectory.
///
/// `tree` is the subdirectory's tree at this commit. It is `None` when the
/// commit removed the subdirectory altogether, which callers treat as an
/// error when they need the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub id: CommitId,
    pub authored: DateTime<Utc>,
    pub message: String,
    pub subdir: String,
    pub tree: Option<TreeId>,
}

impl ChangeRecord {
    /// build a record from a commit and the scoped tree found in it
    pub(crate) fn from_git2(commit: &git2::Commit<'_>, subdir: &str, tree: Option<Oid>) -> HistoryResult<Self> {
        let id = CommitId::new(commit.id());
        let authored = authored_at(id, commit.author().when().seconds())?;

        Ok(Self {
            id,
            authored,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            subdir: subdir.to_string(),
            tree: tree.map(TreeId::new),
        })
    }

    /// the snapshot tree, or `SubdirMissing` if the commit has none
    pub fn snapshot_tree(&self) -> HistoryResult<TreeId> {
        self.tree.ok_or_else(|| HistoryError::SubdirMissing {
            subdir: self.subdir.clone(),
            commit: self.id.to_string(),
        })
    }

    /// first line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// author time of a commit as UTC
pub(crate) fn authored_at(commit: CommitId, seconds: i64) -> HistoryResult<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| HistoryError::InvalidDate {
            commit: commit.to_string(),
            seconds,
        })
}

/// A file inside a change snapshot.
///
/// `path` is relative to the scoped subdirectory and always uses `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub path: String,
    pub mode: i32,
    pub content: Vec<u8>,
}

impl SnapshotFile {
    /// git mode of a submodule entry
    pub const GITLINK_MODE: i32 = 0o160000;

    pub fn new(path: impl Into<String>, mode: i32, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            mode,
            content: content.into(),
        }
    }

    /// whether this entry points at a submodule commit instead of a blob
    pub fn is_gitlink(&self) -> bool {
        self.mode == Self::GITLINK_MODE
    }
}
