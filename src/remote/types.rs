//! Value types exchanged with a remote object store.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an object in the remote store (hex SHA as the API reports it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteSha(String);

impl RemoteSha {
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// short form of the sha
    pub fn short(&self) -> &str {
        let end = self.0.len().min(7);
        &self.0[..end]
    }
}

impl fmt::Display for RemoteSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full name of a remote repository, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryIdentity(String);

impl RepositoryIdentity {
    pub fn new(full_name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let full_name = full_name.into();
        match full_name.split_once('/') {
            None => Err(InvalidNameError::MissingOwner(full_name)),
            Some((owner, name)) => {
                if owner.is_empty() || name.is_empty() || name.contains('/') {
                    Err(InvalidNameError::InvalidPath(full_name))
                } else {
                    Ok(Self(full_name))
                }
            }
        }
    }

    pub fn full_name(&self) -> &str {
        &self.0
    }

    /// organization or user owning the repository
    pub fn owner(&self) -> &str {
        self.0.split_once('/').map(|(owner, _)| owner).unwrap_or(&self.0)
    }

    /// repository name without the owner
    pub fn name(&self) -> &str {
        self.0.split_once('/').map(|(_, name)| name).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for RepositoryIdentity {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepositoryIdentity> for String {
    fn from(value: RepositoryIdentity) -> Self {
        value.0
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a branch name on the remote
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// create a new BranchName
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        // git is more permissive, these are the cases that break ref paths
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.contains("..") || name.ends_with('/') || name.starts_with('/') || name.contains(' ') {
            return Err(InvalidNameError::InvalidPath(name));
        }
        Ok(Self(name))
    }

    /// get the full ref path (e.g., "refs/heads/main")
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// error type for invalid repository and branch names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    MissingOwner(String),
    InvalidPath(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::MissingOwner(name) => write!(f, "'{}' is not of the form owner/name", name),
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
        }
    }
}

impl std::error::Error for InvalidNameError {}

/// encoding of a blob payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobEncoding {
    Utf8,
    Base64,
}

impl BlobEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobEncoding::Utf8 => "utf-8",
            BlobEncoding::Base64 => "base64",
        }
    }
}

/// what a tree entry carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    /// UTF-8 text sent along with the tree
    Inline(String),
    /// a blob created beforehand
    Blob(RemoteSha),
}

/// a file to place in a new remote tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// path from the repository root
    pub path: String,
    /// octal mode string, e.g. "100644"
    pub mode: String,
    pub content: EntryContent,
}

impl TreeEntry {
    pub fn inline(path: impl Into<String>, mode: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: mode.into(),
            content: EntryContent::Inline(text.into()),
        }
    }

    pub fn blob(path: impl Into<String>, mode: impl Into<String>, sha: RemoteSha) -> Self {
        Self {
            path: path.into(),
            mode: mode.into(),
            content: EntryContent::Blob(sha),
        }
    }
}

/// one item of an existing remote tree listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTreeItem {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: RemoteSha,
}

/// a commit as read back from the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommit {
    pub sha: RemoteSha,
    pub tree: RemoteSha,
    pub parents: Vec<RemoteSha>,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    /// authored time, always in UTC
    pub authored: DateTime<Utc>,
}

/// author recorded on a replayed commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
    pub date: DateTime<FixedOffset>,
}

impl AuthorIdentity {
    /// GitHub's no-reply address for a username
    pub fn noreply(username: &str, date: DateTime<FixedOffset>) -> Self {
        Self {
            name: username.to_string(),
            email: format!("{}@users.noreply.github.com", username),
            date,
        }
    }
}

/// a commit to create on the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub message: String,
    pub tree: RemoteSha,
    pub parents: Vec<RemoteSha>,
    pub author: AuthorIdentity,
}
