//! remote object store layer
//!
//! The sync engine never pushes. It talks to the target repository through
//! an object-creation API: blobs, trees and commits are created one by one,
//! and a branch reference is moved at the end. [`ObjectStore`] is that API;
//! two backends implement it.
//!
//! ```text
//!              ┌───────────────────────────┐
//!              │        ObjectStore        │
//!              │ refs · commits · trees ·  │
//!              │          blobs            │
//!              └───────────────────────────┘
//!                 │                     │
//!                 ▼                     ▼
//!        ┌────────────────┐    ┌────────────────┐
//!        │  GithubStore   │    │    GitStore    │
//!        │ (git-data REST)│    │  (git2 on disk)│
//!        └────────────────┘    └────────────────┘
//! ```

mod error;
mod git;
mod github;
mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{RemoteError, RemoteResult};
pub use git::GitStore;
pub use github::{GithubClient, GithubStore, NewRepository};
pub use types::{
    AuthorIdentity, BlobEncoding, BranchName, EntryContent, InvalidNameError, NewCommit,
    RemoteCommit, RemoteSha, RemoteTreeItem, RepositoryIdentity, TreeEntry,
};

/// A versioned, content-addressed tree/commit/ref store.
///
/// All calls block until the store has answered. Implementations must not
/// retry on their own: a failure is reported to the caller as is.
pub trait ObjectStore {
    /// commit the branch currently points to
    fn read_ref(&self, branch: &BranchName) -> RemoteResult<RemoteSha>;

    /// read a commit
    fn read_commit(&self, sha: &RemoteSha) -> RemoteResult<RemoteCommit>;

    /// list the top-level entries of a tree
    fn read_tree(&self, sha: &RemoteSha) -> RemoteResult<Vec<RemoteTreeItem>>;

    /// create a blob from a payload in the given encoding
    fn create_blob(&self, content: &str, encoding: BlobEncoding) -> RemoteResult<RemoteSha>;

    /// create a tree by overlaying `entries` on `base`
    ///
    /// Paths of `base` that no entry mentions are kept.
    fn create_tree(&self, base: Option<&RemoteSha>, entries: &[TreeEntry]) -> RemoteResult<RemoteSha>;

    /// create a commit object; no reference moves
    fn create_commit(&self, commit: &NewCommit) -> RemoteResult<RemoteSha>;

    /// point the branch at `sha`
    fn update_ref(&self, branch: &BranchName, sha: &RemoteSha) -> RemoteResult<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn read_ref(&self, branch: &BranchName) -> RemoteResult<RemoteSha> {
        (**self).read_ref(branch)
    }

    fn read_commit(&self, sha: &RemoteSha) -> RemoteResult<RemoteCommit> {
        (**self).read_commit(sha)
    }

    fn read_tree(&self, sha: &RemoteSha) -> RemoteResult<Vec<RemoteTreeItem>> {
        (**self).read_tree(sha)
    }

    fn create_blob(&self, content: &str, encoding: BlobEncoding) -> RemoteResult<RemoteSha> {
        (**self).create_blob(content, encoding)
    }

    fn create_tree(&self, base: Option<&RemoteSha>, entries: &[TreeEntry]) -> RemoteResult<RemoteSha> {
        (**self).create_tree(base, entries)
    }

    fn create_commit(&self, commit: &NewCommit) -> RemoteResult<RemoteSha> {
        (**self).create_commit(commit)
    }

    fn update_ref(&self, branch: &BranchName, sha: &RemoteSha) -> RemoteResult<()> {
        (**self).update_ref(branch, sha)
    }
}
