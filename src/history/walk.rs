//! History traversal scoped to a subdirectory.
//!
//! A commit belongs to the scoped history when the subdirectory's tree differs
//! from the one in each of its parents, the same rule `git log -- <dir>` uses
//! with default history simplification. Root commits belong to it when they
//! contain the subdirectory.

use std::path::Path;

use git2::{ErrorCode, ObjectType, Oid, Repository, Revwalk, Sort, Tree};

use crate::history::error::{HistoryError, HistoryResult};
use crate::history::types::{ChangeRecord, CommitId};

/// iterate over the changes touching a subdirectory, newest commit time first
///
/// The walk is lazy: commits are looked up one at a time as the iterator
/// advances. Calling [`crate::history::LocalHistory::changes`] again gives a
/// fresh walk from the same starting commit.
pub struct ChangeIter<'repo> {
    repo: &'repo Repository,
    revwalk: Revwalk<'repo>,
    subdir: String,
}

impl<'repo> ChangeIter<'repo> {
    /// create a new change iterator starting at `start`
    pub fn new(repo: &'repo Repository, start: CommitId, subdir: &str) -> HistoryResult<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.push(start.raw())?;
        revwalk.set_sorting(Sort::TIME)?;

        Ok(Self {
            repo,
            revwalk,
            subdir: subdir.to_string(),
        })
    }

    fn visit(&self, oid: Oid) -> HistoryResult<Option<ChangeRecord>> {
        let commit = self.repo.find_commit(oid)?;
        let scoped = subtree_id(&commit.tree()?, &self.subdir)?;

        let touched = if commit.parent_count() == 0 {
            scoped.is_some()
        } else {
            let mut touched = true;
            for parent in commit.parents() {
                if subtree_id(&parent.tree()?, &self.subdir)? == scoped {
                    touched = false;
                    break;
                }
            }
            touched
        };

        if !touched {
            return Ok(None);
        }
        Ok(Some(ChangeRecord::from_git2(&commit, &self.subdir, scoped)?))
    }
}

impl<'repo> Iterator for ChangeIter<'repo> {
    type Item = HistoryResult<ChangeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = match self.revwalk.next()? {
                Ok(oid) => oid,
                Err(e) => return Some(Err(HistoryError::Git(e))),
            };
            match self.visit(oid) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// id of the tree at `subdir` inside `root`, or None when it isn't there
///
/// An empty `subdir` stands for the root tree itself.
pub(crate) fn subtree_id(root: &Tree<'_>, subdir: &str) -> HistoryResult<Option<Oid>> {
    if subdir.is_empty() {
        return Ok(Some(root.id()));
    }

    match root.get_path(Path::new(subdir)) {
        Ok(entry) if entry.kind() == Some(ObjectType::Tree) => Ok(Some(entry.id())),
        Ok(_) => Ok(None),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(HistoryError::Git(e)),
    }
}
