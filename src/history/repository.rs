//!   Local source history.
//!
//!  Wraps the git repository holding the instructor's entregas and answers the
//!  two questions the sync engine asks of it: which commits changed a given
//!  directory, and what did that directory contain at each of them.

use std::path::{Component, Path, PathBuf};

use git2::{ErrorCode, ObjectType, Repository, Tree};

use crate::history::error::{HistoryError, HistoryResult};
use crate::history::types::{ChangeRecord, CommitId, SnapshotFile};
use crate::history::walk::ChangeIter;

/// The local history store.
pub struct LocalHistory {
    repo: Repository,
    root: PathBuf,
}

impl LocalHistory {
    /// Open the repository containing `path`, searching parent directories.
    pub fn open(path: impl AsRef<Path>) -> HistoryResult<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|_| HistoryError::NotARepository(path.to_path_buf()))?;
        let root = repo
            .workdir()
            .ok_or_else(|| HistoryError::BareRepository(repo.path().to_path_buf()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Wrap an already opened repository.
    pub fn from_repository(repo: Repository) -> HistoryResult<Self> {
        let root = repo
            .workdir()
            .ok_or_else(|| HistoryError::BareRepository(repo.path().to_path_buf()))?
            .to_path_buf();
        Ok(Self { repo, root })
    }

    /// Path of `dir` relative to the repository root, `/`-separated.
    ///
    /// Returns an empty string for the root itself.
    pub fn relative_path(&self, dir: impl AsRef<Path>) -> HistoryResult<String> {
        let dir = dir.as_ref();
        let root = self.root.canonicalize()?;
        let absolute = dir.canonicalize()?;

        let relative = absolute
            .strip_prefix(&root)
            .map_err(|_| HistoryError::OutsideRepository {
                path: dir.to_path_buf(),
                root: root.clone(),
            })?;

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        Ok(parts.join("/"))
    }

    /// Get the current HEAD commit.
    pub fn head(&self) -> HistoryResult<CommitId> {
        let head = self.repo.head().map_err(|e| {
            if e.code() == ErrorCode::UnbornBranch {
                HistoryError::EmptyRepository
            } else {
                HistoryError::Git(e)
            }
        })?;

        let commit = head.peel_to_commit()?;
        Ok(CommitId::new(commit.id()))
    }

    /// Changes touching `subdir` reachable from HEAD, newest first.
    pub fn changes(&self, subdir: &str) -> HistoryResult<ChangeIter<'_>> {
        let head = self.head()?;
        ChangeIter::new(&self.repo, head, subdir)
    }

    /// Read every file of the change's snapshot.
    ///
    /// Entries come in tree order, each directory's files interleaved with
    /// its subdirectories the way git stores them.
    pub fn snapshot(&self, change: &ChangeRecord) -> HistoryResult<Vec<SnapshotFile>> {
        let tree_id = change.snapshot_tree()?;
        let tree = self.repo.find_tree(tree_id.raw())?;

        let mut files = Vec::new();
        collect_files(&self.repo, &tree, "", &mut files)?;
        Ok(files)
    }
}

fn collect_files(repo: &Repository, tree: &Tree<'_>, prefix: &str, out: &mut Vec<SnapshotFile>) -> HistoryResult<()> {
    for entry in tree.iter() {
        let name = String::from_utf8_lossy(entry.name_bytes()).into_owned();
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        match entry.kind() {
            Some(ObjectType::Tree) => {
                let subtree = repo.find_tree(entry.id())?;
                collect_files(repo, &subtree, &path, out)?;
            }
            Some(ObjectType::Blob) => {
                let blob = repo.find_blob(entry.id())?;
                out.push(SnapshotFile::new(path, entry.filemode(), blob.content()));
            }
            Some(ObjectType::Commit) => {
                out.push(SnapshotFile::new(path, entry.filemode(), Vec::new()));
            }
            other => {
                return Err(HistoryError::UnexpectedEntryType {
                    path,
                    expected: "blob, tree or commit".to_string(),
                    found: format!("{:?}", other),
                });
            }
        }
    }
    Ok(())
}
