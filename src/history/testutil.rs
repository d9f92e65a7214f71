//! Git fixtures shared by the tests of this crate.

use git2::build::TreeUpdateBuilder;
use git2::{FileMode, Repository, Signature, Time};
use tempfile::TempDir;

use crate::history::types::CommitId;

pub(crate) fn setup_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

pub(crate) fn signature_at(seconds: i64) -> Signature<'static> {
    Signature::new("Docente", "docente@example.com", &Time::new(seconds, 0)).unwrap()
}

fn head_commit(repo: &Repository) -> Option<git2::Commit<'_>> {
    repo.head().ok().and_then(|head| head.peel_to_commit().ok())
}

fn commit_update(
    repo: &Repository,
    authored: i64,
    committed: i64,
    message: &str,
    update: &mut TreeUpdateBuilder,
) -> CommitId {
    let parent = head_commit(repo);
    let baseline = match &parent {
        Some(commit) => commit.tree().unwrap(),
        None => {
            let empty = repo.treebuilder(None).unwrap().write().unwrap();
            repo.find_tree(empty).unwrap()
        }
    };

    let tree_id = update.create_updated(repo, &baseline).unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let author = signature_at(authored);
    let committer = signature_at(committed);
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &author, &committer, message, &tree, &parents)
        .unwrap();
    CommitId::new(oid)
}

/// commit regular files on top of HEAD
pub(crate) fn commit_files(repo: &Repository, seconds: i64, message: &str, files: &[(&str, &[u8])]) -> CommitId {
    let entries: Vec<_> = files
        .iter()
        .map(|(path, content)| (*path, *content, FileMode::Blob))
        .collect();
    commit_entries(repo, seconds, message, &entries)
}

/// like [`commit_files`], committed at a different time than authored
pub(crate) fn commit_files_at(
    repo: &Repository,
    authored: i64,
    committed: i64,
    message: &str,
    files: &[(&str, &[u8])],
) -> CommitId {
    let mut update = TreeUpdateBuilder::new();
    for (path, content) in files {
        let blob = repo.blob(content).unwrap();
        update.upsert(*path, blob, FileMode::Blob);
    }
    commit_update(repo, authored, committed, message, &mut update)
}

/// commit files with explicit modes on top of HEAD
pub(crate) fn commit_entries(
    repo: &Repository,
    seconds: i64,
    message: &str,
    files: &[(&str, &[u8], FileMode)],
) -> CommitId {
    let mut update = TreeUpdateBuilder::new();
    for (path, content, mode) in files {
        let blob = repo.blob(content).unwrap();
        update.upsert(*path, blob, *mode);
    }
    commit_update(repo, seconds, seconds, message, &mut update)
}

/// commit the removal of a path on top of HEAD
pub(crate) fn commit_removal(repo: &Repository, seconds: i64, message: &str, path: &str) -> CommitId {
    let mut update = TreeUpdateBuilder::new();
    update.remove(path);
    commit_update(repo, seconds, seconds, message, &mut update)
}
