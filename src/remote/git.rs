//!   Object store backed by a git repository on disk.
//!
//!  Mirrors what the GitHub git-data API does, using git2 directly: blobs,
//!  trees and commits go to the object database, the tree overlay is done
//!  with `TreeUpdateBuilder`, and reference updates refuse anything that is
//!  not a fast-forward, like the API does when `force` is off.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{TimeZone, Utc};
use git2::build::TreeUpdateBuilder;
use git2::{FileMode, ObjectType, Oid, Repository, Signature, Time};
use parking_lot::Mutex;

use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::types::{
    BlobEncoding, BranchName, EntryContent, NewCommit, RemoteCommit, RemoteSha, RemoteTreeItem, TreeEntry,
};
use crate::remote::ObjectStore;

/// A git repository used as the remote.
///
/// Access to the repository goes through a mutex so the store can be shared.
pub struct GitStore {
    repo: Mutex<Repository>,
    path: PathBuf,
}

impl GitStore {
    /// Open an existing repository (bare or not).
    pub fn open(path: impl AsRef<Path>) -> RemoteResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| RemoteError::NotFound {
            op: "open",
            what: path.display().to_string(),
        })?;

        Ok(Self {
            repo: Mutex::new(repo),
            path: path.to_path_buf(),
        })
    }

    /// Initialize a new bare repository.
    pub fn init_bare(path: impl AsRef<Path>) -> RemoteResult<Self> {
        let path = path.as_ref();
        let repo = Repository::init_bare(path).map_err(RemoteError::git("init"))?;

        Ok(Self {
            repo: Mutex::new(repo),
            path: path.to_path_buf(),
        })
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a function with access to the repository.
    pub fn with_repo<F, T>(&self, f: F) -> RemoteResult<T>
    where
        F: FnOnce(&Repository) -> RemoteResult<T>,
    {
        let repo = self.repo.lock();
        f(&repo)
    }

    /// Create a branch pointing at `target`. Fails if it already exists.
    pub fn create_branch(&self, branch: &BranchName, target: &RemoteSha) -> RemoteResult<()> {
        self.with_repo(|repo| {
            let oid = parse_oid("create_branch", target)?;
            let commit = repo.find_commit(oid).map_err(RemoteError::git("create_branch"))?;
            repo.branch(branch.as_str(), &commit, false)
                .map_err(RemoteError::git("create_branch"))?;
            Ok(())
        })
    }
}

impl ObjectStore for GitStore {
    fn read_ref(&self, branch: &BranchName) -> RemoteResult<RemoteSha> {
        self.with_repo(|repo| {
            let reference = repo.find_reference(&branch.as_ref_path()).map_err(|_| RemoteError::NotFound {
                op: "read_ref",
                what: branch.as_ref_path(),
            })?;
            let commit = reference.peel_to_commit().map_err(RemoteError::git("read_ref"))?;
            Ok(RemoteSha::new(commit.id().to_string()))
        })
    }

    fn read_commit(&self, sha: &RemoteSha) -> RemoteResult<RemoteCommit> {
        self.with_repo(|repo| {
            let oid = parse_oid("read_commit", sha)?;
            let commit = repo.find_commit(oid).map_err(|_| RemoteError::NotFound {
                op: "read_commit",
                what: sha.to_string(),
            })?;

            let author = commit.author();
            let authored = Utc
                .timestamp_opt(author.when().seconds(), 0)
                .single()
                .ok_or_else(|| RemoteError::Decode {
                    op: "read_commit",
                    message: format!("commit {} has an out of range author date", sha),
                })?;

            Ok(RemoteCommit {
                sha: sha.clone(),
                tree: RemoteSha::new(commit.tree_id().to_string()),
                parents: commit.parent_ids().map(|id| RemoteSha::new(id.to_string())).collect(),
                message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
                author_name: String::from_utf8_lossy(author.name_bytes()).into_owned(),
                author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
                authored,
            })
        })
    }

    fn read_tree(&self, sha: &RemoteSha) -> RemoteResult<Vec<RemoteTreeItem>> {
        self.with_repo(|repo| {
            let oid = parse_oid("read_tree", sha)?;
            let tree = repo.find_tree(oid).map_err(|_| RemoteError::NotFound {
                op: "read_tree",
                what: sha.to_string(),
            })?;

            let items = tree
                .iter()
                .map(|entry| RemoteTreeItem {
                    path: String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                    mode: format!("{:06o}", entry.filemode()),
                    kind: match entry.kind() {
                        Some(ObjectType::Tree) => "tree",
                        Some(ObjectType::Commit) => "commit",
                        _ => "blob",
                    }
                    .to_string(),
                    sha: RemoteSha::new(entry.id().to_string()),
                })
                .collect();
            Ok(items)
        })
    }

    fn create_blob(&self, content: &str, encoding: BlobEncoding) -> RemoteResult<RemoteSha> {
        let bytes = match encoding {
            BlobEncoding::Utf8 => content.as_bytes().to_vec(),
            BlobEncoding::Base64 => STANDARD.decode(content).map_err(|e| RemoteError::InvalidRequest {
                op: "create_blob",
                message: format!("invalid base64 payload: {}", e),
            })?,
        };

        self.with_repo(|repo| {
            let oid = repo.blob(&bytes).map_err(RemoteError::git("create_blob"))?;
            Ok(RemoteSha::new(oid.to_string()))
        })
    }

    fn create_tree(&self, base: Option<&RemoteSha>, entries: &[TreeEntry]) -> RemoteResult<RemoteSha> {
        self.with_repo(|repo| {
            let baseline = match base {
                Some(sha) => repo
                    .find_tree(parse_oid("create_tree", sha)?)
                    .map_err(|_| RemoteError::NotFound {
                        op: "create_tree",
                        what: format!("base tree {}", sha),
                    })?,
                None => {
                    let empty = repo
                        .treebuilder(None)
                        .and_then(|builder| builder.write())
                        .map_err(RemoteError::git("create_tree"))?;
                    repo.find_tree(empty).map_err(RemoteError::git("create_tree"))?
                }
            };

            let mut update = TreeUpdateBuilder::new();
            for entry in entries {
                let mode = parse_mode(&entry.mode)?;
                let blob = match &entry.content {
                    EntryContent::Inline(text) => repo.blob(text.as_bytes()).map_err(RemoteError::git("create_tree"))?,
                    EntryContent::Blob(sha) => {
                        let oid = parse_oid("create_tree", sha)?;
                        repo.find_blob(oid).map_err(|_| RemoteError::NotFound {
                            op: "create_tree",
                            what: format!("blob {}", sha),
                        })?;
                        oid
                    }
                };
                update.upsert(entry.path.as_str(), blob, mode);
            }

            let oid = update
                .create_updated(repo, &baseline)
                .map_err(RemoteError::git("create_tree"))?;
            Ok(RemoteSha::new(oid.to_string()))
        })
    }

    fn create_commit(&self, commit: &NewCommit) -> RemoteResult<RemoteSha> {
        self.with_repo(|repo| {
            let tree = repo
                .find_tree(parse_oid("create_commit", &commit.tree)?)
                .map_err(|_| RemoteError::NotFound {
                    op: "create_commit",
                    what: format!("tree {}", commit.tree),
                })?;

            // collect parent commits
            let parents: Vec<git2::Commit<'_>> = commit
                .parents
                .iter()
                .map(|sha| {
                    let oid = parse_oid("create_commit", sha)?;
                    repo.find_commit(oid).map_err(|_| RemoteError::NotFound {
                        op: "create_commit",
                        what: format!("parent {}", sha),
                    })
                })
                .collect::<Result<_, _>>()?;
            let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

            let date = commit.author.date;
            let time = Time::new(date.timestamp(), date.offset().local_minus_utc() / 60);
            let sig = Signature::new(&commit.author.name, &commit.author.email, &time)
                .map_err(RemoteError::git("create_commit"))?;

            // the API records the author as committer when none is given
            let oid = repo
                .commit(None, &sig, &sig, &commit.message, &tree, &parent_refs)
                .map_err(RemoteError::git("create_commit"))?;
            Ok(RemoteSha::new(oid.to_string()))
        })
    }

    fn update_ref(&self, branch: &BranchName, sha: &RemoteSha) -> RemoteResult<()> {
        self.with_repo(|repo| {
            let target = parse_oid("update_ref", sha)?;
            let mut reference = repo.find_reference(&branch.as_ref_path()).map_err(|_| RemoteError::NotFound {
                op: "update_ref",
                what: branch.as_ref_path(),
            })?;

            let current = reference.peel_to_commit().map_err(RemoteError::git("update_ref"))?.id();
            let fast_forward = current == target
                || repo
                    .graph_descendant_of(target, current)
                    .map_err(RemoteError::git("update_ref"))?;
            if !fast_forward {
                return Err(RemoteError::Api {
                    op: "update_ref",
                    status: 422,
                    message: "Update is not a fast forward".to_string(),
                });
            }

            reference
                .set_target(target, &format!("entregas: update {} to {}", branch, sha.short()))
                .map_err(RemoteError::git("update_ref"))?;
            Ok(())
        })
    }
}

fn parse_oid(op: &'static str, sha: &RemoteSha) -> RemoteResult<Oid> {
    Oid::from_str(sha.as_str()).map_err(|_| RemoteError::InvalidRequest {
        op,
        message: format!("'{}' is not an object id", sha),
    })
}

/// map the API's octal mode strings onto git2 file modes
fn parse_mode(mode: &str) -> RemoteResult<FileMode> {
    match mode {
        "100644" => Ok(FileMode::Blob),
        "100755" => Ok(FileMode::BlobExecutable),
        "100664" => Ok(FileMode::BlobGroupWritable),
        "120000" => Ok(FileMode::Link),
        other => Err(RemoteError::InvalidRequest {
            op: "create_tree",
            message: format!("unsupported file mode '{}'", other),
        }),
    }
}
