//! Store wrapper for tests: records every call and injects failures.

use parking_lot::Mutex;

use crate::remote::{
    AuthorIdentity, BlobEncoding, BranchName, NewCommit, ObjectStore, RemoteCommit, RemoteError, RemoteResult,
    RemoteSha, RemoteTreeItem, TreeEntry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ReadRef(String),
    ReadCommit(RemoteSha),
    ReadTree(RemoteSha),
    CreateBlob { content: String, encoding: BlobEncoding },
    CreateTree { base: Option<RemoteSha>, entries: Vec<TreeEntry> },
    CreateCommit(NewCommit),
    UpdateRef(String, RemoteSha),
}

impl Call {
    fn is_write(&self) -> bool {
        matches!(
            self,
            Call::CreateBlob { .. } | Call::CreateTree { .. } | Call::CreateCommit(_) | Call::UpdateRef(..)
        )
    }
}

pub(crate) struct RecordingStore<S> {
    inner: S,
    calls: Mutex<Vec<Call>>,
    commits: Mutex<usize>,
    fail_commit_at: Option<usize>,
    fail_blobs: bool,
    interfere_on_commit: Option<BranchName>,
}

impl<S: ObjectStore> RecordingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            commits: Mutex::new(0),
            fail_commit_at: None,
            fail_blobs: false,
            interfere_on_commit: None,
        }
    }

    /// make the n-th (1-based) create_commit call fail
    pub(crate) fn fail_commit_at(mut self, n: usize) -> Self {
        self.fail_commit_at = Some(n);
        self
    }

    /// make every create_blob call fail
    pub(crate) fn fail_blobs(mut self) -> Self {
        self.fail_blobs = true;
        self
    }

    /// after the first commit is created, advance `branch` on the inner store
    /// as another writer would
    pub(crate) fn interfere_on_commit(mut self, branch: BranchName) -> Self {
        self.interfere_on_commit = Some(branch);
        self
    }

    pub(crate) fn inner(&self) -> &S {
        &self.inner
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn writes(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_write()).count()
    }

    pub(crate) fn blob_calls(&self) -> Vec<(String, BlobEncoding)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::CreateBlob { content, encoding } => Some((content.clone(), *encoding)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn ref_updates(&self) -> usize {
        self.calls.lock().iter().filter(|c| matches!(c, Call::UpdateRef(..))).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn interfere(&self, branch: &BranchName) -> RemoteResult<()> {
        let tip = self.inner.read_ref(branch)?;
        let commit = self.inner.read_commit(&tip)?;
        let tree = self
            .inner
            .create_tree(Some(&commit.tree), &[TreeEntry::inline("intruso.txt", "100644", "otro\n")])?;
        let other = self.inner.create_commit(&NewCommit {
            message: "cambio externo".to_string(),
            tree,
            parents: vec![tip],
            author: AuthorIdentity::noreply("otro", commit.authored.fixed_offset()),
        })?;
        self.inner.update_ref(branch, &other)
    }
}

impl<S: ObjectStore> ObjectStore for RecordingStore<S> {
    fn read_ref(&self, branch: &BranchName) -> RemoteResult<RemoteSha> {
        self.record(Call::ReadRef(branch.to_string()));
        self.inner.read_ref(branch)
    }

    fn read_commit(&self, sha: &RemoteSha) -> RemoteResult<RemoteCommit> {
        self.record(Call::ReadCommit(sha.clone()));
        self.inner.read_commit(sha)
    }

    fn read_tree(&self, sha: &RemoteSha) -> RemoteResult<Vec<RemoteTreeItem>> {
        self.record(Call::ReadTree(sha.clone()));
        self.inner.read_tree(sha)
    }

    fn create_blob(&self, content: &str, encoding: BlobEncoding) -> RemoteResult<RemoteSha> {
        self.record(Call::CreateBlob {
            content: content.to_string(),
            encoding,
        });
        if self.fail_blobs {
            return Err(RemoteError::Api {
                op: "create_blob",
                status: 403,
                message: "Resource not accessible by integration".to_string(),
            });
        }
        self.inner.create_blob(content, encoding)
    }

    fn create_tree(&self, base: Option<&RemoteSha>, entries: &[TreeEntry]) -> RemoteResult<RemoteSha> {
        self.record(Call::CreateTree {
            base: base.cloned(),
            entries: entries.to_vec(),
        });
        self.inner.create_tree(base, entries)
    }

    fn create_commit(&self, commit: &NewCommit) -> RemoteResult<RemoteSha> {
        self.record(Call::CreateCommit(commit.clone()));
        let n = {
            let mut commits = self.commits.lock();
            *commits += 1;
            *commits
        };

        if self.fail_commit_at == Some(n) {
            return Err(RemoteError::Api {
                op: "create_commit",
                status: 502,
                message: "Bad Gateway".to_string(),
            });
        }

        let sha = self.inner.create_commit(commit)?;
        if n == 1 {
            if let Some(branch) = &self.interfere_on_commit {
                self.interfere(branch)?;
            }
        }
        Ok(sha)
    }

    fn update_ref(&self, branch: &BranchName, sha: &RemoteSha) -> RemoteResult<()> {
        self.record(Call::UpdateRef(branch.to_string(), sha.clone()));
        self.inner.update_ref(branch, sha)
    }
}
