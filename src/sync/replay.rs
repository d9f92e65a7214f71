//! Commit replay.
//!
//! Builds, one pending change at a time, a chain of remote trees and commits
//! on top of the branch tip, then moves the branch once. Until that final
//! reference update nothing created here is reachable, so a failure halfway
//! leaves the branch where it was and a re-run starts over from the same tip.

use chrono::{DateTime, Local, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::history::{ChangeRecord, CommitId, LocalHistory};
use crate::remote::{AuthorIdentity, BranchName, NewCommit, ObjectStore, RemoteSha};
use crate::sync::contributors::ContributorSet;
use crate::sync::select::select_pending;
use crate::sync::translate::Translator;

/// the commit a branch points to, with what the replay needs from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTip {
    pub branch: BranchName,
    pub commit: RemoteSha,
    pub tree: RemoteSha,
    pub authored: DateTime<Utc>,
}

/// What to replay and where.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub branch: BranchName,
    /// directory in the remote repository; `None` means the branch name
    pub target_dir: Option<String>,
    /// subdirectory of the local history holding the entrega
    pub subdir: String,
    pub contributors: ContributorSet,
}

impl SyncRequest {
    pub fn new(branch: BranchName, subdir: impl Into<String>, contributors: ContributorSet) -> Self {
        Self {
            branch,
            target_dir: None,
            subdir: subdir.into(),
            contributors,
        }
    }

    /// set the target directory, `""` for the repository root
    pub fn target_dir(mut self, dir: impl Into<String>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    /// directory the entrega lands in
    pub fn target(&self) -> &str {
        self.target_dir.as_deref().unwrap_or(self.branch.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// re-read the branch before moving it and fail if someone else did
    pub check_tip: bool,
    /// select only, write nothing
    pub dry_run: bool,
    /// file names never copied to the remote
    pub exclude: Vec<String>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            check_tip: false,
            dry_run: false,
            exclude: vec!["README.md".to_string()],
        }
    }
}

/// one change handled by a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedChange {
    pub source: CommitId,
    pub summary: String,
    pub authored: DateTime<Utc>,
    /// remote commit created for it; `None` on a dry run
    pub commit: Option<RemoteSha>,
    pub author: Option<String>,
}

/// Outcome of [`Replayer::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub branch: BranchName,
    pub previous_tip: RemoteSha,
    /// where the branch was moved to, if it was
    pub new_tip: Option<RemoteSha>,
    pub changes: Vec<ReplayedChange>,
}

impl SyncReport {
    fn new(tip: &RemoteTip) -> Self {
        Self {
            branch: tip.branch.clone(),
            previous_tip: tip.commit.clone(),
            new_tip: None,
            changes: Vec::new(),
        }
    }

    /// true when the remote was already up to date
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Replays local history onto a remote branch.
///
/// The branch is assumed to only ever receive commits from this replayer. An
/// external commit made while a sync runs is detected only with
/// [`ReplayOptions::check_tip`]; otherwise the final update is left to the
/// store, which rejects it when it is not a fast-forward.
pub struct Replayer<S, R> {
    store: S,
    rng: R,
    options: ReplayOptions,
}

impl<S: ObjectStore, R: Rng> Replayer<S, R> {
    pub fn new(store: S, rng: R) -> Self {
        Self {
            store,
            rng,
            options: ReplayOptions::default(),
        }
    }

    pub fn options(mut self, options: ReplayOptions) -> Self {
        self.options = options;
        self
    }

    /// read the branch and the commit it points to
    pub fn resolve_tip(&self, branch: &BranchName) -> Result<RemoteTip> {
        let sha = self.store.read_ref(branch)?;
        let commit = self.store.read_commit(&sha)?;
        debug!(branch = %branch, tip = %sha.short(), authored = %commit.authored, "resolved remote tip");

        Ok(RemoteTip {
            branch: branch.clone(),
            commit: sha,
            tree: commit.tree,
            authored: commit.authored,
        })
    }

    /// changes of `subdir` not yet on the remote, oldest first
    pub fn pending(&self, history: &LocalHistory, tip: &RemoteTip, subdir: &str) -> Result<Vec<ChangeRecord>> {
        let changes = history.changes(subdir)?;
        Ok(select_pending(tip.authored, changes)?)
    }

    /// Replay every pending change and move the branch once.
    pub fn sync(&mut self, history: &LocalHistory, request: &SyncRequest) -> Result<SyncReport> {
        let tip = self.resolve_tip(&request.branch)?;
        let pending = self.pending(history, &tip, &request.subdir)?;
        let mut report = SyncReport::new(&tip);

        if pending.is_empty() {
            warn!(branch = %request.branch, "nothing to sync, remote is up to date");
            return Ok(report);
        }

        if self.options.dry_run {
            for change in &pending {
                info!(source = %change.id.short(), authored = %change.authored, "would replay: {}", change.summary());
                report.changes.push(ReplayedChange {
                    source: change.id,
                    summary: change.summary().to_string(),
                    authored: change.authored,
                    commit: None,
                    author: None,
                });
            }
            return Ok(report);
        }

        info!(
            branch = %request.branch,
            pending = pending.len(),
            target = request.target(),
            "replaying changes"
        );

        let translator = Translator::new(request.target(), self.options.exclude.iter().cloned());
        let mut base = tip.clone();

        for change in &pending {
            let files = history.snapshot(change)?;
            let entries = translator.translate(&files, &self.store)?;
            let tree = self.store.create_tree(Some(&base.tree), &entries)?;

            let alias = request.contributors.choose(&mut self.rng).to_string();
            let date = change.authored.with_timezone(&Local).fixed_offset();
            let commit = self.store.create_commit(&NewCommit {
                message: change.message.clone(),
                tree: tree.clone(),
                parents: vec![base.commit.clone()],
                author: AuthorIdentity::noreply(&alias, date),
            })?;

            info!(
                source = %change.id.short(),
                commit = %commit.short(),
                author = %alias,
                "replayed: {}",
                change.summary()
            );
            report.changes.push(ReplayedChange {
                source: change.id,
                summary: change.summary().to_string(),
                authored: change.authored,
                commit: Some(commit.clone()),
                author: Some(alias),
            });

            base = RemoteTip {
                branch: base.branch,
                commit,
                tree,
                authored: change.authored,
            };
        }

        if self.options.check_tip {
            let found = self.store.read_ref(&request.branch)?;
            if found != tip.commit {
                return Err(Error::TipMoved {
                    branch: request.branch.clone(),
                    expected: tip.commit,
                    found,
                });
            }
        }

        self.store.update_ref(&request.branch, &base.commit)?;
        info!(
            branch = %request.branch,
            from = %tip.commit.short(),
            to = %base.commit.short(),
            "branch updated"
        );

        report.new_tip = Some(base.commit);
        Ok(report)
    }
}
