//! Repository provisioning.
//!
//! Creates a student repository when it does not exist yet and seeds it with
//! every branch of a skeleton repository. Running it again on an existing
//! repository does nothing.

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks, Repository};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::GithubConfig;
use crate::remote::{GithubClient, RemoteError, RemoteResult, RepositoryIdentity};

const ORIGIN_PREFIX: &str = "refs/remotes/origin/";

/// What [`ensure_exists`] found or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// the repository was already there
    Existing,
    /// the repository was created, with this many skeleton branches pushed
    Created { seeded_branches: usize },
}

/// Make sure `repo` exists, creating it in its owner organization if not.
///
/// A freshly created repository is seeded from `skeleton` when one is given.
pub fn ensure_exists(
    client: &GithubClient,
    config: &GithubConfig,
    repo: &RepositoryIdentity,
    skeleton: Option<&RepositoryIdentity>,
) -> RemoteResult<Provisioned> {
    if client.repository_exists(repo)? {
        debug!(repo = %repo, "repository already exists");
        return Ok(Provisioned::Existing);
    }

    client.create_org_repository(repo, &config.new_repository)?;
    info!(repo = %repo, private = config.new_repository.private, "created repository");

    let seeded_branches = match skeleton {
        Some(skeleton) => seed(
            &clone_url(&config.web_url, skeleton),
            &clone_url(&config.web_url, repo),
            client.token(),
        )?,
        None => 0,
    };
    Ok(Provisioned::Created { seeded_branches })
}

/// HTTPS clone address of a repository
pub fn clone_url(web_url: &str, repo: &RepositoryIdentity) -> String {
    format!("{}/{}.git", web_url.trim_end_matches('/'), repo)
}

/// Copy every branch of `source` into `target`.
///
/// The source is cloned into a temporary directory and its remote-tracking
/// branches are pushed as plain branches. Returns the number of branches.
pub fn seed(source: &str, target: &str, token: Option<&str>) -> RemoteResult<usize> {
    let workdir = TempDir::new().map_err(|e| RemoteError::Transport {
        op: "seed",
        message: format!("cannot create a working directory: {}", e),
    })?;

    let repo = clone(source, workdir.path(), token)?;
    let names = remote_branch_refs(&repo)?;
    let refspecs = branch_refspecs(names.iter().map(String::as_str));
    if refspecs.is_empty() {
        debug!(source, "skeleton has no branches");
        return Ok(0);
    }

    let mut remote = repo.remote_anonymous(target).map_err(RemoteError::git("seed"))?;
    let mut options = PushOptions::new();
    options.remote_callbacks(callbacks(token));
    remote
        .push(&refspecs, Some(&mut options))
        .map_err(RemoteError::git("seed"))?;

    info!(source, target, branches = refspecs.len(), "seeded repository");
    Ok(refspecs.len())
}

fn clone(url: &str, into: &Path, token: Option<&str>) -> RemoteResult<Repository> {
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks(token));
    RepoBuilder::new()
        .fetch_options(fetch)
        .clone(url, into)
        .map_err(RemoteError::git("seed"))
}

fn remote_branch_refs(repo: &Repository) -> RemoteResult<Vec<String>> {
    let references = repo
        .references_glob(&format!("{}*", ORIGIN_PREFIX))
        .map_err(RemoteError::git("seed"))?;

    let mut names = Vec::new();
    for reference in references {
        let reference = reference.map_err(RemoteError::git("seed"))?;
        if let Some(name) = reference.name() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// `refs/remotes/origin/X:refs/heads/X` for every branch but `HEAD`
pub fn branch_refspecs<'a>(refs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    refs.into_iter()
        .filter_map(|name| name.strip_prefix(ORIGIN_PREFIX))
        .filter(|branch| *branch != "HEAD")
        .map(|branch| format!("{}{}:refs/heads/{}", ORIGIN_PREFIX, branch, branch))
        .collect()
}

/// token auth over HTTPS, as GitHub expects it for installation tokens
fn callbacks(token: Option<&str>) -> RemoteCallbacks<'static> {
    let token = token.map(str::to_string);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, _allowed| match &token {
        Some(token) => Cred::userpass_plaintext("x-access-token", token),
        None => Cred::default(),
    });
    callbacks
}
