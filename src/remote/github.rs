//! GitHub git-data API backend.
//!
//! Talks to `/repos/{owner}/{name}/git/...` with a blocking agent. Request and
//! response bodies are plain serde structs so the wire format can be checked
//! without a network.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GithubConfig;
use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::types::{
    BlobEncoding, BranchName, EntryContent, NewCommit, RemoteCommit, RemoteSha, RemoteTreeItem,
    RepositoryIdentity, TreeEntry,
};
use crate::remote::ObjectStore;

const USER_AGENT: &str = concat!("entregas/", env!("CARGO_PKG_VERSION"));

/// Authenticated client for the GitHub REST API.
pub struct GithubClient {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        Self {
            agent,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    /// the token requests are authenticated with, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// object store bound to one repository
    pub fn store(&self, repo: RepositoryIdentity) -> GithubStore<'_> {
        GithubStore { client: self, repo }
    }

    /// whether the repository exists and is visible with our token
    pub fn repository_exists(&self, repo: &RepositoryIdentity) -> RemoteResult<bool> {
        let path = format!("/repos/{}", repo);
        match self.get::<serde_json::Value>("get_repo", &path, repo.full_name()) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// create a repository inside the owner organization
    pub fn create_org_repository(&self, repo: &RepositoryIdentity, settings: &NewRepository) -> RemoteResult<()> {
        let path = format!("/orgs/{}/repos", repo.owner());
        let body = CreateRepositoryRequest {
            name: repo.name(),
            settings,
        };
        self.send::<serde_json::Value, _>("create_repo", "POST", &path, &body, repo.owner())?;
        Ok(())
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let request = self
            .agent
            .request(method, &format!("{}{}", self.api_url, path))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28")
            .set("User-Agent", USER_AGENT);

        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(&self, op: &'static str, path: &str, what: &str) -> RemoteResult<T> {
        debug!(op, path, "GET");
        let response = self.request("GET", path).call().map_err(|e| map_error(op, what, e))?;
        decode(op, response)
    }

    fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        op: &'static str,
        method: &str,
        path: &str,
        body: &B,
        what: &str,
    ) -> RemoteResult<T> {
        debug!(op, path, method, "send");
        let response = self
            .request(method, path)
            .send_json(body)
            .map_err(|e| map_error(op, what, e))?;
        decode(op, response)
    }
}

/// Settings for repositories created during provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRepository {
    pub private: bool,
    pub has_wiki: bool,
    pub has_projects: bool,
    pub has_downloads: bool,
    pub allow_squash_merge: bool,
    pub allow_rebase_merge: bool,
}

impl Default for NewRepository {
    fn default() -> Self {
        Self {
            private: true,
            has_wiki: false,
            has_projects: false,
            has_downloads: false,
            allow_squash_merge: false,
            allow_rebase_merge: false,
        }
    }
}

/// [`ObjectStore`] over one GitHub repository.
pub struct GithubStore<'a> {
    client: &'a GithubClient,
    repo: RepositoryIdentity,
}

impl GithubStore<'_> {
    fn path(&self, rest: &str) -> String {
        format!("/repos/{}/git/{}", self.repo, rest)
    }
}

impl ObjectStore for GithubStore<'_> {
    fn read_ref(&self, branch: &BranchName) -> RemoteResult<RemoteSha> {
        let path = self.path(&format!("ref/heads/{}", branch));
        let response: RefResponse = self.client.get("read_ref", &path, &branch.as_ref_path())?;
        Ok(response.object.sha)
    }

    fn read_commit(&self, sha: &RemoteSha) -> RemoteResult<RemoteCommit> {
        let path = self.path(&format!("commits/{}", sha));
        let response: CommitResponse = self.client.get("read_commit", &path, sha.as_str())?;
        response.into_commit()
    }

    fn read_tree(&self, sha: &RemoteSha) -> RemoteResult<Vec<RemoteTreeItem>> {
        let path = self.path(&format!("trees/{}", sha));
        let response: TreeResponse = self.client.get("read_tree", &path, sha.as_str())?;
        Ok(response.tree)
    }

    fn create_blob(&self, content: &str, encoding: BlobEncoding) -> RemoteResult<RemoteSha> {
        let body = BlobRequest {
            content,
            encoding: encoding.as_str(),
        };
        let response: ShaResponse = self
            .client
            .send("create_blob", "POST", &self.path("blobs"), &body, self.repo.full_name())?;
        Ok(response.sha)
    }

    fn create_tree(&self, base: Option<&RemoteSha>, entries: &[TreeEntry]) -> RemoteResult<RemoteSha> {
        let body = TreeRequest::new(base, entries);
        let response: ShaResponse = self
            .client
            .send("create_tree", "POST", &self.path("trees"), &body, self.repo.full_name())?;
        Ok(response.sha)
    }

    fn create_commit(&self, commit: &NewCommit) -> RemoteResult<RemoteSha> {
        let body = CommitRequest::new(commit);
        let response: ShaResponse = self
            .client
            .send("create_commit", "POST", &self.path("commits"), &body, self.repo.full_name())?;
        Ok(response.sha)
    }

    fn update_ref(&self, branch: &BranchName, sha: &RemoteSha) -> RemoteResult<()> {
        let body = RefUpdateRequest {
            sha: sha.as_str(),
            force: false,
        };
        let path = self.path(&format!("refs/heads/{}", branch));
        self.client
            .send::<serde_json::Value, _>("update_ref", "PATCH", &path, &body, &branch.as_ref_path())?;
        Ok(())
    }
}

fn map_error(op: &'static str, what: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(404, _) => RemoteError::NotFound {
            op,
            what: what.to_string(),
        },
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            RemoteError::Api {
                op,
                status,
                message: api_message(&body),
            }
        }
        ureq::Error::Transport(transport) => RemoteError::Transport {
            op,
            message: transport.to_string(),
        },
    }
}

/// the `message` field of a GitHub error body, or the raw body
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn decode<T: DeserializeOwned>(op: &'static str, response: ureq::Response) -> RemoteResult<T> {
    response.into_json().map_err(|e| RemoteError::Decode {
        op,
        message: e.to_string(),
    })
}

/// Parse an API timestamp as UTC.
///
/// The API reports dates in UTC. The wall-clock part is taken as UTC even if
/// the string carries another offset.
pub(crate) fn parse_api_date(date: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|d| d.naive_local().and_utc())
}

#[derive(Debug, Deserialize)]
struct ShaResponse {
    sha: RemoteSha,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Debug, Deserialize)]
struct PersonResponse {
    name: String,
    email: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: RemoteSha,
    tree: ShaResponse,
    parents: Vec<ShaResponse>,
    message: String,
    author: PersonResponse,
}

impl CommitResponse {
    fn into_commit(self) -> RemoteResult<RemoteCommit> {
        let authored = parse_api_date(&self.author.date).ok_or_else(|| RemoteError::Decode {
            op: "read_commit",
            message: format!("invalid author date '{}'", self.author.date),
        })?;

        Ok(RemoteCommit {
            sha: self.sha,
            tree: self.tree.sha,
            parents: self.parents.into_iter().map(|p| p.sha).collect(),
            message: self.message,
            author_name: self.author.name,
            author_email: self.author.email,
            authored,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<RemoteTreeItem>,
}

#[derive(Debug, Serialize)]
struct BlobRequest<'a> {
    content: &'a str,
    encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct TreeItemRequest<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TreeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<TreeItemRequest<'a>>,
}

impl<'a> TreeRequest<'a> {
    fn new(base: Option<&'a RemoteSha>, entries: &'a [TreeEntry]) -> Self {
        let tree = entries
            .iter()
            .map(|entry| {
                let (content, sha) = match &entry.content {
                    EntryContent::Inline(text) => (Some(text.as_str()), None),
                    EntryContent::Blob(sha) => (None, Some(sha.as_str())),
                };
                TreeItemRequest {
                    path: &entry.path,
                    mode: &entry.mode,
                    kind: "blob",
                    content,
                    sha,
                }
            })
            .collect();

        Self {
            base_tree: base.map(RemoteSha::as_str),
            tree,
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthorRequest<'a> {
    name: &'a str,
    email: &'a str,
    date: String,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
    author: AuthorRequest<'a>,
}

impl<'a> CommitRequest<'a> {
    fn new(commit: &'a NewCommit) -> Self {
        Self {
            message: &commit.message,
            tree: commit.tree.as_str(),
            parents: commit.parents.iter().map(RemoteSha::as_str).collect(),
            author: AuthorRequest {
                name: &commit.author.name,
                email: &commit.author.email,
                date: commit.author.date.to_rfc3339(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RefUpdateRequest<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Debug, Serialize)]
struct CreateRepositoryRequest<'a> {
    name: &'a str,
    #[serde(flatten)]
    settings: &'a NewRepository,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::types::AuthorIdentity;
    use serde_json::json;

    fn status_error(status: u16, text: &str, body: &str) -> ureq::Error {
        ureq::Error::Status(status, ureq::Response::new(status, text, body).unwrap())
    }

    #[test]
    fn test_missing_object_maps_to_not_found() {
        let body = r#"{"message":"Not Found"}"#;
        let err = map_error("read_ref", "refs/heads/tp9", status_error(404, "Not Found", body));
        assert!(err.is_not_found());
        assert_eq!(err.operation(), "read_ref");
        assert!(matches!(err, RemoteError::NotFound { ref what, .. } if what == "refs/heads/tp9"));
    }

    #[test]
    fn test_rejected_request_keeps_status_and_message() {
        let body = r#"{"message":"Update is not a fast forward","documentation_url":"https://docs.github.com"}"#;
        let err = map_error("update_ref", "tp1", status_error(422, "Unprocessable Entity", body));
        assert!(!err.is_not_found());
        match err {
            RemoteError::Api { op, status, message } => {
                assert_eq!(op, "update_ref");
                assert_eq!(status, 422);
                assert_eq!(message, "Update is not a fast forward");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_error_body_is_kept_verbatim() {
        let err = map_error("create_blob", "a.c", status_error(502, "Bad Gateway", "upstream timeout\n"));
        assert!(matches!(
            err,
            RemoteError::Api { status: 502, ref message, .. } if message == "upstream timeout"
        ));
    }

    #[test]
    fn test_transport_failure_is_not_an_api_error() {
        let err = ureq::get("not a url").call().unwrap_err();
        let err = map_error("read_commit", "abc", err);
        assert!(matches!(err, RemoteError::Transport { op: "read_commit", .. }));
    }

    #[test]
    fn test_api_date_is_taken_as_utc() {
        let date = parse_api_date("2020-04-20T15:30:00Z").unwrap();
        assert_eq!(date.to_rfc3339(), "2020-04-20T15:30:00+00:00");

        // a stated offset is ignored, the wall clock is UTC
        let date = parse_api_date("2020-04-20T15:30:00-03:00").unwrap();
        assert_eq!(date.to_rfc3339(), "2020-04-20T15:30:00+00:00");

        assert!(parse_api_date("ayer").is_none());
    }

    #[test]
    fn test_tree_request_body() {
        let entries = vec![
            TreeEntry::inline("tp1/main.c", "100644", "hello\n"),
            TreeEntry::blob("tp1/img.png", "100644", RemoteSha::new("b10b")),
        ];
        let base = RemoteSha::new("base");
        let body = serde_json::to_value(TreeRequest::new(Some(&base), &entries)).unwrap();

        assert_eq!(
            body,
            json!({
                "base_tree": "base",
                "tree": [
                    {"path": "tp1/main.c", "mode": "100644", "type": "blob", "content": "hello\n"},
                    {"path": "tp1/img.png", "mode": "100644", "type": "blob", "sha": "b10b"},
                ]
            })
        );

        let body = serde_json::to_value(TreeRequest::new(None, &[])).unwrap();
        assert_eq!(body, json!({"tree": []}));
    }

    #[test]
    fn test_commit_request_body() {
        let date = DateTime::parse_from_rfc3339("2020-05-01T10:00:00-03:00").unwrap();
        let commit = NewCommit {
            message: "tp1: enunciado\n".to_string(),
            tree: RemoteSha::new("t1"),
            parents: vec![RemoteSha::new("p1")],
            author: AuthorIdentity::noreply("octocat", date),
        };
        let body = serde_json::to_value(CommitRequest::new(&commit)).unwrap();

        assert_eq!(
            body,
            json!({
                "message": "tp1: enunciado\n",
                "tree": "t1",
                "parents": ["p1"],
                "author": {
                    "name": "octocat",
                    "email": "octocat@users.noreply.github.com",
                    "date": "2020-05-01T10:00:00-03:00",
                }
            })
        );
    }

    #[test]
    fn test_commit_response_decoding() {
        let body = json!({
            "sha": "c0ffee",
            "tree": {"sha": "t1", "url": "https://api.github.com/x"},
            "parents": [{"sha": "p1", "url": "https://api.github.com/y"}],
            "message": "Initial commit",
            "author": {"name": "A", "email": "a@x", "date": "2020-04-20T15:30:00Z"},
            "committer": {"name": "GitHub", "email": "noreply@github.com", "date": "2020-04-20T15:30:00Z"},
        });
        let response: CommitResponse = serde_json::from_value(body).unwrap();
        let commit = response.into_commit().unwrap();

        assert_eq!(commit.sha, RemoteSha::new("c0ffee"));
        assert_eq!(commit.tree, RemoteSha::new("t1"));
        assert_eq!(commit.parents, vec![RemoteSha::new("p1")]);
        assert_eq!(commit.authored.timestamp(), 1_587_396_600);
    }

    #[test]
    fn test_ref_and_create_repo_bodies() {
        let body = serde_json::to_value(RefUpdateRequest { sha: "abc", force: false }).unwrap();
        assert_eq!(body, json!({"sha": "abc", "force": false}));

        let settings = NewRepository::default();
        let body = serde_json::to_value(CreateRepositoryRequest {
            name: "algo2_54321",
            settings: &settings,
        })
        .unwrap();
        assert_eq!(body["name"], "algo2_54321");
        assert_eq!(body["private"], true);
        assert_eq!(body["allow_rebase_merge"], false);
    }

    #[test]
    fn test_api_message_extraction() {
        assert_eq!(api_message(r#"{"message": "Bad credentials"}"#), "Bad credentials");
        assert_eq!(api_message("  upstream timeout \n"), "upstream timeout");
    }
}
