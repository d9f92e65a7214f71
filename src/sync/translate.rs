//! Snapshot to remote tree-entry translation.
//!
//! Text files travel inline with the tree request. Anything that is not valid
//! UTF-8 is uploaded first as a base64 blob and referenced by sha.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::history::SnapshotFile;
use crate::remote::{BlobEncoding, ObjectStore, RemoteResult, TreeEntry};

/// Translates snapshot files into tree entries for one target directory.
#[derive(Debug, Clone)]
pub struct Translator {
    target_dir: String,
    exclude: Vec<String>,
}

impl Translator {
    /// `target_dir` is where the snapshot lands in the remote repository,
    /// `""` being the root. `exclude` lists file names that are never copied.
    pub fn new<I, S>(target_dir: &str, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_dir: target_dir.trim_end_matches('/').to_string(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// path of a snapshot file in the remote repository
    pub fn remap(&self, path: &str) -> String {
        if self.target_dir.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.target_dir, path)
        }
    }

    /// whether the last segment of `path` is an excluded name
    pub fn is_excluded(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.exclude.iter().any(|excluded| excluded == name)
    }

    /// Build the tree entries for a snapshot, in snapshot order.
    ///
    /// Creates one blob per binary file. Excluded files and submodule links
    /// produce neither a blob nor an entry.
    pub fn translate<S>(&self, files: &[SnapshotFile], store: &S) -> RemoteResult<Vec<TreeEntry>>
    where
        S: ObjectStore + ?Sized,
    {
        let mut entries = Vec::with_capacity(files.len());

        for file in files {
            if self.is_excluded(&file.path) {
                debug!(path = %file.path, "excluded from sync");
                continue;
            }
            if file.is_gitlink() {
                warn!(path = %file.path, "skipping submodule entry");
                continue;
            }

            let path = self.remap(&file.path);
            let mode = format_mode(file.mode);

            let entry = match std::str::from_utf8(&file.content) {
                Ok(text) => TreeEntry::inline(path, mode, text),
                Err(_) => {
                    debug!(path = %path, bytes = file.content.len(), "binary content, uploading blob");
                    let payload = STANDARD.encode(&file.content);
                    let sha = store.create_blob(&payload, BlobEncoding::Base64)?;
                    TreeEntry::blob(path, mode, sha)
                }
            };
            entries.push(entry);
        }

        Ok(entries)
    }
}

/// git file mode as the octal string the API expects
pub fn format_mode(mode: i32) -> String {
    format!("{:o}", mode)
}
