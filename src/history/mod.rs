//! local history layer for entregas
//!
//! this module reads the instructor's git repository, where each entrega
//! lives in its own directory and every commit touching that directory is a
//! change to be replayed into the student repositories. The sync engine uses
//! this API and never touches git2 for the source side directly.
//!
//! # Usage
//!
//! ```ignore
//! use entregas::history::LocalHistory;
//!
//! let history = LocalHistory::open("./entregas/tp2")?;
//! let subdir = history.relative_path("./entregas/tp2")?;
//!
//! // newest first
//! for change in history.changes(&subdir)? {
//!     let change = change?;
//!     let files = history.snapshot(&change)?;
//! }
//! ```

mod error;
mod repository;
mod types;
mod walk;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{HistoryError, HistoryResult};
pub use repository::LocalHistory;
pub use types::{ChangeRecord, CommitId, SnapshotFile, TreeId};
pub use walk::ChangeIter;
