//! Crate-level error type.
//!
//! Wraps the per-layer errors transparently: the message a caller sees is the
//! one the failing layer produced, naming the store call or roster lookup
//! that went wrong.

use thiserror::Error;

use crate::config::ConfigError;
use crate::history::HistoryError;
use crate::remote::{BranchName, InvalidNameError, RemoteError, RemoteSha};
use crate::roster::RosterError;

/// the main error type of the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// a contributor set needs at least one alias
    #[error("no contributors to attribute commits to")]
    NoContributors,

    /// the branch was moved by someone else while we were replaying
    #[error("branch {branch} moved from {expected} to {found} during sync")]
    TipMoved {
        branch: BranchName,
        expected: RemoteSha,
        found: RemoteSha,
    },
}

impl Error {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_not_found(),
            Error::History(e) => e.is_not_found(),
            Error::Roster(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;
