//! Roster lookup errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::InvalidNameError;

#[derive(Debug, Error)]
pub enum RosterError {
    /// the roster file could not be read
    #[error("cannot read roster {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// the roster has no header row
    #[error("roster is empty")]
    Empty,

    /// a column the lookup needs is not in the header
    #[error("roster has no column '{0}'")]
    MissingColumn(String),

    #[error("legajo(s) {} not found in roster", .0.join(", "))]
    LegajoNotFound(Vec<String>),

    #[error("group {0} not found in roster")]
    GroupNotFound(String),

    /// the rows were found but the repository column is blank
    #[error("column {column} is empty for {}", .legajos.join(", "))]
    NoRepository { column: String, legajos: Vec<String> },

    /// rows of the same group disagree on the repository
    #[error("multiple candidate repositories: {}", .0.join(", "))]
    AmbiguousRepository(Vec<String>),

    #[error("an entrega and a forced column cannot be given together")]
    IncompatibleOptions,

    #[error("invalid repository in roster: {0}")]
    InvalidRepository(#[from] InvalidNameError),
}

impl RosterError {
    /// check if this error indicates the student or group doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, RosterError::LegajoNotFound(_) | RosterError::GroupNotFound(_))
    }
}

pub type RosterResult<T> = std::result::Result<T, RosterError>;
