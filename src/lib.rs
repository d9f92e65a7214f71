//! entregas - replays assignment history into student repositories
//!
//! Instructors keep each assignment ("entrega") as a directory in a git
//! repository of their own. This crate finds a student's or group's
//! repository in the course roster, creates it if needed, and copies the
//! entrega's history into it one commit at a time through GitHub's
//! object-creation API, without ever pushing.
//!
//! # Example
//!
//! ```no_run
//! use entregas::config::Config;
//! use entregas::history::LocalHistory;
//! use entregas::remote::{BranchName, GithubClient};
//! use entregas::roster::Roster;
//! use entregas::sync::{Replayer, SyncRequest};
//!
//! let config = Config::load("conf/entregas.yml").unwrap();
//! let repo = Roster::from_config(&config).unwrap().from_legajo("54321", Some("tp1"), None).unwrap();
//!
//! let history = LocalHistory::open("entregas/tp1").unwrap();
//! let subdir = history.relative_path("entregas/tp1").unwrap();
//! let request = SyncRequest::new(BranchName::new("tp1").unwrap(), subdir, repo.contributors().unwrap());
//!
//! let client = GithubClient::new(&config.github);
//! let report = Replayer::new(client.store(repo.identity.clone()), rand::thread_rng())
//!     .sync(&history, &request)
//!     .unwrap();
//! println!("{} changes replayed", report.changes.len());
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod provision;
pub mod remote;
pub mod roster;
pub mod sync;

pub use error::{Error, Result};
