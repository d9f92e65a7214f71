//! the synchronization engine
//!
//! ```text
//!   LocalHistory ──changes──▶ select_pending ──▶ pending changes (oldest first)
//!                                                     │
//!                              ┌──────────────────────┘
//!                              ▼
//!   snapshot ──▶ Translator ──▶ create_tree ──▶ create_commit ──▶ ... ──▶ update_ref
//! ```
//!
//! [`Replayer`] drives the other two: it selects what the remote branch is
//! missing, translates each change into tree entries and chains the new
//! commits on the remote before moving the branch once.

mod contributors;
mod replay;
mod select;
mod translate;

pub use contributors::ContributorSet;
pub use replay::{RemoteTip, ReplayOptions, ReplayedChange, Replayer, SyncReport, SyncRequest};
pub use select::select_pending;
pub use translate::{format_mode, Translator};
