//! Pending-change selection.

use chrono::{DateTime, Utc};

use crate::history::{ChangeRecord, HistoryResult};

/// Changes newer than the remote tip, oldest first.
///
/// `changes` is the scoped history, newest first by commit time. A change is
/// pending when its authored time is strictly after `tip_time`; one authored
/// in the same second as the tip counts as already applied. The result is
/// ordered by authored time, ties keeping history order, so the replayed tip
/// always carries the latest authored time. Every pending change must still
/// contain the scoped subdirectory.
pub fn select_pending<I>(tip_time: DateTime<Utc>, changes: I) -> HistoryResult<Vec<ChangeRecord>>
where
    I: IntoIterator<Item = HistoryResult<ChangeRecord>>,
{
    let mut pending = Vec::new();
    for change in changes {
        let change = change?;
        if change.authored > tip_time {
            change.snapshot_tree()?;
            pending.push(change);
        }
    }

    pending.reverse();
    pending.sort_by_key(|change| change.authored);
    Ok(pending)
}
