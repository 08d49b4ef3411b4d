//! History snapshots and their debounce timer.
//!
//! Snapshots are taken after a quiet period following the last edit. There
//! is exactly one pending deadline for the whole application: a new edit,
//! even to a different note, cancels and re-arms it against the note being
//! edited.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::{Note, Snapshot};

/// Appends a snapshot of the note's current body. Returns `false` when the
/// body matches the latest snapshot. Oldest entries are evicted beyond
/// `capacity`.
pub fn push_snapshot(note: &mut Note, capacity: usize, now: DateTime<Utc>) -> bool {
    if note.history.last().is_some_and(|s| s.body == note.body) {
        return false;
    }

    note.history.push(Snapshot {
        body: note.body.clone(),
        timestamp: now,
    });
    while note.history.len() > capacity {
        note.history.remove(0);
    }

    debug!(
        "Snapshot recorded for note {} ({} kept)",
        note.id,
        note.history.len()
    );
    true
}

/// The single application-wide debounce deadline for history snapshots.
#[derive(Debug, Default)]
pub struct SnapshotTimer {
    pending: Option<PendingSnapshot>,
}

#[derive(Debug)]
struct PendingSnapshot {
    note_id: String,
    due_at: DateTime<Utc>,
}

impl SnapshotTimer {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Starts (or restarts) the quiet-period countdown for a note. Any
    /// pending deadline is replaced, regardless of which note it targeted.
    pub fn arm(&mut self, note_id: &str, now: DateTime<Utc>, window: Duration) {
        self.pending = Some(PendingSnapshot {
            note_id: note_id.to_string(),
            due_at: now + window,
        });
    }

    /// Drops any pending deadline.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// The note the pending deadline is armed against, if any.
    pub fn pending_note(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.note_id.as_str())
    }

    /// Takes the pending deadline if its quiet period has elapsed, returning
    /// the note it was armed against.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<String> {
        if self.pending.as_ref().is_some_and(|p| now >= p.due_at) {
            self.pending.take().map(|p| p.note_id)
        } else {
            None
        }
    }
}
