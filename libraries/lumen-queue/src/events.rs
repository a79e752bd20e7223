//! Queue events
//!
//! Two kinds of messages flow through the engine:
//! - [`QueueEvent`]s go out to the UI and are drained by the caller
//! - [`Completion`]s come back from background work (neighbor expansion,
//!   resource warm-up) and are applied by the owner of the queue

use crate::expander::ExpansionOutcome;
use crate::prefetch::WarmupReport;
use crate::types::EntryId;
use serde::{Deserialize, Serialize};

/// Events emitted for UI synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueEvent {
    /// A different entry became current (or nothing is current any more)
    CurrentChanged {
        /// New current position
        index: Option<usize>,
        /// ID of the new current entry
        entry_id: Option<EntryId>,
        /// ID of the previously current entry
        previous_entry_id: Option<EntryId>,
    },

    /// Entries were added, removed, replaced, moved or reordered
    QueueChanged {
        /// New queue length
        length: usize,
        /// Version after the change
        version: u64,
    },

    /// Shuffle was turned on or off
    ShuffleChanged {
        /// Whether shuffle is now on
        enabled: bool,
    },

    /// The current entry should be played again from zero
    RestartRequested {
        /// ID of the entry to restart
        entry_id: EntryId,
    },

    /// The current entry finished and nothing follows it
    PlaybackEnded,

    /// Neighbor expansion started for a single-entry queue
    ExpansionStarted {
        /// ID of the entry whose folder is being enumerated
        entry_id: EntryId,
    },

    /// Neighbor expansion replaced the queue
    ExpansionCompleted {
        /// Number of siblings added around the original entry
        added: usize,
    },

    /// Neighbor expansion failed; the queue is unchanged
    ExpansionFailed {
        /// Error message
        message: String,
    },

    /// An entry's resources could not be prepared
    WarmupFailed {
        /// ID of the entry that failed
        entry_id: EntryId,
        /// Error message
        message: String,
    },
}

/// Results of background work, applied on the queue's owner
#[derive(Debug)]
pub enum Completion {
    /// A neighbor expansion finished, failed or was cancelled
    Expansion(ExpansionOutcome),

    /// A batch of warm-ups finished
    Warmup(WarmupReport),
}
