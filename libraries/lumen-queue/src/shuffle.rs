//! Shuffle and restore
//!
//! Turning shuffle on keeps a [`ShuffleBackup`] of the pre-shuffle order.
//! Edits made to the shuffled view are folded into that backup as they
//! happen, so turning shuffle off lands on the original order minus whatever
//! was removed in between. When an edit cannot be accounted for the backup
//! is dropped and restoring becomes a no-op.

use crate::types::{EntryId, QueueEntry, StructuralEdit};
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::{HashMap, VecDeque};

/// Pre-shuffle order plus the removals made since
#[derive(Debug, Clone, Default)]
pub struct ShuffleBackup {
    /// Order immediately before shuffling
    original_order: Vec<QueueEntry>,

    /// Identities removed from the shuffled view (multiset)
    pending_removals: Vec<EntryId>,
}

/// Whether a backup survives an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Backup still describes a valid original order
    Keep,

    /// Backup can no longer be trusted and must be dropped
    Discard,
}

impl ShuffleBackup {
    /// Start a backup from the order about to be shuffled
    pub fn new(original_order: Vec<QueueEntry>) -> Self {
        Self {
            original_order,
            pending_removals: Vec::new(),
        }
    }

    /// Order the backup will restore to, before pending removals
    pub fn original_order(&self) -> &[QueueEntry] {
        &self.original_order
    }

    /// Identities removed since the backup was taken
    pub fn pending_removals(&self) -> &[EntryId] {
        &self.pending_removals
    }

    /// Fold an edit of the shuffled view into the backup
    pub fn reconcile(&mut self, edit: &StructuralEdit) -> Reconciliation {
        match edit {
            StructuralEdit::Removed(entries) => {
                self.pending_removals.extend(entries.iter().map(QueueEntry::id));
                Reconciliation::Keep
            }
            StructuralEdit::Added(entries) => {
                for entry in entries {
                    // A re-added entry cancels its earlier removal
                    match self.pending_removals.iter().position(|id| *id == entry.id()) {
                        Some(pos) => {
                            self.pending_removals.swap_remove(pos);
                        }
                        None => return Reconciliation::Discard,
                    }
                }
                Reconciliation::Keep
            }
            StructuralEdit::Replaced { old, new } => match (old.as_slice(), new.as_slice()) {
                ([old], [new]) => self.substitute(old, new),
                // Batch replace has no reliable mapping back to the original
                _ => Reconciliation::Discard,
            },
            StructuralEdit::Moved { .. } => Reconciliation::Keep,
            StructuralEdit::Reset => Reconciliation::Discard,
        }
    }

    fn substitute(&mut self, old: &QueueEntry, new: &QueueEntry) -> Reconciliation {
        match self
            .original_order
            .iter()
            .position(|entry| entry.id() == old.id())
        {
            Some(pos) => {
                self.original_order[pos] = new.clone();
                Reconciliation::Keep
            }
            None => Reconciliation::Discard,
        }
    }
}

/// Output of [`shuffle`]
#[derive(Debug, Clone)]
pub struct Shuffled {
    /// Permuted entries
    pub entries: Vec<QueueEntry>,

    /// Where the previously current entry ended up
    pub current: Option<usize>,

    /// Backup of the input order
    pub backup: ShuffleBackup,
}

/// Output of [`restore`]
#[derive(Debug, Clone)]
pub enum Restored {
    /// Original order, reconciled against edits made while shuffled
    Original(Vec<QueueEntry>),

    /// The backup did not line up with the view; a fresh shuffle of the view
    Reshuffled(Vec<QueueEntry>),
}

impl Restored {
    /// Resulting entries either way
    pub fn into_entries(self) -> Vec<QueueEntry> {
        match self {
            Restored::Original(entries) | Restored::Reshuffled(entries) => entries,
        }
    }
}

/// Uniformly permute the entries (Fisher-Yates)
///
/// The current entry is not pinned to the front, but the returned `current`
/// points at it wherever it landed. Positions are permuted rather than
/// identities, so duplicates of the current entry cannot be confused.
pub fn shuffle(entries: &[QueueEntry], current: Option<usize>) -> Shuffled {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.shuffle(&mut thread_rng());

    let new_current = current.and_then(|index| order.iter().position(|&i| i == index));
    let shuffled = order.iter().map(|&i| entries[i].clone()).collect();

    Shuffled {
        entries: shuffled,
        current: new_current,
        backup: ShuffleBackup::new(entries.to_vec()),
    }
}

/// Turn a shuffled view back into its original order
///
/// Entry values are taken from `view`, so presentation flags set while
/// shuffled survive the restore.
pub fn restore(backup: ShuffleBackup, view: &[QueueEntry]) -> Restored {
    match reconcile_original(backup, view) {
        Some(entries) => Restored::Original(entries),
        None => {
            tracing::warn!(
                "Shuffle backup does not match the queue ({} entries); reshuffling instead",
                view.len()
            );
            let mut entries = view.to_vec();
            entries.shuffle(&mut thread_rng());
            Restored::Reshuffled(entries)
        }
    }
}

fn reconcile_original(backup: ShuffleBackup, view: &[QueueEntry]) -> Option<Vec<QueueEntry>> {
    let ShuffleBackup {
        mut original_order,
        pending_removals,
    } = backup;

    for id in pending_removals {
        let pos = original_order.iter().position(|entry| entry.id() == id)?;
        original_order.remove(pos);
    }

    if original_order.len() != view.len() {
        return None;
    }

    let mut live: HashMap<EntryId, VecDeque<&QueueEntry>> = HashMap::new();
    for entry in view {
        live.entry(entry.id()).or_default().push_back(entry);
    }

    original_order
        .iter()
        .map(|entry| {
            live.get_mut(&entry.id())
                .and_then(VecDeque::pop_front)
                .cloned()
        })
        .collect()
}
