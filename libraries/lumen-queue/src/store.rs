//! Authoritative queue state
//!
//! ```text
//! entries:  [A] [B] [C] [D]
//!                    ^ current (index 2, identity of C)
//! version:  bumps on every structural change
//! shuffle:  flag + optional backup of the pre-shuffle order
//! ```
//!
//! The current position is tracked by identity as well as by index. After a
//! structural edit the index is re-derived: the positionally expected slot is
//! kept if it still holds the current identity, otherwise the first slot
//! with that identity is used, otherwise nothing is current.

use crate::error::{QueueError, Result};
use crate::shuffle::{self, Reconciliation, Restored, ShuffleBackup};
use crate::types::{EntryId, QueueEntry, QueueSnapshot, StructuralEdit};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Ordered entries plus current position and shuffle state
#[derive(Debug, Clone, Default)]
pub struct QueueStore {
    /// Entries in play order (duplicates allowed)
    entries: Vec<QueueEntry>,

    /// Current position
    current: Option<usize>,

    /// Identity of the current entry
    current_id: Option<EntryId>,

    /// Whether the entries are a shuffled view
    shuffle_enabled: bool,

    /// Pre-shuffle order, while it can still be restored
    backup: Option<ShuffleBackup>,

    /// Monotonic change token
    version: u64,
}

impl QueueStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Queries =====

    /// Entries in play order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at index
    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// Current position
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Current entry
    pub fn current_entry(&self) -> Option<&QueueEntry> {
        self.current.and_then(|index| self.entries.get(index))
    }

    /// Monotonic change token
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the entries are a shuffled view
    pub fn is_shuffled(&self) -> bool {
        self.shuffle_enabled
    }

    /// Backup that turning shuffle off would restore from
    pub fn shuffle_backup(&self) -> Option<&ShuffleBackup> {
        self.backup.as_ref()
    }

    /// Current index and version
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current_index: self.current,
            version: self.version,
        }
    }

    /// First position holding this identity
    pub fn position_of(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == *id)
    }

    /// Mutable access for presentation flags
    ///
    /// Identity and source cannot change through this, so the version is not
    /// bumped.
    pub fn entry_mut(&mut self, index: usize) -> Option<&mut QueueEntry> {
        self.entries.get_mut(index)
    }

    // ===== Position =====

    /// Make the first entry with this identity current, or clear the position
    ///
    /// Only the index is tracked here; flipping the entries' `active` flags is
    /// the caller's job.
    pub fn set_current(&mut self, entry: Option<&EntryId>) -> QueueSnapshot {
        let index = entry.and_then(|id| self.position_of(id));
        self.set_current_index(index)
    }

    /// Make the entry at this exact position current
    ///
    /// Out-of-range positions clear the current entry.
    pub fn set_current_index(&mut self, index: Option<usize>) -> QueueSnapshot {
        self.current = index.filter(|&i| i < self.entries.len());
        self.current_id = self.current.map(|i| self.entries[i].id());
        self.snapshot()
    }

    // ===== Structural edits =====

    /// Replace the whole list
    ///
    /// Counts as a reset for shuffle purposes: any backup is dropped.
    pub fn load(&mut self, entries: Vec<QueueEntry>, current: Option<&EntryId>) -> QueueSnapshot {
        self.entries = entries;
        self.reconcile(&StructuralEdit::Reset);
        self.current = current.and_then(|id| self.position_of(id));
        self.current_id = self.current.map(|i| self.entries[i].id());
        self.finish_mutation()
    }

    /// Insert an entry; `index == len` appends
    pub fn insert(&mut self, index: usize, entry: QueueEntry) -> Result<QueueSnapshot> {
        if index > self.entries.len() {
            return Err(self.out_of_bounds(index));
        }

        self.entries.insert(index, entry.clone());
        let expected = self.current.map(|c| if index <= c { c + 1 } else { c });
        self.reconcile(&StructuralEdit::Added(vec![entry]));
        self.relocate_current(expected);
        Ok(self.finish_mutation())
    }

    /// Append entries to the end
    pub fn append(&mut self, entries: Vec<QueueEntry>) -> QueueSnapshot {
        if entries.is_empty() {
            return self.snapshot();
        }

        self.entries.extend(entries.iter().cloned());
        self.reconcile(&StructuralEdit::Added(entries));
        self.relocate_current(self.current);
        self.finish_mutation()
    }

    /// Remove the entry at index
    pub fn remove_at(&mut self, index: usize) -> Result<QueueSnapshot> {
        if index >= self.entries.len() {
            return Err(self.out_of_bounds(index));
        }

        let removed = self.entries.remove(index);
        let expected = self.current.and_then(|c| match c.cmp(&index) {
            Ordering::Less => Some(c),
            Ordering::Equal => None,
            Ordering::Greater => Some(c - 1),
        });
        self.reconcile(&StructuralEdit::Removed(vec![removed]));
        self.relocate_current(expected);
        Ok(self.finish_mutation())
    }

    /// Swap the entry at index for another
    pub fn replace(&mut self, index: usize, entry: QueueEntry) -> Result<QueueSnapshot> {
        if index >= self.entries.len() {
            return Err(self.out_of_bounds(index));
        }

        let old = std::mem::replace(&mut self.entries[index], entry.clone());
        self.reconcile(&StructuralEdit::Replaced {
            old: vec![old],
            new: vec![entry],
        });
        self.relocate_current(self.current);
        Ok(self.finish_mutation())
    }

    /// Swap a run of entries starting at `start` for the same number of new ones
    pub fn replace_range(
        &mut self,
        start: usize,
        entries: Vec<QueueEntry>,
    ) -> Result<QueueSnapshot> {
        let end = start.saturating_add(entries.len());
        if end > self.entries.len() {
            return Err(self.out_of_bounds(end.saturating_sub(1)));
        }
        if entries.is_empty() {
            return Ok(self.snapshot());
        }

        let old: Vec<QueueEntry> = self
            .entries
            .splice(start..end, entries.iter().cloned())
            .collect();
        self.reconcile(&StructuralEdit::Replaced { old, new: entries });
        self.relocate_current(self.current);
        Ok(self.finish_mutation())
    }

    /// Move an entry from one position to another
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<QueueSnapshot> {
        let len = self.entries.len();
        if from >= len {
            return Err(self.out_of_bounds(from));
        }
        if to >= len {
            return Err(self.out_of_bounds(to));
        }
        if from == to {
            return Ok(self.snapshot());
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry.clone());
        let expected = self.current.map(|c| {
            if c == from {
                to
            } else if from < c && c <= to {
                c - 1
            } else if to <= c && c < from {
                c + 1
            } else {
                c
            }
        });
        self.reconcile(&StructuralEdit::Moved { entry, to });
        self.relocate_current(expected);
        Ok(self.finish_mutation())
    }

    /// Remove every entry
    pub fn clear(&mut self) -> QueueSnapshot {
        self.entries.clear();
        self.reconcile(&StructuralEdit::Reset);
        self.current = None;
        self.current_id = None;
        self.finish_mutation()
    }

    // ===== Shuffle =====

    /// Turn shuffle on or off, returning the resulting order
    ///
    /// Turning it on permutes the entries and keeps the current entry current.
    /// Turning it off restores the reconciled original order; without a
    /// backup the current order is kept as-is. A backup that no longer lines
    /// up with the entries yields a fresh shuffle, and shuffle stays on.
    pub fn set_shuffle(&mut self, enabled: bool) -> &[QueueEntry] {
        if enabled == self.shuffle_enabled || (enabled && self.entries.is_empty()) {
            return &self.entries;
        }

        if enabled {
            let shuffled = shuffle::shuffle(&self.entries, self.current);
            self.entries = shuffled.entries;
            self.current = shuffled.current;
            self.backup = (self.entries.len() > 1).then_some(shuffled.backup);
            self.shuffle_enabled = true;
            debug!("Shuffled {} entries", self.entries.len());
        } else {
            self.shuffle_enabled = false;
            match self.backup.take().map(|backup| shuffle::restore(backup, &self.entries)) {
                Some(Restored::Original(entries)) => {
                    self.entries = entries;
                    self.relocate_current(None);
                    debug!("Restored original order of {} entries", self.entries.len());
                }
                Some(Restored::Reshuffled(entries)) => {
                    // Still a shuffled view, just without a way back
                    self.entries = entries;
                    self.shuffle_enabled = true;
                    self.relocate_current(None);
                }
                None => debug!("No shuffle backup; keeping current order"),
            }
        }

        self.finish_mutation();
        &self.entries
    }

    // ===== Internal =====

    /// Fold a structural edit into the shuffle state
    ///
    /// Every mutation reports itself here after the entries reflect it.
    fn reconcile(&mut self, edit: &StructuralEdit) {
        if let Some(backup) = self.backup.as_mut() {
            if backup.reconcile(edit) == Reconciliation::Discard {
                debug!("Shuffle backup discarded after {} edit", edit.kind());
                self.backup = None;
            }
        }

        // Nothing meaningful to restore with zero or one entry left
        if self.entries.len() <= 1 && self.backup.take().is_some() {
            debug!("Shuffle backup discarded: {} entries left", self.entries.len());
        }
    }

    fn out_of_bounds(&self, index: usize) -> QueueError {
        QueueError::IndexOutOfBounds {
            index,
            len: self.entries.len(),
        }
    }

    fn relocate_current(&mut self, expected: Option<usize>) {
        let Some(id) = self.current_id else {
            self.current = None;
            return;
        };

        self.current = expected
            .filter(|&i| self.entries.get(i).is_some_and(|entry| entry.id() == id))
            .or_else(|| self.position_of(&id));

        if self.current.is_none() {
            self.current_id = None;
        }
    }

    /// Re-derive the current index if it no longer points at the current
    /// identity
    fn repair_current(&mut self) {
        let consistent = match (self.current, self.current_id) {
            (None, None) => true,
            (Some(index), Some(id)) => self.entries.get(index).is_some_and(|e| e.id() == id),
            _ => false,
        };

        if !consistent {
            warn!(
                "Current index {:?} inconsistent with queue of {}; recomputing",
                self.current,
                self.entries.len()
            );
            self.relocate_current(None);
        }
    }

    fn finish_mutation(&mut self) -> QueueSnapshot {
        self.repair_current();

        if self.entries.is_empty() {
            self.current = None;
            self.current_id = None;
            self.shuffle_enabled = false;
            self.backup = None;
        }

        self.version += 1;
        self.snapshot()
    }
}
