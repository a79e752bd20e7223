//! Buffer window around the current entry
//!
//! Entries inside the window have their resources warm; everything else is
//! released. The window is recomputed after every position or membership
//! change, so computing it costs O(radius) regardless of queue length.
//!
//! ```text
//! radius 1, len 5, current 0
//! Off/Track:  [0] [1]  .   .   .        clamped
//! All:        [0] [1]  .   .  [4]       wraps, like navigation does
//! ```

use crate::types::{QueueEntry, RepeatMode};

/// Indices that should be warm, in window order, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferWindow {
    indices: Vec<usize>,
}

impl BufferWindow {
    /// Indices from the back edge to the front edge
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Whether an index is inside the window
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Number of indices in the window
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Compute the warm window around `current`
///
/// Under `All` the window wraps circularly because navigation wraps. When
/// the window would cover the queue more than once each index appears once.
pub fn compute_window(
    current: Option<usize>,
    len: usize,
    repeat: RepeatMode,
    radius: usize,
) -> BufferWindow {
    let Some(current) = current.filter(|&index| index < len) else {
        return BufferWindow::default();
    };

    let indices = if repeat == RepeatMode::All {
        let span = radius.saturating_mul(2).saturating_add(1).min(len);
        let start = (current + len - radius % len) % len;
        (0..span).map(|offset| (start + offset) % len).collect()
    } else {
        let low = current.saturating_sub(radius);
        let high = current.saturating_add(radius).min(len - 1);
        (low..=high).collect()
    };

    BufferWindow { indices }
}

/// Entries entering and leaving the warm set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowDiff {
    /// Newly inside the window: schedule warm-up
    pub warm: Vec<QueueEntry>,

    /// Newly outside the window: release resources
    pub release: Vec<QueueEntry>,
}

impl WindowDiff {
    /// Nothing to do
    pub fn is_empty(&self) -> bool {
        self.warm.is_empty() && self.release.is_empty()
    }
}

/// Keeps the warm set and diffs it against each new window
///
/// Diffing is by identity, so an entry that merely shifted position (an
/// insert before it, a shuffle) stays warm and is not touched again.
#[derive(Debug, Clone)]
pub struct BufferWindowManager {
    radius: usize,
    warm: Vec<QueueEntry>,
}

impl BufferWindowManager {
    /// Create a manager with the given radius
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            warm: Vec::new(),
        }
    }

    /// Change the radius; takes effect on the next recompute
    pub fn set_radius(&mut self, radius: usize) {
        self.radius = radius;
    }

    /// Entries currently considered warm
    pub fn warm_entries(&self) -> &[QueueEntry] {
        &self.warm
    }

    /// Recompute the window and return what changed
    pub fn recompute(
        &mut self,
        entries: &[QueueEntry],
        current: Option<usize>,
        repeat: RepeatMode,
    ) -> WindowDiff {
        let window = compute_window(current, entries.len(), repeat, self.radius);

        let mut next: Vec<QueueEntry> = Vec::with_capacity(window.len());
        for &index in window.indices() {
            let entry = &entries[index];
            if !next.iter().any(|warm| warm.id() == entry.id()) {
                next.push(entry.clone());
            }
        }

        let warm = next
            .iter()
            .filter(|entry| !self.warm.iter().any(|w| w.id() == entry.id()))
            .cloned()
            .collect();
        let release = self
            .warm
            .iter()
            .filter(|w| !next.iter().any(|entry| entry.id() == w.id()))
            .cloned()
            .collect();

        self.warm = next;
        WindowDiff { warm, release }
    }

    /// Stop counting entries as warm without releasing them
    ///
    /// For warm-ups that never started; the next recompute that still
    /// covers them warms them again.
    pub fn forget(&mut self, entries: &[QueueEntry]) {
        self.warm
            .retain(|warm| !entries.iter().any(|entry| entry.id() == warm.id()));
    }

    /// Release everything
    pub fn reset(&mut self) -> WindowDiff {
        WindowDiff {
            warm: Vec::new(),
            release: std::mem::take(&mut self.warm),
        }
    }
}
