//! Queue controller - single owner of the queue
//!
//! Every mutation goes through here. After each position or membership
//! change the controller:
//! 1. syncs the entries' `active` flags with the current position
//! 2. queues [`QueueEvent`]s for the UI
//! 3. recomputes the buffer window and hands the diff to the prefetcher
//! 4. re-evaluates whether neighbor expansion should run
//!
//! Background work never touches the queue directly. It reports back as
//! [`Completion`]s, which the owner applies with [`QueueController::poll_completions`]
//! or [`QueueController::next_completion`].

use crate::error::{QueueError, Result};
use crate::events::{Completion, QueueEvent};
use crate::expander::{ExpansionOutcome, NeighborExpander, SiblingSource};
use crate::navigation::{self, NavigationResult, Step};
use crate::prefetch::{Prefetcher, ResourceLoader, WarmupReport};
use crate::settings::QueueSettings;
use crate::store::QueueStore;
use crate::types::{EntryId, QueueEntry, QueueSnapshot, RepeatMode, StructuralEdit};
use crate::window::BufferWindowManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Expansion attempt for one entry at one store version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExpansionAttempt {
    entry_id: EntryId,
    version: u64,
}

/// What the UI last saw
#[derive(Debug, Clone, Copy, Default)]
struct Observed {
    index: Option<usize>,
    entry_id: Option<EntryId>,
    version: u64,
    shuffled: bool,
}

/// Owns the queue and everything that reacts to it
pub struct QueueController {
    store: QueueStore,
    settings: QueueSettings,

    window: BufferWindowManager,
    prefetcher: Prefetcher,
    expander: NeighborExpander,

    // Background work reports back here
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,

    // Last expansion started; blocks retries until the user loads again
    attempted: Option<ExpansionAttempt>,

    observed: Observed,

    // Event queue for UI synchronization
    pending_events: Vec<QueueEvent>,
}

impl QueueController {
    /// Create a controller with an empty queue
    pub fn new(
        settings: QueueSettings,
        siblings: Arc<dyn SiblingSource>,
        loader: Arc<dyn ResourceLoader>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            store: QueueStore::new(),
            window: BufferWindowManager::new(settings.window_radius),
            prefetcher: Prefetcher::new(loader),
            expander: NeighborExpander::new(siblings, settings.sibling_batch_size),
            settings,
            completions_tx,
            completions_rx,
            attempted: None,
            observed: Observed::default(),
            pending_events: Vec::new(),
        }
    }

    // ===== Queries =====

    /// Queue state
    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Entries in play order
    pub fn entries(&self) -> &[QueueEntry] {
        self.store.entries()
    }

    /// Current entry
    pub fn current_entry(&self) -> Option<&QueueEntry> {
        self.store.current_entry()
    }

    /// Current index and version
    pub fn snapshot(&self) -> QueueSnapshot {
        self.store.snapshot()
    }

    /// Active settings
    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn repeat(&self) -> RepeatMode {
        self.settings.repeat
    }

    /// Entries currently kept warm
    pub fn warm_entries(&self) -> &[QueueEntry] {
        self.window.warm_entries()
    }

    /// Whether a "next" control should be enabled
    pub fn can_advance(&self) -> bool {
        navigation::can_advance(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
            self.expansion_pending(),
        )
    }

    /// Whether a "previous" control should be enabled
    pub fn can_retreat(&self) -> bool {
        navigation::can_retreat(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
            self.expansion_pending(),
        )
    }

    /// Entry that plays when the current one finishes
    pub fn peek_next(&self) -> Option<&QueueEntry> {
        match navigation::handle_end_of_track(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
        ) {
            Step::Move(index) | Step::Restart(index) => self.store.get(index),
            Step::Terminal => None,
        }
    }

    // ===== Structural edits =====

    /// Replace the whole queue
    ///
    /// If shuffle is on, the new list is shuffled with `current` kept current.
    pub fn load(&mut self, entries: Vec<QueueEntry>, current: Option<&EntryId>) -> QueueSnapshot {
        // An explicit load may expand again, even the same entry
        self.attempted = None;
        self.load_entries(entries, current);
        self.after_change();
        self.store.snapshot()
    }

    /// Insert an entry; `index == len` appends
    pub fn insert(&mut self, index: usize, entry: QueueEntry) -> Result<QueueSnapshot> {
        let snapshot = self.store.insert(index, entry)?;
        self.after_change();
        Ok(snapshot)
    }

    /// Append entries to the end
    pub fn append(&mut self, entries: Vec<QueueEntry>) -> QueueSnapshot {
        let snapshot = self.store.append(entries);
        self.after_change();
        snapshot
    }

    /// Queue an entry to play right after the current one
    pub fn play_next(&mut self, entry: QueueEntry) -> QueueSnapshot {
        let index = self
            .store
            .current_index()
            .map_or(0, |current| current + 1);
        let snapshot = match self.store.insert(index, entry) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Play-next insert rejected: {}", e);
                self.store.snapshot()
            }
        };
        self.after_change();
        snapshot
    }

    /// Remove the entry at index
    pub fn remove_at(&mut self, index: usize) -> Result<QueueSnapshot> {
        let snapshot = self.store.remove_at(index)?;
        self.after_change();
        Ok(snapshot)
    }

    /// Swap the entry at index for another
    pub fn replace(&mut self, index: usize, entry: QueueEntry) -> Result<QueueSnapshot> {
        let snapshot = self.store.replace(index, entry)?;
        self.after_change();
        Ok(snapshot)
    }

    /// Swap a run of entries for the same number of new ones
    pub fn replace_range(
        &mut self,
        start: usize,
        entries: Vec<QueueEntry>,
    ) -> Result<QueueSnapshot> {
        let snapshot = self.store.replace_range(start, entries)?;
        self.after_change();
        Ok(snapshot)
    }

    /// Move an entry to another position
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<QueueSnapshot> {
        let snapshot = self.store.move_entry(from, to)?;
        self.after_change();
        Ok(snapshot)
    }

    /// Remove every entry
    pub fn clear(&mut self) -> QueueSnapshot {
        let snapshot = self.store.clear();
        self.after_change();
        snapshot
    }

    /// Apply an edit described by the entries it affects
    ///
    /// For owners that track edits by identity rather than position.
    /// Removals and replacements must name entries that are in the queue
    /// (replacements as one contiguous run); additions append; `Reset`
    /// clears. A mismatched edit is rejected and leaves the queue untouched.
    pub fn on_structural_edit(&mut self, edit: &StructuralEdit) -> Result<QueueSnapshot> {
        let snapshot = match edit {
            StructuralEdit::Added(entries) => self.store.append(entries.clone()),
            StructuralEdit::Removed(entries) => {
                let mut indices = self.positions_of(entries)?;
                indices.sort_unstable_by(|a, b| b.cmp(a));
                for index in indices {
                    self.store.remove_at(index)?;
                }
                self.store.snapshot()
            }
            StructuralEdit::Replaced { old, new } => {
                if old.len() != new.len() {
                    return Err(QueueError::EditMismatch(format!(
                        "{} entries replaced by {}",
                        old.len(),
                        new.len()
                    )));
                }
                let start = self.run_start(old)?;
                self.store.replace_range(start, new.clone())?
            }
            StructuralEdit::Moved { entry, to } => {
                let from = self.positions_of(std::slice::from_ref(entry))?[0];
                self.store.move_entry(from, *to)?
            }
            StructuralEdit::Reset => self.store.clear(),
        };

        self.after_change();
        Ok(snapshot)
    }

    // ===== Position =====

    /// Make the first entry with this identity current, or clear the position
    pub fn set_current(&mut self, entry: Option<&EntryId>) -> QueueSnapshot {
        let snapshot = self.store.set_current(entry);
        self.after_change();
        snapshot
    }

    /// Skip forward
    pub fn next(&mut self) -> NavigationResult {
        let step = navigation::get_next(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
        );
        self.apply_step(step)
    }

    /// Skip back, or restart the current entry if it has played long enough
    pub fn previous(&mut self, elapsed: Duration) -> NavigationResult {
        if let Some(index) = self.store.current_index() {
            if navigation::should_restart_on_previous(
                elapsed,
                self.settings.previous_restart_threshold(),
            ) {
                return self.apply_step(Step::Restart(index));
            }
        }

        let step = navigation::get_previous(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
        );
        self.apply_step(step)
    }

    /// The current entry finished on its own
    pub fn end_of_track(&mut self) -> NavigationResult {
        let step = navigation::handle_end_of_track(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
        );

        if step == Step::Terminal {
            debug!("End of queue reached");
            self.pending_events.push(QueueEvent::PlaybackEnded);
        }

        self.apply_step(step)
    }

    // ===== Modes =====

    /// Turn shuffle on or off, returning the resulting order
    pub fn set_shuffle(&mut self, enabled: bool) -> &[QueueEntry] {
        self.store.set_shuffle(enabled);
        self.after_change();
        self.store.entries()
    }

    /// Change the repeat mode
    pub fn set_repeat(&mut self, mode: RepeatMode) {
        if self.settings.repeat != mode {
            self.settings.repeat = mode;
            // The window wraps only under All
            self.refresh_window();
        }
    }

    /// Apply changed settings
    pub fn apply_settings(&mut self, settings: QueueSettings) -> Result<()> {
        settings.validate()?;

        self.window.set_radius(settings.window_radius);
        self.expander.set_batch_size(settings.sibling_batch_size);
        self.settings = settings;

        self.refresh_window();
        self.maybe_expand();
        Ok(())
    }

    // ===== Background completions =====

    /// Whether background work has yet to report back
    pub fn has_background_work(&self) -> bool {
        self.expander.is_in_flight() || self.prefetcher.has_in_flight()
    }

    /// Apply every completion that has already arrived
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next completion and apply it
    ///
    /// Returns `false` without waiting when no background work is
    /// outstanding.
    pub async fn next_completion(&mut self) -> bool {
        if !self.has_background_work() {
            return false;
        }

        match self.completions_rx.recv().await {
            Some(completion) => {
                self.handle_completion(completion);
                true
            }
            None => false,
        }
    }

    // ===== Events =====

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<QueueEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    /// Cancel background work and release every warm entry
    pub fn shutdown(&mut self) {
        self.expander.cancel();
        self.prefetcher.cancel_all();
        let diff = self.window.reset();
        self.prefetcher.apply(diff, &self.completions_tx);
    }

    // ===== Internal =====

    /// Distinct positions holding these entries, one per occurrence asked for
    fn positions_of(&self, entries: &[QueueEntry]) -> Result<Vec<usize>> {
        let mut taken: Vec<usize> = Vec::with_capacity(entries.len());
        for entry in entries {
            let index = self
                .store
                .entries()
                .iter()
                .enumerate()
                .position(|(i, e)| e.id() == entry.id() && !taken.contains(&i))
                .ok_or_else(|| {
                    QueueError::EditMismatch(format!("{} is not in the queue", entry.source()))
                })?;
            taken.push(index);
        }
        Ok(taken)
    }

    /// Start of the first run of entries matching `run` identity for identity
    fn run_start(&self, run: &[QueueEntry]) -> Result<usize> {
        if run.is_empty() {
            return Ok(0);
        }
        self.store
            .entries()
            .windows(run.len())
            .position(|window| window.iter().zip(run).all(|(a, b)| a.id() == b.id()))
            .ok_or_else(|| {
                QueueError::EditMismatch(format!(
                    "no run of {} replaced entries in the queue",
                    run.len()
                ))
            })
    }

    fn load_entries(&mut self, entries: Vec<QueueEntry>, current: Option<&EntryId>) {
        let shuffled = self.store.is_shuffled();
        self.store.load(entries, current);

        if shuffled && self.store.is_shuffled() {
            // Load drops the backup; shuffle the new list from its given order
            self.store.set_shuffle(false);
            self.store.set_shuffle(true);
        }
    }

    fn apply_step(&mut self, step: Step) -> NavigationResult {
        match step {
            Step::Move(index) => {
                self.store.set_current_index(Some(index));
                self.after_change();
            }
            Step::Restart(index) => {
                if let Some(entry) = self.store.get(index) {
                    self.pending_events.push(QueueEvent::RestartRequested {
                        entry_id: entry.id(),
                    });
                }
            }
            Step::Terminal => {}
        }

        NavigationResult::from_step(step, self.store.entries())
    }

    fn after_change(&mut self) {
        self.sync_active();
        self.emit_changes();
        self.refresh_window();
        self.maybe_expand();
    }

    fn sync_active(&mut self) {
        let current = self.store.current_index();
        for index in 0..self.store.len() {
            if let Some(entry) = self.store.entry_mut(index) {
                entry.active = current == Some(index);
            }
        }
    }

    fn emit_changes(&mut self) {
        let version = self.store.version();
        let structural = version != self.observed.version;
        if structural {
            self.observed.version = version;
            self.pending_events.push(QueueEvent::QueueChanged {
                length: self.store.len(),
                version,
            });
        }

        let shuffled = self.store.is_shuffled();
        if shuffled != self.observed.shuffled {
            self.observed.shuffled = shuffled;
            self.pending_events
                .push(QueueEvent::ShuffleChanged { enabled: shuffled });
        }

        let index = self.store.current_index();
        let entry_id = self.store.current_entry().map(QueueEntry::id);
        // An index shifted by an edit is not a move; stepping between
        // duplicates of one identity is
        let moved = entry_id != self.observed.entry_id
            || (index != self.observed.index && !structural);
        if moved {
            self.pending_events.push(QueueEvent::CurrentChanged {
                index,
                entry_id,
                previous_entry_id: self.observed.entry_id,
            });
        }
        self.observed.index = index;
        self.observed.entry_id = entry_id;
    }

    fn refresh_window(&mut self) {
        let diff = self.window.recompute(
            self.store.entries(),
            self.store.current_index(),
            self.settings.repeat,
        );
        if !diff.is_empty() {
            let skipped = self.prefetcher.apply(diff, &self.completions_tx);
            self.window.forget(&skipped);
        }
    }

    /// The sole entry, if the queue is eligible for expansion
    fn expandable_entry(&self) -> Option<&QueueEntry> {
        if !self.settings.expand_to_siblings || self.store.len() != 1 {
            return None;
        }
        self.store
            .get(0)
            .filter(|entry| entry.source().is_folder_backed())
    }

    /// Whether the queue may still grow through a running expansion
    fn expansion_pending(&self) -> bool {
        self.expandable_entry()
            .is_some_and(|entry| self.expander.in_flight_for(&entry.id()))
    }

    fn maybe_expand(&mut self) {
        let Some(entry) = self.expandable_entry().cloned() else {
            if self.expander.cancel() {
                // Never finished, so it may run again later
                self.attempted = None;
                debug!("Queue no longer expandable; expansion cancelled");
            }
            return;
        };

        let version = self.store.version();
        if let Some(attempt) = self.attempted.filter(|a| a.entry_id == entry.id()) {
            let stale = self.expander.in_flight_for(&entry.id()) && attempt.version != version;
            if !stale {
                return;
            }
        }

        if self
            .expander
            .start(&entry, version, &self.completions_tx)
            .is_some()
        {
            self.attempted = Some(ExpansionAttempt {
                entry_id: entry.id(),
                version,
            });
            self.pending_events.push(QueueEvent::ExpansionStarted {
                entry_id: entry.id(),
            });
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Expansion(outcome) => self.apply_expansion(outcome),
            Completion::Warmup(report) => self.apply_warmup(&report),
        }
    }

    fn apply_expansion(&mut self, outcome: ExpansionOutcome) {
        if !self.expander.accept(&outcome) {
            debug!("Dropping superseded expansion {:?}", outcome.ticket);
            return;
        }

        let unchanged = outcome.version == self.store.version()
            && self.store.len() == 1
            && self
                .store
                .get(0)
                .is_some_and(|entry| entry.id() == outcome.entry_id);
        if !unchanged {
            debug!("Dropping stale expansion {:?}", outcome.ticket);
            return;
        }

        match outcome.result {
            Ok(Some(entries)) => {
                let added = entries.len().saturating_sub(1);
                debug!("Expansion added {} siblings", added);

                // The original entry is current at its new position
                self.load_entries(entries, Some(&outcome.entry_id));
                self.after_change();
                self.pending_events
                    .push(QueueEvent::ExpansionCompleted { added });
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Neighbor expansion failed: {}", e);
                self.pending_events.push(QueueEvent::ExpansionFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    fn apply_warmup(&mut self, report: &WarmupReport) {
        self.prefetcher.settle(report);

        for id in &report.warmed {
            self.set_available(*id, true);
        }

        for failure in &report.failures {
            self.set_available(failure.entry_id, false);
            self.pending_events.push(QueueEvent::WarmupFailed {
                entry_id: failure.entry_id,
                message: failure.message.clone(),
            });
        }
    }

    fn set_available(&mut self, id: EntryId, available: bool) {
        for index in 0..self.store.len() {
            if let Some(entry) = self.store.entry_mut(index) {
                if entry.id() == id {
                    entry.available = available;
                }
            }
        }
    }
}

impl Drop for QueueController {
    fn drop(&mut self) {
        self.expander.cancel();
        self.prefetcher.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::SiblingBatches;
    use crate::types::EntrySource;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct NoSiblings;

    #[async_trait]
    impl SiblingSource for NoSiblings {
        async fn open(&self, _entry: &QueueEntry) -> Result<Box<dyn SiblingBatches>> {
            Err(QueueError::Enumeration("no folder".into()))
        }
    }

    struct NoopLoader;

    #[async_trait]
    impl ResourceLoader for NoopLoader {
        async fn warm(&self, _entry: &QueueEntry, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }

        fn release(&self, _entry: &QueueEntry) {}
    }

    fn create_controller(settings: QueueSettings) -> QueueController {
        QueueController::new(settings, Arc::new(NoSiblings), Arc::new(NoopLoader))
    }

    fn create_entries(count: usize) -> Vec<QueueEntry> {
        (0..count)
            .map(|i| QueueEntry::from_path(format!("/media/{i}.mkv")))
            .collect()
    }

    fn loaded(count: usize, current: usize) -> (QueueController, Vec<QueueEntry>) {
        let entries = create_entries(count);
        let mut controller = create_controller(QueueSettings::default());
        controller.load(entries.clone(), Some(&entries[current].id()));
        controller.drain_events();
        (controller, entries)
    }

    #[test]
    fn load_emits_change_and_current() {
        let entries = create_entries(3);
        let mut controller = create_controller(QueueSettings::default());

        let snapshot = controller.load(entries.clone(), Some(&entries[1].id()));
        assert_eq!(snapshot.current_index, Some(1));

        let events = controller.drain_events();
        assert!(events.contains(&QueueEvent::QueueChanged {
            length: 3,
            version: snapshot.version,
        }));
        assert!(events.contains(&QueueEvent::CurrentChanged {
            index: Some(1),
            entry_id: Some(entries[1].id()),
            previous_entry_id: None,
        }));
        assert!(!controller.has_pending_events());
    }

    #[test]
    fn active_flag_follows_current() {
        let (mut controller, _) = loaded(3, 0);
        assert!(controller.entries()[0].active);

        let result = controller.next();
        assert_eq!(result.index, Some(1));
        assert!(result.entry.as_ref().is_some_and(|entry| entry.active));

        let flags: Vec<bool> = controller.entries().iter().map(|e| e.active).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn previous_restarts_after_threshold() {
        let (mut controller, entries) = loaded(3, 1);

        let result = controller.previous(Duration::from_secs(30));
        assert!(result.is_restart);
        assert_eq!(result.index, Some(1));
        assert_eq!(
            controller.drain_events(),
            vec![QueueEvent::RestartRequested {
                entry_id: entries[1].id()
            }]
        );

        let result = controller.previous(Duration::from_millis(200));
        assert!(!result.is_restart);
        assert_eq!(result.index, Some(0));
    }

    #[test]
    fn end_of_queue_emits_playback_ended() {
        let (mut controller, _) = loaded(2, 1);

        let result = controller.end_of_track();
        assert!(result.is_terminal);
        assert_eq!(controller.drain_events(), vec![QueueEvent::PlaybackEnded]);
        assert_eq!(controller.snapshot().current_index, Some(1));
    }

    #[test]
    fn play_next_lands_after_current() {
        let (mut controller, _) = loaded(3, 1);
        let extra = QueueEntry::from_path("/media/extra.mkv");

        controller.play_next(extra.clone());
        assert_eq!(controller.entries()[2], extra);
        assert_eq!(controller.peek_next(), Some(&extra));
    }

    #[test]
    fn shuffle_toggle_emits_events() {
        let (mut controller, entries) = loaded(5, 2);

        controller.set_shuffle(true);
        let events = controller.drain_events();
        assert!(events.contains(&QueueEvent::ShuffleChanged { enabled: true }));
        assert_eq!(controller.current_entry(), Some(&entries[2]));

        let restored: Vec<EntryId> = controller
            .set_shuffle(false)
            .iter()
            .map(QueueEntry::id)
            .collect();
        let original: Vec<EntryId> = entries.iter().map(QueueEntry::id).collect();
        assert_eq!(restored, original);
        assert!(controller
            .drain_events()
            .contains(&QueueEvent::ShuffleChanged { enabled: false }));
    }

    #[test]
    fn load_while_shuffled_shuffles_new_list() {
        let (mut controller, _) = loaded(4, 0);
        controller.set_shuffle(true);

        let fresh = create_entries(6);
        controller.load(fresh.clone(), Some(&fresh[3].id()));

        assert!(controller.store().is_shuffled());
        assert_eq!(controller.current_entry(), Some(&fresh[3]));

        let restored: Vec<EntryId> = controller
            .set_shuffle(false)
            .iter()
            .map(QueueEntry::id)
            .collect();
        let expected: Vec<EntryId> = fresh.iter().map(QueueEntry::id).collect();
        assert_eq!(restored, expected);
    }

    #[test]
    fn rejected_edit_leaves_queue_untouched() {
        let (mut controller, _) = loaded(2, 0);
        let before = controller.snapshot();

        let result = controller.remove_at(5);
        assert!(matches!(result, Err(QueueError::IndexOutOfBounds { index: 5, len: 2 })));
        assert_eq!(controller.snapshot(), before);
        assert!(!controller.has_pending_events());
    }

    #[test]
    fn repeat_mode_controls_can_advance() {
        let (mut controller, _) = loaded(2, 1);
        assert!(!controller.can_advance());
        assert!(controller.can_retreat());

        controller.set_repeat(RepeatMode::All);
        assert!(controller.can_advance());
        assert_eq!(controller.repeat(), RepeatMode::All);
    }

    #[test]
    fn apply_settings_rejects_invalid() {
        let (mut controller, _) = loaded(2, 0);
        let settings = QueueSettings {
            sibling_batch_size: 0,
            ..QueueSettings::default()
        };
        assert!(controller.apply_settings(settings).is_err());
        assert_eq!(controller.settings(), &QueueSettings::default());
    }

    #[test]
    fn skipped_warmups_run_once_a_runtime_exists() {
        let entries = create_entries(3);
        let mut controller = create_controller(QueueSettings::default());
        controller.load(entries.clone(), Some(&entries[0].id()));
        assert!(controller.warm_entries().is_empty());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            controller.set_current(Some(&entries[0].id()));
            assert_eq!(controller.warm_entries().len(), 3);
            assert!(controller.has_background_work());

            while controller.next_completion().await {}
        });

        assert!(!controller.has_background_work());
        assert!(controller.entries().iter().all(|entry| entry.available));
    }

    #[test]
    fn no_runtime_means_no_background_work() {
        let mut controller = create_controller(QueueSettings::default());
        let entry = QueueEntry::new(EntrySource::File("/media/show/ep1.mkv".into()));
        controller.load(vec![entry.clone()], Some(&entry.id()));

        assert!(!controller.has_background_work());
        assert_eq!(controller.poll_completions(), 0);
        assert!(!controller
            .drain_events()
            .iter()
            .any(|event| matches!(event, QueueEvent::ExpansionStarted { .. })));
    }
}
