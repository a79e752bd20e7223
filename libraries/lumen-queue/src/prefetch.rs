//! Resource warm-up for the buffer window
//!
//! Releases happen synchronously on the owner. Warm-ups run as one
//! background task per window change; inside it every entry warms
//! independently and the task waits for all of them, so one failure never
//! blocks or fails its siblings.

use crate::error::Result;
use crate::events::Completion;
use crate::types::{EntryId, QueueEntry};
use crate::window::WindowDiff;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-entry resource loader provided by the platform
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Prepare an entry's resources (prefetch, probe, read headers)
    async fn warm(&self, entry: &QueueEntry, cancel: &CancellationToken) -> Result<()>;

    /// Drop whatever `warm` prepared. Must be idempotent.
    fn release(&self, entry: &QueueEntry);
}

/// One entry that could not be warmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupFailure {
    /// ID of the entry
    pub entry_id: EntryId,
    /// Error message
    pub message: String,
}

/// Outcome of one batch of warm-ups
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    batch: u64,

    /// Entries warmed successfully
    pub warmed: Vec<EntryId>,

    /// Entries whose warm-up was cancelled (released or superseded)
    pub cancelled: Vec<EntryId>,

    /// Entries that failed to warm
    pub failures: Vec<WarmupFailure>,
}

impl WarmupReport {
    /// Batch this report belongs to
    pub fn batch(&self) -> u64 {
        self.batch
    }

    fn entry_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.warmed
            .iter()
            .chain(&self.cancelled)
            .copied()
            .chain(self.failures.iter().map(|failure| failure.entry_id))
    }
}

enum WarmOutcome {
    Warmed,
    Cancelled,
    Failed(String),
}

async fn warm_one(
    loader: &dyn ResourceLoader,
    entry: &QueueEntry,
    cancel: &CancellationToken,
) -> WarmOutcome {
    if cancel.is_cancelled() {
        return WarmOutcome::Cancelled;
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => WarmOutcome::Cancelled,
        result = loader.warm(entry, cancel) => match result {
            Ok(()) => WarmOutcome::Warmed,
            Err(_) if cancel.is_cancelled() => WarmOutcome::Cancelled,
            Err(e) => WarmOutcome::Failed(e.to_string()),
        },
    }
}

/// Warm every entry concurrently and wait for all of them
pub async fn warm_all(
    loader: &dyn ResourceLoader,
    jobs: Vec<(QueueEntry, CancellationToken)>,
    batch: u64,
) -> WarmupReport {
    let outcomes = join_all(
        jobs.iter()
            .map(|(entry, cancel)| warm_one(loader, entry, cancel)),
    )
    .await;

    let mut report = WarmupReport {
        batch,
        ..WarmupReport::default()
    };

    for ((entry, _), outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            WarmOutcome::Warmed => report.warmed.push(entry.id()),
            WarmOutcome::Cancelled => report.cancelled.push(entry.id()),
            WarmOutcome::Failed(message) => {
                warn!("Warm-up failed for {}: {}", entry.source(), message);
                report.failures.push(WarmupFailure {
                    entry_id: entry.id(),
                    message,
                });
            }
        }
    }

    report
}

/// Applies window diffs against a [`ResourceLoader`]
pub struct Prefetcher {
    loader: Arc<dyn ResourceLoader>,

    /// Warm-ups not yet reported back, keyed by entry, tagged with batch
    in_flight: HashMap<EntryId, (u64, CancellationToken)>,

    next_batch: u64,
}

impl Prefetcher {
    /// Create a prefetcher over a loader
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            in_flight: HashMap::new(),
            next_batch: 0,
        }
    }

    /// Whether any warm-up has not reported back yet
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Release what left the window, start warming what entered it
    ///
    /// The warm-up report arrives later as [`Completion::Warmup`]. Returns
    /// the entries that could not be scheduled because no async runtime is
    /// running.
    pub fn apply(
        &mut self,
        diff: WindowDiff,
        completions: &UnboundedSender<Completion>,
    ) -> Vec<QueueEntry> {
        for entry in &diff.release {
            if let Some((_, cancel)) = self.in_flight.remove(&entry.id()) {
                cancel.cancel();
            }
            self.loader.release(entry);
        }

        if diff.warm.is_empty() {
            return Vec::new();
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "No async runtime; skipping warm-up of {} entries",
                diff.warm.len()
            );
            return diff.warm;
        };

        self.next_batch += 1;
        let batch = self.next_batch;
        let jobs: Vec<(QueueEntry, CancellationToken)> = diff
            .warm
            .into_iter()
            .map(|entry| {
                let cancel = CancellationToken::new();
                let previous = self.in_flight.insert(entry.id(), (batch, cancel.clone()));
                if let Some((_, previous)) = previous {
                    previous.cancel();
                }
                (entry, cancel)
            })
            .collect();

        debug!("Warming {} entries (batch {})", jobs.len(), batch);

        let loader = Arc::clone(&self.loader);
        let completions = completions.clone();
        runtime.spawn(async move {
            let report = warm_all(loader.as_ref(), jobs, batch).await;
            // The owner may already be gone
            let _ = completions.send(Completion::Warmup(report));
        });

        Vec::new()
    }

    /// Forget warm-ups that a report says are finished
    ///
    /// Entries re-warmed by a newer batch stay tracked.
    pub fn settle(&mut self, report: &WarmupReport) {
        for id in report.entry_ids() {
            if self
                .in_flight
                .get(&id)
                .is_some_and(|(batch, _)| *batch == report.batch)
            {
                self.in_flight.remove(&id);
            }
        }
    }

    /// Cancel every outstanding warm-up
    pub fn cancel_all(&mut self) {
        for (_, (_, cancel)) in self.in_flight.drain() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingLoader {
        warmed: Mutex<Vec<EntryId>>,
        released: Mutex<Vec<EntryId>>,
        failing: Vec<EntryId>,
        stall: bool,
    }

    #[async_trait]
    impl ResourceLoader for RecordingLoader {
        async fn warm(&self, entry: &QueueEntry, cancel: &CancellationToken) -> Result<()> {
            if self.stall {
                cancel.cancelled().await;
                return Err(QueueError::Warmup("cancelled".into()));
            }
            if self.failing.contains(&entry.id()) {
                return Err(QueueError::Warmup(format!("cannot open {}", entry.source())));
            }
            self.warmed.lock().unwrap().push(entry.id());
            Ok(())
        }

        fn release(&self, entry: &QueueEntry) {
            self.released.lock().unwrap().push(entry.id());
        }
    }

    fn create_entries(count: usize) -> Vec<QueueEntry> {
        (0..count)
            .map(|i| QueueEntry::from_path(format!("/media/{i}.mkv")))
            .collect()
    }

    #[tokio::test]
    async fn failure_is_isolated_from_siblings() {
        let entries = create_entries(3);
        let loader = RecordingLoader {
            failing: vec![entries[1].id()],
            ..RecordingLoader::default()
        };

        let jobs = entries
            .iter()
            .map(|entry| (entry.clone(), CancellationToken::new()))
            .collect();
        let report = warm_all(&loader, jobs, 1).await;

        assert_eq!(report.warmed, vec![entries[0].id(), entries[2].id()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].entry_id, entries[1].id());
        assert!(report.failures[0].message.contains("cannot open"));
        assert!(report.cancelled.is_empty());
    }

    #[tokio::test]
    async fn cancelled_warmup_is_not_a_failure() {
        let entries = create_entries(1);
        let loader = RecordingLoader {
            stall: true,
            ..RecordingLoader::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = warm_all(&loader, vec![(entries[0].clone(), cancel)], 1).await;
        assert_eq!(report.cancelled, vec![entries[0].id()]);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn apply_reports_back_over_channel() {
        let entries = create_entries(2);
        let loader = Arc::new(RecordingLoader::default());
        let mut prefetcher = Prefetcher::new(loader.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        prefetcher.apply(
            WindowDiff {
                warm: entries.clone(),
                release: Vec::new(),
            },
            &tx,
        );
        assert!(prefetcher.has_in_flight());

        let completion = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let Completion::Warmup(report) = completion else {
            panic!("expected a warm-up report");
        };
        assert_eq!(report.warmed.len(), 2);

        prefetcher.settle(&report);
        assert!(!prefetcher.has_in_flight());
    }

    #[tokio::test]
    async fn release_cancels_in_flight_warmup() {
        let entries = create_entries(1);
        let loader = Arc::new(RecordingLoader {
            stall: true,
            ..RecordingLoader::default()
        });
        let mut prefetcher = Prefetcher::new(loader.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        prefetcher.apply(
            WindowDiff {
                warm: entries.clone(),
                release: Vec::new(),
            },
            &tx,
        );
        prefetcher.apply(
            WindowDiff {
                warm: Vec::new(),
                release: entries.clone(),
            },
            &tx,
        );

        assert_eq!(*loader.released.lock().unwrap(), vec![entries[0].id()]);
        assert!(!prefetcher.has_in_flight());

        let completion = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let Completion::Warmup(report) = completion else {
            panic!("expected a warm-up report");
        };
        assert_eq!(report.cancelled, vec![entries[0].id()]);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn apply_without_runtime_only_releases() {
        let entries = create_entries(2);
        let loader = Arc::new(RecordingLoader::default());
        let mut prefetcher = Prefetcher::new(loader.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let skipped = prefetcher.apply(
            WindowDiff {
                warm: vec![entries[0].clone()],
                release: vec![entries[1].clone()],
            },
            &tx,
        );

        assert_eq!(skipped, vec![entries[0].clone()]);
        assert!(!prefetcher.has_in_flight());
        assert_eq!(*loader.released.lock().unwrap(), vec![entries[1].id()]);
        assert!(loader.warmed.lock().unwrap().is_empty());
    }
}
