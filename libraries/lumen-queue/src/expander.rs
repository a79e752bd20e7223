//! Neighbor expansion
//!
//! A queue holding one folder-backed entry grows into the whole folder: the
//! folder is enumerated page by page off the owner, and the merged list comes
//! back as a [`Completion::Expansion`] to be applied with a single `load`.
//!
//! At most one expansion is in flight. Starting another cancels the first
//! (supersession), and only the latest ticket is ever accepted.

use crate::error::Result;
use crate::events::Completion;
use crate::types::{EntryId, EntrySource, QueueEntry};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default page size for sibling enumeration
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Enumerates the folder an entry lives in
#[async_trait]
pub trait SiblingSource: Send + Sync {
    /// Start enumerating the entry's parent folder
    async fn open(&self, entry: &QueueEntry) -> Result<Box<dyn SiblingBatches>>;
}

/// Paginated sibling enumeration
#[async_trait]
pub trait SiblingBatches: Send {
    /// Next page of at most `batch_size` sources, `None` once exhausted
    async fn next_batch(&mut self, batch_size: usize) -> Result<Option<Vec<EntrySource>>>;
}

fn sort_key(source: &EntrySource) -> (String, String) {
    let full = source.to_string();
    let name = source
        .file_name()
        .map_or_else(|| full.to_lowercase(), str::to_lowercase);
    (name, full)
}

/// Merge enumerated siblings around the original entry
///
/// Siblings are sorted by case-insensitive file name. The sibling matching
/// the original's source is replaced by the original entry so it keeps its
/// identity; if the folder listing missed it, it is inserted where it sorts.
pub fn merge_siblings(original: &QueueEntry, mut siblings: Vec<EntrySource>) -> Vec<QueueEntry> {
    siblings.sort_by_cached_key(sort_key);
    siblings.dedup();

    let mut merged = Vec::with_capacity(siblings.len() + 1);
    let mut placed = false;
    for sibling in siblings {
        if sibling == *original.source() {
            merged.push(original.clone());
            placed = true;
        } else {
            merged.push(QueueEntry::new(sibling));
        }
    }

    if !placed {
        let key = sort_key(original.source());
        let at = merged.partition_point(|entry| sort_key(entry.source()) <= key);
        merged.insert(at, original.clone());
    }

    merged
}

/// Enumerate and merge an entry's siblings
///
/// Returns `Ok(None)` if cancelled. Cancellation is checked before each page
/// is committed and once more before returning.
pub async fn expand_neighbors(
    source: &dyn SiblingSource,
    entry: &QueueEntry,
    batch_size: usize,
    cancel: &CancellationToken,
) -> Result<Option<Vec<QueueEntry>>> {
    let batch_size = batch_size.max(1);

    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(None),
        opened = source.open(entry) => opened,
    };
    let mut batches = match opened {
        Ok(batches) => batches,
        Err(_) if cancel.is_cancelled() => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut siblings = Vec::new();
    loop {
        let batch = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(None),
            batch = batches.next_batch(batch_size) => batch,
        };

        if cancel.is_cancelled() {
            return Ok(None);
        }

        match batch? {
            Some(page) if !page.is_empty() => siblings.extend(page),
            _ => break,
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }

    Ok(Some(merge_siblings(entry, siblings)))
}

/// Identifies one expansion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpansionTicket(u64);

/// Result of one expansion attempt, sent back to the owner
#[derive(Debug)]
pub struct ExpansionOutcome {
    /// Attempt this outcome belongs to
    pub ticket: ExpansionTicket,

    /// Entry that was expanded
    pub entry_id: EntryId,

    /// Store version when the attempt started
    pub version: u64,

    /// Merged entries, `None` if cancelled
    pub result: Result<Option<Vec<QueueEntry>>>,
}

#[derive(Debug)]
struct InFlight {
    ticket: ExpansionTicket,
    entry_id: EntryId,
    cancel: CancellationToken,
}

/// Owns the single in-flight expansion
pub struct NeighborExpander {
    source: Arc<dyn SiblingSource>,
    batch_size: usize,
    next_ticket: u64,
    in_flight: Option<InFlight>,
}

impl NeighborExpander {
    /// Create an expander over a sibling source
    pub fn new(source: Arc<dyn SiblingSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            next_ticket: 0,
            in_flight: None,
        }
    }

    /// Page size used for new expansions
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Change the page size; running expansions keep theirs
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }

    /// Whether an expansion is running
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the running expansion is for this entry
    pub fn in_flight_for(&self, entry_id: &EntryId) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.entry_id == *entry_id)
    }

    /// Start expanding an entry, superseding any running expansion
    ///
    /// Returns `None` when there is no async runtime to run on.
    pub fn start(
        &mut self,
        entry: &QueueEntry,
        version: u64,
        completions: &UnboundedSender<Completion>,
    ) -> Option<ExpansionTicket> {
        self.cancel();

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; not expanding {}", entry.source());
            return None;
        };

        self.next_ticket += 1;
        let ticket = ExpansionTicket(self.next_ticket);
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            ticket,
            entry_id: entry.id(),
            cancel: cancel.clone(),
        });

        debug!("Expanding {} ({:?})", entry.source(), ticket);

        let source = Arc::clone(&self.source);
        let entry = entry.clone();
        let batch_size = self.batch_size;
        let completions = completions.clone();
        runtime.spawn(async move {
            let result = expand_neighbors(source.as_ref(), &entry, batch_size, &cancel).await;
            let outcome = ExpansionOutcome {
                ticket,
                entry_id: entry.id(),
                version,
                result,
            };
            // The owner may already be gone
            let _ = completions.send(Completion::Expansion(outcome));
        });

        Some(ticket)
    }

    /// Cancel the running expansion, if any
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(in_flight) => {
                in_flight.cancel.cancel();
                debug!("Cancelled expansion {:?}", in_flight.ticket);
                true
            }
            None => false,
        }
    }

    /// Admit an outcome if it belongs to the running expansion
    ///
    /// Accepting ends the expansion. Outcomes of superseded or cancelled
    /// attempts are rejected.
    pub fn accept(&mut self, outcome: &ExpansionOutcome) -> bool {
        let current = self.in_flight.as_ref().is_some_and(|in_flight| {
            in_flight.ticket == outcome.ticket && !in_flight.cancel.is_cancelled()
        });

        if current {
            self.in_flight = None;
        }
        current
    }
}
