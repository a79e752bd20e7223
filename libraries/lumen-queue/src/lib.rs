//! Lumen - Playback Queue Engine
//!
//! Platform-agnostic queue management for Lumen.
//!
//! This crate provides:
//! - An ordered queue with a tracked current entry (duplicates allowed)
//! - Next/previous/end-of-track navigation under repeat modes (Off, Track, All)
//! - Shuffle with lossless restore, even after mid-shuffle edits
//! - Neighbor expansion: a single file grows into its folder in the background
//! - A buffer window of warm entries around the current one
//!
//! # Architecture
//!
//! `lumen-queue` knows nothing about decoding, rendering or the filesystem.
//! The platform provides folder enumeration ([`SiblingSource`]) and resource
//! preparation ([`ResourceLoader`]) through traits; `lumen-library` has
//! implementations for local files.
//!
//! [`QueueController`] is the single owner. It is driven with `&mut self`;
//! background work reports back as completions the owner applies.
//!
//! # Example: Navigation
//!
//! ```rust
//! use lumen_queue::{QueueEntry, QueueStore, RepeatMode};
//! use lumen_queue::navigation::{get_next, Step};
//!
//! let entries: Vec<QueueEntry> = ["a.mkv", "b.mkv"]
//!     .iter()
//!     .map(|name| QueueEntry::from_path(format!("/media/{name}")))
//!     .collect();
//!
//! let mut store = QueueStore::new();
//! store.load(entries.clone(), Some(&entries[1].id()));
//!
//! // At the last entry: terminal unless repeating the queue
//! assert_eq!(get_next(store.entries(), store.current_index(), RepeatMode::Off), Step::Terminal);
//! assert_eq!(get_next(store.entries(), store.current_index(), RepeatMode::All), Step::Move(0));
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lumen_queue::{
//!     QueueController, QueueEntry, QueueSettings, ResourceLoader, Result, SiblingBatches,
//!     SiblingSource,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Decoder;
//!
//! #[async_trait]
//! impl ResourceLoader for Decoder {
//!     async fn warm(&self, entry: &QueueEntry, _cancel: &CancellationToken) -> Result<()> {
//!         // Open the file, read headers, fill a buffer
//!         Ok(())
//!     }
//!
//!     fn release(&self, entry: &QueueEntry) {
//!         // Drop buffers
//!     }
//! }
//!
//! struct Folders;
//!
//! #[async_trait]
//! impl SiblingSource for Folders {
//!     async fn open(&self, entry: &QueueEntry) -> Result<Box<dyn SiblingBatches>> {
//!         unimplemented!()
//!     }
//! }
//!
//! # async fn run() {
//! let mut controller =
//!     QueueController::new(QueueSettings::default(), Arc::new(Folders), Arc::new(Decoder));
//!
//! let entry = QueueEntry::from_path("/media/shows/ep1.mkv");
//! controller.load(vec![entry.clone()], Some(&entry.id()));
//!
//! // Apply background results as they arrive
//! while controller.next_completion().await {}
//! for event in controller.drain_events() {
//!     println!("{event:?}");
//! }
//! # }
//! ```

mod controller;
mod error;
pub mod events;
pub mod expander;
pub mod navigation;
pub mod prefetch;
pub mod settings;
pub mod shuffle;
mod store;
pub mod types;
pub mod window;

// Public exports
pub use controller::QueueController;
pub use error::{QueueError, Result};
pub use events::{Completion, QueueEvent};
pub use expander::{NeighborExpander, SiblingBatches, SiblingSource};
pub use navigation::NavigationResult;
pub use prefetch::{Prefetcher, ResourceLoader};
pub use settings::QueueSettings;
pub use store::QueueStore;
pub use types::{EntryId, EntrySource, QueueEntry, QueueSnapshot, RepeatMode, StructuralEdit};
pub use window::{BufferWindow, BufferWindowManager};
