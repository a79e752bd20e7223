//! Core types for queue management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identity of a queue entry
///
/// Every entry gets a fresh identity when created, so queueing the same file
/// twice yields two distinct entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a new, unique identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an entry's media comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySource {
    /// Local file
    File(PathBuf),

    /// Remote or content URI
    Uri(String),

    /// Handle already resolved by the platform (picker token, stream id)
    Handle(String),
}

impl EntrySource {
    /// Parent folder, for sources that live in one
    ///
    /// Only local files are folder-backed; URIs and handles never are.
    pub fn folder(&self) -> Option<&Path> {
        match self {
            EntrySource::File(path) => path.parent().filter(|p| !p.as_os_str().is_empty()),
            EntrySource::Uri(_) | EntrySource::Handle(_) => None,
        }
    }

    /// Whether neighbor expansion can enumerate this source's folder
    pub fn is_folder_backed(&self) -> bool {
        self.folder().is_some()
    }

    /// File name component, if the source is a local file
    pub fn file_name(&self) -> Option<&str> {
        match self {
            EntrySource::File(path) => path.file_name().and_then(|name| name.to_str()),
            EntrySource::Uri(_) | EntrySource::Handle(_) => None,
        }
    }
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySource::File(path) => write!(f, "{}", path.display()),
            EntrySource::Uri(uri) => write!(f, "{uri}"),
            EntrySource::Handle(handle) => write!(f, "handle:{handle}"),
        }
    }
}

/// One playable unit in the queue
///
/// Equality is identity equality: two entries are equal only if they share
/// an [`EntryId`]. The presentation flags belong to the UI layer and travel
/// with the entry value, so any mutation that keeps the identity keeps them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    id: EntryId,
    source: EntrySource,

    /// Whether the entry's resources could be prepared
    pub available: bool,

    /// Whether the entry is the one currently playing
    pub active: bool,
}

impl QueueEntry {
    /// Create a new entry with a fresh identity
    pub fn new(source: EntrySource) -> Self {
        Self {
            id: EntryId::new(),
            source,
            available: true,
            active: false,
        }
    }

    /// Create a new entry for a local file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(EntrySource::File(path.into()))
    }

    /// Stable identity
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Source descriptor
    pub fn source(&self) -> &EntrySource {
        &self.source
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueueEntry {}

/// Repeat mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when the queue ends
    #[default]
    Off,

    /// Loop the current entry only
    Track,

    /// Loop the entire queue
    All,
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(RepeatMode::Off),
            "track" | "one" => Ok(RepeatMode::Track),
            "all" => Ok(RepeatMode::All),
            other => Err(format!("unknown repeat mode '{other}' (expected off, track or all)")),
        }
    }
}

/// Post-mutation view of the queue handed back to callers
///
/// `version` only ever grows. A caller holding an older version knows the
/// queue changed under it and can drop a stale command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Current position, `None` when nothing is current
    pub current_index: Option<usize>,

    /// Monotonic change token
    pub version: u64,
}

/// A structural edit to the entry list
///
/// Carries the affected entries so shuffle reconciliation can fold the edit
/// into its backup without knowing anything about who made it.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralEdit {
    /// Entries were inserted or appended
    Added(Vec<QueueEntry>),

    /// Entries were removed
    Removed(Vec<QueueEntry>),

    /// Entries were swapped in place
    Replaced {
        old: Vec<QueueEntry>,
        new: Vec<QueueEntry>,
    },

    /// An entry changed position
    Moved { entry: QueueEntry, to: usize },

    /// The whole list was replaced or cleared
    Reset,
}

impl StructuralEdit {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            StructuralEdit::Added(_) => "added",
            StructuralEdit::Removed(_) => "removed",
            StructuralEdit::Replaced { .. } => "replaced",
            StructuralEdit::Moved { .. } => "moved",
            StructuralEdit::Reset => "reset",
        }
    }
}
