//! File probe warm-up
//!
//! Warming a local file means checking it is a readable regular file and
//! caching its first bytes (container headers), so starting playback does
//! not wait on a cold disk. Non-file sources have nothing to probe locally.

use async_trait::async_trait;
use lumen_queue::{EntryId, EntrySource, QueueEntry, QueueError, ResourceLoader};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bytes read from the start of each file
pub const DEFAULT_PROBE_BYTES: usize = 64 * 1024;

/// Probes local files and keeps their header bytes while warm
#[derive(Debug)]
pub struct FileProbe {
    probe_bytes: usize,
    headers: Mutex<HashMap<EntryId, Vec<u8>>>,
}

impl Default for FileProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_BYTES)
    }
}

impl FileProbe {
    pub fn new(probe_bytes: usize) -> Self {
        Self {
            probe_bytes: probe_bytes.max(1),
            headers: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an entry's header bytes are cached
    pub fn is_warm(&self, id: &EntryId) -> bool {
        self.headers
            .lock()
            .is_ok_and(|headers| headers.contains_key(id))
    }

    /// Number of entries currently warm
    pub fn warm_count(&self) -> usize {
        self.headers.lock().map_or(0, |headers| headers.len())
    }

    async fn read_header(&self, path: &Path) -> Result<Vec<u8>, QueueError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| QueueError::Warmup(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(QueueError::Warmup(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| QueueError::Warmup(format!("{}: {}", path.display(), e)))?;

        let mut header = Vec::with_capacity(self.probe_bytes);
        file.take(self.probe_bytes as u64)
            .read_to_end(&mut header)
            .await
            .map_err(|e| QueueError::Warmup(format!("{}: {}", path.display(), e)))?;

        if header.is_empty() {
            return Err(QueueError::Warmup(format!("{} is empty", path.display())));
        }
        Ok(header)
    }
}

#[async_trait]
impl ResourceLoader for FileProbe {
    async fn warm(
        &self,
        entry: &QueueEntry,
        cancel: &CancellationToken,
    ) -> lumen_queue::Result<()> {
        let EntrySource::File(path) = entry.source() else {
            debug!("Nothing to probe for {}", entry.source());
            return Ok(());
        };

        let header = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            header = self.read_header(path) => header?,
        };

        if let Ok(mut headers) = self.headers.lock() {
            // Release cancels before it removes; checking under the lock
            // keeps a late read from outliving its release
            if cancel.is_cancelled() {
                return Ok(());
            }
            debug!("Warmed {} ({} bytes)", path.display(), header.len());
            headers.insert(entry.id(), header);
        }
        Ok(())
    }

    fn release(&self, entry: &QueueEntry) {
        if let Ok(mut headers) = self.headers.lock() {
            if headers.remove(&entry.id()).is_some() {
                debug!("Released {}", entry.source());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_warm_caches_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mkv");
        fs::write(&path, vec![7u8; 300]).unwrap();

        let probe = FileProbe::new(128);
        let entry = QueueEntry::from_path(&path);
        probe.warm(&entry, &CancellationToken::new()).await.unwrap();

        assert!(probe.is_warm(&entry.id()));
        assert_eq!(
            probe.headers.lock().unwrap().get(&entry.id()).map(Vec::len),
            Some(128)
        );
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let probe = FileProbe::default();
        let entry = QueueEntry::from_path("/nonexistent/clip.mkv");

        let result = probe.warm(&entry, &CancellationToken::new()).await;
        assert!(matches!(result, Err(QueueError::Warmup(_))));
        assert!(!probe.is_warm(&entry.id()));
    }

    #[tokio::test]
    async fn test_empty_file_and_directory_fail() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty.mkv");
        fs::write(&empty, b"").unwrap();
        let folder = temp.path().join("folder.mkv");
        fs::create_dir(&folder).unwrap();

        let probe = FileProbe::default();
        for path in [empty, folder] {
            let result = probe
                .warm(&QueueEntry::from_path(path), &CancellationToken::new())
                .await;
            assert!(result.is_err());
        }
        assert_eq!(probe.warm_count(), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mkv");
        fs::write(&path, b"header").unwrap();

        let probe = FileProbe::default();
        let entry = QueueEntry::from_path(&path);
        probe.warm(&entry, &CancellationToken::new()).await.unwrap();

        probe.release(&entry);
        probe.release(&entry);
        assert_eq!(probe.warm_count(), 0);
    }

    #[tokio::test]
    async fn test_streams_need_no_probe() {
        let probe = FileProbe::default();
        let entry = QueueEntry::new(EntrySource::Uri("https://example.com/live.m3u8".into()));

        probe.warm(&entry, &CancellationToken::new()).await.unwrap();
        assert_eq!(probe.warm_count(), 0);
    }
}
