//! Folder sibling enumeration
//!
//! Lists the media files next to a queue entry, one page at a time, without
//! descending into subfolders.

use crate::scanner::is_media_file;
use crate::LibraryError;
use async_trait::async_trait;
use lumen_queue::{EntrySource, QueueEntry, SiblingBatches, SiblingSource};
use std::path::PathBuf;
use tokio::fs::{self, ReadDir};
use tracing::debug;

/// Enumerates siblings from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderSiblings;

impl FolderSiblings {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiblingSource for FolderSiblings {
    async fn open(&self, entry: &QueueEntry) -> lumen_queue::Result<Box<dyn SiblingBatches>> {
        let folder = entry
            .source()
            .folder()
            .ok_or_else(|| LibraryError::UnsupportedSource(entry.source().to_string()))?
            .to_path_buf();

        debug!("Listing siblings in {}", folder.display());
        let dir = fs::read_dir(&folder).await.map_err(LibraryError::from)?;

        Ok(Box::new(FolderBatches {
            folder,
            dir,
            exhausted: false,
        }))
    }
}

/// Paginated listing of one folder
pub struct FolderBatches {
    folder: PathBuf,
    dir: ReadDir,
    exhausted: bool,
}

#[async_trait]
impl SiblingBatches for FolderBatches {
    async fn next_batch(
        &mut self,
        batch_size: usize,
    ) -> lumen_queue::Result<Option<Vec<EntrySource>>> {
        let mut batch = Vec::new();

        while !self.exhausted && batch.len() < batch_size {
            let Some(entry) = self.dir.next_entry().await.map_err(LibraryError::from)? else {
                self.exhausted = true;
                break;
            };

            let path = entry.path();
            if !is_media_file(&path) {
                continue;
            }

            // Follows symlinks; dangling links are skipped
            match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => batch.push(EntrySource::File(path)),
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        if batch.is_empty() && self.exhausted {
            debug!("Finished listing {}", self.folder.display());
            return Ok(None);
        }

        Ok(Some(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_queue::expander::expand_neighbors;
    use lumen_queue::QueueError;
    use std::fs as std_fs;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn create_folder(names: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for name in names {
            std_fs::write(temp.path().join(name), b"fake").unwrap();
        }
        temp
    }

    #[tokio::test]
    async fn test_pages_respect_batch_size() {
        let temp = create_folder(&["a.mkv", "b.mkv", "c.mkv", "d.mkv", "e.mkv"]);
        let entry = QueueEntry::from_path(temp.path().join("a.mkv"));

        let mut batches = FolderSiblings::new().open(&entry).await.unwrap();
        let mut total = 0;
        while let Some(batch) = batches.next_batch(2).await.unwrap() {
            assert!(batch.len() <= 2);
            total += batch.len();
        }
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_skips_non_media_and_subfolders() {
        let temp = create_folder(&["ep1.mkv", "ep2.mkv", "notes.txt"]);
        std_fs::create_dir(temp.path().join("extras.mkv")).unwrap();
        let entry = QueueEntry::from_path(temp.path().join("ep1.mkv"));

        let merged = expand_neighbors(&FolderSiblings::new(), &entry, 16, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id(), entry.id());
    }

    #[tokio::test]
    async fn test_missing_folder_fails() {
        let entry = QueueEntry::from_path("/nonexistent/folder/clip.mkv");
        let result = FolderSiblings::new().open(&entry).await;
        assert!(matches!(result, Err(QueueError::Io(_))));
    }

    #[tokio::test]
    async fn test_non_file_source_is_unsupported() {
        let entry = QueueEntry::new(EntrySource::Uri("https://example.com/a.mp4".into()));
        let result = FolderSiblings::new().open(&entry).await;
        assert!(matches!(result, Err(QueueError::Enumeration(_))));
    }
}
