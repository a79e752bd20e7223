//! File scanning for media files

use crate::{LibraryError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported media file extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Video
    "mkv", "mp4", "m4v", "mov", "avi", "webm", "wmv", "mpg", "mpeg", "ts", "flv",
    // Audio
    "mp3", "flac", "ogg", "wav", "aac", "m4a", "opus",
];

/// Scanner for media files in directories
#[derive(Debug, Clone, Default)]
pub struct MediaScanner {
    /// Whether to follow symbolic links
    follow_links: bool,

    /// Maximum depth to traverse (unlimited if unset)
    max_depth: Option<usize>,
}

impl MediaScanner {
    /// Create a new media scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Set maximum directory depth to traverse
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Scan a directory for media files
    ///
    /// Files come back in queue order: sorted by path, comparing file names
    /// case-insensitively.
    pub fn scan_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !path.exists() {
            return Err(LibraryError::FileNotFound(path.display().to_string()));
        }

        if !path.is_dir() {
            return Err(LibraryError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let mut walker = WalkDir::new(path).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut media_files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| !entry.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| is_media_file(path))
            .collect();

        media_files.sort_by_cached_key(|path| queue_order_key(path));
        Ok(media_files)
    }
}

fn queue_order_key(path: &Path) -> (Option<PathBuf>, String) {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    (path.parent().map(Path::to_path_buf), name)
}

/// Check if a file is a supported media file
pub fn is_media_file(path: &Path) -> bool {
    media_extension(path).is_some()
}

/// Lowercased extension, if it is a supported one
pub fn media_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_media_file() {
        assert!(is_media_file(Path::new("clip.mkv")));
        assert!(is_media_file(Path::new("clip.MP4")));
        assert!(is_media_file(Path::new("song.flac")));
        assert!(!is_media_file(Path::new("notes.txt")));
        assert!(!is_media_file(Path::new("clip")));
    }

    #[test]
    fn test_media_extension() {
        assert_eq!(media_extension(Path::new("clip.MKV")), Some("mkv".to_string()));
        assert_eq!(media_extension(Path::new("cover.jpg")), None);
    }

    #[test]
    fn test_scan_directory_sorted() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();

        fs::write(base.join("b.mkv"), b"fake").unwrap();
        fs::write(base.join("A.mp4"), b"fake").unwrap();
        fs::write(base.join("readme.txt"), b"not media").unwrap();

        let subdir = base.join("extras");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("c.webm"), b"fake").unwrap();

        let files = MediaScanner::new().scan_directory(base).unwrap();
        let names: Vec<&str> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();

        assert_eq!(names, vec!["A.mp4", "b.mkv", "c.webm"]);
    }

    #[test]
    fn test_scan_with_max_depth() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();

        fs::write(base.join("one.mkv"), b"fake").unwrap();
        let subdir = base.join("season2");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("two.mkv"), b"fake").unwrap();

        let files = MediaScanner::new().max_depth(1).scan_directory(base).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("one.mkv"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = MediaScanner::new().scan_directory(Path::new("/nonexistent/media"));
        assert!(matches!(result, Err(LibraryError::FileNotFound(_))));
    }

    #[test]
    fn test_scan_file_is_invalid() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("clip.mkv");
        fs::write(&file, b"fake").unwrap();

        let result = MediaScanner::new().scan_directory(&file);
        assert!(matches!(result, Err(LibraryError::InvalidPath(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_folders_need_follow_links() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("clip.mkv"), b"fake").unwrap();

        let base = temp.path().join("library");
        fs::create_dir(&base).unwrap();
        std::os::unix::fs::symlink(&real, base.join("linked")).unwrap();

        assert!(MediaScanner::new().scan_directory(&base).unwrap().is_empty());

        let files = MediaScanner::new()
            .follow_links(true)
            .scan_directory(&base)
            .unwrap();
        assert_eq!(files, vec![base.join("linked").join("clip.mkv")]);
    }
}
