//! Folder ingestion.
//!
//! Walks a picked folder the way a directory file picker does: every regular
//! file comes back with its name, size, guessed MIME type and a relative path
//! that starts with the folder's own name. Non-media files are left in; the
//! wall filters them at ingestion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::{IngestFile, MediaKind};

/// Configuration for the file scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0, // unlimited
            follow_symlinks: false,
        }
    }
}

pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans a folder off the async runtime.
    pub async fn scan(&self, dir: &Path) -> Result<Vec<IngestFile>> {
        let dir = dir.to_path_buf();
        let config = self.config.clone();

        task::spawn_blocking(move || Self::discover(&dir, &config))
            .await
            .context("Scan task panicked")?
    }

    /// Lists every file under `dir`, sorted by path.
    pub fn discover(dir: &Path, config: &ScanConfig) -> Result<Vec<IngestFile>> {
        if !dir.is_dir() {
            anyhow::bail!("{:?} is not a directory", dir);
        }
        info!("Starting scan of {:?}", dir);

        let folder = folder_name(dir);
        let mut walker = WalkDir::new(dir).follow_links(config.follow_symlinks);
        if !config.recursive {
            walker = walker.max_depth(1);
        } else if config.max_depth > 0 {
            walker = walker.max_depth(config.max_depth);
        }

        let mut paths: Vec<(PathBuf, u64)> = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("Failed to read metadata for {:?}: {}", entry.path(), e);
                    continue;
                }
            };
            paths.push((entry.into_path(), metadata.len()));
        }

        // Sort by path for consistent ordering
        paths.sort_by(|a, b| a.0.cmp(&b.0));

        let files: Vec<IngestFile> = paths
            .into_iter()
            .filter_map(|(path, size)| to_ingest_file(dir, &folder, path, size))
            .collect();

        let media = files.iter().filter(|f| f.is_media()).count();
        info!(total = files.len(), media, "Scan complete");
        Ok(files)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown Folder")
        .to_string()
}

fn to_ingest_file(root: &Path, folder: &str, path: PathBuf, size: u64) -> Option<IngestFile> {
    let name = path.file_name()?.to_str()?.to_string();
    let relative = path.strip_prefix(root).ok()?;
    let mut relative_path = folder.to_string();
    for component in relative.iter() {
        relative_path.push('/');
        relative_path.push_str(&component.to_string_lossy());
    }

    let mime = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(MediaKind::mime_for_extension);
    debug!(?path, mime, "Discovered file");

    Some(
        IngestFile::new(name, size, mime)
            .with_relative_path(relative_path)
            .with_path(path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn create_test_image(path: &Path) {
        // Create a minimal valid PNG file (1x1 pixel)
        let png_data: [u8; 67] = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
            0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 dimensions
            0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
            0xDE, // bit depth, color type, etc
            0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
            0x08, 0xD7, 0x63, 0xF8, 0x0F, 0x00, 0x00, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0xB4,
            0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
            0xAE, 0x42, 0x60, 0x82,
        ];

        let mut file = File::create(path).unwrap();
        file.write_all(&png_data).unwrap();
    }

    #[test]
    fn test_scan_config_default() {
        let config = ScanConfig::default();
        assert!(config.recursive);
        assert_eq!(config.max_depth, 0);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = tempdir().unwrap();
        let files = FileScanner::discover(dir.path(), &ScanConfig::default()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(FileScanner::discover(&missing, &ScanConfig::default()).is_err());
    }

    #[test]
    fn test_discover_paths_and_mime() {
        let root = tempdir().unwrap();
        let dir = root.path().join("holiday");
        fs::create_dir(&dir).unwrap();

        create_test_image(&dir.join("b.png"));
        File::create(dir.join("a.mp4")).unwrap();
        File::create(dir.join("notes.txt")).unwrap();

        let files = FileScanner::discover(&dir, &ScanConfig::default()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.png", "notes.txt"]);

        assert_eq!(files[0].mime.as_deref(), Some("video/mp4"));
        assert_eq!(files[1].relative_path, "holiday/b.png");
        assert_eq!(files[1].size, 67);
        assert_eq!(files[1].folder_name(), "holiday");
        assert!(!files[2].is_media());
    }

    #[test]
    fn test_discover_recursive() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();

        create_test_image(&dir.path().join("root.png"));
        create_test_image(&subdir.join("nested.png"));

        let config = ScanConfig {
            recursive: true,
            ..Default::default()
        };
        let files = FileScanner::discover(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.relative_path.ends_with("/subdir/nested.png")));

        let config = ScanConfig {
            recursive: false,
            ..Default::default()
        };
        let files = FileScanner::discover(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_async() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("test1.png"));
        create_test_image(&dir.path().join("test2.png"));

        let files = FileScanner::new().scan(dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.is_media()));
    }
}
