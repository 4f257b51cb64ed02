use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::audio::NodeId;
use crate::surface::TileHandle;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    /// Classifies a file by MIME type first, then by file name extension.
    pub fn detect(name: &str, mime: Option<&str>) -> Option<Self> {
        if let Some(kind) = mime.and_then(Self::from_mime) {
            return Some(kind);
        }
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Best-effort MIME type for an extension, as a file picker would report it.
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        let mime = match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "ogg" => "video/ogg",
            "mov" => "video/quicktime",
            "avi" => "video/x-msvideo",
            _ => return None,
        };
        Some(mime)
    }
}

/// Stable identity of a laid-out item. Never reused, not even across clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Deduplication key: two files with the same name and size are the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub name: String,
    pub size: u64,
}

/// A file handed to the wall by the ingestion side.
#[derive(Debug, Clone)]
pub struct IngestFile {
    pub name: String,
    pub size: u64,
    pub mime: Option<String>,
    /// Path relative to the picked folder, starting with the folder name.
    pub relative_path: String,
    /// Where the bytes live.
    pub path: PathBuf,
}

impl IngestFile {
    pub fn new(name: impl Into<String>, size: u64, mime: Option<&str>) -> Self {
        let name = name.into();
        Self {
            relative_path: name.clone(),
            path: PathBuf::from(&name),
            name,
            size,
            mime: mime.map(str::to_owned),
        }
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = relative_path.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn key(&self) -> FileKey {
        FileKey {
            name: self.name.clone(),
            size: self.size,
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::detect(&self.name, self.mime.as_deref())
    }

    pub fn is_media(&self) -> bool {
        self.kind().is_some()
    }

    /// First component of the relative path.
    pub fn folder_name(&self) -> String {
        self.relative_path
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown Folder")
            .to_string()
    }
}

/// Per-item audio nodes: source -> panner -> gain -> destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioGraph {
    pub source: NodeId,
    pub panner: NodeId,
    pub gain: NodeId,
    /// Context generation the nodes were created in.
    pub epoch: u64,
}

impl AudioGraph {
    pub fn nodes(&self) -> [NodeId; 3] {
        [self.source, self.panner, self.gain]
    }
}

#[derive(Debug, Clone)]
pub struct MediaItem {
    pub id: ItemId,
    pub file: Arc<IngestFile>,
    pub kind: MediaKind,
    pub tile: TileHandle,
    pub column: usize,
    pub x: f32,
    /// Logical layout position, independent of scrolling.
    pub y: f32,
    pub width: f32,
    /// Estimated until the real media size is reported.
    pub height: f32,
    pub playing: bool,
    /// Volume last applied to the media element.
    pub volume: f32,
    /// Present only while the item is audible.
    pub audio: Option<AudioGraph>,
    /// Media failed to load; the tile stays in the layout but is inert.
    pub media_failed: bool,
}

impl MediaItem {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// On-screen top edge for a given column offset.
    pub fn screen_y(&self, column_offset: f32) -> f32 {
        self.y - column_offset
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_mime() {
        assert_eq!(
            MediaKind::detect("clip.png", Some("video/mp4")),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::detect("photo.JPG", None), Some(MediaKind::Image));
        assert_eq!(MediaKind::detect("clip.ogg", Some("")), Some(MediaKind::Video));
        assert_eq!(MediaKind::detect("notes.txt", Some("text/plain")), None);
        assert_eq!(MediaKind::detect("no_extension", None), None);
    }

    #[test]
    fn test_folder_name() {
        let file = IngestFile::new("a.png", 1, None).with_relative_path("holiday/day1/a.png");
        assert_eq!(file.folder_name(), "holiday");

        let file = IngestFile::new("a.png", 1, None).with_relative_path("");
        assert_eq!(file.folder_name(), "Unknown Folder");
    }

    #[test]
    fn test_item_id_display() {
        assert_eq!(ItemId(42).to_string(), "item-42");
    }
}
