use crate::models::ItemId;

/// Result alias that carries [`WallError`].
pub type Result<T> = std::result::Result<T, WallError>;

/// Errors surfaced by the wall engine.
///
/// None of these ever escape the render tick; they are returned from the
/// explicit entry points (ingestion, configuration, audio setup) so callers
/// can log them.
#[derive(Debug, thiserror::Error)]
pub enum WallError {
    /// Column width is not positive, so nothing can be placed until the
    /// layout dimensions are recomputed.
    #[error("layout not computed (column width {column_width})")]
    InvalidLayout { column_width: f32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported media file: {name}")]
    UnsupportedMedia { name: String },
    #[error("file already present: {name} ({size} bytes)")]
    DuplicateFile { name: String, size: u64 },
    #[error("unknown item {0}")]
    UnknownItem(ItemId),
    #[error("rendering surface: {0}")]
    Surface(#[from] SurfaceError),
    #[error("audio: {0}")]
    Audio(#[from] AudioError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by an [`AudioBackend`](crate::audio::AudioBackend) or
/// raised by the session's own guards.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AudioError {
    /// The platform has no audio API at all. Permanent.
    #[error("audio context not supported")]
    Unsupported,
    /// The circuit breaker is open.
    #[error("audio disabled after repeated errors ({remaining_ms} ms remaining)")]
    Disabled { remaining_ms: u64 },
    #[error("audio context not ready")]
    NotReady,
    #[error("audio backend: {0}")]
    Backend(String),
}

impl AudioError {
    pub fn backend<T: Into<String>>(msg: T) -> Self {
        Self::Backend(msg.into())
    }
}

/// Failures reported by a [`RenderSurface`](crate::surface::RenderSurface).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    /// Autoplay was refused; expected under browser policy and never fatal.
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
    #[error("could not create tile for {0}")]
    CreateFailed(String),
}
