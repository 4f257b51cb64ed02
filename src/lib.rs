//! Auto-scrolling masonry media wall.
//!
//! A headless engine that lays images and videos out in independently
//! scrolling columns, recycles items that scroll off the top, plays what is
//! visible and mixes each video's audio by its position on screen. Rendering
//! and audio output sit behind the [`RenderSurface`] and [`AudioBackend`]
//! traits.

pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod layout;
pub mod models;
pub mod scanner;
pub mod surface;

pub use audio::{AudioBackend, HeadlessAudio, SessionState, VolumeStyle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::WallConfig;
pub use engine::{MediaWall, MediaWallBuilder, TickReport};
pub use error::{AudioError, Result, SurfaceError, WallError};
pub use events::{EventQueue, EventSender, WallEvent};
pub use models::{IngestFile, ItemId, MediaItem, MediaKind};
pub use surface::{HeadlessSurface, RenderSurface, TileHandle};
