//! Inbound events.
//!
//! Media load callbacks, audio context state changes and host resizes all
//! arrive asynchronously. Producers push them through an [`EventSender`];
//! the engine drains the queue once at the start of every tick.

use std::time::Duration;

use flume::{Receiver, Sender};
use tracing::warn;

use crate::audio::ContextState;
use crate::models::ItemId;

#[derive(Debug, Clone, PartialEq)]
pub enum WallEvent {
    /// Real media size is known; `height` is at the tile's current width.
    MetadataLoaded { id: ItemId, height: f32 },
    /// The media could not be loaded.
    MediaFailed { id: ItemId, reason: String },
    AudioStateChanged(ContextState),
    /// Context-level audio failure.
    AudioFailed(String),
    Resized {
        container_width: f32,
        viewport_height: f32,
    },
    /// A user gesture that may unlock audio.
    UserInteraction,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<WallEvent>,
}

impl EventSender {
    /// Returns false once the wall is gone.
    pub fn send(&self, event: WallEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(event = ?e.into_inner(), "Event queue closed, dropping event");
                false
            }
        }
    }
}

pub struct EventQueue {
    tx: Sender<WallEvent>,
    rx: Receiver<WallEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender { tx: self.tx.clone() }
    }

    /// Everything queued so far, in arrival order.
    pub fn drain(&self) -> Vec<WallEvent> {
        self.rx.try_iter().collect()
    }

    /// Blocks until an event arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WallEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
