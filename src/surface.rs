//! Rendering surface seam.
//!
//! The engine never touches pixels. It asks a [`RenderSurface`] for one
//! positioned tile per item, and later moves, plays, pauses and removes it.
//! [`HeadlessSurface`] keeps tiles in memory and forwards media to a
//! [`MetadataProbe`] so real heights arrive the way load callbacks would.

use std::collections::HashMap;

use tracing::trace;

use crate::error::SurfaceError;
use crate::models::{IngestFile, ItemId, MediaKind};
use crate::scanner::metadata::{MetadataProbe, ProbeRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileHandle(pub u64);

/// Everything needed to create a tile.
#[derive(Debug, Clone, Copy)]
pub struct TileRequest<'a> {
    pub id: ItemId,
    pub file: &'a IngestFile,
    pub kind: MediaKind,
    pub x: f32,
    /// On-screen top edge (`y - column offset`).
    pub top: f32,
    pub width: f32,
}

pub trait RenderSurface {
    fn create_tile(&mut self, request: TileRequest<'_>) -> Result<TileHandle, SurfaceError>;
    fn set_position(&mut self, tile: TileHandle, x: f32, top: f32);
    fn play(&mut self, tile: TileHandle) -> Result<(), SurfaceError>;
    fn pause(&mut self, tile: TileHandle);
    fn set_media_volume(&mut self, tile: TileHandle, volume: f32);
    fn remove_tile(&mut self, tile: TileHandle);
    fn set_container_height(&mut self, height: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileState {
    pub id: ItemId,
    pub kind: MediaKind,
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub playing: bool,
    pub volume: f32,
}

/// In-memory surface for the headless driver.
pub struct HeadlessSurface {
    tiles: HashMap<TileHandle, TileState>,
    next_handle: u64,
    container_height: f32,
    probe: Option<MetadataProbe>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
            next_handle: 0,
            container_height: 0.0,
            probe: None,
        }
    }

    /// Measures every new tile's media in the background.
    pub fn with_probe(mut self, probe: MetadataProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn tile(&self, tile: TileHandle) -> Option<&TileState> {
        self.tiles.get(&tile)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn playing_count(&self) -> usize {
        self.tiles.values().filter(|t| t.playing).count()
    }

    pub fn container_height(&self) -> f32 {
        self.container_height
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for HeadlessSurface {
    fn create_tile(&mut self, request: TileRequest<'_>) -> Result<TileHandle, SurfaceError> {
        self.next_handle += 1;
        let handle = TileHandle(self.next_handle);
        self.tiles.insert(
            handle,
            TileState {
                id: request.id,
                kind: request.kind,
                x: request.x,
                top: request.top,
                width: request.width,
                playing: false,
                volume: 0.0,
            },
        );
        if let Some(probe) = &self.probe {
            probe.request(ProbeRequest {
                id: request.id,
                path: request.file.path.clone(),
                kind: request.kind,
                width: request.width,
            });
        }
        trace!(item = %request.id, ?handle, "Created tile");
        Ok(handle)
    }

    fn set_position(&mut self, tile: TileHandle, x: f32, top: f32) {
        if let Some(state) = self.tiles.get_mut(&tile) {
            state.x = x;
            state.top = top;
        }
    }

    fn play(&mut self, tile: TileHandle) -> Result<(), SurfaceError> {
        if let Some(state) = self.tiles.get_mut(&tile) {
            state.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self, tile: TileHandle) {
        if let Some(state) = self.tiles.get_mut(&tile) {
            state.playing = false;
        }
    }

    fn set_media_volume(&mut self, tile: TileHandle, volume: f32) {
        if let Some(state) = self.tiles.get_mut(&tile) {
            state.volume = volume;
        }
    }

    fn remove_tile(&mut self, tile: TileHandle) {
        self.tiles.remove(&tile);
    }

    fn set_container_height(&mut self, height: f32) {
        self.container_height = height;
    }
}

#[cfg(test)]
pub(crate) use recording::{RecordingSurface, SurfaceCall};

#[cfg(test)]
mod recording {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum SurfaceCall {
        Create(ItemId, TileHandle),
        Position(TileHandle, f32),
        Play(TileHandle),
        Pause(TileHandle),
        Volume(TileHandle, f32),
        Remove(TileHandle),
        ContainerHeight(f32),
    }

    #[derive(Default)]
    struct Log {
        calls: Vec<SurfaceCall>,
        reject_autoplay: bool,
        fail_create: bool,
    }

    /// Test surface that records every call. Clones share the log.
    #[derive(Clone, Default)]
    pub struct RecordingSurface {
        log: Arc<Mutex<Log>>,
        next: Arc<Mutex<u64>>,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<SurfaceCall> {
            self.log.lock().calls.clone()
        }

        pub fn reject_autoplay(&mut self, reject: bool) {
            self.log.lock().reject_autoplay = reject;
        }

        pub fn fail_create(&self, fail: bool) {
            self.log.lock().fail_create = fail;
        }

        pub fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
            self.log.lock().calls.iter().filter(|c| pred(c)).count()
        }

        pub fn last_volume(&self, tile: TileHandle) -> Option<f32> {
            self.log.lock().calls.iter().rev().find_map(|c| match c {
                SurfaceCall::Volume(t, v) if *t == tile => Some(*v),
                _ => None,
            })
        }
    }

    impl RenderSurface for RecordingSurface {
        fn create_tile(&mut self, request: TileRequest<'_>) -> Result<TileHandle, SurfaceError> {
            let mut log = self.log.lock();
            if log.fail_create {
                return Err(SurfaceError::CreateFailed(request.file.name.clone()));
            }
            let mut next = self.next.lock();
            *next += 1;
            let handle = TileHandle(*next);
            log.calls.push(SurfaceCall::Create(request.id, handle));
            Ok(handle)
        }

        fn set_position(&mut self, tile: TileHandle, _x: f32, top: f32) {
            self.log.lock().calls.push(SurfaceCall::Position(tile, top));
        }

        fn play(&mut self, tile: TileHandle) -> Result<(), SurfaceError> {
            let mut log = self.log.lock();
            log.calls.push(SurfaceCall::Play(tile));
            if log.reject_autoplay {
                return Err(SurfaceError::PlaybackRejected("NotAllowedError".into()));
            }
            Ok(())
        }

        fn pause(&mut self, tile: TileHandle) {
            self.log.lock().calls.push(SurfaceCall::Pause(tile));
        }

        fn set_media_volume(&mut self, tile: TileHandle, volume: f32) {
            self.log.lock().calls.push(SurfaceCall::Volume(tile, volume));
        }

        fn remove_tile(&mut self, tile: TileHandle) {
            self.log.lock().calls.push(SurfaceCall::Remove(tile));
        }

        fn set_container_height(&mut self, height: f32) {
            self.log.lock().calls.push(SurfaceCall::ContainerHeight(height));
        }
    }
}
