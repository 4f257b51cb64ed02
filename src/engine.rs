//! The media wall engine.
//!
//! [`MediaWall`] owns every piece of wall state: the column model, the item
//! registry, the audio session, the rendering surface and the inbound event
//! queue. The host drives it by calling [`MediaWall::tick`] once per frame
//! and the ingestion/configuration entry points in between.
//!
//! One tick always runs in this order:
//! 1. drain inbound events (metadata, media failures, audio state, resizes)
//! 2. check audio deadlines (cool-down, retry, resize pause)
//! 3. advance column offsets and recycle items (auto-scroll only)
//! 4. push on-screen positions, then play/pause by visibility
//! 5. apply volume and pan (auto-scroll only, throttled)
//!
//! so volume and pan always see the positions of the same tick.

use std::sync::Arc;
use std::time::Instant;

use fastrand::Rng;
use tracing::{debug, info, trace, warn};

use crate::audio::{AudioBackend, AudioSession, HeadlessAudio, MixFrame, SessionState, VolumeStyle};
use crate::clock::{Clock, SystemClock};
use crate::config::{WallConfig, MAX_COLUMNS, MIN_COLUMNS};
use crate::error::{Result, WallError};
use crate::events::{EventQueue, EventSender, WallEvent};
use crate::layout::{
    correct_height, update_playback, MasonryLayout, PlaybackReport, RecyclingScheduler, ScrollSpeeds,
    Viewport,
};
use crate::models::{ColumnModel, IngestFile, ItemId, MediaItem, MediaRegistry};
use crate::surface::{HeadlessSurface, RenderSurface, TileRequest};

/// Ticks between periodic status lines.
pub const LOG_INTERVAL_TICKS: u64 = 60;

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub events: usize,
    pub relocations: usize,
    pub playback: PlaybackReport,
    /// The volume pass ran (it is throttled).
    pub mixed: bool,
}

pub struct MediaWallBuilder {
    config: WallConfig,
    surface: Option<Box<dyn RenderSurface>>,
    audio: Option<Box<dyn AudioBackend>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<EventQueue>,
    container_width: f32,
    viewport_height: f32,
    seed: Option<u64>,
}

impl MediaWallBuilder {
    pub fn surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn audio(mut self, audio: Box<dyn AudioBackend>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Queue whose senders were already handed out (e.g. to a probe).
    pub fn events(mut self, events: EventQueue) -> Self {
        self.events = Some(events);
        self
    }

    pub fn viewport(mut self, container_width: f32, viewport_height: f32) -> Self {
        self.container_width = container_width;
        self.viewport_height = viewport_height;
        self
    }

    /// Seeds the column speed generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<MediaWall> {
        self.config.validate()?;

        let mut rng = match self.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };
        let columns = ColumnModel::new(self.config.column_count, self.config.gutter, &mut rng);
        let audio = self.audio.unwrap_or_else(|| Box::new(HeadlessAudio::new()));
        let session = AudioSession::new(audio, &self.config);

        let mut wall = MediaWall {
            columns,
            registry: MediaRegistry::new(),
            session,
            surface: self.surface.unwrap_or_else(|| Box::new(HeadlessSurface::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            events: self.events.unwrap_or_default(),
            rng,
            container_width: self.container_width,
            viewport_height: self.viewport_height,
            auto_scroll: false,
            first_selection: true,
            volume_style: VolumeStyle::CenterY,
            total_height: 0.0,
            tick_count: 0,
            config: self.config,
        };
        wall.update_layout_dimensions();
        info!(
            columns = wall.config.column_count,
            column_width = wall.columns.width(),
            "Media wall ready"
        );
        Ok(wall)
    }
}

pub struct MediaWall {
    config: WallConfig,
    columns: ColumnModel,
    registry: MediaRegistry,
    session: AudioSession,
    surface: Box<dyn RenderSurface>,
    clock: Arc<dyn Clock>,
    events: EventQueue,
    rng: Rng,
    container_width: f32,
    viewport_height: f32,
    auto_scroll: bool,
    /// The next ingestion starts from a clean wall.
    first_selection: bool,
    volume_style: VolumeStyle,
    total_height: f32,
    tick_count: u64,
}

impl MediaWall {
    pub fn builder(config: WallConfig) -> MediaWallBuilder {
        MediaWallBuilder {
            config,
            surface: None,
            audio: None,
            clock: None,
            events: None,
            container_width: 0.0,
            viewport_height: 0.0,
            seed: None,
        }
    }

    /// Sender for host callbacks (media loads, audio state, resizes).
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Creates the shared audio context up front instead of on first
    /// interaction.
    pub fn setup_audio(&mut self) -> Result<SessionState> {
        let now = self.clock.now();
        Ok(self.session.initialize(now)?)
    }

    // --- ingestion -------------------------------------------------------

    /// Lays out a batch of files from one folder picker selection.
    ///
    /// Non-media files and files already on the wall (same name and size)
    /// are skipped. Returns the ids of the items created, in order.
    pub fn ingest(&mut self, files: Vec<IngestFile>) -> Vec<ItemId> {
        self.prepare_ingest();

        let total = files.len();
        let media: Vec<IngestFile> = files
            .into_iter()
            .filter(|f| {
                let keep = f.is_media();
                if !keep {
                    trace!(name = %f.name, "Skipping non-media file");
                }
                keep
            })
            .collect();
        let Some(first) = media.first() else {
            debug!(total, "No media files in selection");
            return Vec::new();
        };

        let folder = first.folder_name();
        let fresh = self.registry.retain_new(&folder, media);
        let mut ids = Vec::with_capacity(fresh.len());
        for file in fresh {
            let name = file.name.clone();
            match self.create_item(file) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(name = %name, error = %e, "Failed to create item"),
            }
        }
        self.update_total_height();

        info!(folder = %folder, total, added = ids.len(), "Ingested files");
        ids
    }

    /// Lays out a single file, reporting why it was refused.
    pub fn add_file(&mut self, file: IngestFile) -> Result<ItemId> {
        if !file.is_media() {
            return Err(WallError::UnsupportedMedia { name: file.name });
        }
        self.prepare_ingest();

        let (name, size) = (file.name.clone(), file.size);
        let folder = file.folder_name();
        let file = self
            .registry
            .retain_new(&folder, vec![file])
            .pop()
            .ok_or(WallError::DuplicateFile { name, size })?;
        let id = self.create_item(file)?;
        self.update_total_height();
        Ok(id)
    }

    fn prepare_ingest(&mut self) {
        if self.first_selection {
            self.clear_all();
            self.first_selection = false;
        }
        if !self.columns.is_consistent(self.config.column_count) || self.columns.width() <= 0.0 {
            warn!("Column state inconsistent, recomputing dimensions");
            self.update_layout_dimensions();
        }
    }

    fn create_item(&mut self, file: Arc<IngestFile>) -> Result<ItemId> {
        let kind = file.kind().ok_or_else(|| WallError::UnsupportedMedia {
            name: file.name.clone(),
        })?;

        let layout = self.layout();
        let placement = match layout.choose(&self.columns) {
            Ok(placement) => placement,
            Err(WallError::InvalidLayout { column_width }) => {
                warn!(column_width, "Invalid layout, recomputing before placement");
                self.update_layout_dimensions();
                layout.choose(&self.columns)?
            }
            Err(e) => return Err(e),
        };

        let width = self.columns.width();
        let height = width * self.config.estimated_aspect;
        let id = self.registry.allocate_id();
        let tile = self.surface.create_tile(TileRequest {
            id,
            file: &file,
            kind,
            x: placement.x,
            top: placement.y - self.columns.offset(placement.column),
            width,
        })?;
        self.columns.commit(placement.column, placement.y, height);

        trace!(item = %id, column = placement.column, y = placement.y, "Created item");
        self.registry.push(MediaItem {
            id,
            file,
            kind,
            tile,
            column: placement.column,
            x: placement.x,
            y: placement.y,
            width,
            height,
            playing: false,
            volume: 0.0,
            audio: None,
            media_failed: false,
        });
        Ok(id)
    }

    // --- per-frame -------------------------------------------------------

    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        self.tick_count += 1;
        let mut report = TickReport::default();

        let events = self.events.drain();
        report.events = events.len();
        for event in events {
            self.handle_event(event, now);
        }

        self.session.poll(now);

        let active = self.auto_scroll && !self.registry.is_empty();
        if active {
            let scheduler = RecyclingScheduler::new(self.layout(), self.config.pop_out_px);
            let speeds = ScrollSpeeds {
                scroll_speed: self.config.scroll_speed,
                uniformity: self.config.uniformity,
            };
            report.relocations = scheduler
                .tick(&mut self.columns, self.registry.items_mut(), speeds)
                .len();
            self.update_total_height();
        }

        self.sync_positions();
        let viewport = self.viewport();
        report.playback = update_playback(
            self.registry.items_mut(),
            &self.columns,
            &viewport,
            self.surface.as_mut(),
        );

        if active {
            report.mixed = self.mix(self.volume_style, now);
        }
        self.session
            .enforce_breaker(self.registry.items_mut(), self.surface.as_mut(), now);

        if self.tick_count % LOG_INTERVAL_TICKS == 0 {
            debug!(
                tick = self.tick_count,
                items = self.registry.len(),
                total_height = self.total_height,
                audio = ?self.session.state(),
                audio_errors = self.session.error_count(),
                "Wall status"
            );
        }
        report
    }

    fn handle_event(&mut self, event: WallEvent, now: Instant) {
        match event {
            WallEvent::MetadataLoaded { id, height } => {
                if let Err(e) = self.correct_item_height(id, height) {
                    trace!(error = %e, "Ignoring metadata for removed item");
                }
            }
            WallEvent::MediaFailed { id, reason } => self.fail_media(id, &reason),
            WallEvent::AudioStateChanged(state) => self.session.on_context_state(state, now),
            WallEvent::AudioFailed(reason) => {
                self.session
                    .handle_audio_error(&reason, self.registry.items_mut(), now)
            }
            WallEvent::Resized {
                container_width,
                viewport_height,
            } => self.resize(container_width, viewport_height),
            WallEvent::UserInteraction => {
                self.session.resume_on_interaction(now);
                let frame = MixFrame {
                    offsets: self.columns.offsets(),
                    viewport: Viewport {
                        width: self.container_width,
                        height: self.viewport_height,
                        render_buffer: self.config.render_buffer,
                    },
                };
                self.session
                    .reconnect_visible(self.registry.items_mut(), &frame, now);
            }
        }
    }

    /// Applies a measured height. Returns whether anything moved.
    pub fn correct_item_height(&mut self, id: ItemId, height: f32) -> Result<bool> {
        if !self.registry.contains(id) {
            return Err(WallError::UnknownItem(id));
        }
        let changed = correct_height(&mut self.columns, self.registry.items_mut(), id, height).is_some();
        if changed {
            self.update_total_height();
        }
        Ok(changed)
    }

    fn fail_media(&mut self, id: ItemId, reason: &str) {
        let Some(item) = self.registry.get_mut(id) else {
            trace!(item = %id, "Ignoring failure for removed item");
            return;
        };
        warn!(item = %id, name = %item.file.name, reason, "Media failed to load");
        item.media_failed = true;
        item.volume = 0.0;
        if item.playing {
            self.surface.pause(item.tile);
            item.playing = false;
        }
        self.surface.set_media_volume(item.tile, 0.0);
        self.session.cleanup(item);
    }

    fn sync_positions(&mut self) {
        for item in self.registry.items() {
            self.surface
                .set_position(item.tile, item.x, item.screen_y(self.columns.offset(item.column)));
        }
    }

    fn mix(&mut self, style: VolumeStyle, now: Instant) -> bool {
        let viewport = self.viewport();
        let frame = MixFrame {
            offsets: self.columns.offsets(),
            viewport,
        };
        self.session.set_volume_style(
            style,
            self.registry.items_mut(),
            &frame,
            self.surface.as_mut(),
            now,
        )
    }

    // --- layout lifecycle ------------------------------------------------

    /// Removes every item and zeroes the columns. Files are forgotten too.
    pub fn clear_all(&mut self) {
        for mut item in self.registry.take_all_items() {
            self.teardown_item(&mut item);
        }
        self.registry.clear();
        if self.columns.is_consistent(self.config.column_count) {
            self.columns.reset();
        } else {
            self.columns.resize(self.config.column_count, &mut self.rng);
        }
        self.first_selection = true;
        self.update_total_height();
        info!("Cleared all media");
    }

    /// Removes one folder's items. Remaining items are laid out again.
    pub fn delete_folder(&mut self, name: &str) -> bool {
        let Some(keys) = self.registry.remove_folder(name) else {
            warn!(folder = name, "Folder not found");
            return false;
        };
        let removed = self.registry.take_items_for(&keys);
        let count = removed.len();
        for mut item in removed {
            self.teardown_item(&mut item);
        }

        if self.registry.files().is_empty() {
            self.columns.reset();
            self.update_total_height();
        } else {
            self.recompute_layout();
        }
        info!(folder = name, removed = count, "Deleted folder");
        true
    }

    /// Tears every item down and lays the retained files out again from
    /// the top. Items get new ids.
    pub fn recompute_layout(&mut self) {
        for mut item in self.registry.take_all_items() {
            self.teardown_item(&mut item);
        }
        self.update_layout_dimensions();
        self.columns.reset();

        let files = self.registry.files().to_vec();
        for file in files {
            let name = file.name.clone();
            if let Err(e) = self.create_item(file) {
                warn!(name = %name, error = %e, "Failed to recreate item");
            }
        }
        self.update_total_height();
        info!(
            items = self.registry.len(),
            column_width = self.columns.width(),
            "Recomputed layout"
        );
    }

    /// Re-derives the column width from the container and repairs the
    /// column arrays if their length drifted from the configured count.
    pub fn update_layout_dimensions(&mut self) {
        let count = self.config.column_count;
        if !self.columns.is_consistent(count) {
            self.columns.resize(count, &mut self.rng);
        }
        self.columns.set_gutter(self.config.gutter);
        let width = ColumnModel::compute_width(
            self.container_width,
            count,
            self.config.gutter,
            self.config.fallback_column_width,
        );
        self.columns.set_width(width);
    }

    /// Hard reset to a new column count. Speeds of surviving columns are
    /// kept; auto-scroll is paused across the rebuild.
    pub fn set_column_count(&mut self, count: usize) -> Result<()> {
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&count) {
            return Err(WallError::InvalidConfig(format!(
                "column count {count} outside {MIN_COLUMNS}..={MAX_COLUMNS}"
            )));
        }
        if count == self.config.column_count {
            return Ok(());
        }

        let was_scrolling = self.auto_scroll;
        self.auto_scroll = false;

        self.config.column_count = count;
        self.columns.resize(count, &mut self.rng);
        self.recompute_layout();

        self.auto_scroll = was_scrolling;
        info!(columns = count, "Column count changed");
        Ok(())
    }

    /// New container or viewport size. Audio stays off briefly while the
    /// wall is rebuilt.
    pub fn resize(&mut self, container_width: f32, viewport_height: f32) {
        let now = self.clock.now();
        self.container_width = container_width;
        self.viewport_height = viewport_height;
        self.session.pause_for(self.config.resize_audio_pause, now);

        self.update_layout_dimensions();
        if !self.registry.is_empty() {
            self.recompute_layout();
        }
        debug!(container_width, viewport_height, "Resized");
    }

    fn teardown_item(&mut self, item: &mut MediaItem) {
        self.session.cleanup(item);
        if item.playing {
            self.surface.pause(item.tile);
            item.playing = false;
        }
        self.surface.remove_tile(item.tile);
    }

    fn update_total_height(&mut self) {
        self.total_height = self.columns.total_height();
        self.surface.set_container_height(self.total_height);
    }

    // --- controls --------------------------------------------------------

    pub fn set_auto_scroll(&mut self, enabled: bool) {
        if self.auto_scroll == enabled {
            return;
        }
        self.auto_scroll = enabled;
        if !enabled {
            self.mute_all_immediately();
        }
        info!(enabled, "Auto-scroll toggled");
    }

    /// Returns the new state.
    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.set_auto_scroll(!self.auto_scroll);
        self.auto_scroll
    }

    pub fn mute_all_immediately(&mut self) {
        self.session
            .mute_all_immediately(self.registry.items_mut(), self.surface.as_mut());
    }

    /// Switches the volume style and applies it right away (throttled).
    pub fn set_volume_style(&mut self, style: VolumeStyle) -> bool {
        self.volume_style = style;
        let now = self.clock.now();
        self.mix(style, now)
    }

    pub fn set_scroll_speed(&mut self, speed: f32) {
        self.config.set_scroll_speed(speed);
    }

    pub fn set_uniformity(&mut self, uniformity: f32) {
        self.config.set_uniformity(uniformity);
    }

    pub fn set_pop_in(&mut self, px: f32) {
        self.config.set_pop_in(px);
    }

    pub fn set_pop_out(&mut self, px: f32) {
        self.config.set_pop_out(px);
    }

    pub fn set_render_buffer(&mut self, px: f32) {
        self.config.set_render_buffer(px);
    }

    pub fn set_column_speed(&mut self, column: usize, speed: f32) {
        self.columns.set_individual_speed(column, speed);
    }

    // --- accessors -------------------------------------------------------

    pub fn config(&self) -> &WallConfig {
        &self.config
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn items(&self) -> &[MediaItem] {
        self.registry.items()
    }

    pub fn item(&self, id: ItemId) -> Option<&MediaItem> {
        self.registry.get(id)
    }

    pub fn folders(&self) -> Vec<(String, usize)> {
        self.registry
            .folders()
            .map(|(name, count)| (name.to_string(), count))
            .collect()
    }

    pub fn total_content_height(&self) -> f32 {
        self.total_height
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.container_width,
            height: self.viewport_height,
            render_buffer: self.config.render_buffer,
        }
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.auto_scroll
    }

    pub fn volume_style(&self) -> VolumeStyle {
        self.volume_style
    }

    pub fn audio_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn audio_error_count(&self) -> u32 {
        self.session.error_count()
    }

    pub fn audio_disabled(&self) -> bool {
        self.session.is_disabled(self.clock.now())
    }

    pub fn audio_enabled(&self) -> bool {
        self.session.audio_enabled(self.clock.now())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn layout(&self) -> MasonryLayout {
        MasonryLayout::new(self.viewport_height, self.config.pop_in_px, self.auto_scroll)
    }

    /// Stops everything and closes the audio context.
    pub fn dispose(&mut self) {
        self.auto_scroll = false;
        for mut item in self.registry.take_all_items() {
            self.teardown_item(&mut item);
        }
        self.session.dispose();
        info!(ticks = self.tick_count, "Media wall disposed");
    }
}
