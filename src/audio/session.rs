//! Shared audio context and per-item graph lifecycle.
//!
//! One [`AudioSession`] owns the only audio context. Items get a
//! source -> panner -> gain -> destination graph lazily, the first time they
//! need to be heard while the context is running, and lose it as soon as
//! they go silent.
//!
//! Nothing in here propagates a failure to the render loop. Every failure is
//! logged, counted against a [`CircuitBreaker`] and answered by tearing down
//! the affected graph. Three failures open the breaker for ten seconds,
//! during which every item is muted and every audio operation is a no-op.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::audio::backend::{AudioBackend, ContextState, NodeId, ResumeOutcome};
use crate::audio::breaker::CircuitBreaker;
use crate::audio::mix::{center_volume, horizontal_pan, VolumeStyle};
use crate::config::WallConfig;
use crate::error::AudioError;
use crate::layout::Viewport;
use crate::models::{AudioGraph, MediaItem};
use crate::surface::{RenderSurface, TileHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Suspended,
    Failed,
}

/// Positions the mixer reads for one pass.
#[derive(Debug, Clone, Copy)]
pub struct MixFrame<'a> {
    pub offsets: &'a [f32],
    pub viewport: Viewport,
}

impl MixFrame<'_> {
    fn offset(&self, column: usize) -> f32 {
        self.offsets.get(column).copied().unwrap_or(0.0)
    }
}

pub struct AudioSession {
    backend: Box<dyn AudioBackend>,
    state: SessionState,
    breaker: CircuitBreaker,
    /// Bumped on every new context; graphs from older contexts are stale.
    epoch: u64,
    unsupported: bool,
    throttle: Duration,
    retry_backoff: Duration,
    last_update: Option<Instant>,
    retry_at: Option<Instant>,
    paused_until: Option<Instant>,
}

impl AudioSession {
    pub fn new(backend: Box<dyn AudioBackend>, config: &WallConfig) -> Self {
        Self {
            backend,
            state: SessionState::Uninitialized,
            breaker: CircuitBreaker::new(config.max_audio_errors, config.audio_cooldown),
            epoch: 0,
            unsupported: false,
            throttle: config.audio_throttle,
            retry_backoff: config.audio_retry_backoff,
            last_update: None,
            retry_at: None,
            paused_until: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn error_count(&self) -> u32 {
        self.breaker.error_count()
    }

    /// Circuit breaker open.
    pub fn is_disabled(&self, now: Instant) -> bool {
        self.breaker.is_open(now)
    }

    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    /// Audio operations are allowed: breaker closed and no resize pause.
    pub fn audio_enabled(&self, now: Instant) -> bool {
        !self.breaker.is_open(now) && !matches!(self.paused_until, Some(until) if now < until)
    }

    /// Creates the shared context.
    ///
    /// While an attempt is still in flight (context created, resume not yet
    /// confirmed) this returns `Initializing` without creating another one.
    pub fn initialize(&mut self, now: Instant) -> Result<SessionState, AudioError> {
        self.close_expired_breaker(now);
        if self.breaker.is_open(now) {
            return Err(AudioError::Disabled {
                remaining_ms: self.breaker.remaining(now).as_millis() as u64,
            });
        }
        if self.state == SessionState::Initializing {
            debug!("Audio context initialization already in flight");
            return Ok(self.state);
        }
        if self.unsupported || !self.backend.is_supported() {
            if !self.unsupported {
                warn!("Audio context not supported; continuing without audio");
                self.unsupported = true;
            }
            self.state = SessionState::Failed;
            return Err(AudioError::Unsupported);
        }

        self.state = SessionState::Initializing;
        self.retry_at = None;

        let initial = match self.backend.create_context() {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Failed to create audio context");
                self.state = SessionState::Failed;
                self.record_failure(now, true);
                return Err(e);
            }
        };
        self.epoch += 1;

        match initial {
            ContextState::Running => self.state = SessionState::Ready,
            ContextState::Suspended => match self.backend.resume() {
                Ok(ResumeOutcome::Running) => {
                    info!("Audio context resumed");
                    self.state = SessionState::Ready;
                }
                Ok(ResumeOutcome::Pending) => {
                    debug!("Audio context resume pending");
                }
                Err(e) => {
                    // May still work after a user gesture.
                    warn!(error = %e, "Failed to resume audio context");
                    self.state = SessionState::Suspended;
                }
            },
            ContextState::Closed => {
                error!("Audio context closed on creation");
                self.state = SessionState::Failed;
                self.record_failure(now, true);
                return Err(AudioError::NotReady);
            }
        }

        info!(state = ?self.state, epoch = self.epoch, "Audio context initialized");
        Ok(self.state)
    }

    /// Applies a state change reported by the context.
    pub fn on_context_state(&mut self, context: ContextState, now: Instant) {
        let next = match context {
            ContextState::Running => SessionState::Ready,
            ContextState::Suspended => SessionState::Suspended,
            ContextState::Closed => SessionState::Failed,
        };
        if next == self.state {
            return;
        }
        info!(from = ?self.state, to = ?next, "Audio context state changed");
        self.state = next;
        if next == SessionState::Failed && !self.breaker.is_open(now) {
            self.retry_at = Some(now + self.retry_backoff);
        }
    }

    /// Checks every deadline. Called once per tick.
    pub fn poll(&mut self, now: Instant) {
        self.close_expired_breaker(now);

        if matches!(self.paused_until, Some(until) if now >= until) {
            self.paused_until = None;
            debug!("Audio resumed after resize");
        }

        if !matches!(self.retry_at, Some(at) if now >= at) {
            return;
        }
        self.retry_at = None;
        if self.state == SessionState::Failed && !self.unsupported {
            info!("Attempting audio context recovery");
            if let Err(e) = self.initialize(now) {
                warn!(error = %e, "Audio context recovery failed");
            }
        }
    }

    /// Closes a breaker whose cool-down has passed. Every audio entry point
    /// calls this, so recovery does not wait for the next tick.
    fn close_expired_breaker(&mut self, now: Instant) {
        if self.breaker.poll(now) {
            info!("Audio re-enabled after cooldown");
            if self.state == SessionState::Failed {
                self.retry_at = Some(now);
            }
        }
    }

    /// Suspends audio operations for `duration` without counting a failure.
    pub fn pause_for(&mut self, duration: Duration, now: Instant) {
        self.paused_until = Some(now + duration);
    }

    /// Whether graphs can be built and updated right now. May kick off
    /// (re)initialization or a resume as a side effect.
    pub fn ensure_ready(&mut self, now: Instant) -> bool {
        self.close_expired_breaker(now);
        if !self.audio_enabled(now) || self.unsupported {
            return false;
        }

        let context = self.backend.context_state();
        let missing = matches!(context, None | Some(ContextState::Closed));
        if missing || matches!(self.state, SessionState::Failed | SessionState::Uninitialized) {
            if self.breaker.headroom() > 0 {
                debug!("Audio context not ready, reinitializing");
                if let Err(e) = self.initialize(now) {
                    trace!(error = %e, "Audio reinitialization failed");
                }
            }
            return false;
        }

        if context == Some(ContextState::Suspended) && self.state != SessionState::Suspended {
            match self.backend.resume() {
                Ok(ResumeOutcome::Running) => self.state = SessionState::Ready,
                Ok(ResumeOutcome::Pending) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to resume audio context");
                    self.record_failure(now, false);
                }
            }
        }

        self.state == SessionState::Ready || self.backend.context_state() == Some(ContextState::Running)
    }

    /// Sets an item's gain and pan, building its graph on first use.
    ///
    /// No-op while disabled or not ready, and for media without an audio
    /// track. A failure tears the item's graph down and counts once.
    pub fn apply_volume_and_pan(&mut self, item: &mut MediaItem, volume: f32, pan: f32, now: Instant) {
        self.close_expired_breaker(now);
        if !item.is_video() || item.media_failed {
            return;
        }
        if !self.audio_enabled(now) || !self.ensure_ready(now) {
            return;
        }
        if let Err(e) = self.try_apply(item, volume, pan) {
            self.cleanup(item);
            self.record_failure(now, false);
            warn!(
                item = %item.id,
                errors = self.breaker.error_count(),
                max = self.breaker.threshold(),
                error = %e,
                "Audio update failed"
            );
        }
    }

    fn try_apply(&mut self, item: &mut MediaItem, volume: f32, pan: f32) -> Result<(), AudioError> {
        if matches!(item.audio, Some(graph) if graph.epoch != self.epoch) {
            // Nodes died with their context.
            item.audio = None;
        }

        let running = self.backend.context_state() == Some(ContextState::Running);
        if item.audio.is_none() {
            if !running {
                return Ok(());
            }
            if !self.backend.has_audio_track(item.tile) {
                trace!(item = %item.id, "No audio track, skipping");
                return Ok(());
            }
            let graph = self.build_graph(item.tile)?;
            debug!(item = %item.id, "Created audio graph");
            item.audio = Some(graph);
        }

        let Some(graph) = item.audio else {
            return Ok(());
        };
        if !running {
            return Ok(());
        }
        self.backend.set_gain(graph.gain, volume.clamp(0.0, 1.0))?;
        self.backend.set_pan(graph.panner, pan.clamp(-1.0, 1.0))?;
        Ok(())
    }

    fn build_graph(&mut self, tile: TileHandle) -> Result<AudioGraph, AudioError> {
        let mut created = Vec::with_capacity(3);
        match wire_graph(self.backend.as_mut(), tile, &mut created) {
            Ok([source, panner, gain]) => Ok(AudioGraph {
                source,
                panner,
                gain,
                epoch: self.epoch,
            }),
            Err(e) => {
                for node in created {
                    let _ = self.backend.disconnect(node);
                }
                Err(e)
            }
        }
    }

    /// Disconnects and forgets an item's graph. Already-disconnected nodes
    /// are fine.
    pub fn cleanup(&mut self, item: &mut MediaItem) {
        let Some(graph) = item.audio.take() else {
            return;
        };
        if graph.epoch != self.epoch {
            return;
        }
        for node in graph.nodes() {
            if let Err(e) = self.backend.disconnect(node) {
                trace!(item = %item.id, error = %e, "Audio node already disconnected");
            }
        }
    }

    /// Zeroes every video immediately, ignoring the throttle, and tears all
    /// graphs down.
    pub fn mute_all_immediately(&mut self, items: &mut [MediaItem], surface: &mut dyn RenderSurface) {
        if items.is_empty() {
            return;
        }
        info!("Muting all audio");
        for item in items.iter_mut().filter(|i| i.is_video()) {
            self.silence(item, surface, true);
        }
    }

    /// Throttled volume pass over every video item. Returns whether it ran.
    pub fn set_volume_style(
        &mut self,
        style: VolumeStyle,
        items: &mut [MediaItem],
        frame: &MixFrame<'_>,
        surface: &mut dyn RenderSurface,
        now: Instant,
    ) -> bool {
        self.close_expired_breaker(now);
        if items.is_empty() {
            return false;
        }
        if matches!(self.last_update, Some(last) if now.duration_since(last) < self.throttle) {
            return false;
        }
        self.last_update = Some(now);

        if !self.audio_enabled(now) {
            let teardown = self.breaker.is_open(now);
            for item in items.iter_mut().filter(|i| i.is_video()) {
                self.silence(item, surface, teardown);
            }
            return true;
        }

        for item in items.iter_mut().filter(|i| i.is_video() && !i.media_failed) {
            match style {
                VolumeStyle::CenterY => {
                    let offset = frame.offset(item.column);
                    let volume = if frame.viewport.is_visible(item, offset) {
                        center_volume(item.screen_y(offset), item.height, frame.viewport.height)
                    } else {
                        0.0
                    };
                    item.volume = volume;
                    surface.set_media_volume(item.tile, volume);
                    if volume > 0.0 {
                        let pan = horizontal_pan(item.x, item.width, frame.viewport.width);
                        self.apply_volume_and_pan(item, volume, pan, now);
                    } else {
                        self.cleanup(item);
                    }
                }
                VolumeStyle::OnlyOne => self.silence(item, surface, false),
                VolumeStyle::MuteAll => self.silence(item, surface, true),
            }
        }

        if self.breaker.is_open(now) {
            self.force_mute(items, surface);
        }
        true
    }

    /// Keeps everything silent while the breaker is open.
    pub fn enforce_breaker(&mut self, items: &mut [MediaItem], surface: &mut dyn RenderSurface, now: Instant) {
        self.close_expired_breaker(now);
        if self.breaker.is_open(now) {
            self.force_mute(items, surface);
        }
    }

    fn force_mute(&mut self, items: &mut [MediaItem], surface: &mut dyn RenderSurface) {
        for item in items.iter_mut().filter(|i| i.is_video()) {
            if item.volume != 0.0 || item.has_audio() {
                self.silence(item, surface, true);
            }
        }
    }

    fn silence(&mut self, item: &mut MediaItem, surface: &mut dyn RenderSurface, teardown: bool) {
        item.volume = 0.0;
        surface.set_media_volume(item.tile, 0.0);
        if let Some(graph) = item.audio {
            if graph.epoch == self.epoch {
                let _ = self.backend.set_gain(graph.gain, 0.0);
            }
        }
        if teardown {
            self.cleanup(item);
        }
    }

    /// Rebuilds graphs for visible videos that should be audible.
    pub fn reconnect_visible(&mut self, items: &mut [MediaItem], frame: &MixFrame<'_>, now: Instant) {
        if !self.ensure_ready(now) {
            return;
        }
        for item in items.iter_mut().filter(|i| i.is_video() && i.volume > 0.0) {
            if frame.viewport.is_visible(item, frame.offset(item.column)) {
                let pan = horizontal_pan(item.x, item.width, frame.viewport.width);
                let volume = item.volume;
                self.apply_volume_and_pan(item, volume, pan, now);
            }
        }
    }

    /// User gesture: resume a suspended context or bring up a missing one.
    pub fn resume_on_interaction(&mut self, now: Instant) {
        match self.backend.context_state() {
            Some(ContextState::Suspended) => match self.backend.resume() {
                Ok(ResumeOutcome::Running) => {
                    info!("Audio context resumed on user interaction");
                    self.state = SessionState::Ready;
                }
                Ok(ResumeOutcome::Pending) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to resume audio context on interaction");
                    self.state = SessionState::Failed;
                    if let Err(e) = self.initialize(now) {
                        warn!(error = %e, "Audio reinitialization failed");
                    }
                }
            },
            None | Some(ContextState::Closed) => {
                if let Err(e) = self.initialize(now) {
                    warn!(error = %e, "Failed to initialize audio on interaction");
                }
            }
            Some(ContextState::Running) if self.state == SessionState::Failed => {
                if let Err(e) = self.initialize(now) {
                    warn!(error = %e, "Failed to initialize audio on interaction");
                }
            }
            Some(ContextState::Running) => {}
        }
    }

    /// Context-level failure: drop every graph and retry after the backoff.
    pub fn handle_audio_error(&mut self, reason: &str, items: &mut [MediaItem], now: Instant) {
        error!(reason, "Audio error encountered");
        self.state = SessionState::Failed;
        for item in items.iter_mut() {
            self.cleanup(item);
        }
        self.record_failure(now, true);
    }

    /// Closes the context for good (page unload).
    pub fn dispose(&mut self) {
        self.backend.close();
        self.state = SessionState::Uninitialized;
        self.retry_at = None;
        self.epoch += 1;
        info!("Audio session disposed");
    }

    fn record_failure(&mut self, now: Instant, context_level: bool) {
        if self.breaker.record_failure(now) {
            error!(
                cooldown_ms = self.breaker.remaining(now).as_millis() as u64,
                "Too many audio errors; disabling audio"
            );
            self.retry_at = None;
        } else if context_level {
            self.retry_at = Some(now + self.retry_backoff);
        }
    }
}

/// Creates and wires one graph, pushing each node into `created` as soon as
/// it exists so a failure can be unwound.
fn wire_graph(
    backend: &mut dyn AudioBackend,
    tile: TileHandle,
    created: &mut Vec<NodeId>,
) -> Result<[NodeId; 3], AudioError> {
    let source = backend.create_media_source(tile)?;
    created.push(source);
    let panner = backend.create_panner()?;
    created.push(panner);
    let gain = backend.create_gain()?;
    created.push(gain);

    backend.connect(source, panner)?;
    backend.connect(panner, gain)?;
    backend.connect_destination(gain)?;
    Ok([source, panner, gain])
}
