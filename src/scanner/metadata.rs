//! Background measurement of real media sizes.
//!
//! Tiles are laid out with an estimated height. [`MetadataProbe`] reads the
//! real dimensions off the render thread and reports the height at the
//! tile's width back to the engine as a [`WallEvent`].
//!
//! - Small worker pool (1-4 threads) fed through a flume channel
//! - Images are measured from their headers only
//! - Videos fall back to 16:9 once the file is known to be readable

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flume::{Receiver, Sender};
use image::ImageReader;
use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};

use crate::events::{EventSender, WallEvent};
use crate::models::{ItemId, MediaKind};

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Height / width assumed for videos.
const VIDEO_ASPECT: f32 = 9.0 / 16.0;

#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub id: ItemId,
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Tile width the height is computed for.
    pub width: f32,
}

pub struct MetadataProbe {
    request_tx: Sender<ProbeRequest>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Items queued or being measured.
    pending: Arc<RwLock<HashSet<ItemId>>>,
}

impl MetadataProbe {
    pub fn new(workers: usize, events: EventSender) -> Result<Self> {
        let num_workers = workers.clamp(1, MAX_WORKERS);
        let (request_tx, request_rx) = flume::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(RwLock::new(HashSet::new()));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let events = events.clone();
            let shutdown = Arc::clone(&shutdown);
            let pending = Arc::clone(&pending);

            let handle = thread::Builder::new()
                .name(format!("probe-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, events, shutdown, pending))
                .context("Failed to spawn metadata worker")?;
            handles.push(handle);
        }

        debug!(num_workers, "Started metadata probe");

        Ok(Self {
            request_tx,
            workers: handles,
            shutdown,
            pending,
        })
    }

    /// Queues a measurement. Returns false if the item is already pending.
    pub fn request(&self, req: ProbeRequest) -> bool {
        if !self.pending.write().insert(req.id) {
            trace!(item = %req.id, "Probe already pending");
            return false;
        }

        let id = req.id;
        if self.request_tx.send(req).is_err() {
            error!("Metadata probe disconnected");
            self.pending.write().remove(&id);
            return false;
        }
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down metadata probe");
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MetadataProbe {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<ProbeRequest>,
    events: EventSender,
    shutdown: Arc<AtomicBool>,
    pending: Arc<RwLock<HashSet<ItemId>>>,
) {
    debug!(worker_id, "Probe worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(req) => {
                let event = match measure(&req) {
                    Ok(height) => WallEvent::MetadataLoaded { id: req.id, height },
                    Err(e) => {
                        warn!(item = %req.id, path = ?req.path, error = %e, "Failed to load media");
                        WallEvent::MediaFailed {
                            id: req.id,
                            reason: format!("{e:#}"),
                        }
                    }
                };
                pending.write().remove(&req.id);
                events.send(event);
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Probe worker stopped");
}

/// Height of the media when shown at `req.width`.
pub fn measure(req: &ProbeRequest) -> Result<f32> {
    match req.kind {
        MediaKind::Image => {
            let (width, height) = ImageReader::open(&req.path)
                .with_context(|| format!("Failed to open {:?}", req.path))?
                .with_guessed_format()
                .context("Failed to sniff image format")?
                .into_dimensions()
                .with_context(|| format!("Failed to read dimensions of {:?}", req.path))?;
            if width == 0 || height == 0 {
                bail!("image {:?} has zero size", req.path);
            }
            trace!(item = %req.id, width, height, "Measured image");
            Ok(req.width * height as f32 / width as f32)
        }
        MediaKind::Video => {
            fs::metadata(&req.path).with_context(|| format!("Failed to stat {:?}", req.path))?;
            Ok(req.width * VIDEO_ASPECT)
        }
    }
}
