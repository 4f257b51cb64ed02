use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mediawall::scanner::{FileScanner, MetadataProbe};
use mediawall::{EventQueue, HeadlessAudio, HeadlessSurface, MediaWall, SystemClock, WallConfig};

/// Frames run when `MEDIAWALL_TICKS` is unset (about ten seconds).
const DEFAULT_TICKS: u64 = 600;
const FRAME: Duration = Duration::from_millis(16);
const CONTAINER_WIDTH: f32 = 1920.0;
const VIEWPORT_HEIGHT: f32 = 1080.0;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediawall=info".parse()?),
        )
        .init();

    let folder = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: mediawall <folder>")?;
    let config = WallConfig::from_env();
    let ticks = match std::env::var("MEDIAWALL_TICKS") {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(value = %raw, "Ignoring MEDIAWALL_TICKS");
            DEFAULT_TICKS
        }),
        Err(_) => DEFAULT_TICKS,
    };

    let files = FileScanner::new()
        .scan(&folder)
        .await
        .with_context(|| format!("Failed to scan {:?}", folder))?;

    let events = EventQueue::new();
    let probe = MetadataProbe::new(2, events.sender())?;
    let mut wall = MediaWall::builder(config)
        .surface(Box::new(HeadlessSurface::new().with_probe(probe)))
        .audio(Box::new(HeadlessAudio::new()))
        .clock(Arc::new(SystemClock))
        .events(events)
        .viewport(CONTAINER_WIDTH, VIEWPORT_HEIGHT)
        .build()?;

    let ids = wall.ingest(files);
    if ids.is_empty() {
        warn!("No media found in {:?}", folder);
        return Ok(());
    }
    if let Err(e) = wall.setup_audio() {
        warn!(error = %e, "Continuing without audio");
    }
    wall.set_auto_scroll(true);

    let mut interval = tokio::time::interval(FRAME);
    let mut relocations = 0;
    for _ in 0..ticks {
        interval.tick().await;
        relocations += wall.tick().relocations;
    }

    let playing = wall.items().iter().filter(|i| i.playing).count();
    let audible = wall.items().iter().filter(|i| i.has_audio()).count();
    info!(
        items = wall.items().len(),
        ticks,
        relocations,
        playing,
        audible,
        total_height = wall.total_content_height(),
        audio = ?wall.audio_state(),
        "Run complete"
    );

    wall.dispose();
    Ok(())
}
