use tracing::trace;

use crate::models::{ColumnModel, MediaItem};
use crate::surface::RenderSurface;

/// Visible area of the wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Container width; also the reference width for stereo panning.
    pub width: f32,
    pub height: f32,
    /// Pixels beyond the top and bottom edges still counted as visible.
    pub render_buffer: f32,
}

impl Viewport {
    pub fn is_visible(&self, item: &MediaItem, column_offset: f32) -> bool {
        let top = item.screen_y(column_offset);
        top + item.height >= -self.render_buffer && top <= self.height + self.render_buffer
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub started: usize,
    pub paused: usize,
    pub rejected: usize,
}

/// Plays visible videos and pauses hidden ones.
///
/// Issues no calls for items whose state already matches, so running it
/// twice on unchanged positions is a no-op the second time. Refused
/// autoplay leaves the item paused; it is retried on the next call.
pub fn update_playback(
    items: &mut [MediaItem],
    columns: &ColumnModel,
    viewport: &Viewport,
    surface: &mut dyn RenderSurface,
) -> PlaybackReport {
    let mut report = PlaybackReport::default();

    for item in items.iter_mut().filter(|i| i.is_video() && !i.media_failed) {
        let visible = viewport.is_visible(item, columns.offset(item.column));
        if visible && !item.playing {
            match surface.play(item.tile) {
                Ok(()) => {
                    item.playing = true;
                    report.started += 1;
                }
                Err(e) => {
                    trace!(item = %item.id, error = %e, "Autoplay refused");
                    report.rejected += 1;
                }
            }
        } else if !visible && item.playing {
            surface.pause(item.tile);
            item.playing = false;
            report.paused += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngestFile, ItemId, MediaKind};
    use crate::surface::{RecordingSurface, SurfaceCall, TileHandle};
    use fastrand::Rng;
    use std::sync::Arc;

    fn make_item(id: u64, kind: MediaKind, y: f32, height: f32) -> MediaItem {
        MediaItem {
            id: ItemId(id),
            file: Arc::new(IngestFile::new(format!("{id}.mp4"), id, None)),
            kind,
            tile: TileHandle(id),
            column: 0,
            x: 0.0,
            y,
            width: 100.0,
            height,
            playing: false,
            volume: 0.0,
            audio: None,
            media_failed: false,
        }
    }

    fn make_columns() -> ColumnModel {
        let mut rng = Rng::with_seed(2);
        ColumnModel::new(1, 10.0, &mut rng)
    }

    #[test]
    fn test_visibility_edges() {
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
            render_buffer: 0.0,
        };
        // bottom exactly at the top edge counts
        assert!(viewport.is_visible(&make_item(1, MediaKind::Video, -100.0, 100.0), 0.0));
        assert!(!viewport.is_visible(&make_item(1, MediaKind::Video, -101.0, 100.0), 0.0));
        // top exactly at the bottom edge counts
        assert!(viewport.is_visible(&make_item(1, MediaKind::Video, 600.0, 100.0), 0.0));
        assert!(!viewport.is_visible(&make_item(1, MediaKind::Video, 601.0, 100.0), 0.0));
        // offsets shift the item up
        assert!(viewport.is_visible(&make_item(1, MediaKind::Video, 1000.0, 100.0), 500.0));

        let buffered = Viewport {
            render_buffer: 50.0,
            ..viewport
        };
        assert!(buffered.is_visible(&make_item(1, MediaKind::Video, 640.0, 100.0), 0.0));
    }

    #[test]
    fn test_playback_is_idempotent() {
        let columns = make_columns();
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
            render_buffer: 0.0,
        };
        let mut items = vec![
            make_item(1, MediaKind::Video, 0.0, 100.0),
            make_item(2, MediaKind::Video, 2000.0, 100.0),
            make_item(3, MediaKind::Image, 0.0, 100.0),
        ];
        items[1].playing = true;
        let mut surface = RecordingSurface::new();

        let first = update_playback(&mut items, &columns, &viewport, &mut surface);
        assert_eq!(first.started, 1);
        assert_eq!(first.paused, 1);
        let calls = surface.calls().len();

        let second = update_playback(&mut items, &columns, &viewport, &mut surface);
        assert_eq!(second, PlaybackReport::default());
        assert_eq!(surface.calls().len(), calls);
        assert!(surface.calls().contains(&SurfaceCall::Play(TileHandle(1))));
        assert!(surface.calls().contains(&SurfaceCall::Pause(TileHandle(2))));
    }

    #[test]
    fn test_rejected_autoplay_is_retried() {
        let columns = make_columns();
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
            render_buffer: 0.0,
        };
        let mut items = vec![make_item(1, MediaKind::Video, 0.0, 100.0)];
        let mut surface = RecordingSurface::new();
        surface.reject_autoplay(true);

        let report = update_playback(&mut items, &columns, &viewport, &mut surface);
        assert_eq!(report.rejected, 1);
        assert!(!items[0].playing);

        surface.reject_autoplay(false);
        let report = update_playback(&mut items, &columns, &viewport, &mut surface);
        assert_eq!(report.started, 1);
        assert!(items[0].playing);
    }
}
