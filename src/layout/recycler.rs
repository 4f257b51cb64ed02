use tracing::debug;

use crate::layout::masonry::MasonryLayout;
use crate::models::{ColumnModel, ItemId, MediaItem};

/// Speed inputs for one scheduler tick.
#[derive(Debug, Clone, Copy)]
pub struct ScrollSpeeds {
    pub scroll_speed: f32,
    pub uniformity: f32,
}

/// One item moved from above the viewport to below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relocation {
    pub id: ItemId,
    pub column: usize,
    pub from_y: f32,
    pub to_y: f32,
}

/// Endless-scroll scheduler.
///
/// Each tick advances every column offset, then moves at most one item per
/// column (the topmost one that has fully scrolled past
/// `offset - pop_out_px`) to below the visible band of that column. The
/// per-column cap keeps the work per frame at O(columns) no matter how many
/// items qualify at once.
#[derive(Debug, Clone, Copy)]
pub struct RecyclingScheduler {
    pub layout: MasonryLayout,
    pub pop_out_px: f32,
}

impl RecyclingScheduler {
    pub fn new(layout: MasonryLayout, pop_out_px: f32) -> Self {
        Self { layout, pop_out_px }
    }

    /// Advances offsets, then recycles. Callers recompute the total content
    /// height afterwards.
    pub fn tick(
        &self,
        columns: &mut ColumnModel,
        items: &mut [MediaItem],
        speeds: ScrollSpeeds,
    ) -> Vec<Relocation> {
        columns.advance(speeds.scroll_speed, speeds.uniformity);
        self.recycle(columns, items)
    }

    pub fn recycle(&self, columns: &mut ColumnModel, items: &mut [MediaItem]) -> Vec<Relocation> {
        let mut moved = Vec::new();

        for column in 0..columns.count() {
            let threshold = columns.offset(column) - self.pop_out_px;

            let candidate = items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.column == column && item.bottom() < threshold)
                .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y))
                .map(|(idx, _)| idx);

            let Some(idx) = candidate else {
                continue;
            };

            let item = &mut items[idx];
            let from_y = item.y;
            let placement = self.layout.respawn(columns, column, item.height);
            item.x = placement.x;
            item.y = placement.y;

            debug!(
                item = %item.id,
                column,
                from_y,
                to_y = placement.y,
                "Recycled item below viewport"
            );
            moved.push(Relocation {
                id: item.id,
                column,
                from_y,
                to_y: placement.y,
            });
        }

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngestFile, MediaKind};
    use crate::surface::TileHandle;
    use fastrand::Rng;
    use std::sync::Arc;

    fn make_item(id: u64, column: usize, y: f32, height: f32) -> MediaItem {
        MediaItem {
            id: ItemId(id),
            file: Arc::new(IngestFile::new(format!("{id}.mp4"), id, None)),
            kind: MediaKind::Video,
            tile: TileHandle(id),
            column,
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

    /// One column, uniform speed, items stacked 100 px apart.
    fn make_stack(count: u64) -> (ColumnModel, Vec<MediaItem>) {
        let mut rng = Rng::with_seed(11);
        let mut columns = ColumnModel::new(1, 10.0, &mut rng);
        columns.set_width(100.0);
        let mut items = Vec::new();
        for id in 0..count {
            let y = id as f32 * 100.0;
            columns.commit(0, y, 90.0);
            items.push(make_item(id + 1, 0, y, 90.0));
        }
        (columns, items)
    }

    fn uniform(speed: f32) -> ScrollSpeeds {
        ScrollSpeeds {
            scroll_speed: speed,
            uniformity: 1.0,
        }
    }

    #[test]
    fn test_nothing_moves_before_threshold() {
        let (mut columns, mut items) = make_stack(5);
        let scheduler = RecyclingScheduler::new(MasonryLayout::new(300.0, 0.0, true), 200.0);

        // offset 250, threshold 50: no item's bottom is above 50
        let moved = scheduler.tick(&mut columns, &mut items, uniform(250.0));
        assert!(moved.is_empty());
        assert_eq!(columns.offset(0), 250.0);
    }

    #[test]
    fn test_one_item_per_column_per_tick() {
        let (mut columns, mut items) = make_stack(6);
        let scheduler = RecyclingScheduler::new(MasonryLayout::new(300.0, 0.0, true), 0.0);

        // offset 400: items at y 0, 100, 200 all end above 400
        let moved = scheduler.tick(&mut columns, &mut items, uniform(400.0));
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, ItemId(1));
        assert_eq!(moved[0].from_y, 0.0);

        let moved = scheduler.recycle(&mut columns, &mut items);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, ItemId(2));
    }

    #[test]
    fn test_relocation_lands_below_band_and_height() {
        let (mut columns, mut items) = make_stack(3);
        let scheduler = RecyclingScheduler::new(MasonryLayout::new(300.0, 40.0, true), 0.0);

        let height_before = columns.height(0);
        let moved = scheduler.tick(&mut columns, &mut items, uniform(150.0));
        assert_eq!(moved.len(), 1);

        let to_y = moved[0].to_y;
        assert!(to_y >= height_before);
        assert!(to_y >= 150.0 + 300.0 + 40.0);
        assert_eq!(items[0].y, to_y);
        assert_eq!(columns.height(0), to_y + 100.0);
        // On-screen position is derived, never stored.
        assert_eq!(items[0].screen_y(columns.offset(0)), to_y - 150.0);
    }

    #[test]
    fn test_columns_recycle_independently() {
        let mut rng = Rng::with_seed(5);
        let mut columns = ColumnModel::new(2, 0.0, &mut rng);
        columns.set_width(100.0);
        columns.set_individual_speed(0, 1.0);
        columns.set_individual_speed(1, 0.0);
        let mut items = vec![make_item(1, 0, 0.0, 50.0), make_item(2, 1, 0.0, 50.0)];
        columns.commit(0, 0.0, 50.0);
        columns.commit(1, 0.0, 50.0);

        let scheduler = RecyclingScheduler::new(MasonryLayout::new(100.0, 0.0, true), 0.0);
        let moved = scheduler.tick(
            &mut columns,
            &mut items,
            ScrollSpeeds {
                scroll_speed: 60.0,
                uniformity: 0.0,
            },
        );

        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].column, 0);
        assert_eq!(items[1].y, 0.0);
    }
}
