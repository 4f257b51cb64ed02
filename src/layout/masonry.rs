use tracing::{debug, trace};

use crate::error::{Result, WallError};
use crate::models::{ColumnModel, ItemId, MediaItem};

/// Smallest height change worth cascading through a column.
const HEIGHT_EPSILON: f32 = 1.0;

/// Where an item goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub column: usize,
    pub x: f32,
    pub y: f32,
}

/// Shortest-column placement.
///
/// While auto-scroll runs, a column's height is raised to at least the
/// bottom of the visible band (`offset + viewport_height + pop_in_px`) so
/// new items never spawn inside or above what is on screen.
#[derive(Debug, Clone, Copy)]
pub struct MasonryLayout {
    pub viewport_height: f32,
    pub pop_in_px: f32,
    pub auto_scroll: bool,
}

impl MasonryLayout {
    pub fn new(viewport_height: f32, pop_in_px: f32, auto_scroll: bool) -> Self {
        Self {
            viewport_height,
            pop_in_px,
            auto_scroll,
        }
    }

    /// First y below the visible band of a column.
    pub fn band_bottom(&self, columns: &ColumnModel, column: usize) -> f32 {
        columns.offset(column) + self.viewport_height + self.pop_in_px
    }

    pub fn effective_height(&self, columns: &ColumnModel, column: usize) -> f32 {
        let height = columns.height(column);
        if self.auto_scroll {
            height.max(self.band_bottom(columns, column))
        } else {
            height
        }
    }

    /// Argmin of effective height; the lowest index wins ties.
    pub fn shortest_column(&self, columns: &ColumnModel) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for column in 0..columns.count() {
            let h = self.effective_height(columns, column);
            match best {
                Some((_, best_h)) if h >= best_h => {}
                _ => best = Some((column, h)),
            }
        }
        best
    }

    /// Chooses a slot without committing it.
    pub fn choose(&self, columns: &ColumnModel) -> Result<Placement> {
        let width = columns.width();
        if width <= 0.0 || !width.is_finite() {
            return Err(WallError::InvalidLayout { column_width: width });
        }
        let (column, y) = self
            .shortest_column(columns)
            .ok_or(WallError::InvalidLayout { column_width: width })?;
        Ok(Placement {
            column,
            x: columns.column_x(column),
            y,
        })
    }

    /// Chooses a slot and reserves `item_height` in it.
    pub fn place(&self, columns: &mut ColumnModel, item_height: f32) -> Result<Placement> {
        let placement = self.choose(columns)?;
        columns.commit(placement.column, placement.y, item_height);
        trace!(
            column = placement.column,
            y = placement.y,
            item_height,
            "Placed item"
        );
        Ok(placement)
    }

    /// Slot for an item recycled within `column`: never above the column's
    /// current height nor inside the visible band, whatever the scroll state.
    pub fn respawn(&self, columns: &mut ColumnModel, column: usize, item_height: f32) -> Placement {
        let y = columns.height(column).max(self.band_bottom(columns, column));
        columns.commit(column, y, item_height);
        Placement {
            column,
            x: columns.column_x(column),
            y,
        }
    }
}

/// Applies a measured height to an item and shifts everything below it in
/// the same column by the difference.
///
/// Returns the applied delta, or `None` when the item is unknown, the height
/// is not positive, or the change is within 1 px. Callers must recompute the
/// total content height afterwards.
pub fn correct_height(
    columns: &mut ColumnModel,
    items: &mut [MediaItem],
    id: ItemId,
    new_height: f32,
) -> Option<f32> {
    if new_height <= 0.0 || !new_height.is_finite() {
        return None;
    }
    let (column, y, old_height) = {
        let item = items.iter().find(|i| i.id == id)?;
        (item.column, item.y, item.height)
    };
    let delta = new_height - old_height;
    if delta.abs() <= HEIGHT_EPSILON {
        return None;
    }

    let mut shifted = 0usize;
    for item in items.iter_mut() {
        if item.id == id {
            item.height = new_height;
        } else if item.column == column && item.y > y {
            item.y += delta;
            shifted += 1;
        }
    }
    columns.apply_delta(column, delta);

    debug!(item = %id, column, delta, shifted, "Corrected item height");
    Some(delta)
}
