use fastrand::Rng;

/// Lower bound of a randomly drawn individual column speed.
pub const MIN_INDIVIDUAL_SPEED: f32 = 0.5;
/// Width of the random speed range; speeds fall in `[0.5, 1.5)`.
pub const INDIVIDUAL_SPEED_SPREAD: f32 = 1.0;

/// Per-column layout state: next free y, scroll offset and speed multiplier.
///
/// Heights only grow between explicit resets; `reset` and `resize` are the
/// only ways to bring them back to zero.
#[derive(Debug, Clone)]
pub struct ColumnModel {
    heights: Vec<f32>,
    offsets: Vec<f32>,
    speeds: Vec<f32>,
    width: f32,
    gutter: f32,
}

impl ColumnModel {
    pub fn new(count: usize, gutter: f32, rng: &mut Rng) -> Self {
        Self {
            heights: vec![0.0; count],
            offsets: vec![0.0; count],
            speeds: (0..count).map(|_| random_speed(rng)).collect(),
            width: 0.0,
            gutter,
        }
    }

    /// Column width for a container: `(container - gutter * (n - 1)) / n`,
    /// or `fallback` when that is not positive.
    pub fn compute_width(container_width: f32, count: usize, gutter: f32, fallback: f32) -> f32 {
        let width = if count > 0 {
            (container_width - gutter * (count as f32 - 1.0)) / count as f32
        } else {
            container_width
        };
        if width > 0.0 && width.is_finite() {
            width
        } else {
            fallback
        }
    }

    pub fn count(&self) -> usize {
        self.heights.len()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn gutter(&self) -> f32 {
        self.gutter
    }

    pub fn set_gutter(&mut self, gutter: f32) {
        self.gutter = gutter;
    }

    pub fn height(&self, column: usize) -> f32 {
        self.heights.get(column).copied().unwrap_or(0.0).max(0.0)
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn offset(&self, column: usize) -> f32 {
        self.offsets.get(column).copied().unwrap_or(0.0)
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    pub fn individual_speed(&self, column: usize) -> f32 {
        self.speeds.get(column).copied().unwrap_or(1.0)
    }

    pub fn individual_speeds(&self) -> &[f32] {
        &self.speeds
    }

    pub fn set_individual_speed(&mut self, column: usize, speed: f32) {
        if let Some(slot) = self.speeds.get_mut(column) {
            *slot = speed.max(0.0);
        }
    }

    /// Left edge of a column.
    pub fn column_x(&self, column: usize) -> f32 {
        column as f32 * (self.width + self.gutter)
    }

    /// Blend of the column's own speed and the global speed:
    /// `individual * (1 - u) + uniform * u`.
    pub fn effective_speed(&self, column: usize, scroll_speed: f32, uniformity: f32) -> f32 {
        let u = uniformity.clamp(0.0, 1.0);
        if u >= 1.0 {
            return scroll_speed;
        }
        let individual = scroll_speed * self.individual_speed(column);
        individual * (1.0 - u) + scroll_speed * u
    }

    /// Advances every column offset by its effective speed.
    pub fn advance(&mut self, scroll_speed: f32, uniformity: f32) {
        for column in 0..self.count() {
            let step = self.effective_speed(column, scroll_speed, uniformity);
            self.offsets[column] += step;
        }
    }

    /// Marks `[y, y + item_height + gutter)` of a column as used.
    pub fn commit(&mut self, column: usize, y: f32, item_height: f32) {
        if let Some(h) = self.heights.get_mut(column) {
            *h = (y + item_height + self.gutter).max(*h);
        }
    }

    /// Shifts a column's height by a signed delta (height correction).
    pub fn apply_delta(&mut self, column: usize, delta: f32) {
        if let Some(h) = self.heights.get_mut(column) {
            *h = (*h + delta).max(0.0);
        }
    }

    /// Total content height: tallest column, never negative.
    pub fn total_height(&self) -> f32 {
        self.heights
            .iter()
            .copied()
            .filter(|h| h.is_finite())
            .fold(0.0, f32::max)
    }

    /// Zeroes heights and offsets; speeds are user preferences and survive.
    pub fn reset(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = 0.0);
        self.offsets.iter_mut().for_each(|o| *o = 0.0);
    }

    /// Rebuilds the arrays for a new column count, keeping the speeds of
    /// columns that still exist and drawing fresh ones for added columns.
    pub fn resize(&mut self, count: usize, rng: &mut Rng) {
        self.heights = vec![0.0; count];
        self.offsets = vec![0.0; count];
        self.speeds.truncate(count);
        while self.speeds.len() < count {
            self.speeds.push(random_speed(rng));
        }
    }

    /// Heights, offsets and speeds all have `count` entries and hold numbers.
    pub fn is_consistent(&self, count: usize) -> bool {
        self.heights.len() == count
            && self.offsets.len() == count
            && self.speeds.len() == count
            && self.heights.iter().all(|h| h.is_finite())
    }
}

fn random_speed(rng: &mut Rng) -> f32 {
    MIN_INDIVIDUAL_SPEED + rng.f32() * INDIVIDUAL_SPEED_SPREAD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_columns(count: usize) -> ColumnModel {
        let mut rng = Rng::with_seed(7);
        ColumnModel::new(count, 10.0, &mut rng)
    }

    #[test]
    fn test_compute_width() {
        // (1000 - 10 * 3) / 4
        assert_eq!(ColumnModel::compute_width(1000.0, 4, 10.0, 100.0), 242.5);
        assert_eq!(ColumnModel::compute_width(20.0, 4, 10.0, 100.0), 100.0);
        assert_eq!(ColumnModel::compute_width(0.0, 2, 0.0, 100.0), 100.0);
    }

    #[test]
    fn test_random_speeds_in_range() {
        let columns = make_columns(10);
        for &s in columns.individual_speeds() {
            assert!((0.5..1.5).contains(&s), "speed {s} out of range");
        }
    }

    #[test]
    fn test_effective_speed_blend() {
        let mut columns = make_columns(2);
        columns.set_individual_speed(0, 0.5);

        assert_eq!(columns.effective_speed(0, 2.0, 0.0), 1.0);
        assert_eq!(columns.effective_speed(0, 2.0, 1.0), 2.0);
        // 2 * 0.5 * 0.5 + 2 * 0.5
        assert_eq!(columns.effective_speed(0, 2.0, 0.5), 1.5);
    }

    #[test]
    fn test_advance_moves_offsets() {
        let mut columns = make_columns(3);
        columns.advance(1.0, 1.0);
        columns.advance(1.0, 1.0);
        assert_eq!(columns.offsets(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_commit_never_shrinks() {
        let mut columns = make_columns(2);
        columns.commit(0, 100.0, 50.0);
        assert_eq!(columns.height(0), 160.0);
        columns.commit(0, 0.0, 10.0);
        assert_eq!(columns.height(0), 160.0);
    }

    #[test]
    fn test_resize_preserves_overlapping_speeds() {
        let mut rng = Rng::with_seed(1);
        let mut columns = ColumnModel::new(4, 10.0, &mut rng);
        columns.set_individual_speed(1, 1.25);
        columns.commit(0, 0.0, 100.0);
        columns.advance(1.0, 1.0);

        columns.resize(6, &mut rng);
        assert_eq!(columns.count(), 6);
        assert_eq!(columns.individual_speed(1), 1.25);
        assert!(columns.heights().iter().all(|&h| h == 0.0));
        assert!(columns.offsets().iter().all(|&o| o == 0.0));

        columns.resize(2, &mut rng);
        assert_eq!(columns.individual_speeds().len(), 2);
        assert_eq!(columns.individual_speed(1), 1.25);
        assert!(columns.is_consistent(2));
    }

    #[test]
    fn test_total_height_is_max() {
        let mut columns = make_columns(3);
        columns.commit(0, 0.0, 40.0);
        columns.commit(2, 0.0, 90.0);
        assert_eq!(columns.total_height(), 100.0);
        columns.reset();
        assert_eq!(columns.total_height(), 0.0);
    }
}
