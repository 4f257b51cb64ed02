//! Wall configuration.
//!
//! Holds every parameter the control panel can change. Setters clamp into
//! the ranges the panel exposes; `validate` rejects values no setter could
//! have produced.

use std::time::Duration;

use tracing::warn;

use crate::error::{Result, WallError};

pub const MIN_COLUMNS: usize = 2;
pub const MAX_COLUMNS: usize = 10;

const MIN_SCROLL_SPEED: f32 = 0.5;
const MAX_SCROLL_SPEED: f32 = 5.0;
const POP_RANGE_PX: f32 = 500.0;

#[derive(Debug, Clone)]
pub struct WallConfig {
    /// Global scroll speed in px per tick (default: 1.0)
    pub scroll_speed: f32,
    /// 0 = fully individual column speeds, 1 = uniform (default: 0.0)
    pub uniformity: f32,
    /// Extra distance below the viewport where new and recycled items spawn (default: 0)
    pub pop_in_px: f32,
    /// Distance above the viewport an item must pass before it is recycled (default: 200)
    pub pop_out_px: f32,
    /// Number of columns, 2..=10 (default: 6)
    pub column_count: usize,
    /// Gap between columns and between stacked items (default: 10)
    pub gutter: f32,
    /// Pixels beyond the viewport edges still treated as visible (default: 0)
    pub render_buffer: f32,
    /// Column width used when the container is too narrow (default: 100)
    pub fallback_column_width: f32,
    /// Height / width ratio used until real media size is known (default: 9/16)
    pub estimated_aspect: f32,
    pub audio_throttle: Duration,
    pub max_audio_errors: u32,
    pub audio_cooldown: Duration,
    pub audio_retry_backoff: Duration,
    /// How long audio stays paused after a resize
    pub resize_audio_pause: Duration,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            scroll_speed: 1.0,
            uniformity: 0.0,
            pop_in_px: 0.0,
            pop_out_px: 200.0,
            column_count: 6,
            gutter: 10.0,
            render_buffer: 0.0,
            fallback_column_width: 100.0,
            estimated_aspect: 9.0 / 16.0,
            audio_throttle: Duration::from_millis(100),
            max_audio_errors: 3,
            audio_cooldown: Duration::from_secs(10),
            audio_retry_backoff: Duration::from_secs(2),
            resize_audio_pause: Duration::from_secs(1),
        }
    }
}

impl WallConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&self.column_count) {
            return Err(WallError::InvalidConfig(format!(
                "column count {} outside {}..={}",
                self.column_count, MIN_COLUMNS, MAX_COLUMNS
            )));
        }
        let finite = [
            ("scroll_speed", self.scroll_speed),
            ("uniformity", self.uniformity),
            ("pop_in_px", self.pop_in_px),
            ("pop_out_px", self.pop_out_px),
            ("gutter", self.gutter),
            ("render_buffer", self.render_buffer),
            ("fallback_column_width", self.fallback_column_width),
            ("estimated_aspect", self.estimated_aspect),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(WallError::InvalidConfig(format!("{name} is not finite")));
            }
        }
        if self.fallback_column_width <= 0.0 || self.estimated_aspect <= 0.0 {
            return Err(WallError::InvalidConfig(
                "fallback width and estimated aspect must be positive".into(),
            ));
        }
        if self.max_audio_errors == 0 {
            return Err(WallError::InvalidConfig("max_audio_errors must be at least 1".into()));
        }
        Ok(())
    }

    pub fn set_scroll_speed(&mut self, speed: f32) {
        self.scroll_speed = speed.clamp(MIN_SCROLL_SPEED, MAX_SCROLL_SPEED);
    }

    pub fn set_uniformity(&mut self, uniformity: f32) {
        self.uniformity = uniformity.clamp(0.0, 1.0);
    }

    pub fn set_pop_in(&mut self, px: f32) {
        self.pop_in_px = px.clamp(-POP_RANGE_PX, POP_RANGE_PX);
    }

    pub fn set_pop_out(&mut self, px: f32) {
        self.pop_out_px = px.clamp(-POP_RANGE_PX, POP_RANGE_PX);
    }

    pub fn set_render_buffer(&mut self, px: f32) {
        self.render_buffer = px.max(0.0);
    }

    /// Reads `MEDIAWALL_*` overrides from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies overrides from any key lookup. Unparsable or out-of-range
    /// values are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MEDIAWALL_COLUMNS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if (MIN_COLUMNS..=MAX_COLUMNS).contains(&n) => self.column_count = n,
                _ => warn!(value = %raw, "Ignoring MEDIAWALL_COLUMNS"),
            }
        }
        if let Some(raw) = lookup("MEDIAWALL_SPEED") {
            match raw.trim().parse::<f32>() {
                Ok(v) if v.is_finite() => self.set_scroll_speed(v),
                _ => warn!(value = %raw, "Ignoring MEDIAWALL_SPEED"),
            }
        }
        if let Some(raw) = lookup("MEDIAWALL_UNIFORMITY") {
            match raw.trim().parse::<f32>() {
                Ok(v) if v.is_finite() => self.set_uniformity(v),
                _ => warn!(value = %raw, "Ignoring MEDIAWALL_UNIFORMITY"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = WallConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.column_count, 6);
        assert_eq!(config.pop_out_px, 200.0);
        assert_eq!(config.max_audio_errors, 3);
    }

    #[test]
    fn test_setters_clamp() {
        let mut config = WallConfig::default();
        config.set_uniformity(1.7);
        assert_eq!(config.uniformity, 1.0);
        config.set_pop_out(-900.0);
        assert_eq!(config.pop_out_px, -500.0);
        config.set_scroll_speed(0.1);
        assert_eq!(config.scroll_speed, 0.5);
        config.set_render_buffer(-3.0);
        assert_eq!(config.render_buffer, 0.0);
    }

    #[test]
    fn test_validate_rejects_column_count() {
        let config = WallConfig {
            column_count: 11,
            ..WallConfig::default()
        };
        assert!(matches!(config.validate(), Err(WallError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides_skip_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("MEDIAWALL_COLUMNS", "4"),
            ("MEDIAWALL_SPEED", "fast"),
            ("MEDIAWALL_UNIFORMITY", "0.5"),
        ]
        .into_iter()
        .collect();

        let mut config = WallConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.column_count, 4);
        assert_eq!(config.scroll_speed, 1.0);
        assert_eq!(config.uniformity, 0.5);
    }
}
