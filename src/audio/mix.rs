use std::fmt;
use std::str::FromStr;

/// How `set_volume_style` distributes loudness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStyle {
    /// Louder the closer an item's center is to the viewport center.
    CenterY,
    /// Silences every item but keeps audio graphs wired.
    OnlyOne,
    /// Silences every item and tears its audio graph down.
    MuteAll,
}

impl FromStr for VolumeStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "centerY" => Ok(Self::CenterY),
            "onlyOne" => Ok(Self::OnlyOne),
            "muteAll" => Ok(Self::MuteAll),
            other => Err(format!("unknown volume style {other:?}")),
        }
    }
}

impl fmt::Display for VolumeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CenterY => "centerY",
            Self::OnlyOne => "onlyOne",
            Self::MuteAll => "muteAll",
        };
        f.write_str(name)
    }
}

/// Volume by vertical proximity: 1 when the item's center sits on the
/// viewport center, falling linearly to 0 at the viewport edge.
pub fn center_volume(screen_top: f32, item_height: f32, viewport_height: f32) -> f32 {
    if viewport_height <= 0.0 {
        return 0.0;
    }
    let half = viewport_height / 2.0;
    let item_center = screen_top + item_height / 2.0;
    let distance = (item_center - half).abs() / half;
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Stereo pan by horizontal position, clamped to [-1, 1].
pub fn horizontal_pan(x: f32, item_width: f32, container_width: f32) -> f32 {
    if container_width <= 0.0 {
        return 0.0;
    }
    let half = container_width / 2.0;
    let item_center = x + item_width / 2.0;
    ((item_center - half) / half).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_volume_law() {
        // viewport 600: center at 300
        assert_eq!(center_volume(250.0, 100.0, 600.0), 1.0);
        assert_eq!(center_volume(-50.0, 100.0, 600.0), 0.0);
        assert_eq!(center_volume(550.0, 100.0, 600.0), 0.0);
        assert_eq!(center_volume(2000.0, 100.0, 600.0), 0.0);
        // halfway between center and edge
        assert_eq!(center_volume(100.0, 100.0, 600.0), 0.5);
        assert_eq!(center_volume(0.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn test_horizontal_pan() {
        assert_eq!(horizontal_pan(350.0, 100.0, 800.0), 0.0);
        assert_eq!(horizontal_pan(0.0, 0.0, 800.0), -1.0);
        assert_eq!(horizontal_pan(700.0, 100.0, 800.0), 0.875);
        assert_eq!(horizontal_pan(5000.0, 100.0, 800.0), 1.0);
    }

    #[test]
    fn test_style_names() {
        assert_eq!("centerY".parse::<VolumeStyle>(), Ok(VolumeStyle::CenterY));
        assert_eq!(VolumeStyle::MuteAll.to_string(), "muteAll");
        assert!("loud".parse::<VolumeStyle>().is_err());
    }
}
