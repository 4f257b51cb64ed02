pub mod masonry;
pub mod recycler;
pub mod visibility;

pub use masonry::{correct_height, MasonryLayout, Placement};
pub use recycler::{RecyclingScheduler, Relocation, ScrollSpeeds};
pub use visibility::{update_playback, PlaybackReport, Viewport};
