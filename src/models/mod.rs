pub mod column;
pub mod media_item;
pub mod registry;

pub use column::*;
pub use media_item::*;
pub use registry::*;
