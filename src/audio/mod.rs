pub mod backend;
pub mod breaker;
pub mod mix;
pub mod session;

pub use backend::{AudioBackend, ContextState, HeadlessAudio, NodeId, ResumeOutcome};
pub use breaker::CircuitBreaker;
pub use mix::{center_volume, horizontal_pan, VolumeStyle};
pub use session::{AudioSession, MixFrame, SessionState};
