pub mod engine;
pub mod session;
pub mod state;

pub use engine::MediaEngine;
pub use session::{PlaybackEvent, PlaybackSession};
pub use state::{PlaybackState, PlaybackStatus};
