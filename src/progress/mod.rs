pub mod format;
pub mod resume;
pub mod tracker;

pub use resume::{ResumeController, ResumeDecision};
pub use tracker::ProgressTracker;
