mod progress;
mod video;

pub use progress::{is_valid_telemetry, percent_of, ProgressRecord, ProgressTable};
pub use video::{VideoRecord, VideoWithProgress};
