// Audio module - click synthesis, tempo math, offline rendering and WAV export

pub mod buffer;
pub mod click;
pub mod render;
pub mod tempo;
pub mod wav;

// Re-export commonly used types for convenience
pub use buffer::SampleBuffer;
pub use tempo::{click_times, interval_seconds, ClickTimes};
pub use wav::{AudioArtifact, WavSummary};
