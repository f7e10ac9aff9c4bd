// Swing Tempo - golf swing tempo click engine
// Drift-free live click scheduling and deterministic WAV click-track export

// Module declarations
pub mod api;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod presets;

// Re-exports for convenience
pub use api::*;
pub use audio::{AudioArtifact, SampleBuffer, WavSummary};
pub use config::AppConfig;
pub use engine::{EngineHandle, PrecisionMode, SchedulerStatus, TransportState};
pub use error::AudioError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let artifact = export_click_track(120, 0.5).unwrap();
        assert!(!artifact.is_empty());
        assert_eq!(AppConfig::default().export.bit_depth, 16);
    }
}
