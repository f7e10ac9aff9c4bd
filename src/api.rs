// Public API for the surrounding application
// Flat functions over one process-wide engine, for hosts that cannot hold an
// EngineHandle themselves (FFI shims, UI glue)

use once_cell::sync::Lazy;

use crate::audio::AudioArtifact;
use crate::engine::{EngineHandle, SchedulerStatus};
use crate::error::AudioError;
use crate::presets::{self, ClubPreset};

// Re-export error code constants for hosts that map codes to messages
pub use crate::error::AudioErrorCodes;

/// Global engine instance
///
/// Created on first use with the default output device and configuration
/// from `assets/swing_config.json`. The output device itself is only
/// acquired while playing.
static ENGINE: Lazy<EngineHandle> = Lazy::new(EngineHandle::new);

/// Get the version of the click engine
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Start the click track at the specified BPM
///
/// Returns as soon as the output is open. Safe to call while already
/// playing; the call is then ignored.
///
/// # Arguments
/// * `bpm` - Beats per minute (> 0; clubs use 100-141)
///
/// # Errors
/// - Invalid BPM value (must be > 0)
/// - No output device could be opened
/// - Lock poisoning on engine state
pub fn start_playback(bpm: u32) -> Result<(), AudioError> {
    ENGINE.start_playback(bpm)
}

/// Stop the click track and release the output device
///
/// Safe to call even if nothing is playing.
pub fn stop_playback() -> Result<(), AudioError> {
    ENGINE.stop_playback()
}

/// Change tempo
///
/// While playing, clicks already committed to the device keep their timing
/// and every later click follows the new BPM. While stopped, the value is
/// kept for display only; `start_playback` always takes its own BPM.
pub fn set_bpm(bpm: u32) -> Result<(), AudioError> {
    ENGINE.set_bpm(bpm)
}

/// Current transport state, BPM and output precision
pub fn playback_status() -> Result<SchedulerStatus, AudioError> {
    ENGINE.status()
}

/// Render and encode a click track
///
/// # Returns
/// A complete WAV file; the caller decides where it goes. Use
/// [`AudioArtifact::suggested_file_name`] for the download name.
pub fn export_click_track(bpm: u32, duration_secs: f64) -> Result<AudioArtifact, AudioError> {
    ENGINE.export_click_track(bpm, duration_secs)
}

/// Club presets in display order
pub fn club_presets() -> Vec<ClubPreset> {
    presets::CLUB_PRESETS.to_vec()
}
