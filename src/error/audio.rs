// Audio error types and constants

use crate::error::{ErrorCode, ErrorKind};
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported to the
/// surrounding application.
///
/// Error code range: 1001-1010
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// BPM value is invalid (must be > 0)
    pub const BPM_INVALID: i32 = 1001;

    /// Render duration is zero, negative or not finite
    pub const DURATION_INVALID: i32 = 1002;

    /// Sample rate is zero
    pub const SAMPLE_RATE_INVALID: i32 = 1003;

    /// Requested bit depth is not 16-bit signed PCM
    pub const BIT_DEPTH_UNSUPPORTED: i32 = 1004;

    /// Channel count outside 1..=2
    pub const CHANNEL_COUNT_INVALID: i32 = 1005;

    /// No output device, or the device refused to open a stream
    pub const OUTPUT_UNAVAILABLE: i32 = 1006;

    /// WAV container could not be produced or parsed
    pub const ENCODING_FAILED: i32 = 1007;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1008;

    /// Scheduler worker thread could not be spawned or died during startup
    pub const WORKER_FAILED: i32 = 1009;

    /// Configuration value is out of range or inconsistent with another
    pub const CONFIG_INVALID: i32 = 1010;
}

/// Log an audio error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
/// Never panics.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, kind={:?}, component=ClickEngine, message={}",
        context,
        err.code(),
        err.kind(),
        err.message()
    );
}

/// Errors raised by the click engine
///
/// Error code ranges: 1001-1010
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// BPM value is invalid (must be > 0)
    BpmInvalid { bpm: u32 },

    /// Render duration must be finite and > 0
    DurationInvalid { seconds: f64 },

    /// Sample rate must be > 0
    SampleRateInvalid { sample_rate: u32 },

    /// Only 16-bit signed PCM is supported
    BitDepthUnsupported { bit_depth: u16 },

    /// Channel count must be 1 (mono) or 2 (stereo)
    ChannelCountInvalid { channels: u16 },

    /// Host audio output could not be acquired
    OutputUnavailable { reason: String },

    /// WAV container could not be produced
    EncodingFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Scheduler worker failed before reporting readiness
    WorkerFailed { reason: String },

    /// Configuration field rejected by `AppConfig::validate`
    ConfigInvalid { field: String, reason: String },
}

impl AudioError {
    /// Coarse category used by callers to decide how to react.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AudioError::BpmInvalid { .. }
            | AudioError::DurationInvalid { .. }
            | AudioError::SampleRateInvalid { .. }
            | AudioError::BitDepthUnsupported { .. }
            | AudioError::ChannelCountInvalid { .. }
            | AudioError::ConfigInvalid { .. } => ErrorKind::InvalidArgument,
            AudioError::OutputUnavailable { .. } => ErrorKind::AudioOutputUnavailable,
            AudioError::EncodingFailed { .. } => ErrorKind::EncodingFailure,
            AudioError::LockPoisoned { .. } | AudioError::WorkerFailed { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::BpmInvalid { .. } => AudioErrorCodes::BPM_INVALID,
            AudioError::DurationInvalid { .. } => AudioErrorCodes::DURATION_INVALID,
            AudioError::SampleRateInvalid { .. } => AudioErrorCodes::SAMPLE_RATE_INVALID,
            AudioError::BitDepthUnsupported { .. } => AudioErrorCodes::BIT_DEPTH_UNSUPPORTED,
            AudioError::ChannelCountInvalid { .. } => AudioErrorCodes::CHANNEL_COUNT_INVALID,
            AudioError::OutputUnavailable { .. } => AudioErrorCodes::OUTPUT_UNAVAILABLE,
            AudioError::EncodingFailed { .. } => AudioErrorCodes::ENCODING_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::WorkerFailed { .. } => AudioErrorCodes::WORKER_FAILED,
            AudioError::ConfigInvalid { .. } => AudioErrorCodes::CONFIG_INVALID,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::BpmInvalid { bpm } => {
                format!("BPM must be greater than 0 (got {})", bpm)
            }
            AudioError::DurationInvalid { seconds } => {
                format!("Duration must be a finite number of seconds > 0 (got {})", seconds)
            }
            AudioError::SampleRateInvalid { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
            AudioError::BitDepthUnsupported { bit_depth } => {
                format!("Unsupported bit depth {}: only 16-bit PCM is supported", bit_depth)
            }
            AudioError::ChannelCountInvalid { channels } => {
                format!("Channel count must be 1 or 2 (got {})", channels)
            }
            AudioError::OutputUnavailable { reason } => {
                format!("Audio output unavailable: {}", reason)
            }
            AudioError::EncodingFailed { reason } => {
                format!("WAV encoding failed: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::WorkerFailed { reason } => {
                format!("Scheduler worker failed: {}", reason)
            }
            AudioError::ConfigInvalid { field, reason } => {
                format!("Invalid configuration for {}: {}", field, reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::EncodingFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::BpmInvalid { bpm: 0 }.code(),
            AudioErrorCodes::BPM_INVALID
        );
        assert_eq!(
            AudioError::DurationInvalid { seconds: -1.0 }.code(),
            AudioErrorCodes::DURATION_INVALID
        );
        assert_eq!(
            AudioError::SampleRateInvalid { sample_rate: 0 }.code(),
            AudioErrorCodes::SAMPLE_RATE_INVALID
        );
        assert_eq!(
            AudioError::BitDepthUnsupported { bit_depth: 24 }.code(),
            AudioErrorCodes::BIT_DEPTH_UNSUPPORTED
        );
        assert_eq!(
            AudioError::ChannelCountInvalid { channels: 0 }.code(),
            AudioErrorCodes::CHANNEL_COUNT_INVALID
        );
        assert_eq!(
            AudioError::OutputUnavailable {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::OUTPUT_UNAVAILABLE
        );
        assert_eq!(
            AudioError::EncodingFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::ENCODING_FAILED
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AudioError::WorkerFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::WORKER_FAILED
        );
        assert_eq!(
            AudioError::ConfigInvalid {
                field: "scheduler.lookahead_ms".to_string(),
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::CONFIG_INVALID
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AudioError::BpmInvalid { bpm: 0 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AudioError::ChannelCountInvalid { channels: 3 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AudioError::OutputUnavailable {
                reason: "no device".to_string()
            }
            .kind(),
            ErrorKind::AudioOutputUnavailable
        );
        assert_eq!(
            AudioError::EncodingFailed {
                reason: "x".to_string()
            }
            .kind(),
            ErrorKind::EncodingFailure
        );
        assert!(AudioError::DurationInvalid { seconds: 0.0 }.is_invalid_argument());
        assert!(!AudioError::LockPoisoned {
            component: "scheduler".to_string()
        }
        .is_invalid_argument());
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::BpmInvalid { bpm: 0 };
        assert_eq!(err.message(), "BPM must be greater than 0 (got 0)");

        let err = AudioError::BitDepthUnsupported { bit_depth: 24 };
        assert!(err.message().contains("only 16-bit"));

        let err = AudioError::OutputUnavailable {
            reason: "No default output device found".to_string(),
        };
        assert_eq!(
            err.message(),
            "Audio output unavailable: No default output device found"
        );
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::BpmInvalid { bpm: 0 };
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_hound_error() {
        let audio_err: AudioError = hound::Error::Unsupported.into();
        match audio_err {
            AudioError::EncodingFailed { reason } => assert!(!reason.is_empty()),
            other => panic!("Expected EncodingFailed, got {:?}", other),
        }
    }
}
