// Error types for the swing tempo click engine
//
// This module defines the engine's error type and the coarse taxonomy
// callers use to decide whether to proceed, degrade, or give up.

mod audio;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Error taxonomy shared with the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Caller error (bad BPM, duration, sample rate, bit depth, channels).
    /// Never retried; the requested operation must not proceed.
    InvalidArgument,
    /// Host audio output could not be acquired, or only without
    /// sample-accurate scheduling.
    AudioOutputUnavailable,
    /// Container encoding failed. Indicates a defect.
    EncodingFailure,
    /// Poisoned locks and similar engine defects.
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait() {
        let err: &dyn ErrorCode = &AudioError::BpmInvalid { bpm: 0 };
        assert_eq!(err.code(), AudioErrorCodes::BPM_INVALID);
        assert!(err.message().contains("BPM"));
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), AudioError> {
            Err(AudioError::SampleRateInvalid { sample_rate: 0 })
        }

        fn caller() -> Result<(), AudioError> {
            may_fail()?;
            Ok(())
        }

        let err = caller().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
