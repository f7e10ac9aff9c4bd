//! Backend abstractions for live click output.
//!
//! A backend hands out one [`AudioOutput`] per play session. The output is
//! the scoped audio resource: acquired when playback starts, released when
//! it is dropped at stop. Outputs are created on, and never leave, the
//! scheduler thread, so they need not be `Send` (cpal streams are not).

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::audio::SampleBuffer;
use crate::engine::scheduler::ClickEvent;
use crate::error::AudioError;

/// How precisely an output honours submitted target times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrecisionMode {
    /// Clicks start on the exact frame of their target time.
    SampleAccurate,
    /// Target times are ignored; clicks play as soon as they are submitted.
    /// The scheduler compensates by submitting each click only once due.
    BestEffort,
}

/// One acquired audio output.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    /// Seconds on the output's own monotonic clock.
    fn now(&self) -> f64;

    fn precision(&self) -> PrecisionMode;

    /// Hand one click to the device for playback at `event.time`.
    fn submit(&mut self, event: ClickEvent, click: &SampleBuffer) -> Result<(), AudioError>;
}

/// Trait implemented by platform-specific audio backends.
pub trait AudioBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Acquire the output device for a new play session.
    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError>;
}

/// Trait representing a monotonic time source used for telemetry timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

mod cpal_output;
pub mod mixer;
mod stub;

pub use self::cpal_output::CpalBackend;
pub use self::stub::{StubBackend, StubTimeSource, SubmittedClick};
