use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::audio::SampleBuffer;
use crate::engine::scheduler::ClickEvent;
use crate::error::AudioError;

use super::{AudioBackend, AudioOutput, PrecisionMode, TimeSource};

/// One click as it reached the stub output.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedClick {
    pub index: u64,
    /// Target time on the output clock
    pub time: f64,
    /// Output clock reading when the scheduler handed the click over
    pub submitted_at: f64,
    /// Length of the click buffer in samples
    pub samples: usize,
}

/// Stub backend used for deterministic testing and CLI tooling.
///
/// Produces no sound. Every submission is recorded against a real monotonic
/// clock so tests can check what the scheduler committed and when.
pub struct StubBackend {
    precision: PrecisionMode,
    sample_rate: u32,
    fail_open: AtomicBool,
    submissions: Arc<Mutex<Vec<SubmittedClick>>>,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::with_precision(PrecisionMode::SampleAccurate)
    }

    /// A stub whose outputs report the given precision.
    pub fn with_precision(precision: PrecisionMode) -> Self {
        Self {
            precision,
            sample_rate: 44100,
            fail_open: AtomicBool::new(false),
            submissions: Arc::new(Mutex::new(Vec::new())),
            opened: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make subsequent `open` calls fail with `OutputUnavailable`.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every click submitted so far, across sessions.
    pub fn submissions(&self) -> Vec<SubmittedClick> {
        match self.submissions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of outputs acquired.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of outputs released.
    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(AudioError::OutputUnavailable {
                reason: "stub output configured to fail".to_string(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubOutput {
            start: Instant::now(),
            sample_rate: self.sample_rate,
            precision: self.precision,
            submissions: Arc::clone(&self.submissions),
            released: Arc::clone(&self.released),
        }))
    }
}

struct StubOutput {
    start: Instant,
    sample_rate: u32,
    precision: PrecisionMode,
    submissions: Arc<Mutex<Vec<SubmittedClick>>>,
    released: Arc<AtomicUsize>,
}

impl AudioOutput for StubOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn precision(&self) -> PrecisionMode {
        self.precision
    }

    fn submit(&mut self, event: ClickEvent, click: &SampleBuffer) -> Result<(), AudioError> {
        let submitted_at = self.now();
        let mut guard = self
            .submissions
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "stub_submissions".to_string(),
            })?;
        guard.push(SubmittedClick {
            index: event.index,
            time: event.time,
            submitted_at,
            samples: click.len(),
        });
        Ok(())
    }
}

impl Drop for StubOutput {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deterministic time source for tests and tooling.
///
/// Each call to `now()` advances by a fixed 10ms to guarantee monotonic
/// timestamps without depending on wall-clock progress.
pub struct StubTimeSource {
    start: Instant,
    offset_ms: AtomicU64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> Instant {
        let ms = self.offset_ms.fetch_add(10, Ordering::SeqCst);
        self.start + Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_submissions() {
        let backend = StubBackend::new();
        let click = SampleBuffer::silence(44100, 8);
        {
            let mut output = backend.open().unwrap();
            output
                .submit(ClickEvent { index: 0, time: 0.0 }, &click)
                .unwrap();
            output
                .submit(ClickEvent { index: 1, time: 0.5 }, &click)
                .unwrap();
        }

        let submitted = backend.submissions();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].index, 1);
        assert_eq!(submitted[1].time, 0.5);
        assert_eq!(submitted[1].samples, 8);
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.release_count(), 1);
    }

    #[test]
    fn test_fail_open() {
        let backend = StubBackend::new();
        backend.set_fail_open(true);
        let err = backend.open().err().unwrap();
        assert!(matches!(err, AudioError::OutputUnavailable { .. }));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn test_precision_is_reported() {
        let backend = StubBackend::with_precision(PrecisionMode::BestEffort);
        let output = backend.open().unwrap();
        assert_eq!(output.precision(), PrecisionMode::BestEffort);
        assert_eq!(output.sample_rate(), 44100);
    }

    #[test]
    fn test_output_clock_is_monotonic() {
        let backend = StubBackend::new();
        let output = backend.open().unwrap();
        let a = output.now();
        let b = output.now();
        assert!(b >= a);
    }

    #[test]
    fn test_time_source_steps() {
        let source = StubTimeSource::new();
        let a = source.now();
        let b = source.now();
        assert_eq!(b - a, Duration::from_millis(10));
    }
}
