//! Engine module housing the live click path.
//!
//! This module exposes trait-based output backends (`backend`), the lookahead
//! scheduler (`scheduler`) and the `EngineHandle` entry points (`core`).

pub mod backend;
pub mod core;
pub mod scheduler;

pub use backend::{
    AudioBackend, AudioOutput, CpalBackend, PrecisionMode, StubBackend, StubTimeSource,
    SystemTimeSource, TimeSource,
};
pub use core::{EngineHandle, TelemetryEvent, TelemetryEventKind};
pub use scheduler::{ClickEvent, ClickPlan, LiveScheduler, SchedulerStatus, TransportState};
