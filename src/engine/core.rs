//! EngineHandle: the click engine as seen by the surrounding application.
//!
//! Wraps the live scheduler and the offline export path behind the entry
//! points the application calls (`start_playback`, `stop_playback`,
//! `set_bpm`, `export_click_track`) and publishes telemetry for each
//! transition on a broadcast channel.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::audio::{render, wav, AudioArtifact};
use crate::config::{AppConfig, ExportConfig};
use crate::engine::backend::{
    AudioBackend, CpalBackend, PrecisionMode, SystemTimeSource, TimeSource,
};
use crate::engine::scheduler::{LiveScheduler, SchedulerStatus};
use crate::error::{log_audio_error, AudioError};
use crate::presets;

/// Telemetry event emitted by the engine core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEventKind {
    PlaybackStarted { bpm: u32, precision: PrecisionMode },
    PlaybackStopped,
    BpmChanged { bpm: u32 },
    /// Output cannot honour target times; clicks play when submitted.
    ReducedPrecision,
    ExportCompleted { bpm: u32, bytes: usize },
    Warning,
}

/// Render and encode a click track with an explicit export format.
///
/// The format and the container size are checked before rendering so a bad
/// request costs nothing.
pub fn render_click_track(
    bpm: u32,
    duration_secs: f64,
    export: &ExportConfig,
) -> Result<AudioArtifact, AudioError> {
    wav::validate_format(export.sample_rate, export.bit_depth, export.channels)?;
    let frames = render::sample_count(duration_secs, export.sample_rate)? as u64;
    if frames > wav::max_frames(export.channels) {
        return Err(AudioError::DurationInvalid {
            seconds: duration_secs,
        });
    }
    let buffer = render::render(bpm, duration_secs, export.sample_rate)?;
    wav::encode(&buffer, export.sample_rate, export.bit_depth, export.channels)
}

/// EngineHandle owns the live scheduler, the configuration and telemetry.
pub struct EngineHandle {
    config: Arc<RwLock<AppConfig>>,
    scheduler: LiveScheduler,
    telemetry_tx: broadcast::Sender<TelemetryEvent>,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
}

impl EngineHandle {
    /// Create a new EngineHandle on the default output device, with
    /// configuration from the default location.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(CpalBackend::new()), AppConfig::load())
    }

    pub fn with_backend(backend: Arc<dyn AudioBackend>, config: AppConfig) -> Self {
        Self::with_parts(backend, Arc::new(SystemTimeSource::default()), config)
    }

    pub fn with_parts(
        backend: Arc<dyn AudioBackend>,
        time_source: Arc<dyn TimeSource>,
        config: AppConfig,
    ) -> Self {
        let scheduler = LiveScheduler::new(
            backend,
            config.scheduler.clone(),
            presets::default_preset().default_bpm,
        );
        let (telemetry_tx, _) = broadcast::channel(128);

        Self {
            config: Arc::new(RwLock::new(config)),
            scheduler,
            telemetry_tx,
            start_instant: time_source.now(),
            time_source,
        }
    }

    fn emit_event(&self, kind: TelemetryEventKind, detail: Option<String>) {
        let timestamp_ms = self
            .time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_millis() as u64;
        let _ = self.telemetry_tx.send(TelemetryEvent {
            timestamp_ms,
            kind,
            detail,
        });
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Start clicking at `bpm`. A no-op while already playing.
    pub fn start_playback(&self, bpm: u32) -> Result<(), AudioError> {
        let started = match self.scheduler.start(bpm) {
            Ok(started) => started,
            Err(err) => {
                log_audio_error(&err, "EngineHandle::start_playback");
                self.emit_event(
                    TelemetryEventKind::Warning,
                    Some(format!("Failed to start playback: {}", err)),
                );
                return Err(err);
            }
        };
        if !started {
            return Ok(());
        }

        let status = self.scheduler.status()?;
        if let Some(precision) = status.precision {
            self.emit_event(TelemetryEventKind::PlaybackStarted { bpm, precision }, None);
            if precision == PrecisionMode::BestEffort {
                self.emit_event(
                    TelemetryEventKind::ReducedPrecision,
                    Some("Output lacks sample-accurate scheduling".to_string()),
                );
            }
        }
        Ok(())
    }

    /// Stop clicking. A no-op while stopped.
    pub fn stop_playback(&self) -> Result<(), AudioError> {
        if self.scheduler.stop()? {
            self.emit_event(TelemetryEventKind::PlaybackStopped, None);
        }
        Ok(())
    }

    /// Update BPM. Takes effect on the next uncommitted click while playing.
    pub fn set_bpm(&self, bpm: u32) -> Result<(), AudioError> {
        match self.scheduler.set_bpm(bpm) {
            Ok(()) => {
                self.emit_event(TelemetryEventKind::BpmChanged { bpm }, None);
                Ok(())
            }
            Err(err) => {
                self.emit_event(
                    TelemetryEventKind::Warning,
                    Some(format!("Failed to apply BPM: {}", err)),
                );
                Err(err)
            }
        }
    }

    pub fn status(&self) -> Result<SchedulerStatus, AudioError> {
        self.scheduler.status()
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    /// Render `duration_secs` of clicks at `bpm` with the configured format.
    pub fn export_click_track(
        &self,
        bpm: u32,
        duration_secs: f64,
    ) -> Result<AudioArtifact, AudioError> {
        let export = self.config_snapshot()?.export;
        self.export_with(bpm, duration_secs, &export)
    }

    /// Export using the configured default duration.
    pub fn export_default_duration(&self, bpm: u32) -> Result<AudioArtifact, AudioError> {
        let export = self.config_snapshot()?.export;
        self.export_with(bpm, export.default_duration_secs, &export)
    }

    pub fn export_with(
        &self,
        bpm: u32,
        duration_secs: f64,
        export: &ExportConfig,
    ) -> Result<AudioArtifact, AudioError> {
        let result = render_click_track(bpm, duration_secs, export);
        self.finish_export(bpm, duration_secs, result)
    }

    /// Same as [`EngineHandle::export_click_track`], with rendering moved to
    /// the blocking pool so long durations do not stall the caller's runtime.
    pub async fn export_click_track_async(
        &self,
        bpm: u32,
        duration_secs: f64,
    ) -> Result<AudioArtifact, AudioError> {
        let export = self.config_snapshot()?.export;
        let result = tokio::task::spawn_blocking(move || {
            render_click_track(bpm, duration_secs, &export)
        })
        .await
        .map_err(|e| AudioError::WorkerFailed {
            reason: format!("Export task failed: {}", e),
        })?;
        self.finish_export(bpm, duration_secs, result)
    }

    fn finish_export(
        &self,
        bpm: u32,
        duration_secs: f64,
        result: Result<AudioArtifact, AudioError>,
    ) -> Result<AudioArtifact, AudioError> {
        match result {
            Ok(artifact) => {
                log::info!(
                    "[EngineHandle] Exported {}s at {} BPM ({} bytes)",
                    duration_secs,
                    bpm,
                    artifact.len()
                );
                self.emit_event(
                    TelemetryEventKind::ExportCompleted {
                        bpm,
                        bytes: artifact.len(),
                    },
                    None,
                );
                Ok(artifact)
            }
            Err(err) => {
                log_audio_error(&err, "EngineHandle::export");
                Err(err)
            }
        }
    }

    // ========================================================================
    // CONFIG & TELEMETRY
    // ========================================================================

    pub fn config_snapshot(&self) -> Result<AppConfig, AudioError> {
        self.config
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| AudioError::LockPoisoned {
                component: "config".to_string(),
            })
    }

    /// Replace the export format used by later exports.
    pub fn set_export_config(&self, export: ExportConfig) -> Result<(), AudioError> {
        wav::validate_format(export.sample_rate, export.bit_depth, export.channels)?;
        render::validate_duration(export.default_duration_secs)?;

        let mut guard = self.config.write().map_err(|_| AudioError::LockPoisoned {
            component: "config".to_string(),
        })?;
        guard.export = export;
        Ok(())
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry_tx.subscribe()
    }

    /// Telemetry as a stream. Events missed by a lagging consumer are skipped.
    pub fn telemetry_stream(&self) -> impl Stream<Item = TelemetryEvent> + Send + 'static {
        BroadcastStream::new(self.telemetry_tx.subscribe())
            .filter_map(|result| async move { result.ok() })
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}
