//! Configuration management for scheduler and export tuning
//!
//! This module provides runtime configuration loading from JSON files, so the
//! lookahead window and export format can be adjusted without recompiling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::audio::wav;
use crate::error::AudioError;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Live scheduler timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Period of the polling loop
    pub poll_interval_ms: u64,
    /// How far ahead of the audio clock each tick commits clicks.
    /// Must be larger than the poll period, and should cover its jitter too.
    /// `validate` rejects anything at or below `poll_interval_ms`.
    pub lookahead_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            lookahead_ms: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lookahead_secs(&self) -> f64 {
        self.lookahead_ms as f64 / 1000.0
    }
}

/// Click track export format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
    /// Duration used when the caller does not ask for one
    pub default_duration_secs: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: 16,
            channels: 1,
            default_duration_secs: 15.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing, not valid
    /// JSON, or fails [`AppConfig::validate`]
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                        config
                    }
                    Err(err) => {
                        log::warn!(
                            "[Config] Rejected configuration from {:?}: {}. Using defaults.",
                            path.as_ref(),
                            err
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/swing_config.json")
    }

    /// Check that the scheduler timing and export format are usable.
    pub fn validate(&self) -> Result<(), AudioError> {
        let SchedulerConfig {
            poll_interval_ms,
            lookahead_ms,
        } = self.scheduler;
        if poll_interval_ms == 0 {
            return Err(AudioError::ConfigInvalid {
                field: "scheduler.poll_interval_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if lookahead_ms <= poll_interval_ms {
            return Err(AudioError::ConfigInvalid {
                field: "scheduler.lookahead_ms".to_string(),
                reason: format!(
                    "must be greater than poll_interval_ms ({} <= {})",
                    lookahead_ms, poll_interval_ms
                ),
            });
        }
        crate::audio::render::validate_duration(self.export.default_duration_secs)?;
        wav::validate_format(
            self.export.sample_rate,
            self.export.bit_depth,
            self.export.channels,
        )
    }
}
