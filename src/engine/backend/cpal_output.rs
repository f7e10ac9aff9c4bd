//! CPAL-based live output for desktop platforms (Linux, macOS, Windows)
//!
//! The output clock is the number of frames the device has pulled, divided
//! by the device sample rate. Clicks are handed to the audio callback through
//! the lock-free voice queues in [`super::mixer`], each tagged with the exact
//! frame it must start on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use super::mixer::{voice_channels, ClickMixer, Voice, VoiceSender, DEFAULT_QUEUE_CAPACITY};
use super::{AudioBackend, AudioOutput, PrecisionMode};
use crate::audio::SampleBuffer;
use crate::engine::scheduler::ClickEvent;
use crate::error::AudioError;

/// Opens the host's default output device for every play session.
pub struct CpalBackend {
    queue_capacity: usize,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError> {
        Ok(Box::new(CpalOutput::open(self.queue_capacity)?))
    }
}

struct CpalOutput {
    _stream: cpal::Stream,
    sample_rate: u32,
    frame_counter: Arc<AtomicU64>,
    sender: VoiceSender,
    click_cache: Option<Arc<[f32]>>,
}

impl CpalOutput {
    fn open(queue_capacity: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::OutputUnavailable {
                reason: "No default output device found".to_string(),
            })?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::OutputUnavailable {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;

        let frame_counter = Arc::new(AtomicU64::new(0));
        let (sender, mixer) =
            voice_channels(queue_capacity, channels, Arc::clone(&frame_counter));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer),
            other => {
                return Err(AudioError::OutputUnavailable {
                    reason: format!("Unsupported output sample format {:?}", other),
                })
            }
        }
        .map_err(|e| AudioError::OutputUnavailable {
            reason: format!("{:?}", e),
        })?;

        stream.play().map_err(|e| AudioError::OutputUnavailable {
            reason: format!("Output start failed: {}", e),
        })?;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels,
            "[CpalOutput] Output stream acquired"
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            frame_counter,
            sender,
            click_cache: None,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: ClickMixer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            mixer.render(data, T::from_sample);
        },
        |err| tracing::error!("[CpalOutput] Output stream error: {}", err),
        None,
    )
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn now(&self) -> f64 {
        self.frame_counter.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn precision(&self) -> PrecisionMode {
        PrecisionMode::SampleAccurate
    }

    fn submit(&mut self, event: ClickEvent, click: &SampleBuffer) -> Result<(), AudioError> {
        let samples = Arc::clone(
            self.click_cache
                .get_or_insert_with(|| Arc::from(click.to_f32())),
        );
        let start_frame = (event.time.max(0.0) * self.sample_rate as f64).round() as u64;

        self.sender
            .submit(Voice {
                start_frame,
                samples,
            })
            .map_err(|_| AudioError::OutputUnavailable {
                reason: format!("Click submission queue full, dropped click {}", event.index),
            })
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        tracing::info!("[CpalOutput] Output stream released");
    }
}
