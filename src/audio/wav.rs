//! WAV encoder - RIFF/PCM container for exported click tracks
//!
//! Produces the canonical 44-byte header followed by 16-bit signed
//! little-endian samples:
//!
//! ```text
//! 0  "RIFF"  4  36 + data  8  "WAVE"
//! 12 "fmt "  16 16         20 1 (PCM)   22 channels   24 sample rate
//! 28 byte rate  32 block align  34 bits per sample
//! 36 "data"  40 data size  44.. samples (interleaved when stereo)
//! ```

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use super::buffer::SampleBuffer;
use crate::error::AudioError;

/// The only bit depth the encoder writes
pub const SUPPORTED_BIT_DEPTH: u16 = 16;

/// Size of the canonical PCM header
pub const HEADER_LEN: usize = 44;

/// Encoded WAV file. Immutable once produced; the caller owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    bytes: Vec<u8>,
}

impl AudioArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse the header back out of the encoded bytes.
    pub fn summary(&self) -> Result<WavSummary, AudioError> {
        WavSummary::from_bytes(&self.bytes)
    }

    /// Download name used by the trainer UI,
    /// e.g. `golf_metronome_Mid_iron_121bpm.wav`.
    pub fn suggested_file_name(label: &str, bpm: u32) -> String {
        let label: String = label
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        format!("golf_metronome_{}_{}bpm.wav", label, bpm)
    }
}

/// Format fields read back from an encoded container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavSummary {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
    /// Sample data size in bytes (the `data` chunk length)
    pub data_size: u32,
    /// Samples per channel
    pub frames: u32,
}

impl WavSummary {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let bytes_per_sample = (spec.bits_per_sample as u32).div_ceil(8);
        Ok(Self {
            sample_rate: spec.sample_rate,
            bit_depth: spec.bits_per_sample,
            channels: spec.channels,
            data_size: reader.len() * bytes_per_sample,
            frames: reader.duration(),
        })
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Validate an export format before any work is done.
pub fn validate_format(sample_rate: u32, bit_depth: u16, channels: u16) -> Result<(), AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::SampleRateInvalid { sample_rate });
    }
    if bit_depth != SUPPORTED_BIT_DEPTH {
        return Err(AudioError::BitDepthUnsupported { bit_depth });
    }
    if !(1..=2).contains(&channels) {
        return Err(AudioError::ChannelCountInvalid { channels });
    }
    Ok(())
}

/// Most frames a container with `channels` channels can hold before the
/// RIFF size field overflows.
pub fn max_frames(channels: u16) -> u64 {
    let frame_bytes = (SUPPORTED_BIT_DEPTH as u64 / 8) * channels.max(1) as u64;
    (u32::MAX as u64 - 36) / frame_bytes
}

/// Encode a mono buffer as a 16-bit PCM WAV file.
///
/// With `channels == 2` every sample is written to both channels, so the
/// data size is `buffer.len() * 2 * channels` bytes.
///
/// # Errors
/// - `AudioError::SampleRateInvalid` when `sample_rate == 0`
/// - `AudioError::BitDepthUnsupported` for anything but 16
/// - `AudioError::ChannelCountInvalid` outside 1..=2
/// - `AudioError::EncodingFailed` if the container cannot be written
pub fn encode(
    buffer: &SampleBuffer,
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
) -> Result<AudioArtifact, AudioError> {
    validate_format(sample_rate, bit_depth, channels)?;

    let data_size = buffer.len() as u64 * (bit_depth as u64 / 8) * channels as u64;
    if data_size > (u32::MAX as u64 - 36) {
        return Err(AudioError::EncodingFailed {
            reason: format!("{} bytes of samples exceed the RIFF size limit", data_size),
        });
    }

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bit_depth,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + data_size as usize));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        {
            let total = buffer.len() as u32 * channels as u32;
            let mut samples = writer.get_i16_writer(total);
            for &sample in buffer.samples() {
                for _ in 0..channels {
                    samples.write_sample(sample);
                }
            }
            samples.flush()?;
        }
        writer.finalize()?;
    }

    let bytes = cursor.into_inner();
    if bytes.len() != HEADER_LEN + data_size as usize {
        return Err(AudioError::EncodingFailed {
            reason: format!(
                "expected {} bytes, writer produced {}",
                HEADER_LEN + data_size as usize,
                bytes.len()
            ),
        });
    }

    Ok(AudioArtifact { bytes })
}
