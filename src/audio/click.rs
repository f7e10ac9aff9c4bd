//! Click synthesis - the one tone burst shared by live playback and export
//!
//! Key properties:
//! - Fixed 40ms length at any sample rate
//! - Starts at full envelope and decays exponentially to 0.1% of peak by the
//!   last sample, so there is no step at the buffer boundary
//! - Pure and deterministic: seeded noise, no global state

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::buffer::SampleBuffer;
use crate::error::AudioError;

/// Duration of one click in milliseconds
pub const CLICK_DURATION_MS: u64 = 40;

/// Pitch of the tonal body of the click
pub const CLICK_FREQUENCY_HZ: f64 = 1760.0;

/// Peak amplitude as a fraction of i16 full scale
const CLICK_PEAK: f64 = 0.8;

/// Envelope value reached at the final sample (relative to the start)
const ENVELOPE_FLOOR: f64 = 0.001;

/// Share of the noise transient in the mix
const NOISE_MIX: f64 = 0.15;

/// Noise decays this many times faster than the tone
const NOISE_DECAY_FACTOR: f64 = 4.0;

const NOISE_SEED: u64 = 42;

/// Number of samples in one click at `sample_rate` (never less than one).
pub fn click_len(sample_rate: u32) -> usize {
    ((sample_rate as u64 * CLICK_DURATION_MS / 1000) as usize).max(1)
}

/// Synthesizes one click: a sine burst with a short noise transient under a
/// single exponential decay envelope.
///
/// # Arguments
/// * `sample_rate` - Sample rate in Hz (must be > 0)
///
/// # Errors
/// `AudioError::SampleRateInvalid` when `sample_rate == 0`.
///
/// # Examples
/// ```
/// use swing_tempo::audio::click::{click_len, synthesize};
///
/// let click = synthesize(44100).unwrap();
/// assert_eq!(click.len(), click_len(44100));
/// assert_eq!(click.len(), 1764);
/// ```
pub fn synthesize(sample_rate: u32) -> Result<SampleBuffer, AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::SampleRateInvalid { sample_rate });
    }

    let len = click_len(sample_rate);
    let decay = -ENVELOPE_FLOOR.ln();
    let last = (len.saturating_sub(1)).max(1) as f64;
    let phase_step = std::f64::consts::TAU * CLICK_FREQUENCY_HZ / sample_rate as f64;
    let full_scale = i16::MAX as f64 * CLICK_PEAK;

    let mut rng = StdRng::seed_from_u64(NOISE_SEED);
    let mut samples = Vec::with_capacity(len);

    for i in 0..len {
        let progress = i as f64 / last;
        let envelope = (-decay * progress).exp();
        let noise_envelope = (-decay * NOISE_DECAY_FACTOR * progress).exp();

        let tone = (phase_step * i as f64).sin();
        let noise: f64 = rng.gen_range(-1.0..1.0);
        let value = envelope * (1.0 - NOISE_MIX) * tone + noise_envelope * NOISE_MIX * noise;

        samples.push((value * full_scale).round() as i16);
    }

    Ok(SampleBuffer::new(sample_rate, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_duration() {
        for &sr in &[8000, 22050, 44100, 48000, 96000] {
            let click = synthesize(sr).unwrap();
            assert_eq!(
                click.len(),
                (sr as usize * 40) / 1000,
                "Click should be exactly 40ms at {} Hz",
                sr
            );
            assert_eq!(click.sample_rate(), sr);
        }
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert_eq!(
            synthesize(0),
            Err(AudioError::SampleRateInvalid { sample_rate: 0 })
        );
    }

    #[test]
    fn test_tiny_sample_rate_still_produces_a_sample() {
        let click = synthesize(10).unwrap();
        assert_eq!(click.len(), 1);
    }

    #[test]
    fn test_click_is_deterministic() {
        let first = synthesize(48000).unwrap();
        let second = synthesize(48000).unwrap();
        assert_eq!(first, second, "Same sample rate must give identical clicks");
    }

    #[test]
    fn test_click_is_loud_at_start() {
        let click = synthesize(44100).unwrap();
        let head_peak = click.samples()[..64]
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap();
        assert!(
            head_peak as f64 > i16::MAX as f64 * 0.5,
            "Attack should be near full scale, got {}",
            head_peak
        );
    }

    #[test]
    fn test_tail_decays_below_one_percent_of_peak() {
        for &sr in &[22050, 44100, 48000] {
            let click = synthesize(sr).unwrap();
            let peak = click.peak() as f64;
            let tail = &click.samples()[click.len() - (sr as usize / 1000)..];
            for &sample in tail {
                assert!(
                    (sample.unsigned_abs() as f64) <= peak * 0.01,
                    "Tail sample {} exceeds 1% of peak {} at {} Hz",
                    sample,
                    peak,
                    sr
                );
            }
        }
    }

    #[test]
    fn test_envelope_never_grows() {
        // Compare peaks of consecutive 2ms windows: each must not exceed the
        // previous one by more than rounding noise.
        let click = synthesize(48000).unwrap();
        let window = 96;
        let peaks: Vec<u16> = click
            .samples()
            .chunks(window)
            .map(|w| w.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0))
            .collect();
        for pair in peaks.windows(2) {
            assert!(
                pair[1] <= pair[0] + 2,
                "Envelope grew between windows: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }
}
