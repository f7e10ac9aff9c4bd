//! Offline renderer - a whole click track in one buffer
//!
//! Used by the export path. Rendering is deterministic: identical
//! `(bpm, duration, sample_rate)` always yield identical samples, so exported
//! files are reproducible and testable without any audio device.

use super::buffer::SampleBuffer;
use super::click;
use super::tempo;
use crate::error::AudioError;

/// Longest track, in samples, that still fits a 16-bit mono WAV data chunk.
pub const MAX_RENDER_SAMPLES: u64 = (u32::MAX as u64 - 36) / 2;

/// Render `duration_secs` of click track at `bpm`.
///
/// The output holds `round(duration_secs * sample_rate)` samples of silence
/// with one click mixed in at every instant `n * 60 / bpm < duration_secs`.
/// Clicks that would run past the end are truncated; overlapping clicks
/// saturate at the i16 limits.
///
/// # Errors
/// `AudioError::BpmInvalid`, `AudioError::DurationInvalid` or
/// `AudioError::SampleRateInvalid` for non-positive inputs.
/// `AudioError::DurationInvalid` also when the track would exceed
/// [`MAX_RENDER_SAMPLES`]; nothing is allocated in that case.
///
/// # Examples
/// ```
/// use swing_tempo::audio::render::render;
///
/// let track = render(120, 2.0, 44100).unwrap();
/// assert_eq!(track.len(), 88200);
/// ```
pub fn render(bpm: u32, duration_secs: f64, sample_rate: u32) -> Result<SampleBuffer, AudioError> {
    tempo::validate_bpm(bpm)?;
    validate_duration(duration_secs)?;
    let click = click::synthesize(sample_rate)?;

    let total = sample_count(duration_secs, sample_rate)?;
    let mut output = SampleBuffer::silence(sample_rate, total);

    let mut clicks = 0usize;
    for t in tempo::click_times(bpm, 0.0, duration_secs)? {
        let offset = (t * sample_rate as f64).round() as usize;
        output.mix_at(offset, click.samples());
        clicks += 1;
    }

    log::debug!(
        "[Render] bpm={} duration={}s sample_rate={} samples={} clicks={}",
        bpm,
        duration_secs,
        sample_rate,
        total,
        clicks
    );

    Ok(output)
}

/// Durations must be finite and strictly positive.
pub fn validate_duration(seconds: f64) -> Result<(), AudioError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(AudioError::DurationInvalid { seconds });
    }
    Ok(())
}

/// Number of samples `render` produces: `round(duration_secs * sample_rate)`.
///
/// # Errors
/// `AudioError::DurationInvalid` for a non-positive duration, or one whose
/// sample count exceeds [`MAX_RENDER_SAMPLES`].
pub fn sample_count(duration_secs: f64, sample_rate: u32) -> Result<usize, AudioError> {
    validate_duration(duration_secs)?;
    let total = (duration_secs * sample_rate as f64).round();
    if total > MAX_RENDER_SAMPLES as f64 {
        return Err(AudioError::DurationInvalid {
            seconds: duration_secs,
        });
    }
    Ok(total as usize)
}

/// Sample offsets at which `render` places each click.
pub fn click_offsets(
    bpm: u32,
    duration_secs: f64,
    sample_rate: u32,
) -> Result<Vec<usize>, AudioError> {
    validate_duration(duration_secs)?;
    Ok(tempo::click_times(bpm, 0.0, duration_secs)?
        .map(|t| (t * sample_rate as f64).round() as usize)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_length_is_rounded_duration() {
        let cases = [
            (120, 2.0, 44100, 88200),
            (121, 15.0, 44100, 661500),
            (100, 0.5, 48000, 24000),
            (128, 1.00001, 44100, 44100),
            (128, 0.333333, 8000, 2667),
        ];
        for (bpm, duration, sr, expected) in cases {
            let track = render(bpm, duration, sr).unwrap();
            assert_eq!(track.len(), expected, "duration={} sr={}", duration, sr);
            assert_eq!(track.sample_rate(), sr);
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let first = render(121, 3.0, 44100).unwrap();
        let second = render(121, 3.0, 44100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_clicks_land_on_beat_offsets() {
        let track = render(120, 2.0, 44100).unwrap();
        let click = click::synthesize(44100).unwrap();
        let offsets = click_offsets(120, 2.0, 44100).unwrap();
        assert_eq!(offsets, vec![0, 22050, 44100, 66150]);

        for offset in offsets {
            assert_eq!(
                &track.samples()[offset..offset + click.len()],
                click.samples(),
                "Click at offset {} should be copied verbatim",
                offset
            );
        }
    }

    #[test]
    fn test_silence_between_clicks() {
        let track = render(120, 2.0, 44100).unwrap();
        let click_len = click::click_len(44100);
        assert!(track.samples()[click_len..22050].iter().all(|&s| s == 0));
        assert!(track.samples()[66150 + click_len..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_click_tail_truncated_at_end() {
        // 0.51s at 120 BPM: the second click starts 10ms before the end.
        let track = render(120, 0.51, 44100).unwrap();
        let click = click::synthesize(44100).unwrap();
        let tail = &track.samples()[22050..];
        assert_eq!(tail.len(), 441);
        assert_eq!(tail, &click.samples()[..441]);
    }

    #[test]
    fn test_overlapping_clicks_sum() {
        // 6000 BPM puts a click every 10ms, so four clicks ring at once.
        let track = render(6000, 0.2, 44100).unwrap();
        let click = click::synthesize(44100).unwrap();

        let mut expected = vec![0i32; track.len()];
        for offset in click_offsets(6000, 0.2, 44100).unwrap() {
            for (i, &s) in click.samples().iter().enumerate() {
                if let Some(slot) = expected.get_mut(offset + i) {
                    *slot += s as i32;
                }
            }
        }
        let expected: Vec<i16> = expected
            .into_iter()
            .map(|s| s.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .collect();

        assert_eq!(track.samples(), expected.as_slice());
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(render(0, 1.0, 44100), Err(AudioError::BpmInvalid { bpm: 0 }));
        assert_eq!(
            render(120, 0.0, 44100),
            Err(AudioError::DurationInvalid { seconds: 0.0 })
        );
        assert_eq!(
            render(120, -1.0, 44100),
            Err(AudioError::DurationInvalid { seconds: -1.0 })
        );
        assert!(render(120, f64::NAN, 44100).is_err());
        assert!(render(120, f64::INFINITY, 44100).is_err());
        assert_eq!(
            render(120, 1.0, 0),
            Err(AudioError::SampleRateInvalid { sample_rate: 0 })
        );
    }

    #[test]
    fn test_huge_duration_rejected_without_allocating() {
        assert_eq!(
            render(120, 1e15, 44100),
            Err(AudioError::DurationInvalid { seconds: 1e15 })
        );
        assert!(render(120, f64::MAX, 44100).is_err());
    }

    #[test]
    fn test_sample_count_limit() {
        let limit = MAX_RENDER_SAMPLES as f64;
        assert_eq!(sample_count(limit, 1).unwrap() as u64, MAX_RENDER_SAMPLES);
        assert!(matches!(
            sample_count(limit + 1.0, 1),
            Err(AudioError::DurationInvalid { .. })
        ));
        assert!(render(120, limit + 1.0, 1).is_err());
        assert_eq!(sample_count(2.0, 44100).unwrap(), 88200);
    }
}
