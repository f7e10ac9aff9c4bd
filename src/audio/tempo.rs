//! Tempo clock - BPM to click instants
//!
//! Click `n` sits at `start + n * interval`. Positions are always computed
//! from the index instead of accumulated, so long sessions never drift.

use crate::error::AudioError;

/// Seconds between consecutive clicks: `60 / bpm`.
///
/// # Errors
/// `AudioError::BpmInvalid` when `bpm == 0`.
///
/// # Examples
/// ```
/// use swing_tempo::audio::tempo::interval_seconds;
///
/// assert_eq!(interval_seconds(120).unwrap(), 0.5);
/// ```
pub fn interval_seconds(bpm: u32) -> Result<f64, AudioError> {
    validate_bpm(bpm)?;
    Ok(60.0 / bpm as f64)
}

/// Reject BPM values the engine cannot derive an interval from.
#[inline]
pub fn validate_bpm(bpm: u32) -> Result<(), AudioError> {
    if bpm == 0 {
        return Err(AudioError::BpmInvalid { bpm });
    }
    Ok(())
}

/// Lazy sequence of click instants in `[start, end)`.
///
/// # Errors
/// `AudioError::BpmInvalid` when `bpm == 0`.
pub fn click_times(bpm: u32, start: f64, end: f64) -> Result<ClickTimes, AudioError> {
    Ok(ClickTimes::new(start, interval_seconds(bpm)?, end))
}

/// Exact (fractional) number of samples between beats.
///
/// The integer-rounded form would accumulate error over a session; callers
/// convert individual click instants to sample offsets instead.
#[inline]
pub fn samples_per_beat(bpm: u32, sample_rate: u32) -> Result<f64, AudioError> {
    Ok(interval_seconds(bpm)? * sample_rate as f64)
}

/// Iterator over `start + n * interval` for every `n` with a time `< end`.
///
/// Cloning yields an independent iterator from the same position, so a
/// sequence can be restarted by keeping a clone of the fresh value.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickTimes {
    start: f64,
    interval: f64,
    end: f64,
    next_index: u64,
}

impl ClickTimes {
    /// `interval` must be > 0; [`click_times`] guarantees this.
    pub fn new(start: f64, interval: f64, end: f64) -> Self {
        Self {
            start,
            interval,
            end,
            next_index: 0,
        }
    }

    /// Skip straight to click `index` without iterating the ones before it.
    pub fn starting_at(mut self, index: u64) -> Self {
        self.next_index = index;
        self
    }

    /// Target time of click `index`.
    #[inline]
    pub fn time_of(&self, index: u64) -> f64 {
        self.start + index as f64 * self.interval
    }

    /// Index of the click the iterator yields next.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }
}

impl Iterator for ClickTimes {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let t = self.time_of(self.next_index);
        if t < self.end {
            self.next_index += 1;
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interval_formula() {
        for bpm in [1, 60, 100, 112, 121, 128, 141, 240, 1000] {
            assert_relative_eq!(interval_seconds(bpm).unwrap(), 60.0 / bpm as f64);
        }
        assert_eq!(interval_seconds(60).unwrap(), 1.0);
        assert_eq!(interval_seconds(120).unwrap(), 0.5);
    }

    #[test]
    fn test_zero_bpm_rejected() {
        assert_eq!(interval_seconds(0), Err(AudioError::BpmInvalid { bpm: 0 }));
        assert!(click_times(0, 0.0, 1.0).is_err());
        assert!(samples_per_beat(0, 44100).is_err());
    }

    #[test]
    fn test_120_bpm_two_seconds() {
        let times: Vec<f64> = click_times(120, 0.0, 2.0).unwrap().collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_121_bpm_fifteen_seconds() {
        let times: Vec<f64> = click_times(121, 0.0, 15.0).unwrap().collect();
        assert_eq!(times.len(), 31);
        assert!(*times.last().unwrap() < 15.0);
    }

    #[test]
    fn test_click_count_matches_floor_formula() {
        // Durations that are not an exact multiple of the interval.
        for (bpm, duration) in [(100, 10.0), (112, 7.3), (128, 14.0), (141, 3.3)] {
            let interval = interval_seconds(bpm).unwrap();
            let expected = (duration / interval).floor() as usize + 1;
            let count = click_times(bpm, 0.0, duration).unwrap().count();
            assert_eq!(count, expected, "bpm={} duration={}", bpm, duration);
        }
    }

    #[test]
    fn test_offset_start() {
        let times: Vec<f64> = click_times(60, 10.0, 12.5).unwrap().collect();
        assert_eq!(times, vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(click_times(120, 5.0, 5.0).unwrap().count(), 0);
        assert_eq!(click_times(120, 5.0, 1.0).unwrap().count(), 0);
    }

    #[test]
    fn test_restartable_via_clone() {
        let fresh = click_times(90, 0.0, 4.0).unwrap();
        let first: Vec<f64> = fresh.clone().collect();
        let second: Vec<f64> = fresh.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_starting_at_skips_without_drift() {
        let times = click_times(121, 0.0, f64::INFINITY).unwrap();
        let mut late = times.clone().starting_at(10_000);
        assert_relative_eq!(late.next().unwrap(), 10_000.0 * 60.0 / 121.0);
        assert_eq!(late.next_index(), 10_001);
    }

    #[test]
    fn test_samples_per_beat() {
        assert_eq!(samples_per_beat(120, 48000).unwrap(), 24000.0);
        assert_eq!(samples_per_beat(100, 44100).unwrap(), 26460.0);
        assert_relative_eq!(samples_per_beat(140, 48000).unwrap(), 20571.428571428572);
    }
}
