// SampleBuffer - owned block of 16-bit signed PCM samples
//
// A buffer is produced by exactly one component (click synthesis, offline
// render) and then moved to its consumer (audio output, WAV encoder). It is
// never shared mutably after the handoff.

/// Mono PCM samples at a fixed sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Buffer of `len` samples of digital silence.
    pub fn silence(sample_rate: u32, len: usize) -> Self {
        Self::new(sample_rate, vec![0; len])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute amplitude in the buffer.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// Additively mix `source` into this buffer starting at `offset`.
    ///
    /// Sums are computed in i32 and clamped to the i16 range, so overlapping
    /// clicks saturate instead of wrapping. Whatever part of `source` would
    /// land past the end of this buffer is dropped.
    ///
    /// Returns the number of samples actually mixed.
    pub fn mix_at(&mut self, offset: usize, source: &[i16]) -> usize {
        if offset >= self.samples.len() {
            return 0;
        }
        let available = self.samples.len() - offset;
        let count = available.min(source.len());

        for (dst, &src) in self.samples[offset..offset + count]
            .iter_mut()
            .zip(&source[..count])
        {
            let mixed = *dst as i32 + src as i32;
            *dst = mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }

        count
    }

    /// Convert to normalized f32 in [-1.0, 1.0) for float output streams.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| s as f32 / (i16::MAX as f32 + 1.0))
            .collect()
    }
}
