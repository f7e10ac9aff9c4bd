// ClickMixer - real-time side of the live output
//
// Click submissions travel from the scheduler thread to the audio callback
// over two lock-free SPSC (Single Producer Single Consumer) ring buffers:
// - SUBMIT_QUEUE: scheduler pushes voices tagged with their start frame
// - RETIRE_QUEUE: audio thread hands finished voices back so their sample
//   memory is freed on the scheduler thread, never in the callback
//
// Voice flow:
// 1. Scheduler pushes a `Voice` into SUBMIT_QUEUE
// 2. Audio callback pops it into the active set
// 3. Callback mixes every active voice sample-accurately from its start frame
// 4. Finished voices are pushed to RETIRE_QUEUE
// 5. Scheduler drains RETIRE_QUEUE before its next submission

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

/// Maximum number of clicks sounding or waiting inside the callback
pub const MAX_ACTIVE_VOICES: usize = 32;

/// Default capacity of each ring
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// One click waiting for, or in the middle of, playback.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Output frame at which the first sample must sound
    pub start_frame: u64,
    /// Normalized samples shared by every voice of a session
    pub samples: Arc<[f32]>,
}

/// Scheduler-side ends of the voice queues.
pub struct VoiceSender {
    pub submit_producer: Producer<Voice>,
    pub retire_consumer: Consumer<Voice>,
}

impl VoiceSender {
    /// Queue a voice for the callback. Returns the voice back if the ring is
    /// full.
    pub fn submit(&mut self, voice: Voice) -> Result<(), Voice> {
        self.drain_retired();
        self.submit_producer.push(voice).map_err(|err| match err {
            rtrb::PushError::Full(voice) => voice,
        })
    }

    /// Drop voices the callback has finished with.
    pub fn drain_retired(&mut self) -> usize {
        let mut drained = 0;
        while self.retire_consumer.pop().is_ok() {
            drained += 1;
        }
        drained
    }
}

/// Audio-thread state: active voices plus the shared frame clock.
pub struct ClickMixer {
    voices: Vec<Voice>,
    submit_consumer: Consumer<Voice>,
    retire_producer: Producer<Voice>,
    frame_counter: Arc<AtomicU64>,
    channels: usize,
}

/// Build a connected sender/mixer pair.
///
/// # Panics
/// Panics if `capacity` or `channels` is 0.
pub fn voice_channels(
    capacity: usize,
    channels: usize,
    frame_counter: Arc<AtomicU64>,
) -> (VoiceSender, ClickMixer) {
    assert!(capacity > 0, "capacity must be greater than 0");
    assert!(channels > 0, "channels must be greater than 0");

    let (submit_producer, submit_consumer) = RingBuffer::new(capacity);
    let (retire_producer, retire_consumer) = RingBuffer::new(capacity);

    (
        VoiceSender {
            submit_producer,
            retire_consumer,
        },
        ClickMixer {
            voices: Vec::with_capacity(MAX_ACTIVE_VOICES),
            submit_consumer,
            retire_producer,
            frame_counter,
            channels,
        },
    )
}

impl ClickMixer {
    /// Fill one interleaved output buffer and advance the frame clock.
    ///
    /// Real-time safe: no allocation (the voice list never grows past its
    /// pre-allocated capacity), no locks, bounded work.
    pub fn render<T, F>(&mut self, data: &mut [T], convert: F)
    where
        T: Copy,
        F: Fn(f32) -> T,
    {
        let frame_count = data.len() / self.channels;
        let first_frame = self.frame_counter.load(Ordering::Relaxed);

        self.accept_submissions(first_frame);

        for (i, frame) in data.chunks_mut(self.channels).enumerate() {
            let position = first_frame + i as u64;
            let mut value = 0.0f32;
            for voice in &self.voices {
                if position >= voice.start_frame {
                    let offset = (position - voice.start_frame) as usize;
                    if let Some(sample) = voice.samples.get(offset) {
                        value += *sample;
                    }
                }
            }

            let out = convert(value.clamp(-1.0, 1.0));
            for slot in frame.iter_mut() {
                *slot = out;
            }
        }

        let end_frame = first_frame + frame_count as u64;
        self.retire_finished(end_frame);
        self.frame_counter.store(end_frame, Ordering::Relaxed);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn accept_submissions(&mut self, first_frame: u64) {
        while self.voices.len() < MAX_ACTIVE_VOICES {
            match self.submit_consumer.pop() {
                Ok(mut voice) => {
                    // Late submissions start on the first frame we still own.
                    if voice.start_frame < first_frame {
                        voice.start_frame = first_frame;
                    }
                    self.voices.push(voice);
                }
                Err(_) => break,
            }
        }
    }

    fn retire_finished(&mut self, end_frame: u64) {
        let mut i = 0;
        while i < self.voices.len() {
            let voice = &self.voices[i];
            let finished = end_frame >= voice.start_frame
                && (end_frame - voice.start_frame) as usize >= voice.samples.len();
            if finished {
                let voice = self.voices.swap_remove(i);
                let _ = self.retire_producer.push(voice);
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(channels: usize) -> (VoiceSender, ClickMixer, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        let (sender, mixer) = voice_channels(8, channels, Arc::clone(&counter));
        (sender, mixer, counter)
    }

    fn voice(start_frame: u64, samples: &[f32]) -> Voice {
        Voice {
            start_frame,
            samples: Arc::from(samples),
        }
    }

    #[test]
    fn test_voice_starts_on_exact_frame() {
        let (mut sender, mut mixer, counter) = pair(1);
        sender.submit(voice(5, &[0.5, 0.25, 0.125])).unwrap();

        let mut out = [1.0f32; 10];
        mixer.render(&mut out, |v| v);

        assert_eq!(out, [0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.25, 0.125, 0.0, 0.0]);
        assert_eq!(counter.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_voice_spans_callbacks() {
        let (mut sender, mut mixer, _) = pair(1);
        sender.submit(voice(3, &[0.1, 0.2, 0.3, 0.4])).unwrap();

        let mut first = [0.0f32; 4];
        mixer.render(&mut first, |v| v);
        let mut second = [0.0f32; 4];
        mixer.render(&mut second, |v| v);

        assert_eq!(first, [0.0, 0.0, 0.0, 0.1]);
        assert_eq!(second, [0.2, 0.3, 0.4, 0.0]);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_late_voice_starts_immediately() {
        let (mut sender, mut mixer, counter) = pair(1);
        counter.store(100, Ordering::Relaxed);
        sender.submit(voice(40, &[0.5, 0.5])).unwrap();

        let mut out = [0.0f32; 4];
        mixer.render(&mut out, |v| v);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_future_voice_waits() {
        let (mut sender, mut mixer, _) = pair(1);
        sender.submit(voice(1_000, &[0.5])).unwrap();

        let mut out = [0.0f32; 16];
        mixer.render(&mut out, |v| v);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn test_stereo_duplicates_frames() {
        let (mut sender, mut mixer, counter) = pair(2);
        sender.submit(voice(1, &[0.5])).unwrap();

        let mut out = [0.0f32; 6];
        mixer.render(&mut out, |v| v);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.5, 0.0, 0.0]);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_overlapping_voices_sum_and_clamp() {
        let (mut sender, mut mixer, _) = pair(1);
        sender.submit(voice(0, &[0.75, 0.25])).unwrap();
        sender.submit(voice(0, &[0.75, 0.25])).unwrap();

        let mut out = [0.0f32; 2];
        mixer.render(&mut out, |v| v);
        assert_eq!(out, [1.0, 0.5]);
    }

    #[test]
    fn test_finished_voices_are_retired() {
        let (mut sender, mut mixer, _) = pair(1);
        sender.submit(voice(0, &[0.1, 0.1])).unwrap();

        let mut out = [0.0f32; 4];
        mixer.render(&mut out, |v| v);
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(sender.drain_retired(), 1);
    }

    #[test]
    fn test_i16_conversion() {
        let (mut sender, mut mixer, _) = pair(1);
        sender.submit(voice(0, &[0.5, -1.0])).unwrap();

        let mut out = [0i16; 2];
        mixer.render(&mut out, |v| (v * i16::MAX as f32) as i16);
        assert_eq!(out, [16383, -32767]);
    }

    #[test]
    fn test_full_queue_returns_voice() {
        let counter = Arc::new(AtomicU64::new(0));
        let (mut sender, _mixer) = voice_channels(1, 1, counter);
        sender.submit(voice(0, &[0.1])).unwrap();
        let rejected = sender.submit(voice(10, &[0.2])).unwrap_err();
        assert_eq!(rejected.start_frame, 10);
    }

    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<VoiceSender>();
        assert_send::<ClickMixer>();
    }
}
