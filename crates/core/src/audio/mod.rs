//! Single-sample playback shared between the event loop and the audio
//! device callback.
//!
//! [`PlaybackController`] holds exactly one active [`Sample`] and a byte
//! cursor into it. The event loop replaces the sample with
//! [`PlaybackController::play_sample`]; the device thread pulls output with
//! [`PlaybackController::produce`]. Both sides go through one mutex and hold
//! it only for a bounded copy or fill, so the callback never waits on I/O or
//! allocation.

mod device;

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub use device::{list_output_devices, AudioDevice};

/// Decoded audio clip in the process-wide [`AudioFormat`](crate::AudioFormat).
///
/// The bytes are shared, so handing a sample to the controller never copies
/// audio data. Whoever created the sample (normally the
/// [`SampleStore`](crate::SampleStore)) keeps a handle for as long as it
/// might be replayed.
#[derive(Clone, PartialEq, Eq)]
pub struct Sample {
    bytes: Arc<[u8]>,
}

impl Sample {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Encodes 16-bit samples as little-endian bytes.
    pub fn from_pcm16(samples: &[i16]) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::from_bytes(bytes)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::from_bytes(Vec::new())
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample").field("len", &self.len()).finish()
    }
}

#[derive(Debug, Default)]
struct PlaybackState {
    sample: Sample,
    cursor: usize,
}

impl PlaybackState {
    fn remaining(&self) -> usize {
        assert!(
            self.cursor <= self.sample.len(),
            "playback cursor {} past end of {}-byte sample",
            self.cursor,
            self.sample.len()
        );
        self.sample.len() - self.cursor
    }
}

/// The one place that knows what is currently playing.
///
/// Starting a new sample always abandons the previous one: there is no queue
/// and no mixing, the last `play_sample` wins.
#[derive(Debug, Default)]
pub struct PlaybackController {
    state: Mutex<PlaybackState>,
}

impl PlaybackController {
    /// Creates an idle controller. Until a sample is set every `produce`
    /// call yields silence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the common case of sharing the controller between the
    /// event loop and a device callback.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replaces the active sample and rewinds to its start.
    ///
    /// Whatever was still playing is cut off at the next [`produce`]. An
    /// empty sample is accepted and simply silences output.
    ///
    /// [`produce`]: Self::produce
    pub fn play_sample(&self, sample: Sample) {
        let _previous = {
            let mut state = self.lock();
            state.cursor = 0;
            std::mem::replace(&mut state.sample, sample)
        };
        // `_previous` drops here, after the guard, so a last reference is
        // never released while the callback is waiting on the lock.
    }

    /// Fills all of `out` from the active sample and advances the cursor.
    ///
    /// Bytes past the end of the sample are written as zero, so the buffer is
    /// always completely initialised on return.
    pub fn produce(&self, out: &mut [u8]) {
        let mut state = self.lock();
        let start = state.cursor;
        let available = out.len().min(state.remaining());

        out[..available].copy_from_slice(&state.sample.as_bytes()[start..start + available]);
        state.cursor = start + available;
        out[available..].fill(0);
    }

    /// [`produce`](Self::produce) for devices that hand out 16-bit sample
    /// buffers. The sample bytes are little-endian regardless of host order.
    pub fn produce_pcm16(&self, out: &mut [i16]) {
        self.produce(bytemuck::cast_slice_mut(out));
        if cfg!(target_endian = "big") {
            for sample in out.iter_mut() {
                *sample = i16::from_le(*sample);
            }
        }
    }

    /// Bytes of the active sample not yet delivered.
    pub fn remaining(&self) -> usize {
        self.lock().remaining()
    }

    /// True once the active sample is exhausted (or none was ever set).
    pub fn is_idle(&self) -> bool {
        self.remaining() == 0
    }

    // The state is only ever written as a whole while the guard is held, so a
    // panic elsewhere cannot leave it torn and a poisoned lock is safe to use.
    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicBool, sync::atomic::Ordering, thread};

    use super::*;

    fn sample(bytes: &[u8]) -> Sample {
        Sample::from_bytes(bytes.to_vec())
    }

    #[test]
    fn produces_prefix_of_new_sample() {
        let controller = PlaybackController::new();
        let data: Vec<u8> = (0..32).collect();
        controller.play_sample(sample(&data));

        let mut buf = [0xAA_u8; 10];
        controller.produce(&mut buf);

        assert_eq!(&buf, &data[..10]);
        assert_eq!(controller.remaining(), 22);
    }

    #[test]
    fn chunked_reads_reassemble_the_sample() {
        let controller = PlaybackController::new();
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();
        controller.play_sample(sample(&data));

        let mut collected = Vec::new();
        for chunk in [1_usize, 7, 0, 256, 300, 436] {
            let mut buf = vec![0xFF; chunk];
            controller.produce(&mut buf);
            collected.extend_from_slice(&buf);
        }

        assert_eq!(collected, data);
        assert!(controller.is_idle());
    }

    #[test]
    fn exhausted_or_unset_sample_yields_silence() {
        let controller = PlaybackController::new();
        let mut buf = [0x5A_u8; 16];
        controller.produce(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));

        controller.play_sample(sample(&[1, 2, 3]));
        let mut drain = [0_u8; 3];
        controller.produce(&mut drain);

        let mut buf = [0x5A_u8; 16];
        controller.produce(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn straddling_read_pads_tail_with_zeros() {
        let controller = PlaybackController::new();
        controller.play_sample(sample(&[0x11, 0x22, 0x33, 0x44]));

        let mut buf = [0_u8; 2];
        controller.produce(&mut buf);
        assert_eq!(buf, [0x11, 0x22]);

        let mut buf = [0xEE_u8; 4];
        controller.produce(&mut buf);
        assert_eq!(buf, [0x33, 0x44, 0x00, 0x00]);
        assert!(controller.is_idle());
    }

    #[test]
    fn zero_length_sample_is_immediately_exhausted() {
        let controller = PlaybackController::new();
        controller.play_sample(Sample::empty());

        let mut buf = [0x77_u8; 8];
        controller.produce(&mut buf);
        assert_eq!(buf, [0; 8]);
    }

    #[test]
    fn new_sample_discards_the_rest_of_the_old_one() {
        let controller = PlaybackController::new();
        controller.play_sample(sample(&[1, 1, 1, 1, 1, 1]));

        let mut buf = [0_u8; 2];
        controller.produce(&mut buf);

        controller.play_sample(sample(&[9, 8, 7]));
        let mut buf = [0xFF_u8; 6];
        controller.produce(&mut buf);
        assert_eq!(buf, [9, 8, 7, 0, 0, 0]);
    }

    #[test]
    fn replaying_the_same_sample_rewinds() {
        let controller = PlaybackController::new();
        let clip = sample(&[4, 5, 6]);
        controller.play_sample(clip.clone());

        let mut buf = [0_u8; 2];
        controller.produce(&mut buf);
        controller.play_sample(clip);

        let mut buf = [0_u8; 3];
        controller.produce(&mut buf);
        assert_eq!(buf, [4, 5, 6]);
    }

    #[test]
    fn pcm16_output_decodes_little_endian_bytes() {
        let controller = PlaybackController::new();
        controller.play_sample(Sample::from_pcm16(&[1, -2, 0x1234]));

        let mut out = [i16::MAX; 5];
        controller.produce_pcm16(&mut out);
        assert_eq!(out, [1, -2, 0x1234, 0, 0]);
    }

    /// Each byte of these samples encodes which sample it came from and its
    /// offset, so a single `produce` result can be checked for tearing.
    const FIRST: std::ops::RangeInclusive<u8> = 1..=120;
    const SECOND: std::ops::RangeInclusive<u8> = 121..=250;

    fn assert_untorn(buf: &[u8]) {
        let run = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        assert!(
            buf[run..].iter().all(|&b| b == 0),
            "sample bytes after silence: {buf:?}"
        );
        let Some(&head) = buf.first().filter(|_| run > 0) else {
            return;
        };
        let range = if FIRST.contains(&head) { FIRST } else { SECOND };
        for (i, &b) in buf[..run].iter().enumerate() {
            // Staying consecutive inside one range also bounds the run by the
            // bytes that were left in that sample.
            assert!(range.contains(&b), "bytes from two samples: {buf:?}");
            assert_eq!(usize::from(b), usize::from(head) + i, "gap in run: {buf:?}");
        }
    }

    #[test]
    fn untorn_check_rejects_mixed_output() {
        assert_untorn(&[3, 4, 5, 0, 0]);
        assert_untorn(&[0, 0, 0]);
        assert!(std::panic::catch_unwind(|| assert_untorn(&[119, 120, 121])).is_err());
        assert!(std::panic::catch_unwind(|| assert_untorn(&[7, 0, 8])).is_err());
        assert!(std::panic::catch_unwind(|| assert_untorn(&[7, 9, 0])).is_err());
    }

    #[test]
    fn concurrent_replacement_never_tears_output() {
        let controller = PlaybackController::shared();
        let first = Sample::from_bytes(FIRST.collect::<Vec<u8>>());
        let second = Sample::from_bytes(SECOND.collect::<Vec<u8>>());
        let done = Arc::new(AtomicBool::new(false));

        let consumer = {
            let controller = Arc::clone(&controller);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut calls = 0_usize;
                while !done.load(Ordering::Acquire) || calls < 100 {
                    let mut buf = [0xFF_u8; 48];
                    controller.produce(&mut buf);
                    assert_untorn(&buf);
                    calls += 1;
                }
                calls
            })
        };

        for round in 0..5000 {
            let next = if round % 2 == 0 { &first } else { &second };
            controller.play_sample(next.clone());
            if round % 64 == 0 {
                thread::yield_now();
            }
        }
        done.store(true, Ordering::Release);

        let calls = consumer.join().expect("consumer thread panicked");
        assert!(calls >= 100);
    }
}
