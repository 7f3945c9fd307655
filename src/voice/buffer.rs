//! Sample buffers and the shared capture ring

use std::sync::{Arc, Mutex};

/// Samples with `|x|` at or below this level are trimmed from clip edges
pub const TRIM_LEVEL: f32 = 0.01;

/// Mono clip with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    #[must_use]
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Clip length in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Drop leading and trailing samples whose magnitude is at most `level`
    ///
    /// A clip with no sample above `level` is returned unchanged.
    #[must_use]
    pub fn trim_silence(self, level: f32) -> Self {
        let first = self.samples.iter().position(|s| s.abs() > level);
        let last = self.samples.iter().rposition(|s| s.abs() > level);

        match (first, last) {
            (Some(first), Some(last)) => Self {
                samples: self.samples[first..=last].to_vec(),
                sample_rate: self.sample_rate,
            },
            _ => {
                tracing::debug!(samples = self.samples.len(), "silent clip, trim skipped");
                self
            }
        }
    }

    /// Consume the buffer, returning the raw samples
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Read access to a continuously written audio stream
///
/// Positions are absolute sample counts since the stream started; only the
/// last [`capacity`](Self::capacity) samples remain readable.
pub trait AudioSource: Send + Sync {
    /// Sample rate of the stream
    fn sample_rate(&self) -> u32;

    /// Total samples written so far
    fn position(&self) -> u64;

    /// Number of samples retained
    fn capacity(&self) -> usize;

    /// Copy the samples in `[start, end)`
    ///
    /// Parts of the span no longer retained are skipped.
    fn read_span(&self, start: u64, end: u64) -> Vec<f32>;

    /// The most recent `count` samples (fewer if not yet written)
    fn latest(&self, count: usize) -> Vec<f32> {
        let end = self.position();
        let start = end.saturating_sub(count as u64);
        self.read_span(start, end)
    }
}

#[derive(Debug)]
struct RingState {
    data: Vec<f32>,
    written: u64,
}

/// Fixed-size ring buffer shared between a capture callback and readers
///
/// Cloning yields another handle to the same ring.
#[derive(Debug, Clone)]
pub struct CaptureRing {
    state: Arc<Mutex<RingState>>,
    sample_rate: u32,
    capacity: usize,
}

impl CaptureRing {
    /// Create a ring holding `seconds` of audio at `sample_rate`
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn with_duration(sample_rate: u32, seconds: f32) -> Self {
        let capacity = (sample_rate as f32 * seconds.max(0.0)).ceil() as usize;
        Self::new(sample_rate, capacity)
    }

    /// Create a ring holding `capacity` samples
    #[must_use]
    pub fn new(sample_rate: u32, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Arc::new(Mutex::new(RingState {
                data: vec![0.0; capacity],
                written: 0,
            })),
            sample_rate,
            capacity,
        }
    }

    /// Append samples, overwriting the oldest ones
    pub fn push(&self, samples: &[f32]) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        let cap = self.capacity;
        // Only the tail can survive a push longer than the ring
        let skip = samples.len().saturating_sub(cap);
        let samples = &samples[skip..];
        let base = state.written + skip as u64;

        let mut offset = slot(base, cap);
        let mut rest = samples;
        while !rest.is_empty() {
            let n = rest.len().min(cap - offset);
            state.data[offset..offset + n].copy_from_slice(&rest[..n]);
            rest = &rest[n..];
            offset = 0;
        }

        state.written = base + samples.len() as u64;
    }

    /// Forget everything written so far
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.data.fill(0.0);
            state.written = 0;
        }
    }
}

impl AudioSource for CaptureRing {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn position(&self) -> u64 {
        self.state.lock().map(|s| s.written).unwrap_or(0)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_span(&self, start: u64, end: u64) -> Vec<f32> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };

        let cap = self.capacity;
        let end = end.min(state.written);
        let start = start.max(state.written.saturating_sub(cap as u64));
        if start >= end {
            return Vec::new();
        }

        let len = (end - start) as usize;
        let first = slot(start, cap);
        let mut out = Vec::with_capacity(len);

        // Tail of the ring, then the wrapped head
        let tail = len.min(cap - first);
        out.extend_from_slice(&state.data[first..first + tail]);
        out.extend_from_slice(&state.data[..len - tail]);
        out
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn slot(position: u64, capacity: usize) -> usize {
    (position % capacity as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_silence_edges() {
        let clip = SampleBuffer::new(vec![0.0, 0.005, 0.3, -0.4, 0.2, 0.01, 0.0], 16_000);
        let trimmed = clip.trim_silence(TRIM_LEVEL);
        assert_eq!(trimmed.samples(), &[0.3, -0.4, 0.2]);
    }

    #[test]
    fn test_trim_all_silent_passes_through() {
        let clip = SampleBuffer::new(vec![0.0, 0.01, -0.005], 16_000);
        let trimmed = clip.clone().trim_silence(TRIM_LEVEL);
        assert_eq!(trimmed, clip);
    }

    #[test]
    fn test_duration() {
        let clip = SampleBuffer::new(vec![0.0; 8000], 16_000);
        assert!((clip.duration_secs() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ring_push_and_latest() {
        let ring = CaptureRing::new(16_000, 8);
        ring.push(&[1.0, 2.0, 3.0]);

        assert_eq!(ring.position(), 3);
        assert_eq!(ring.latest(2), vec![2.0, 3.0]);
        assert_eq!(ring.latest(10), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ring_wraparound_span() {
        let ring = CaptureRing::new(16_000, 4);
        ring.push(&[1.0, 2.0, 3.0]);
        ring.push(&[4.0, 5.0, 6.0]);

        // Slots now hold [5, 6, 3, 4]; span 2..6 crosses the end
        assert_eq!(ring.read_span(2, 6), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_ring_drops_overwritten_samples() {
        let ring = CaptureRing::new(16_000, 4);
        ring.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(ring.position(), 6);
        assert_eq!(ring.read_span(0, 6), vec![3.0, 4.0, 5.0, 6.0]);
        assert!(ring.read_span(0, 2).is_empty());
    }

    #[test]
    fn test_ring_clear() {
        let ring = CaptureRing::with_duration(16_000, 0.5);
        assert_eq!(ring.capacity(), 8000);

        ring.push(&[0.5; 100]);
        ring.clear();
        assert_eq!(ring.position(), 0);
        assert!(ring.latest(10).is_empty());
    }
}
