//! Frame loudness and RMS peak picking
//!
//! Voiced regions of a clip show up as local maxima in the frame RMS series.
//! The strongest, well separated maxima are the frames worth running pitch
//! estimation on.

/// Frame length used for RMS and pitch frames
pub const FRAME_SIZE: usize = 2048;

/// Distance between consecutive RMS frames
pub const HOP_SIZE: usize = 512;

/// Minimum spacing between accepted peaks, in hops
const MIN_PEAK_SPACING_HOPS: usize = 8;

/// Fraction of the quietest frames skipped when estimating the noise floor
const NOISE_FLOOR_PERCENTILE: f32 = 0.1;

/// Peaks must exceed the noise floor by this factor
const NOISE_FLOOR_FACTOR: f32 = 1.5;

/// RMS value of one frame together with the sample index it starts at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRms {
    /// Sample index of the first sample in the frame
    pub index: usize,
    /// Root-mean-square amplitude of the frame
    pub rms: f32,
}

/// Root-mean-square amplitude of a window
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Mean absolute amplitude of a window
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_abs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples.iter().map(|s| f64::from(s.abs())).sum();
    (sum / samples.len() as f64) as f32
}

/// Compute RMS over sliding frames
///
/// Frames start at `0, hop, 2*hop, ...` for as long as a full frame plus at
/// least one sample remains after it.
#[must_use]
pub fn frame_rms(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<FrameRms> {
    if frame_size == 0 || hop_size == 0 || samples.len() <= frame_size {
        return Vec::new();
    }

    (0..samples.len() - frame_size)
        .step_by(hop_size)
        .map(|index| FrameRms {
            index,
            rms: rms(&samples[index..index + frame_size]),
        })
        .collect()
}

/// Picks the loudest well-separated frames from an RMS series
#[derive(Debug, Clone, Copy)]
pub struct RmsPeakPicker {
    hop_size: usize,
}

impl Default for RmsPeakPicker {
    fn default() -> Self {
        Self::new(HOP_SIZE)
    }
}

impl RmsPeakPicker {
    /// Create a peak picker for frames spaced `hop_size` samples apart
    #[must_use]
    pub const fn new(hop_size: usize) -> Self {
        Self { hop_size }
    }

    /// Minimum distance in samples between two accepted peaks
    #[must_use]
    pub const fn min_distance(&self) -> usize {
        self.hop_size * MIN_PEAK_SPACING_HOPS
    }

    /// Noise floor of an RMS series
    ///
    /// Sorts ascending, skips the lowest 10% and takes the next value.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn noise_floor(frames: &[FrameRms]) -> f32 {
        let mut values: Vec<f32> = frames.iter().map(|f| f.rms).collect();
        values.sort_by(f32::total_cmp);

        let skip = (values.len() as f32 * NOISE_FLOOR_PERCENTILE) as usize;
        values.get(skip).copied().unwrap_or(0.0)
    }

    /// Return up to `count` peak sample indices, strongest first
    ///
    /// A peak is an interior local maximum above 1.5x the noise floor. Peaks
    /// closer than [`min_distance`](Self::min_distance) to an already accepted
    /// one are skipped.
    #[must_use]
    pub fn pick(&self, frames: &[FrameRms], count: usize) -> Vec<usize> {
        if frames.len() < 3 || count == 0 {
            return Vec::new();
        }

        let threshold = Self::noise_floor(frames) * NOISE_FLOOR_FACTOR;

        let mut candidates: Vec<FrameRms> = frames
            .windows(3)
            .filter(|w| w[1].rms > w[0].rms && w[1].rms > w[2].rms && w[1].rms > threshold)
            .map(|w| w[1])
            .collect();

        // Stable sort keeps earlier frames first among equal RMS values
        candidates.sort_by(|a, b| b.rms.total_cmp(&a.rms));

        let min_distance = self.min_distance();
        let mut peaks: Vec<usize> = Vec::with_capacity(count);

        for candidate in candidates {
            let too_close = peaks
                .iter()
                .any(|&existing| existing.abs_diff(candidate.index) < min_distance);

            if !too_close {
                peaks.push(candidate.index);
                if peaks.len() >= count {
                    break;
                }
            }
        }

        tracing::trace!(frames = frames.len(), threshold, peaks = ?peaks, "picked rms peaks");
        peaks
    }
}
