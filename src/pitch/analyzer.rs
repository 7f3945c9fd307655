//! Whole-clip pitch analysis

use serde::Serialize;

use super::classify::{PitchBoundaries, PitchCategory, classify, note_name};
use super::fft::SpectralHinter;
use super::rms::{FRAME_SIZE, HOP_SIZE, RmsPeakPicker, frame_rms, mean_abs};
use super::yin::YinEstimator;
use crate::voice::SampleBuffer;

/// Default number of RMS peaks examined per clip
pub const DEFAULT_PEAK_COUNT: usize = 4;

/// Frames quieter than this (mean absolute level) carry no pitch
pub const REALTIME_SILENCE_LEVEL: f32 = 0.01;

/// Single pitch detection inside a clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchEstimate {
    pub frequency_hz: f32,
    /// Sample index of the analyzed frame
    pub frame_start: usize,
}

/// Result of analyzing one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchAnalysis {
    /// Detections in the order the peaks were examined (strongest first)
    pub estimates: Vec<PitchEstimate>,
    pub notes: Vec<String>,
    /// Detections per category, indexed by [`PitchCategory::index`]
    pub counts: [usize; 3],
    pub dominant: PitchCategory,
    /// Number of samples in the analyzed clip
    pub sample_count: usize,
}

impl PitchAnalysis {
    /// Detected frequencies in Hz
    #[must_use]
    pub fn frequencies(&self) -> Vec<f32> {
        self.estimates.iter().map(|e| e.frequency_hz).collect()
    }

    /// Detections for one category
    #[must_use]
    pub const fn count(&self, category: PitchCategory) -> usize {
        self.counts[category.index()]
    }

    /// Mean detected frequency, if any
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_frequency(&self) -> Option<f32> {
        if self.estimates.is_empty() {
            return None;
        }
        let sum: f32 = self.estimates.iter().map(|e| e.frequency_hz).sum();
        Some(sum / self.estimates.len() as f32)
    }
}

/// Runs RMS peak picking, the spectral hint and YIN over a clip
#[derive(Debug, Clone)]
pub struct PitchAnalyzer {
    peak_count: usize,
    hinted: bool,
    picker: RmsPeakPicker,
    yin: YinEstimator,
    hinter: SpectralHinter,
}

impl Default for PitchAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_PEAK_COUNT, true, YinEstimator::default())
    }
}

impl PitchAnalyzer {
    #[must_use]
    pub fn new(peak_count: usize, hinted: bool, yin: YinEstimator) -> Self {
        Self {
            peak_count,
            hinted,
            picker: RmsPeakPicker::new(HOP_SIZE),
            yin,
            hinter: SpectralHinter::new(FRAME_SIZE),
        }
    }

    #[must_use]
    pub const fn peak_count(&self) -> usize {
        self.peak_count
    }

    #[must_use]
    pub const fn is_hinted(&self) -> bool {
        self.hinted
    }

    /// Analyze a complete clip
    ///
    /// Each RMS peak frame is estimated independently; frames with no pitch
    /// are skipped. With no detections the dominant category is Medium.
    #[must_use]
    pub fn analyze(&self, clip: &SampleBuffer, bounds: &PitchBoundaries) -> PitchAnalysis {
        let samples = clip.samples();
        let frames = frame_rms(samples, FRAME_SIZE, HOP_SIZE);
        let peaks = self.picker.pick(&frames, self.peak_count);

        let estimates: Vec<PitchEstimate> = peaks
            .into_iter()
            .filter_map(|start| {
                let frame = &samples[start..(start + FRAME_SIZE).min(samples.len())];
                self.estimate_frame(frame, clip.sample_rate())
                    .map(|frequency_hz| PitchEstimate {
                        frequency_hz,
                        frame_start: start,
                    })
            })
            .collect();

        let mut counts = [0usize; 3];
        for estimate in &estimates {
            counts[classify(estimate.frequency_hz, bounds).index()] += 1;
        }

        let notes = estimates
            .iter()
            .filter_map(|e| note_name(e.frequency_hz))
            .collect();

        let analysis = PitchAnalysis {
            dominant: dominant_category(counts),
            estimates,
            notes,
            counts,
            sample_count: samples.len(),
        };

        tracing::debug!(
            samples = analysis.sample_count,
            detections = analysis.estimates.len(),
            dominant = %analysis.dominant,
            "clip analyzed"
        );

        analysis
    }

    /// Pitch of the most recent frame, for live feedback
    ///
    /// Uses the last [`FRAME_SIZE`] samples. Quiet frames report no pitch.
    #[must_use]
    pub fn detect_realtime(&self, samples: &[f32], sample_rate: u32) -> Option<f32> {
        let frame = &samples[samples.len().saturating_sub(FRAME_SIZE)..];
        if frame.is_empty() || mean_abs(frame) < REALTIME_SILENCE_LEVEL {
            return None;
        }

        self.estimate_frame(frame, sample_rate)
    }

    fn estimate_frame(&self, frame: &[f32], sample_rate: u32) -> Option<f32> {
        let hint = if self.hinted {
            Some(self.hinter.hint(frame, sample_rate)).filter(|h| *h > 0.0)
        } else {
            None
        };

        self.yin.estimate(frame, sample_rate, hint)
    }
}

/// Category with the most detections; ties go to the lower category
#[must_use]
pub fn dominant_category(counts: [usize; 3]) -> PitchCategory {
    if counts.iter().all(|&c| c == 0) {
        return PitchCategory::Medium;
    }

    let mut best = PitchCategory::Low;
    for category in PitchCategory::ALL {
        if counts[category.index()] > counts[best.index()] {
            best = category;
        }
    }
    best
}
