//! Pitch detection engine
//!
//! RMS peak picking finds voiced frames, an FFT peak gives a coarse hint and
//! YIN estimates the fundamental. Frequencies are then bucketed into
//! categories that select a spell element.

mod analyzer;
mod classify;
mod fft;
mod rms;
mod yin;

pub use analyzer::{
    DEFAULT_PEAK_COUNT, PitchAnalysis, PitchAnalyzer, PitchEstimate, REALTIME_SILENCE_LEVEL,
    dominant_category,
};
pub use classify::{
    ElementMap, GAUGE_MAX_HZ, GAUGE_MIN_HZ, MAX_BOUNDARY_HZ, MIN_BOUNDARY_HZ, PitchBoundaries,
    PitchCategory, classify, gauge_frequency, gauge_position, note_name,
};
pub use fft::{SpectralHinter, fft_in_place, hann_window};
pub use rms::{FRAME_SIZE, FrameRms, HOP_SIZE, RmsPeakPicker, frame_rms, mean_abs, rms};
pub use yin::{DEFAULT_THRESHOLD, LagRange, YinEstimator, cumulative_mean_normalized, difference};
