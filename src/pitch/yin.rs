//! YIN fundamental frequency estimation
//!
//! Two search modes share the difference function:
//! - unhinted: classic cumulative-mean-normalized threshold search
//! - hinted: a narrow lag window around an FFT estimate, searched for the raw
//!   difference minimum

/// Default threshold on the normalized difference function
pub const DEFAULT_THRESHOLD: f32 = 0.2;

/// Half-width of the hinted lag window, in samples
const HINT_LAG_RANGE: usize = 100;

/// Hints outside `(HINT_MIN_HZ, HINT_MAX_HZ)` are ignored
const HINT_MIN_HZ: f32 = 50.0;
const HINT_MAX_HZ: f32 = 2000.0;

/// Smallest lag ever searched
const MIN_LAG_FLOOR: usize = 2;

/// Inclusive-exclusive lag window `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagRange {
    pub min: usize,
    pub max: usize,
}

impl LagRange {
    /// Default search range covering roughly 50-1000 Hz
    #[must_use]
    pub fn unhinted(sample_rate: u32, frame_len: usize) -> Self {
        let sr = sample_rate as usize;
        Self {
            min: MIN_LAG_FLOOR.max(sr / 1000),
            max: (frame_len / 2).min(sr / 50),
        }
    }

    /// Narrowed range around `sample_rate / hint`
    ///
    /// Returns `None` when the hint is out of bounds or the window collapses.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn hinted(sample_rate: u32, frame_len: usize, hint_hz: f32) -> Option<Self> {
        if !(hint_hz > HINT_MIN_HZ && hint_hz < HINT_MAX_HZ) {
            return None;
        }

        let center = (sample_rate as f32 / hint_hz).round() as usize;
        let range = Self {
            min: MIN_LAG_FLOOR.max(center.saturating_sub(HINT_LAG_RANGE)),
            max: (frame_len / 2).min(center + HINT_LAG_RANGE),
        };

        (!range.is_empty()).then_some(range)
    }

    /// True when no lag can be searched
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max <= self.min
    }
}

/// Estimates the fundamental frequency of a single frame
#[derive(Debug, Clone, Copy)]
pub struct YinEstimator {
    threshold: f32,
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl YinEstimator {
    /// Create an estimator with the given normalized-difference threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Threshold used by the unhinted search
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Estimate F0 in Hz, or `None` when no period was found
    ///
    /// A hint in (50, 2000) Hz narrows the lag window to +-100 samples around
    /// the hinted period and switches to the raw minimum search.
    #[must_use]
    pub fn estimate(&self, frame: &[f32], sample_rate: u32, hint_hz: Option<f32>) -> Option<f32> {
        if sample_rate == 0 {
            return None;
        }

        let hinted = hint_hz.and_then(|h| LagRange::hinted(sample_rate, frame.len(), h));
        let frequency = match hinted {
            Some(range) => self.estimate_hinted(frame, sample_rate, range),
            None => self.estimate_unhinted(frame, sample_rate),
        };

        tracing::trace!(?hint_hz, hinted = hinted.is_some(), ?frequency, "yin estimate");
        frequency
    }

    fn estimate_unhinted(&self, frame: &[f32], sample_rate: u32) -> Option<f32> {
        let range = LagRange::unhinted(sample_rate, frame.len());
        if range.is_empty() {
            return None;
        }

        // Normalization needs every lag from 1, not only the searched window
        let d = difference(frame, 1, range.max);
        let d_prime = cumulative_mean_normalized(&d);

        let mut tau = (range.min..range.max).find(|&tau| d_prime[tau] < self.threshold)?;
        while tau + 1 < range.max && d_prime[tau + 1] < d_prime[tau] {
            tau += 1;
        }

        refine(&d, tau, range, sample_rate)
    }

    // Unlike textbook YIN this skips normalization and takes the raw minimum
    // inside the hinted window. Exact zeros are float artifacts, not periods.
    fn estimate_hinted(&self, frame: &[f32], sample_rate: u32, range: LagRange) -> Option<f32> {
        let d = difference(frame, range.min, range.max);

        let tau = (range.min..range.max)
            .filter(|&tau| d[tau] > 0.0)
            .min_by(|&a, &b| d[a].total_cmp(&d[b]))?;

        refine(&d, tau, range, sample_rate)
    }
}

/// Difference function `d(tau)` for `tau` in `[from, to)`
///
/// The returned vector is indexed by lag; entries below `from` are zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn difference(frame: &[f32], from: usize, to: usize) -> Vec<f32> {
    let to = to.min(frame.len());
    let mut d = vec![0.0f32; to];

    for (tau, slot) in d.iter_mut().enumerate().skip(from) {
        let sum: f64 = frame[..frame.len() - tau]
            .iter()
            .zip(&frame[tau..])
            .map(|(a, b)| {
                let diff = f64::from(a - b);
                diff * diff
            })
            .sum();
        *slot = sum as f32;
    }

    d
}

/// Cumulative-mean-normalized difference `d'(tau)`
///
/// Expects `d` computed from lag 1. `d'(0)` is defined as 1.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cumulative_mean_normalized(d: &[f32]) -> Vec<f32> {
    let mut d_prime = vec![1.0f32; d.len()];
    let mut running = 0.0f32;

    for tau in 1..d.len() {
        running += d[tau];
        d_prime[tau] = if running > 0.0 {
            d[tau] / (running / tau as f32)
        } else {
            1.0
        };
    }

    d_prime
}

/// Parabolic interpolation around an interior lag
///
/// Lags on the window boundary cannot be refined and yield no pitch. A
/// degenerate parabola falls back to the integer lag.
#[allow(clippy::cast_precision_loss)]
fn refine(d: &[f32], tau: usize, range: LagRange, sample_rate: u32) -> Option<f32> {
    if tau <= range.min || tau + 1 >= range.max {
        return None;
    }

    let (a, b, c) = (d[tau - 1], d[tau], d[tau + 1]);
    let mut shift = (a - c) / (2.0 * (a - 2.0 * b + c));
    if !shift.is_finite() {
        shift = 0.0;
    }

    let period = tau as f32 + shift;
    (period > 0.0).then(|| sample_rate as f32 / period)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    fn within(actual: f32, expected: f32, pct: f32) -> bool {
        (actual - expected).abs() <= expected * pct / 100.0
    }

    #[test]
    fn test_lag_range_44k() {
        let range = LagRange::unhinted(44_100, 2048);
        assert_eq!(range, LagRange { min: 44, max: 882 });
    }

    #[test]
    fn test_lag_range_16k_limited_by_frame() {
        let range = LagRange::unhinted(16_000, 512);
        assert_eq!(range, LagRange { min: 16, max: 256 });
    }

    #[test]
    fn test_hinted_range_centered() {
        let range = LagRange::hinted(44_100, 2048, 441.0).unwrap();
        assert_eq!(range, LagRange { min: 2, max: 200 });

        let range = LagRange::hinted(44_100, 2048, 220.0).unwrap();
        assert_eq!(range, LagRange { min: 100, max: 300 });
    }

    #[test]
    fn test_hint_out_of_bounds_ignored() {
        assert!(LagRange::hinted(44_100, 2048, 0.0).is_none());
        assert!(LagRange::hinted(44_100, 2048, 50.0).is_none());
        assert!(LagRange::hinted(44_100, 2048, 2500.0).is_none());
    }

    #[test]
    fn test_hinted_range_collapses_for_tiny_frame() {
        // Centre lag 441 is beyond frame_len / 2 = 16
        assert!(LagRange::hinted(44_100, 32, 100.0).is_none());
    }

    #[test]
    fn test_unhinted_sine_220() {
        let frame = sine(220.0, 44_100, 2048);
        let f0 = YinEstimator::default().estimate(&frame, 44_100, None).unwrap();
        assert!(within(f0, 220.0, 1.0), "got {f0}");
    }

    #[test]
    fn test_hinted_sine_220() {
        let frame = sine(220.0, 44_100, 2048);
        let f0 = YinEstimator::default()
            .estimate(&frame, 44_100, Some(215.3))
            .unwrap();
        assert!(within(f0, 220.0, 1.0), "got {f0}");
    }

    #[test]
    fn test_unhinted_sine_at_16k() {
        let frame = sine(180.0, 16_000, 2048);
        let f0 = YinEstimator::default().estimate(&frame, 16_000, None).unwrap();
        assert!(within(f0, 180.0, 1.0), "got {f0}");
    }

    #[test]
    fn test_silence_has_no_pitch() {
        let frame = vec![0.0f32; 2048];
        assert!(YinEstimator::default().estimate(&frame, 44_100, None).is_none());
        assert!(YinEstimator::default()
            .estimate(&frame, 44_100, Some(220.0))
            .is_none());
    }

    #[test]
    fn test_zero_sample_rate() {
        assert!(YinEstimator::default().estimate(&[0.1; 2048], 0, None).is_none());
    }

    #[test]
    fn test_hinted_search_uses_raw_difference_minimum() {
        // The hinted path does not normalize: it returns the global raw minimum
        // of d(tau) in the window. For a clean sine that is the true period, but
        // under noise a shallower dip can win where textbook YIN would not pick
        // it. This pins the behavior so a change to it is deliberate.
        let frame = sine(220.0, 44_100, 2048);
        let range = LagRange::hinted(44_100, 2048, 215.3).unwrap();
        let d = difference(&frame, range.min, range.max);

        let raw_min = (range.min..range.max)
            .filter(|&t| d[t] > 0.0)
            .min_by(|&a, &b| d[a].total_cmp(&d[b]))
            .unwrap();
        assert_eq!(raw_min, 200);
    }

    #[test]
    fn test_refine_rejects_window_edges() {
        let range = LagRange { min: 10, max: 20 };
        let d = vec![1.0f32; 20];
        assert!(refine(&d, 10, range, 44_100).is_none());
        assert!(refine(&d, 19, range, 44_100).is_none());
    }

    #[test]
    fn test_refine_degenerate_parabola_uses_integer_lag() {
        // Flat neighbourhood: a - 2b + c == 0
        let range = LagRange { min: 10, max: 20 };
        let d = vec![1.0f32; 20];
        let f0 = refine(&d, 15, range, 15_000).unwrap();
        assert!((f0 - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_cumulative_mean_normalized_starts_at_one() {
        let d = vec![0.0, 2.0, 2.0, 2.0];
        let d_prime = cumulative_mean_normalized(&d);
        assert!((d_prime[0] - 1.0).abs() < f32::EPSILON);
        assert!((d_prime[1] - 1.0).abs() < f32::EPSILON);
        assert!((d_prime[3] - 1.0).abs() < f32::EPSILON);
    }
}
