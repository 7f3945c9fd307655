//! Coarse F0 hint from the FFT magnitude peak
//!
//! A single spectral peak is a cheap, octave-robust estimate. It only bounds
//! the YIN search; it is never reported as the pitch itself.

use std::borrow::Cow;
use std::f32::consts::PI;

/// First bin considered, rejecting near-DC rumble
const FIRST_BIN: usize = 2;

/// Produces frequency hints for [`YinEstimator`](super::YinEstimator)
#[derive(Debug, Clone)]
pub struct SpectralHinter {
    window: Vec<f32>,
}

impl SpectralHinter {
    /// Create a hinter for frames of `frame_size` samples
    ///
    /// The Hann window is computed once here and reused for every frame.
    #[must_use]
    pub fn new(frame_size: usize) -> Self {
        Self {
            window: hann_window(frame_size),
        }
    }

    /// Frame size the window was built for
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.window.len()
    }

    /// Dominant frequency of `frame` in Hz, or 0.0 when the spectrum is empty
    ///
    /// Frames that are not a power of two long are zero-padded after
    /// windowing. A frame whose length differs from the cached window gets a
    /// window of its own length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hint(&self, frame: &[f32], sample_rate: u32) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }

        let window = if frame.len() == self.window.len() {
            Cow::Borrowed(self.window.as_slice())
        } else {
            Cow::Owned(hann_window(frame.len()))
        };

        let n = frame.len().next_power_of_two();
        let mut real = vec![0.0f32; n];
        let mut imag = vec![0.0f32; n];

        for ((slot, &sample), &weight) in real.iter_mut().zip(frame).zip(window.iter()) {
            *slot = sample * weight;
        }

        fft_in_place(&mut real, &mut imag);

        let mut max_magnitude = 0.0f32;
        let mut max_index = 0usize;
        for i in FIRST_BIN..n / 2 {
            let magnitude = real[i].hypot(imag[i]);
            if magnitude > max_magnitude {
                max_magnitude = magnitude;
                max_index = i;
            }
        }

        if max_index == 0 {
            return 0.0;
        }

        max_index as f32 * sample_rate as f32 / n as f32
    }
}

/// Hann window of length `len`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hann_window(len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }

    let denom = (len - 1) as f32;
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}

/// Iterative radix-2 Cooley-Tukey FFT
///
/// `real.len()` must be a power of two and equal to `imag.len()`.
#[allow(clippy::cast_precision_loss)]
pub fn fft_in_place(real: &mut [f32], imag: &mut [f32]) {
    let n = real.len();
    debug_assert_eq!(n, imag.len());
    debug_assert!(n.is_power_of_two());
    if n < 2 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 0..n - 1 {
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
        let mut k = n / 2;
        while k <= j {
            j -= k;
            k /= 2;
        }
        j += k;
    }

    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let angle = -2.0 * PI / size as f32;
        let (step_imag, step_real) = angle.sin_cos();
        let (mut w_real, mut w_imag) = (1.0f32, 0.0f32);

        for i in 0..half {
            let mut m = i;
            while m < n {
                let next = m + half;
                let tr = w_real * real[next] - w_imag * imag[next];
                let ti = w_real * imag[next] + w_imag * real[next];

                real[next] = real[m] - tr;
                imag[next] = imag[m] - ti;
                real[m] += tr;
                imag[m] += ti;

                m += size;
            }

            let prev = w_real;
            w_real = prev * step_real - w_imag * step_imag;
            w_imag = prev * step_imag + w_imag * step_real;
        }

        size *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(2048);
        assert!(w[0].abs() < 1e-6);
        assert!(w[2047].abs() < 1e-6);
        assert!((w[1023] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_fft_impulse_is_flat() {
        let mut real = vec![0.0f32; 8];
        let mut imag = vec![0.0f32; 8];
        real[0] = 1.0;
        fft_in_place(&mut real, &mut imag);

        for (re, im) in real.iter().zip(&imag) {
            assert!((re - 1.0).abs() < 1e-6);
            assert!(im.abs() < 1e-6);
        }
    }

    #[test]
    fn test_fft_single_tone_bin() {
        // Exactly 4 cycles in 64 samples lands in bin 4
        let mut real: Vec<f32> = (0..64)
            .map(|i| (2.0 * PI * 4.0 * i as f32 / 64.0).cos())
            .collect();
        let mut imag = vec![0.0f32; 64];
        fft_in_place(&mut real, &mut imag);

        let peak = (0..32)
            .max_by(|&a, &b| real[a].hypot(imag[a]).total_cmp(&real[b].hypot(imag[b])))
            .unwrap();
        assert_eq!(peak, 4);
        assert!((real[4] - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_hint_near_tone() {
        let hinter = SpectralHinter::new(2048);
        let hint = hinter.hint(&sine(220.0, 44_100, 2048), 44_100);

        // One bin is ~21.5 Hz at this size
        assert!((hint - 220.0).abs() < 22.0, "got {hint}");
    }

    #[test]
    fn test_hint_of_silence_is_zero() {
        let hinter = SpectralHinter::new(2048);
        assert!(hinter.hint(&[0.0; 2048], 44_100).abs() < f32::EPSILON);
        assert!(hinter.hint(&[], 44_100).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hint_windows_frames_of_any_length() {
        // A frame longer than the cached window is windowed over its full length
        let frame = sine(330.0, 16_000, 3000);
        let short = SpectralHinter::new(1024).hint(&frame, 16_000);
        let exact = SpectralHinter::new(3000).hint(&frame, 16_000);
        assert!((short - exact).abs() < f32::EPSILON, "{short} vs {exact}");

        let frame = sine(330.0, 16_000, 700);
        let long = SpectralHinter::new(2048).hint(&frame, 16_000);
        let exact = SpectralHinter::new(700).hint(&frame, 16_000);
        assert!((long - exact).abs() < f32::EPSILON, "{long} vs {exact}");
    }

    #[test]
    fn test_hint_zero_pads_odd_frames() {
        let hinter = SpectralHinter::new(1500);
        let hint = hinter.hint(&sine(440.0, 16_000, 1500), 16_000);
        assert!((hint - 440.0).abs() < 16.0, "got {hint}");
    }
}
