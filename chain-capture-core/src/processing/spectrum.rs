use rustfft::{num_complex::Complex64, FftPlanner};

use crate::models::audio_models::{SpectrumBin, SpectrumView};

/// Display band for the live view, refreshed on every tick.
pub const LIVE_BAND_HZ: (f64, f64) = (100.0, 3000.0);

/// Display band for the whole-recording view produced on stop.
pub const FULL_BAND_HZ: (f64, f64) = (0.0, 3000.0);

/// Magnitude spectrum of a sample window.
///
/// Uses a rectangular window and unnormalised magnitudes `|X[k]|`. Any window
/// length is accepted; FFT plans are cached per length.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Spectrum of `samples` restricted to bins whose centre lies in `[band_lo, band_hi]`.
    ///
    /// Only non-negative frequencies are reported; for even lengths the
    /// Nyquist bin counts as negative and is left out.
    pub fn analyze(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        band_lo: f64,
        band_hi: f64,
    ) -> SpectrumView {
        let n = samples.len();
        if n == 0 || sample_rate == 0 {
            return SpectrumView::default();
        }

        let fft = self.planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex64> = samples
            .iter()
            .map(|&s| Complex64::new(s as f64, 0.0))
            .collect();
        fft.process(&mut buffer);

        let resolution = bin_width(n, sample_rate);
        let non_negative = (n - 1) / 2 + 1;
        let bins = buffer
            .iter()
            .take(non_negative)
            .enumerate()
            .filter_map(|(k, value)| {
                let frequency_hz = k as f64 * resolution;
                (frequency_hz >= band_lo && frequency_hz <= band_hi).then(|| SpectrumBin {
                    frequency_hz,
                    magnitude: value.norm(),
                })
            })
            .collect();

        SpectrumView { bins }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Frequency spacing between adjacent bins for an `n`-point transform.
pub fn bin_width(n: usize, sample_rate: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    sample_rate as f64 / n as f64
}
