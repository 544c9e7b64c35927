//! Time/frequency views handed to shells for plotting.

use crate::models::audio_models::{DisplayFrame, LevelReading};
use crate::processing::spectrum::SpectrumAnalyzer;

/// Evenly spaced timestamps ending at `elapsed_secs`.
///
/// `n` points from `elapsed_secs - n / sample_rate` to `elapsed_secs`, both
/// inclusive, so the newest sample lines up with the time since start.
pub fn time_axis(n: usize, sample_rate: u32, elapsed_secs: f64) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![elapsed_secs],
        _ => {
            let span = if sample_rate == 0 {
                0.0
            } else {
                n as f64 / sample_rate as f64
            };
            let start = elapsed_secs - span;
            let step = span / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Build a frame from a sample window: time axis, band-limited spectrum and level.
pub fn render_frame(
    analyzer: &mut SpectrumAnalyzer,
    samples: Vec<f32>,
    sample_rate: u32,
    elapsed_secs: f64,
    band: (f64, f64),
    level: LevelReading,
) -> DisplayFrame {
    let spectrum = analyzer.analyze(&samples, sample_rate, band.0, band.1);
    DisplayFrame {
        elapsed_secs,
        time_axis: time_axis(samples.len(), sample_rate, elapsed_secs),
        samples,
        spectrum,
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::spectrum::LIVE_BAND_HZ;
    use approx::assert_abs_diff_eq;

    #[test]
    fn axis_ends_at_elapsed_time() {
        let axis = time_axis(16000, 16000, 2.5);
        assert_eq!(axis.len(), 16000);
        assert_abs_diff_eq!(axis[0], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(*axis.last().unwrap(), 2.5, epsilon = 1e-9);
        assert!(axis.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn axis_degenerate_lengths() {
        assert!(time_axis(0, 16000, 1.0).is_empty());
        assert_eq!(time_axis(1, 16000, 1.0), vec![1.0]);
        assert_eq!(time_axis(2, 4, 1.0), vec![0.5, 1.0]);
    }

    #[test]
    fn frame_uses_requested_band() {
        let mut analyzer = SpectrumAnalyzer::new();
        let frame = render_frame(&mut analyzer, vec![0.1; 1600], 16000, 0.1, LIVE_BAND_HZ, LevelReading { db: 42.0 });
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.time_axis.len(), 1600);
        assert_eq!(frame.level.db, 42.0);
        assert!(frame.spectrum.bins.iter().all(|b| b.frequency_hz >= 100.0 && b.frequency_hz <= 3000.0));
    }
}
