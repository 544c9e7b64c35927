use crate::models::audio_models::LevelReading;

/// Standard acoustic reference pressure (20 µPa).
pub const REFERENCE_PRESSURE: f64 = 20e-6;

/// RMS-derived sound-pressure-level estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelEstimator;

impl LevelEstimator {
    /// `20 * log10(rms / 20e-6)`, or exactly 0 dB when the RMS is zero.
    pub fn estimate(samples: &[f32]) -> LevelReading {
        let rms = Self::rms(samples);
        if rms <= 0.0 {
            return LevelReading { db: 0.0 };
        }
        LevelReading {
            db: 20.0 * (rms / REFERENCE_PRESSURE).log10(),
        }
    }

    /// Root-mean-square amplitude. Empty input yields 0.
    pub fn rms(samples: &[f32]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let energy: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (energy / samples.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn silence_is_zero_db() {
        assert_eq!(LevelEstimator::estimate(&[0.0; 512]).db, 0.0);
        assert_eq!(LevelEstimator::estimate(&[]).db, 0.0);
    }

    #[test]
    fn full_scale_constant() {
        // 1.0 / 20e-6 = 50000 → 20 * log10(50000)
        let reading = LevelEstimator::estimate(&[1.0; 64]);
        assert_relative_eq!(reading.db, 93.979_400_086_720_38, epsilon = 1e-9);
    }

    #[test]
    fn level_increases_with_amplitude() {
        let mut previous = f64::NEG_INFINITY;
        for amplitude in [1e-6f32, 1e-4, 0.01, 0.1, 0.5, 1.0] {
            let db = LevelEstimator::estimate(&[amplitude; 128]).db;
            assert!(db > previous, "{amplitude} gave {db}, previous {previous}");
            previous = db;
        }
    }

    #[test]
    fn sign_does_not_matter() {
        let positive = LevelEstimator::estimate(&[0.3; 10]);
        let negative = LevelEstimator::estimate(&[-0.3; 10]);
        assert_eq!(positive, negative);
    }

    #[test]
    fn single_sample() {
        let reading = LevelEstimator::estimate(&[0.02]);
        assert_relative_eq!(reading.db, 60.0, epsilon = 1e-5);
    }
}
