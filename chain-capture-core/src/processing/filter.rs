//! Butterworth band-pass design and streaming application.
//!
//! The design follows the classic analog-prototype route: Butterworth low-pass
//! poles, low-pass → band-pass transform, then the bilinear transform. The
//! digital poles are grouped into second-order sections so the filter can run
//! sample by sample with its state carried from one block to the next.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::models::error::CaptureError;

/// Band-pass design parameters.
///
/// Invariant (checked by [`FilterSpec::validate`]): `0 < low_hz < high_hz < sample_rate / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: u32,
    pub sample_rate: f64,
}

impl FilterSpec {
    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(CaptureError::InvalidFilterSpec(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.order == 0 {
            return Err(CaptureError::InvalidFilterSpec("order must be at least 1".into()));
        }
        let nyquist = self.nyquist();
        let ordered = self.low_hz > 0.0 && self.low_hz < self.high_hz && self.high_hz < nyquist;
        if !ordered {
            return Err(CaptureError::InvalidFilterSpec(format!(
                "cutoffs must satisfy 0 < low ({}) < high ({}) < nyquist ({})",
                self.low_hz, self.high_hz, nyquist
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * y + self.z2;
        self.z2 = self.b2 * input - self.a2 * y;
        y
    }

    fn clear(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Causal Butterworth band-pass filter with persistent state.
///
/// Coefficients are computed once per [`FilterSpec`]. Each call to
/// [`process_block`](Self::process_block) continues the same stream, so
/// consecutive blocks filter exactly like one long signal.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    sections: Vec<Biquad>,
}

impl BandpassFilter {
    pub fn new(spec: FilterSpec) -> Result<Self, CaptureError> {
        spec.validate()?;
        let sections = design_sections(&spec);
        log::debug!(
            "Designed band-pass {}-{} Hz, order {} at {} Hz ({} sections)",
            spec.low_hz,
            spec.high_hz,
            spec.order,
            spec.sample_rate,
            sections.len()
        );
        Ok(Self { sections })
    }

    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let mut value = sample as f64;
        for section in &mut self.sections {
            value = section.process(value);
        }
        value as f32
    }

    /// Filter one block. Output has the same length and timebase as the input.
    pub fn process_block(&mut self, block: &[f32]) -> Vec<f32> {
        block.iter().map(|&s| self.process_sample(s)).collect()
    }

    /// Forget all past input, as if the stream had just started.
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.clear();
        }
    }
}

/// Filter a complete signal from rest in one call.
pub fn filter_signal(spec: FilterSpec, samples: &[f32]) -> Result<Vec<f32>, CaptureError> {
    let mut filter = BandpassFilter::new(spec)?;
    Ok(filter.process_block(samples))
}

fn design_sections(spec: &FilterSpec) -> Vec<Biquad> {
    let order = spec.order as usize;
    // Bilinear transform on a normalised clock (fs = 2), so 2 * fs = 4.
    let fs2 = 4.0;
    let warp = |hz: f64| fs2 * (PI * hz / spec.sample_rate).tan();
    let low = warp(spec.low_hz);
    let high = warp(spec.high_hz);
    let bandwidth = high - low;
    let center_sq = low * high;

    let mut digital_poles = Vec::with_capacity(2 * order);
    let mut pole_product = Complex64::new(1.0, 0.0);
    for k in 0..order {
        let m = 2.0 * k as f64 + 1.0 - order as f64;
        let prototype = -Complex64::from_polar(1.0, PI * m / (2.0 * order as f64));
        let scaled = prototype * (bandwidth / 2.0);
        let offset = (scaled * scaled - center_sq).sqrt();
        for analog in [scaled + offset, scaled - offset] {
            let fs = Complex64::new(fs2, 0.0);
            pole_product *= fs - analog;
            digital_poles.push((fs + analog) / (fs - analog));
        }
    }

    // N analog zeros at the origin map to z = 1; the N zeros at infinity map to z = -1.
    let gain = bandwidth.powi(order as i32) * fs2.powi(order as i32) / pole_product.re;

    let tolerance = 1e-12;
    let mut real_poles: Vec<f64> = Vec::new();
    let mut denominators: Vec<(f64, f64)> = Vec::with_capacity(order);
    for pole in &digital_poles {
        if pole.im > tolerance {
            denominators.push((-2.0 * pole.re, pole.norm_sqr()));
        } else if pole.im.abs() <= tolerance {
            real_poles.push(pole.re);
        }
    }
    // Real poles always come in pairs: one per real prototype pole.
    real_poles.sort_by(f64::total_cmp);
    for pair in real_poles.chunks(2) {
        if let [a, b] = pair {
            denominators.push((-(a + b), a * b));
        } else {
            denominators.push((-pair[0], 0.0));
        }
    }

    let section_gain = gain.abs().powf(1.0 / denominators.len().max(1) as f64);
    denominators
        .into_iter()
        .enumerate()
        .map(|(i, (a1, a2))| {
            let g = if i == 0 {
                section_gain * gain.signum()
            } else {
                section_gain
            };
            Biquad {
                b0: g,
                b1: 0.0,
                b2: -g,
                a1,
                a2,
                ..Default::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn chain_spec(sample_rate: f64) -> FilterSpec {
        FilterSpec {
            low_hz: 20.0,
            high_hz: 1000.0,
            order: 5,
            sample_rate,
        }
    }

    fn tone(freq: f64, amplitude: f64, sample_rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate).sin()) as f32)
            .collect()
    }

    fn rms(samples: &[f32]) -> f64 {
        (samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
    }

    #[test]
    fn valid_cutoffs_construct() {
        for sample_rate in [8000.0, 16000.0, 44100.0, 48000.0] {
            let nyquist = sample_rate / 2.0;
            for (low, high) in [(20.0, 1000.0), (1.0, nyquist - 1.0), (100.0, 200.0), (nyquist * 0.1, nyquist * 0.9)] {
                for order in [1, 2, 5, 8] {
                    let spec = FilterSpec { low_hz: low, high_hz: high, order, sample_rate };
                    let mut filter = BandpassFilter::new(spec)
                        .unwrap_or_else(|e| panic!("{spec:?} should construct: {e}"));
                    let out = filter.process_block(&tone(low.max(high / 2.0), 0.5, sample_rate, 256));
                    assert!(out.iter().all(|s| s.is_finite()));
                }
            }
        }
    }

    #[test]
    fn invalid_cutoffs_rejected() {
        let base = chain_spec(16000.0);
        let cases = [
            FilterSpec { low_hz: 1000.0, high_hz: 1000.0, ..base },
            FilterSpec { low_hz: 1000.0, high_hz: 20.0, ..base },
            FilterSpec { high_hz: 8000.0, ..base },
            FilterSpec { high_hz: 9000.0, ..base },
            FilterSpec { low_hz: 0.0, ..base },
            FilterSpec { low_hz: -5.0, ..base },
            FilterSpec { low_hz: f64::NAN, ..base },
            FilterSpec { order: 0, ..base },
            FilterSpec { sample_rate: 0.0, ..base },
        ];
        for spec in cases {
            assert!(
                matches!(BandpassFilter::new(spec), Err(CaptureError::InvalidFilterSpec(_))),
                "{spec:?} should be rejected"
            );
        }
    }

    #[test]
    fn passband_tone_keeps_amplitude() {
        let sample_rate = 16000.0;
        let input = tone(500.0, 0.5, sample_rate, 32000);
        let output = filter_signal(chain_spec(sample_rate), &input).unwrap();
        // Skip the start-up transient.
        let ratio = rms(&output[16000..]) / rms(&input[16000..]);
        assert!((0.95..1.05).contains(&ratio), "passband gain {ratio}");
    }

    #[test]
    fn stopband_tone_is_attenuated() {
        let sample_rate = 16000.0;
        let input = tone(4000.0, 0.5, sample_rate, 16000);
        let output = filter_signal(chain_spec(sample_rate), &input).unwrap();
        let ratio = rms(&output[8000..]) / rms(&input[8000..]);
        assert!(ratio < 0.01, "stopband gain {ratio}");
    }

    #[test]
    fn dc_is_removed() {
        let input = vec![0.25f32; 48000];
        let output = filter_signal(chain_spec(16000.0), &input).unwrap();
        assert!(output[40000..].iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn blockwise_matches_one_shot() {
        let sample_rate = 16000.0;
        let input = tone(300.0, 0.4, sample_rate, 4000);
        let whole = filter_signal(chain_spec(sample_rate), &input).unwrap();

        let mut filter = BandpassFilter::new(chain_spec(sample_rate)).unwrap();
        let mut pieces = Vec::new();
        for chunk in input.chunks(333) {
            pieces.extend(filter.process_block(chunk));
        }

        assert_eq!(pieces.len(), whole.len());
        for (a, b) in pieces.iter().zip(&whole) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn single_sample_block() {
        let mut filter = BandpassFilter::new(chain_spec(16000.0)).unwrap();
        let out = filter.process_block(&[1.0]);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_finite());
        assert!(filter.process_block(&[]).is_empty());
    }

    #[test]
    fn reset_restarts_the_stream() {
        let input = tone(200.0, 0.3, 16000.0, 500);
        let mut filter = BandpassFilter::new(chain_spec(16000.0)).unwrap();
        let first = filter.process_block(&input);
        filter.reset();
        let second = filter.process_block(&input);
        assert_eq!(first, second);
    }
}
