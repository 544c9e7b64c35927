use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// One driver-delivered chunk of mono samples, tagged with its sample rate.
///
/// Immutable once built; `CaptureBuffer` stores blocks in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Box<[f32]>,
    sample_rate: u32,
}

impl SampleBlock {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Deref for SampleBlock {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.samples
    }
}

/// Format requested from an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }
}

/// Status flag delivered alongside each captured block.
///
/// Anything other than `Clear` is surfaced as a warning, never as a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Clear,
    Warning(String),
}

impl StreamStatus {
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear)
    }
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Sound-pressure level in dB relative to 20 µPa.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelReading {
    pub db: f64,
}

/// One bin of a magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumBin {
    pub frequency_hz: f64,
    pub magnitude: f64,
}

/// Magnitude spectrum restricted to a display band, ordered by frequency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumView {
    pub bins: Vec<SpectrumBin>,
}

impl SpectrumView {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Bin with the largest magnitude.
    pub fn peak(&self) -> Option<SpectrumBin> {
        self.bins
            .iter()
            .copied()
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }
}

/// Everything a shell needs to redraw its time and frequency plots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayFrame {
    /// Seconds since recording started, aligned with the last sample.
    pub elapsed_secs: f64,
    pub time_axis: Vec<f64>,
    pub samples: Vec<f32>,
    pub spectrum: SpectrumView,
    pub level: LevelReading,
}

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Default)]
pub struct CaptureSessionDiagnostics {
    pub callback_count: u64,
    pub samples_total: u64,
    pub stream_warnings: u64,
    pub display_ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_exposes_samples_and_rate() {
        let block = SampleBlock::new(vec![0.1, 0.2, 0.3, 0.4], 4);
        assert_eq!(block.samples(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(block.len(), 4);
        assert_eq!(block.sample_rate(), 4);
    }

    #[test]
    fn spectrum_peak_picks_largest_magnitude() {
        let view = SpectrumView {
            bins: vec![
                SpectrumBin { frequency_hz: 100.0, magnitude: 1.0 },
                SpectrumBin { frequency_hz: 200.0, magnitude: 5.0 },
                SpectrumBin { frequency_hz: 300.0, magnitude: 2.0 },
            ],
        };
        assert_eq!(view.peak().unwrap().frequency_hz, 200.0);
        assert!(SpectrumView::default().peak().is_none());
    }
}
