use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use crate::processing::filter::FilterSpec;

/// File the recording is flushed to when no other path is configured.
pub const DEFAULT_OUTPUT_FILE: &str = "gear2.wav";

/// Band-pass corner frequencies and order, independent of the sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterBand {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: u32,
}

impl Default for FilterBand {
    /// Mechanical chain noise sits between 20 Hz and 1 kHz.
    fn default() -> Self {
        Self {
            low_hz: 20.0,
            high_hz: 1000.0,
            order: 5,
        }
    }
}

/// Configuration for one recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Capture sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Display tick period in milliseconds (default: 50).
    pub update_interval_ms: u64,

    /// Band-pass applied to every captured block.
    pub filter: FilterBand,

    /// Bit depth of the persisted PCM file. Only 16 is supported.
    pub bits_per_sample: u16,

    /// Where the recording is flushed on stop.
    pub output_path: PathBuf,

    /// Free-form label stored in the metadata sidecar and used for upload.
    pub label: String,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::InvalidParameter(
                "sample rate must be a positive integer".into(),
            ));
        }
        if self.update_interval_ms == 0 {
            return Err(CaptureError::InvalidParameter(
                "update interval must be a positive integer".into(),
            ));
        }
        if self.bits_per_sample != 16 {
            return Err(CaptureError::InvalidParameter(format!(
                "unsupported bit depth: {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    /// The filter spec for this session's sample rate. Not validated here.
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            low_hz: self.filter.low_hz,
            high_hz: self.filter.high_hz,
            order: self.filter.order,
            sample_rate: self.sample_rate as f64,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            update_interval_ms: 50,
            filter: FilterBand::default(),
            bits_per_sample: 16,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            label: "recording".into(),
        }
    }
}

/// Parse a text field as a strictly positive integer.
///
/// Used by shells that collect parameters as free text.
pub fn parse_positive(field: &str, text: &str) -> Result<u32, CaptureError> {
    let value: i64 = text.trim().parse().map_err(|_| {
        CaptureError::InvalidParameter(format!("{field} must be a positive integer, got {text:?}"))
    })?;
    if value <= 0 {
        return Err(CaptureError::InvalidParameter(format!(
            "{field} must be a positive integer, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| CaptureError::InvalidParameter(format!("{field} is too large: {value}")))
}
