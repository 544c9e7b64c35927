use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::DisplayFrame;
use super::config::FilterBand;

/// Result returned when a recording session stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    /// `None` when nothing was captured and no file was written.
    pub file_path: Option<PathBuf>,
    pub duration_secs: f64,
    pub total_samples: usize,
    pub sample_rate: u32,
    /// Whole-recording view over the [0, 3000] Hz band.
    pub final_frame: DisplayFrame,
    pub metadata: Option<RecordingMetadata>,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub label: String,
    pub file_path: String,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub total_samples: usize,
    pub duration_secs: f64,
    pub filter: FilterBand,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new_mono(
        label: &str,
        file_path: &str,
        sample_rate: u32,
        total_samples: usize,
        filter: FilterBand,
        checksum: &str,
    ) -> Self {
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            total_samples as f64 / sample_rate as f64
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.to_string(),
            file_path: file_path.to_string(),
            sample_rate,
            bits_per_sample: 16,
            total_samples,
            duration_secs,
            filter,
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
