use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar path for a recording: `gear2.wav` → `gear2.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), CaptureError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::IoFailure(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| CaptureError::IoFailure(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| CaptureError::IoFailure(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::IoFailure(format!("failed to parse metadata: {}", e)))
}

/// Delete a recording and its sidecar. Missing files are not an error.
///
/// Returns whether the recording itself existed.
pub fn remove_recording(recording_path: &Path) -> Result<bool, CaptureError> {
    let existed = remove_if_present(recording_path)?;
    remove_if_present(&metadata_path(recording_path))?;
    Ok(existed)
}

fn remove_if_present(path: &Path) -> Result<bool, CaptureError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CaptureError::IoFailure(format!(
            "failed to delete {}: {}",
            path.display(),
            e
        ))),
    }
}
