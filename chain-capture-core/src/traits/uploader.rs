use std::path::Path;

use crate::models::error::CaptureError;

/// Sends a finished recording to a remote ingestion service.
///
/// Implementations own their timeout and must never be invoked from the
/// capture or display paths. Failures are reported, never retried.
pub trait Uploader: Send + Sync {
    /// Upload `file_path` tagged with `label`, authenticating with `credential`.
    ///
    /// `Ok` carries the success message; failures are `CaptureError::UploadFailure`
    /// with the response detail.
    fn upload(&self, file_path: &Path, label: &str, credential: &str) -> Result<String, CaptureError>;
}
