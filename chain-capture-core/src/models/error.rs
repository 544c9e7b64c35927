use thiserror::Error;

/// Errors that can occur while capturing, analysing, persisting or uploading audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Non-positive sample rate, update interval or other user-supplied value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filter cutoffs violate `0 < low < high < sample_rate / 2`.
    #[error("invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("i/o failure: {0}")]
    IoFailure(String),

    #[error("upload failed: {0}")]
    UploadFailure(String),

    /// Operation not permitted in the current session state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}
