pub mod http_uploader;

use std::time::Duration;

/// Edge Impulse training-data ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://ingestion.edgeimpulse.com/api/training/files";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how long to try when uploading a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
