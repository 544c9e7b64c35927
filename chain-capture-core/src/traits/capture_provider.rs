use std::sync::Arc;

use crate::models::audio_models::{AudioSource, StreamFormat, StreamStatus};
use crate::models::error::CaptureError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: mono f32 samples for this block.
/// - `frame_count`: number of frames delivered (equals `samples.len()` for mono).
/// - `status`: driver status; anything but `Clear` is a warning, and a
///   warning may arrive with an empty block.
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], usize, &StreamStatus) + Send + Sync + 'static>;

/// Interface for audio input streams.
///
/// Implemented by `CpalMicCapture` in the `chain-capture-cpal` crate and by
/// in-memory providers in tests.
pub trait CaptureProvider: Send {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Open and start a stream in `format`, delivering blocks via `callback`.
    ///
    /// The callback fires on the driver's thread, so keep processing minimal.
    /// Failure to open maps to `CaptureError::DeviceUnavailable`.
    fn start(&mut self, format: StreamFormat, callback: AudioBufferCallback) -> Result<(), CaptureError>;

    /// Stop the stream and release it. No callback runs after this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Information about the audio device backing this provider.
    fn device_info(&self) -> AudioSource;
}
