use crate::models::audio_models::{DisplayFrame, StreamStatus};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Event delegate for acquisition session notifications.
///
/// Frame and warning notifications arrive on the display-tick thread; state
/// and completion notifications arrive on the thread calling the session.
/// Never called from the capture callback.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called on every display tick with the trailing one-second view.
    fn on_display_frame(&self, frame: &DisplayFrame);

    /// Called when the input stream reported a non-clear status since the last tick.
    fn on_stream_warning(&self, status: &StreamStatus);

    /// Called when an error occurs during capture or flush.
    fn on_error(&self, error: &CaptureError);

    /// Called when recording stops and the file has been flushed.
    fn on_capture_finished(&self, result: &RecordingResult);
}
