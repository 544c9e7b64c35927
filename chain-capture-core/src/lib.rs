//! # chain-capture-core
//!
//! Platform-agnostic acquisition pipeline for bicycle-chain sound recordings.
//!
//! Provides band-pass filtering, level and spectrum estimation, sample
//! buffering, WAV I/O, upload, and session orchestration. Audio backends
//! (cpal in `chain-capture-cpal`) implement the `CaptureProvider` trait and
//! plug into the generic `AcquisitionSession`.
//!
//! ## Architecture
//!
//! ```text
//! chain-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureDelegate, Uploader
//! ├── models/       ← CaptureError, CaptureState, SessionConfig, DisplayFrame, etc.
//! ├── processing/   ← BandpassFilter, LevelEstimator, SpectrumAnalyzer, CaptureBuffer, WAV header
//! ├── session/      ← AcquisitionSession (generic orchestrator), display frames
//! ├── storage/      ← PcmFileWriter, WAV reader, metadata sidecar
//! └── upload/       ← HttpUploader (multipart POST)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;
pub mod upload;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioSource, CaptureSessionDiagnostics, DisplayFrame, LevelReading, SampleBlock, SpectrumBin, SpectrumView,
    StreamFormat, StreamStatus,
};
pub use models::config::{parse_positive, FilterBand, SessionConfig};
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::capture_buffer::CaptureBuffer;
pub use processing::filter::{filter_signal, BandpassFilter, FilterSpec};
pub use processing::level::LevelEstimator;
pub use processing::spectrum::{SpectrumAnalyzer, FULL_BAND_HZ, LIVE_BAND_HZ};
pub use session::acquisition::AcquisitionSession;
pub use storage::wav_reader::read_wav;
pub use storage::wav_writer::{write_wav, PcmFileWriter};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
pub use traits::uploader::Uploader;
pub use upload::http_uploader::HttpUploader;
pub use upload::UploadConfig;
