//! # chain-capture-cpal
//!
//! Cross-platform audio backend for chain-capture, built on cpal.
//!
//! Provides:
//! - `CpalMicCapture`: microphone capture implementing `CaptureProvider`
//! - `CpalPlayback`: blocking playback on the default output device
//! - `DeviceEnumerator`: input device listing and lookup
//!
//! ## Usage
//! ```ignore
//! use chain_capture_core::{AcquisitionSession, SessionConfig};
//! use chain_capture_cpal::CpalMicCapture;
//!
//! let mic = CpalMicCapture::default_device();
//! let mut session = AcquisitionSession::new(mic, SessionConfig::default());
//! session.start_recording()?;
//! ```

pub mod cpal_mic;
pub mod device_enumerator;
pub mod playback;

pub use cpal_mic::CpalMicCapture;
pub use device_enumerator::DeviceEnumerator;
pub use playback::CpalPlayback;
