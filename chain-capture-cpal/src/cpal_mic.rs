//! cpal microphone capture provider.
//!
//! Opens an input stream at the requested sample rate and delivers mono f32
//! blocks via the `AudioBufferCallback`. The `cpal::Stream` is not `Send` on
//! every host, so it lives on a dedicated thread for its whole lifetime.

use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Sender};

use chain_capture_core::models::audio_models::{AudioSource, StreamFormat, StreamStatus};
use chain_capture_core::models::error::CaptureError;
use chain_capture_core::processing::pcm;
use chain_capture_core::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

use crate::device_enumerator::DeviceEnumerator;

/// Handle to the thread that owns the open stream.
struct StreamThread {
    stop_tx: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// cpal microphone capture.
///
/// Blocks arrive on cpal's callback thread; stream errors are forwarded as
/// [`StreamStatus::Warning`] with an empty block.
pub struct CpalMicCapture {
    device_name: Option<String>,
    is_default: bool,
    stream_thread: Option<StreamThread>,
}

impl CpalMicCapture {
    /// Create a capture for the system default microphone.
    pub fn default_device() -> Self {
        Self {
            device_name: None,
            is_default: true,
            stream_thread: None,
        }
    }

    /// Create a capture for a specific microphone by device name.
    pub fn with_device(name: String) -> Self {
        Self {
            device_name: Some(name),
            is_default: false,
            stream_thread: None,
        }
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .find_input_device(self.device_name.as_deref())
            .is_ok()
    }

    fn start(&mut self, format: StreamFormat, callback: AudioBufferCallback) -> Result<(), CaptureError> {
        if self.stream_thread.is_some() {
            return Err(CaptureError::InvalidState("mic capture already running".into()));
        }

        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let device_name = self.device_name.clone();

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = match open_input_stream(device_name.as_deref(), format, callback) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Hold the stream open until stop() (or the handle is dropped).
                let _ = stop_rx.recv();
                if let Err(e) = stream.pause() {
                    log::debug!("Failed to pause input stream: {}", e);
                }
                drop(stream);
            })
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to spawn mic thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.stream_thread = Some(StreamThread { stop_tx, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::DeviceUnavailable("mic thread exited before opening the stream".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(StreamThread { stop_tx, handle }) = self.stream_thread.take() {
            let _ = stop_tx.send(());
            handle
                .join()
                .map_err(|_| CaptureError::DeviceUnavailable("mic thread panicked".into()))?;
        }
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        let name = self
            .device_name
            .clone()
            .or_else(|| DeviceEnumerator::new().default_capture_device_name())
            .unwrap_or_else(|| "Default Microphone".into());
        AudioSource {
            id: self.device_name.clone().unwrap_or_else(|| "default-mic".into()),
            name,
            is_default: self.is_default,
        }
    }
}

impl Drop for CpalMicCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Open and start an input stream.
///
/// Tries a mono stream at the requested rate first, then the device's own
/// channel count at the same rate, downmixing each block to mono.
fn open_input_stream(
    device_name: Option<&str>,
    format: StreamFormat,
    callback: AudioBufferCallback,
) -> Result<cpal::Stream, CaptureError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let label = device.name().unwrap_or_else(|_| "unknown input device".to_string());

    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {}", label, e)))?;
    let sample_format = default_config.sample_format();
    let native_channels = default_config.channels();

    let candidates = channel_candidates(format.channels, native_channels);
    let (stream, channels) = open_first(&candidates, |channels| {
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };
        log::debug!(
            "Opening '{}': format={:?} sample_rate={}Hz channels={}",
            label,
            sample_format,
            format.sample_rate,
            channels
        );
        let stream = build_stream(&device, &config, sample_format, callback.clone())?;
        stream.play().map_err(|e| format!("failed to start: {}", e))?;
        Ok(stream)
    })
    .map_err(|e| {
        CaptureError::DeviceUnavailable(format!(
            "'{}' cannot capture at {} Hz: {}",
            label, format.sample_rate, e
        ))
    })?;

    log::info!(
        "Input stream open on '{}' at {} Hz ({} channel(s))",
        label,
        format.sample_rate,
        channels
    );
    Ok(stream)
}

/// Channel counts to try, in order: the requested count, then the device's own.
fn channel_candidates(requested: u16, native: u16) -> Vec<u16> {
    let mut candidates = vec![requested.max(1)];
    let native = native.max(1);
    if !candidates.contains(&native) {
        candidates.push(native);
    }
    candidates
}

/// Run `open` for each channel count until one succeeds.
///
/// A failure at any stage (build or start) moves on to the next candidate.
fn open_first<S>(
    candidates: &[u16],
    mut open: impl FnMut(u16) -> Result<S, String>,
) -> Result<(S, u16), String> {
    let mut last_error = String::from("no channel configuration to try");
    for &channels in candidates {
        match open(channels) {
            Ok(stream) => return Ok((stream, channels)),
            Err(e) => {
                log::debug!("{} channel(s) rejected: {}", channels, e);
                last_error = e;
            }
        }
    }
    Err(last_error)
}

/// Convert every supported sample type to f32 up front so the pipeline stays format-agnostic.
fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    callback: AudioBufferCallback,
) -> Result<cpal::Stream, String> {
    match sample_format {
        SampleFormat::F32 => build_typed_stream::<f32>(device, config, callback, |s| s),
        SampleFormat::I16 => build_typed_stream::<i16>(device, config, callback, pcm::from_i16),
        SampleFormat::U16 => build_typed_stream::<u16>(device, config, callback, |s| {
            (s as f32 - 32_768.0) / 32_768.0
        }),
        other => Err(format!("unsupported sample format: {:?}", other)),
    }
}

fn build_typed_stream<T: SizedSample + 'static>(
    device: &cpal::Device,
    config: &StreamConfig,
    callback: AudioBufferCallback,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream, String> {
    let channels = usize::from(config.channels.max(1));
    let error_callback = callback.clone();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let interleaved: Vec<f32> = data.iter().map(|&s| convert(s)).collect();
                let mono = pcm::downmix_to_mono(&interleaved, channels);
                callback(&mono, mono.len(), &StreamStatus::Clear);
            },
            move |err| {
                log::warn!("Input stream error: {}", err);
                error_callback(&[], 0, &StreamStatus::Warning(err.to_string()));
            },
            None,
        )
        .map_err(|e| e.to_string())
}
