//! Blocking playback of a mono recording on the default output device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Sender};

use chain_capture_core::models::error::CaptureError;
use chain_capture_core::processing::pcm;

use crate::device_enumerator::DeviceEnumerator;

/// Extra time allowed past the nominal clip length before giving up.
const PLAYBACK_GRACE: Duration = Duration::from_secs(2);

/// Plays recordings through the default output device.
#[derive(Default)]
pub struct CpalPlayback;

impl CpalPlayback {
    pub fn new() -> Self {
        Self
    }

    /// Play `samples` (mono, `sample_rate`) and block until they have been rendered.
    ///
    /// Samples are resampled to the device rate and copied to every output channel.
    pub fn play_blocking(&self, samples: &[f32], sample_rate: u32) -> Result<(), CaptureError> {
        if sample_rate == 0 {
            return Err(CaptureError::InvalidParameter("sample rate must be positive".into()));
        }
        if samples.is_empty() {
            return Ok(());
        }

        let device = DeviceEnumerator::new().default_output_device()?;
        let label = device.name().unwrap_or_else(|_| "unknown output device".to_string());
        let default_config = device
            .default_output_config()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {}", label, e)))?;
        let sample_format = default_config.sample_format();
        let config: StreamConfig = default_config.config();

        let device_rate = config.sample_rate.0;
        let clip = Arc::new(pcm::resample_linear(samples, sample_rate, device_rate));
        let (done_tx, done_rx) = bounded::<()>(1);

        log::info!(
            "Playing {} samples on '{}' at {} Hz ({} channel(s))",
            clip.len(),
            label,
            device_rate,
            config.channels
        );

        let stream = match sample_format {
            SampleFormat::F32 => build_output::<f32>(&device, &config, clip.clone(), done_tx, |s| s),
            SampleFormat::I16 => build_output::<i16>(&device, &config, clip.clone(), done_tx, pcm::to_i16),
            SampleFormat::U16 => build_output::<u16>(&device, &config, clip.clone(), done_tx, |s| {
                ((s.clamp(-1.0, 1.0) * 0.5 + 0.5) * 65535.0) as u16
            }),
            other => Err(CaptureError::DeviceUnavailable(format!(
                "unsupported output sample format: {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to start '{}': {}", label, e)))?;

        let nominal = Duration::from_secs_f64(clip.len() as f64 / device_rate.max(1) as f64);
        if done_rx.recv_timeout(nominal + PLAYBACK_GRACE).is_err() {
            log::warn!("Playback on '{}' did not finish in time", label);
        }
        // Let the device drain its last buffer.
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);
        Ok(())
    }
}

fn build_output<T: SizedSample + 'static>(
    device: &cpal::Device,
    config: &StreamConfig,
    clip: Arc<Vec<f32>>,
    done_tx: Sender<()>,
    convert: fn(f32) -> T,
) -> Result<cpal::Stream, CaptureError> {
    let channels = usize::from(config.channels.max(1));
    let position = AtomicUsize::new(0);
    let finished = AtomicBool::new(false);

    device
        .build_output_stream(
            config,
            move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut pos = position.load(Ordering::Relaxed);
                for frame in out.chunks_mut(channels) {
                    let value = match clip.get(pos) {
                        Some(&s) => convert(s),
                        None => convert(0.0),
                    };
                    for ch in frame.iter_mut() {
                        *ch = value;
                    }
                    pos += 1;
                }
                position.store(pos, Ordering::Relaxed);
                if pos >= clip.len() && !finished.swap(true, Ordering::Relaxed) {
                    let _ = done_tx.try_send(());
                }
            },
            |err| log::warn!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to open output stream: {}", e)))
}
