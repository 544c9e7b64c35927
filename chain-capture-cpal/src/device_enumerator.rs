//! Input device enumeration via the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};

use chain_capture_core::models::audio_models::AudioSource;
use chain_capture_core::models::error::CaptureError;

/// Lists and resolves input devices on the default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input (microphone) devices. The default device is flagged.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_capture_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to list input devices: {}", e)))?;

        let mut sources = Vec::new();
        for device in devices {
            let Ok(name) = device.name() else {
                continue;
            };
            sources.push(AudioSource {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            });
        }
        Ok(sources)
    }

    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Resolve a device by exact name, or the default input when `name` is `None`.
    pub fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        match name {
            Some(name) => {
                let mut devices = self
                    .host
                    .input_devices()
                    .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to list input devices: {}", e)))?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| CaptureError::DeviceUnavailable(format!("input device '{}' not found", name)))
            }
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into())),
        }
    }

    pub fn default_output_device(&self) -> Result<cpal::Device, CaptureError> {
        self.host
            .default_output_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default output device".into()))
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
