//! RIFF/WAVE header for linear PCM.
//!
//! Layout of the 44-byte header:
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    36 + data_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * bits / 8
//! [32-33]  block_align = channels * bits / 8
//! [34-35]  bits_per_sample
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use crate::models::error::CaptureError;

pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size field.
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Mono 16-bit header with an empty data chunk, to be patched on close.
    pub fn mono_pcm16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            bits_per_sample: 16,
            channels: 1,
            data_size: 0,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// `None` when the rate does not fit the 32-bit header field.
    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(u32::from(self.block_align()))
    }

    pub fn riff_size(&self) -> u32 {
        36 + self.data_size
    }

    pub fn encode(&self) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
        let byte_rate = self.byte_rate().ok_or_else(|| {
            CaptureError::InvalidParameter(format!(
                "sample rate {} Hz is too high for a WAV header",
                self.sample_rate
            ))
        })?;
        let mut header = [0u8; WAV_HEADER_SIZE];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_size().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        Ok(header)
    }
}
