use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::processing::pcm;
use crate::processing::wav_format::{self, WavHeader};

/// Streaming mono 16-bit PCM WAV writer.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [raw 16-bit little-endian PCM data...]
/// ```
/// The header is written with a zero data size on create and patched by
/// [`finish`](Self::finish).
pub struct PcmFileWriter {
    file_path: PathBuf,
    file: BufWriter<File>,
    data_bytes: u64,
}

impl PcmFileWriter {
    pub fn create(file_path: PathBuf, sample_rate: u32, bits_per_sample: u16) -> Result<Self, CaptureError> {
        if bits_per_sample != 16 {
            return Err(CaptureError::InvalidParameter(format!(
                "unsupported bit depth: {bits_per_sample}"
            )));
        }
        if sample_rate == 0 {
            return Err(CaptureError::InvalidParameter("sample rate must be positive".into()));
        }
        let header = WavHeader::mono_pcm16(sample_rate).encode()?;

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::IoFailure(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&file_path)
            .map_err(|e| CaptureError::IoFailure(format!("failed to create {}: {}", file_path.display(), e)))?;
        let mut file = BufWriter::new(file);
        file.write_all(&header)
            .map_err(|e| CaptureError::IoFailure(format!("write failed: {}", e)))?;

        Ok(Self {
            file_path,
            file,
            data_bytes: 0,
        })
    }

    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        let bytes = pcm::to_pcm16_le(samples);
        self.file
            .write_all(&bytes)
            .map_err(|e| CaptureError::IoFailure(format!("write failed: {}", e)))?;
        self.data_bytes += bytes.len() as u64;
        Ok(())
    }

    /// Samples written so far.
    pub fn samples_written(&self) -> u64 {
        self.data_bytes / 2
    }

    /// Patch the header sizes, flush, and return the file's SHA-256 hex digest.
    pub fn finish(mut self) -> Result<String, CaptureError> {
        let data_size = u32::try_from(self.data_bytes)
            .ok()
            .filter(|size| *size <= u32::MAX - 36)
            .ok_or_else(|| CaptureError::IoFailure("recording exceeds the 4 GiB WAV limit".into()))?;

        let io_err = |e: std::io::Error| CaptureError::IoFailure(e.to_string());
        self.file
            .seek(SeekFrom::Start(wav_format::RIFF_SIZE_OFFSET))
            .map_err(io_err)?;
        self.file.write_all(&(36 + data_size).to_le_bytes()).map_err(io_err)?;
        self.file
            .seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET))
            .map_err(io_err)?;
        self.file.write_all(&data_size.to_le_bytes()).map_err(io_err)?;
        self.file.flush().map_err(io_err)?;
        drop(self.file);

        sha256_file(&self.file_path)
    }
}

/// Write `samples` as a complete mono PCM file. Returns the SHA-256 checksum.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, bits_per_sample: u16) -> Result<String, CaptureError> {
    let mut writer = PcmFileWriter::create(path.to_path_buf(), sample_rate, bits_per_sample)?;
    writer.write_samples(samples)?;
    writer.finish()
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data = fs::read(path)
        .map_err(|e| CaptureError::IoFailure(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}
