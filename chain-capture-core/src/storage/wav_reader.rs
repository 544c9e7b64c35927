use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::models::error::CaptureError;
use crate::processing::pcm;

/// Read a PCM WAV file as `(sample_rate, mono samples)`.
///
/// 16-bit integer and 32-bit float files are accepted; multi-channel files
/// are averaged down to mono.
pub fn read_wav(path: &Path) -> Result<(u32, Vec<f32>), CaptureError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| CaptureError::IoFailure(format!("failed to open {}: {}", path.display(), e)))?;
    let spec = reader.spec();
    log::debug!(
        "Reading WAV {}: {} Hz, {} channels, {} bits",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(pcm::from_i16))
            .collect::<Result<Vec<f32>, _>>(),
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<f32>, _>>(),
        (format, bits) => {
            return Err(CaptureError::IoFailure(format!(
                "unsupported wav encoding: {format:?} {bits}-bit"
            )))
        }
    }
    .map_err(|e| CaptureError::IoFailure(format!("failed to read samples: {}", e)))?;

    Ok((spec.sample_rate, pcm::downmix_to_mono(&samples, spec.channels as usize)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::wav_writer::write_wav;
    use approx::assert_abs_diff_eq;
    use std::fs;

    fn temp_file_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("chain_capture_reader_{}_{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn reads_back_written_file() {
        let path = temp_file_path("roundtrip.wav");
        let samples: Vec<f32> = (0..1600).map(|i| ((i % 50) as f32 / 50.0) - 0.5).collect();
        write_wav(&path, &samples, 16000, 16).unwrap();

        let (rate, decoded) = read_wav(&path).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in decoded.iter().zip(&samples) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1.0 / 16000.0);
        }
        fs::remove_file(&path).ok();
    }

    #[test]
    fn stereo_float_is_downmixed() {
        let path = temp_file_path("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (l, r) in [(0.2f32, 0.4f32), (-0.5, 0.5)] {
            writer.write_sample(l).unwrap();
            writer.write_sample(r).unwrap();
        }
        writer.finalize().unwrap();

        let (rate, decoded) = read_wav(&path).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(decoded.len(), 2);
        assert_abs_diff_eq!(decoded[0], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(decoded[1], 0.0, epsilon = 1e-6);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_io_failure() {
        let result = read_wav(&temp_file_path("missing.wav"));
        assert!(matches!(result, Err(CaptureError::IoFailure(_))));
    }
}
