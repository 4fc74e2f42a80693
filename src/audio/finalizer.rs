//! WAV serialization of a finished recording.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::types::{AudioBuffer, AudioError, AudioFormat};

/// Writes a captured [`AudioBuffer`] to a playable file.
pub trait AudioFinalizer {
    /// Serialize every block in order. Returns the number of samples written.
    fn write_all(&self, path: &Path, buffer: &AudioBuffer) -> Result<u64, AudioError>;
}

/// 16-bit PCM WAV via hound. No resampling, no gap filling.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavFinalizer;

impl WavFinalizer {
    fn spec(format: AudioFormat) -> WavSpec {
        WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        }
    }
}

impl AudioFinalizer for WavFinalizer {
    fn write_all(&self, path: &Path, buffer: &AudioBuffer) -> Result<u64, AudioError> {
        let mut writer = WavWriter::create(path, Self::spec(buffer.format()))?;
        let mut written = 0u64;
        for chunk in buffer.chunks() {
            for &sample in chunk.samples() {
                writer.write_sample(sample)?;
            }
            written += chunk.len() as u64;
        }
        writer.finalize()?;

        log::info!(
            "Wrote {} ({} samples, {:.2}s)",
            path.display(),
            written,
            buffer.duration().as_secs_f64()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmChunk;

    #[test]
    fn test_wav_header_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");

        let mut buffer = AudioBuffer::new(AudioFormat::default());
        buffer.push(PcmChunk::new(vec![100; 1024]));
        buffer.push(PcmChunk::new(vec![-100; 1024]));

        let written = WavFinalizer.write_all(&path, &buffer).unwrap();
        assert_eq!(written, 2048);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 2048);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert!(samples[..1024].iter().all(|&s| s == 100));
        assert!(samples[1024..].iter().all(|&s| s == -100));
    }

    #[test]
    fn test_empty_buffer_writes_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        let buffer = AudioBuffer::new(AudioFormat::default());

        assert_eq!(WavFinalizer.write_all(&path, &buffer).unwrap(), 0);
        assert_eq!(hound::WavReader::open(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("audio.wav");
        let buffer = AudioBuffer::new(AudioFormat::default());
        assert!(WavFinalizer.write_all(&path, &buffer).is_err());
    }
}
