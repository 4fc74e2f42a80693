//! PCM data records and audio errors.

use std::time::Duration;

/// Capture format. Samples are always signed 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per PCM block
    pub block_size: usize,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Interleaved samples in one block.
    pub fn samples_per_block(&self) -> usize {
        self.block_size * self.channels as usize
    }

    /// Wall-clock length of one block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}

impl Default for AudioFormat {
    /// 44.1 kHz mono, 1024-frame blocks.
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            block_size: 1024,
        }
    }
}

/// One block of interleaved 16-bit samples, in capture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmChunk {
    samples: Vec<i16>,
}

impl PcmChunk {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Append-only sequence of PCM blocks for one recording.
///
/// Owned by the capture worker while it runs and handed back on join, so
/// it is never shared between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    format: AudioFormat,
    chunks: Vec<PcmChunk>,
}

impl AudioBuffer {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            chunks: Vec::new(),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn push(&mut self, chunk: PcmChunk) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[PcmChunk] {
        &self.chunks
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of all block lengths, in samples.
    pub fn total_samples(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    /// Captured audio length.
    pub fn duration(&self) -> Duration {
        let frames = self.total_samples() / self.format.channels.max(1) as u64;
        Duration::from_secs_f64(frames as f64 / self.format.sample_rate as f64)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// Errors from the microphone, the capture worker, or the WAV writer.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio input device available")]
    NoInputDevice,
    #[error("audio input device '{0}' not found")]
    DeviceNotFound(String),
    #[error("audio device does not support {0}")]
    UnsupportedConfig(String),
    #[error("failed to start audio stream: {0}")]
    StreamFailed(String),
    #[error("audio read failed: {0}")]
    ReadFailed(String),
    #[error("no audio data for {0:?}")]
    Timeout(Duration),
    #[error("audio stream closed")]
    Disconnected,
    #[error("audio capture thread panicked")]
    WorkerPanicked,
    #[error("failed to write WAV file: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
