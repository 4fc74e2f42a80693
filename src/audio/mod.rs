//! Microphone recording.
//!
//! - [`AudioProvider`] / [`AudioInput`]: the blocking device seam
//! - [`AudioCaptureWorker`]: reads fixed-size blocks on its own thread
//! - [`AudioFinalizer`] / [`WavFinalizer`]: writes the result once the worker is joined
//! - [`CpalAudio`]: cpal-backed microphone (feature `devices`)

mod finalizer;
#[cfg(feature = "devices")]
mod input;
mod types;
mod worker;

pub use finalizer::{AudioFinalizer, WavFinalizer};
#[cfg(feature = "devices")]
pub use input::{list_input_devices, CpalAudio};
pub use types::{AudioBuffer, AudioError, AudioFormat, PcmChunk};
pub use worker::{AudioCaptureWorker, WorkerOutcome};

/// An open microphone stream.
pub trait AudioInput {
    /// Block until `frames` frames are available and return them as one chunk.
    fn read_block(&mut self, frames: usize) -> Result<PcmChunk, AudioError>;
}

/// Opens microphone streams.
///
/// Called from the capture thread, so the stream it returns never has to
/// cross threads.
pub trait AudioProvider: Send + Sync {
    fn open_input(&self, format: AudioFormat) -> Result<Box<dyn AudioInput>, AudioError>;
}
