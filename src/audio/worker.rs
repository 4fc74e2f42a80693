//! Microphone capture on a dedicated thread.
//!
//! The worker owns its [`AudioBuffer`] outright and returns it through
//! `join`, so the controller can only look at the audio after the thread
//! has finished. The only shared state is the running flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::types::{AudioBuffer, AudioError, AudioFormat};
use super::AudioProvider;

/// What the worker hands back when joined.
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Every block read, in capture order. Partial when `error` is set.
    pub buffer: AudioBuffer,
    /// Why the worker ended early, if it did.
    pub error: Option<AudioError>,
}

/// Handle to the running capture thread.
pub struct AudioCaptureWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<WorkerOutcome>>,
}

impl AudioCaptureWorker {
    /// Spawn the capture thread. The device itself is opened on that thread.
    pub fn spawn(
        provider: Arc<dyn AudioProvider>,
        format: AudioFormat,
    ) -> Result<Self, AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || capture_loop(provider.as_ref(), format, &flag))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// `true` while the thread is alive.
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Clear the running flag and block until the thread exits.
    ///
    /// The read in progress completes first, so the last block is whole.
    pub fn stop(mut self) -> WorkerOutcome {
        self.finish()
    }

    fn finish(&mut self) -> WorkerOutcome {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return WorkerOutcome {
                buffer: AudioBuffer::new(AudioFormat::default()),
                error: Some(AudioError::Disconnected),
            };
        };
        match handle.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Audio capture thread panicked");
                WorkerOutcome {
                    buffer: AudioBuffer::new(AudioFormat::default()),
                    error: Some(AudioError::WorkerPanicked),
                }
            }
        }
    }
}

impl Drop for AudioCaptureWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.finish();
        }
    }
}

impl std::fmt::Debug for AudioCaptureWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCaptureWorker")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn capture_loop(
    provider: &dyn AudioProvider,
    format: AudioFormat,
    running: &AtomicBool,
) -> WorkerOutcome {
    let mut buffer = AudioBuffer::new(format);

    let mut input = match provider.open_input(format) {
        Ok(input) => input,
        Err(e) => {
            log::error!("Audio input unavailable: {}", e);
            return WorkerOutcome {
                buffer,
                error: Some(e),
            };
        }
    };
    log::debug!(
        "Audio capture running ({} Hz, {} ch, {}-frame blocks)",
        format.sample_rate,
        format.channels,
        format.block_size
    );

    while running.load(Ordering::Acquire) {
        match input.read_block(format.block_size) {
            Ok(chunk) => buffer.push(chunk),
            Err(e) => {
                log::error!("Audio capture stopped after {} blocks: {}", buffer.len(), e);
                return WorkerOutcome {
                    buffer,
                    error: Some(e),
                };
            }
        }
    }

    log::debug!("Audio capture finished with {} blocks", buffer.len());
    WorkerOutcome {
        buffer,
        error: None,
    }
}
