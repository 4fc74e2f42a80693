//! The recording session state machine.
//!
//! A [`RecordingSession`] is created once and driven from a single
//! controlling task: `start()`, then `tick()` on every beat of a
//! [`crate::scheduler::CaptureScheduler`], then `stop()`. Each tick runs one
//! capture, compose and write cycle. Microphone capture runs on its own
//! thread for the duration of one recording and is joined in `stop()`
//! before its samples are finalized.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::{
    AudioBuffer, AudioCaptureWorker, AudioError, AudioFinalizer, AudioFormat, AudioProvider,
    WorkerOutcome,
};
use crate::camera::{CameraOverlaySource, CameraProvider};
use crate::capture::{CaptureError, ScreenSource};
use crate::compositor::{paste_overlay, OverlayRegion};
use crate::scheduler::DEFAULT_TICK_INTERVAL;
use crate::video::{SinkError, VideoSettings, VideoSink, VideoSinkFactory, DEFAULT_ENCODER_FPS};

/// Session-level settings, usually derived from [`crate::config::Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub output_dir: PathBuf,
    pub video_file: String,
    pub audio_file: String,
    pub tick_interval: Duration,
    /// Frame rate declared to the encoder. Not derived from `tick_interval`.
    pub encoder_fps: f64,
    pub camera_mirror: bool,
    pub audio_enabled: bool,
    pub audio_format: AudioFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            video_file: "screen_recording.avi".to_string(),
            audio_file: "audio_recording.wav".to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            encoder_fps: DEFAULT_ENCODER_FPS,
            camera_mirror: false,
            audio_enabled: true,
            audio_format: AudioFormat::default(),
        }
    }
}

impl SessionConfig {
    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join(&self.video_file)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join(&self.audio_file)
    }
}

/// The external collaborators a session records from and writes to.
pub struct Devices {
    pub screen: Box<dyn ScreenSource>,
    pub camera: Box<dyn CameraProvider>,
    /// `None` records video only.
    pub audio: Option<Arc<dyn AudioProvider>>,
    pub video: Box<dyn VideoSinkFactory>,
    pub finalizer: Box<dyn AudioFinalizer>,
}

/// Errors that keep a recording from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot determine screen resolution: {0}")]
    Screen(#[from] CaptureError),
    #[error("cannot create output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot open video output: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
}

/// Per-recording counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Cycles run, one per tick.
    pub ticks: u64,
    /// Ticks the ticker dropped because a cycle overran.
    pub skipped_ticks: u64,
    pub frames_written: u64,
    /// Frames that carried a camera overlay.
    pub overlay_composites: u64,
    pub capture_failures: u64,
    pub write_failures: u64,
}

/// What became of the microphone recording.
#[derive(Debug)]
pub enum AudioOutcome {
    /// Audio was switched off for this session.
    Disabled,
    /// The WAV file was written. `interrupted` is set when the device failed
    /// partway and only the audio before the failure was kept.
    Written {
        path: PathBuf,
        samples: u64,
        interrupted: Option<AudioError>,
    },
    /// No audio was captured.
    Unavailable(AudioError),
    /// Audio was captured but the file could not be written.
    FinalizeFailed(AudioError),
}

/// Report returned by [`RecordingSession::stop`].
#[derive(Debug)]
pub struct RecordingSummary {
    pub video_path: PathBuf,
    /// Set when the encoder failed to finalize the container.
    pub video_error: Option<SinkError>,
    pub stats: SessionStats,
    pub duration: Duration,
    pub audio: AudioOutcome,
}

impl std::fmt::Display for RecordingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames in {:.1}s -> {}",
            self.stats.frames_written,
            self.duration.as_secs_f64(),
            self.video_path.display()
        )?;
        if let Some(e) = &self.video_error {
            write!(f, " (encoder error: {})", e)?;
        }
        match &self.audio {
            AudioOutcome::Disabled => Ok(()),
            AudioOutcome::Written { path, samples, .. } => {
                write!(f, "; {} samples -> {}", samples, path.display())
            }
            AudioOutcome::Unavailable(e) => write!(f, "; no audio ({})", e),
            AudioOutcome::FinalizeFailed(e) => write!(f, "; audio not saved ({})", e),
        }
    }
}

struct ActiveRecording {
    sink: Box<dyn VideoSink>,
    sink_size: (u32, u32),
    camera: CameraOverlaySource,
    audio: Option<AudioCaptureWorker>,
    /// Why the worker never started, if it didn't.
    audio_start_error: Option<AudioError>,
    overlay_fits: bool,
    stats: SessionStats,
    started_at: Instant,
    audio_exit_reported: bool,
    resize_reported: bool,
}

impl ActiveRecording {
    fn run_cycle(&mut self, screen: &mut dyn ScreenSource, overlay_enabled: bool) {
        self.stats.ticks += 1;
        self.check_audio_worker();

        let mut frame = match screen.capture() {
            Ok(frame) => frame.into_rgb(),
            Err(e) => {
                self.stats.capture_failures += 1;
                if self.stats.capture_failures == 1 {
                    log::warn!("Screen capture failed, skipping frame: {}", e);
                } else {
                    log::debug!("Screen capture failed ({}): {}", self.stats.capture_failures, e);
                }
                return;
            }
        };

        if frame.size() != self.sink_size {
            if !self.resize_reported {
                log::warn!(
                    "Screen frames are {:?}, scaling to {:?}",
                    frame.size(),
                    self.sink_size
                );
                self.resize_reported = true;
            }
            frame = frame.resize(self.sink_size.0, self.sink_size.1);
        }

        if overlay_enabled && self.overlay_fits {
            if let Some(overlay) = self.camera.try_read_frame() {
                if paste_overlay(&mut frame, &overlay) {
                    self.stats.overlay_composites += 1;
                }
            }
        }

        match self.sink.write(&frame) {
            Ok(()) => self.stats.frames_written += 1,
            Err(e) => {
                self.stats.write_failures += 1;
                if self.stats.write_failures == 1 {
                    log::warn!("Video write failed: {}", e);
                } else {
                    log::debug!("Video write failed ({}): {}", self.stats.write_failures, e);
                }
            }
        }
    }

    fn check_audio_worker(&mut self) {
        if self.audio_exit_reported {
            return;
        }
        if let Some(worker) = &self.audio {
            if !worker.is_alive() {
                log::warn!("Audio capture stopped early; recording continues without audio");
                self.audio_exit_reported = true;
            }
        }
    }
}

/// Owns the devices and at most one recording in progress.
pub struct RecordingSession {
    config: SessionConfig,
    devices: Devices,
    overlay_enabled: bool,
    active: Option<ActiveRecording>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig, devices: Devices) -> Self {
        Self {
            config,
            devices,
            overlay_enabled: false,
            active: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn overlay_enabled(&self) -> bool {
        self.overlay_enabled
    }

    /// Toggle compositing. The camera is only opened by `start()`, so turning
    /// the overlay on mid-recording shows it only if the camera was opened
    /// when the recording began.
    pub fn set_overlay_enabled(&mut self, enabled: bool) {
        if self.overlay_enabled != enabled {
            log::info!("Camera overlay {}", if enabled { "enabled" } else { "disabled" });
        }
        self.overlay_enabled = enabled;
        if enabled {
            if let Some(active) = &self.active {
                if !active.camera.is_available() {
                    log::info!(
                        "Camera was not opened for this recording; overlay applies from the next one"
                    );
                }
            }
        }
    }

    /// Counters of the recording in progress.
    pub fn stats(&self) -> Option<SessionStats> {
        self.active.as_ref().map(|a| a.stats)
    }

    /// Open the video sink, the camera and the microphone. A no-op while
    /// already recording.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            log::debug!("start() ignored: already recording");
            return Ok(());
        }

        let (width, height) = self.devices.screen.resolution()?;
        fs::create_dir_all(&self.config.output_dir).map_err(|e| SessionError::OutputDir {
            path: self.config.output_dir.clone(),
            source: e,
        })?;

        let settings = VideoSettings {
            path: self.config.video_path(),
            frame_rate: self.config.encoder_fps,
            width,
            height,
        };
        let sink = self.devices.video.open(&settings)?;

        let overlay_fits = OverlayRegion::for_frame(width, height).is_some();
        if !overlay_fits {
            let (min_w, min_h) = OverlayRegion::MIN_FRAME;
            log::warn!(
                "Screen {}x{} is smaller than {}x{}; camera overlay disabled",
                width,
                height,
                min_w,
                min_h
            );
        }

        let camera = if self.overlay_enabled && overlay_fits {
            CameraOverlaySource::open(self.devices.camera.as_mut(), self.config.camera_mirror)
        } else {
            CameraOverlaySource::unavailable()
        };

        let (audio, audio_start_error) = match (&self.devices.audio, self.config.audio_enabled) {
            (Some(provider), true) => {
                match AudioCaptureWorker::spawn(Arc::clone(provider), self.config.audio_format) {
                    Ok(worker) => (Some(worker), None),
                    Err(e) => {
                        log::warn!("Audio capture could not start: {}", e);
                        (None, Some(e))
                    }
                }
            }
            _ => (None, None),
        };

        log::info!(
            "Recording started: {}x{} every {:?} -> {}",
            width,
            height,
            self.config.tick_interval,
            settings.path.display()
        );

        self.active = Some(ActiveRecording {
            sink,
            sink_size: (width, height),
            camera,
            audio,
            audio_start_error,
            overlay_fits,
            stats: SessionStats::default(),
            started_at: Instant::now(),
            audio_exit_reported: false,
            resize_reported: false,
        });
        Ok(())
    }

    /// Run one capture cycle. `skipped` is how many ticks the ticker dropped
    /// before this one. Returns `false` while idle.
    pub fn tick(&mut self, skipped: u64) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.stats.skipped_ticks += skipped;
        active.run_cycle(self.devices.screen.as_mut(), self.overlay_enabled);
        true
    }

    /// End the recording and finalize both files. `None` while idle.
    ///
    /// No cycle runs once the recording is taken out of the session, the
    /// audio worker is joined before its buffer is read, and release
    /// failures are reported in the summary rather than returned.
    pub fn stop(&mut self) -> Option<RecordingSummary> {
        let mut active = self.active.take()?;
        let duration = active.started_at.elapsed();

        let video_error = active.sink.close().err();
        if let Some(e) = &video_error {
            log::error!("Video file may be incomplete: {}", e);
        }
        active.camera.close();

        let audio = match active.audio.take() {
            Some(worker) => self.finalize_audio(worker.stop()),
            None => match active.audio_start_error.take() {
                Some(e) => AudioOutcome::Unavailable(e),
                None => AudioOutcome::Disabled,
            },
        };

        let summary = RecordingSummary {
            video_path: self.config.video_path(),
            video_error,
            stats: active.stats,
            duration,
            audio,
        };
        log::info!("Recording stopped: {}", summary);
        Some(summary)
    }

    /// Stop any recording in progress before the session goes away.
    pub fn shutdown(&mut self) -> Option<RecordingSummary> {
        self.stop()
    }

    fn finalize_audio(&self, outcome: WorkerOutcome) -> AudioOutcome {
        let WorkerOutcome { mut buffer, error } = outcome;
        if buffer.is_empty() {
            return match error {
                Some(e) => {
                    log::warn!("No audio captured: {}", e);
                    AudioOutcome::Unavailable(e)
                }
                None => self.write_audio(&mut buffer, None),
            };
        }
        if let Some(e) = &error {
            log::warn!(
                "Audio device failed after {:.1}s; keeping what was captured: {}",
                buffer.duration().as_secs_f64(),
                e
            );
        }
        self.write_audio(&mut buffer, error)
    }

    fn write_audio(
        &self,
        buffer: &mut AudioBuffer,
        interrupted: Option<AudioError>,
    ) -> AudioOutcome {
        let path = self.config.audio_path();
        let result = self.devices.finalizer.write_all(&path, buffer);
        buffer.clear();
        match result {
            Ok(samples) => AudioOutcome::Written {
                path,
                samples,
                interrupted,
            },
            Err(e) => {
                log::error!("Failed to write {}: {}", path.display(), e);
                AudioOutcome::FinalizeFailed(e)
            }
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.active.is_some() {
            log::debug!("Session dropped while recording; stopping");
            let _ = self.stop();
        }
    }
}
