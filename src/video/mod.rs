//! Video output.
//!
//! [`VideoSink`] accepts composited frames in order and finalizes the
//! container on close. [`FfmpegSink`] is the real implementation: raw RGB
//! piped into an ffmpeg process that encodes MPEG-4 Part 2 (XVID tag) into
//! an AVI container.

mod ffmpeg;

pub use ffmpeg::{encoder_args, FfmpegSink, FfmpegSinkFactory};

use std::path::PathBuf;

use crate::frame::{Frame, PixelFormat};
use crate::pipeline::PipelineError;

/// Declared container frame rate. Deliberately independent of the capture
/// cadence; see `DESIGN.md`.
pub const DEFAULT_ENCODER_FPS: f64 = 20.0;

/// Where and how to write one recording's video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub path: PathBuf,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

/// Errors from opening, feeding or closing a video sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("frame is {actual:?}, sink expects {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("sink accepts RGB frames, got {0:?}")]
    FormatMismatch(PixelFormat),
    #[error("video sink is closed")]
    Closed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open video file.
pub trait VideoSink {
    /// Append one frame. Frames land in the file in call order.
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Flush and finalize the container. Further calls are no-ops.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Opens video sinks.
pub trait VideoSinkFactory {
    fn open(&mut self, settings: &VideoSettings) -> Result<Box<dyn VideoSink>, SinkError>;
}
