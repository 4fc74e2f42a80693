//! ffmpeg-backed video sink.

use super::{SinkError, VideoSettings, VideoSink, VideoSinkFactory};
use crate::frame::{Frame, PixelFormat};
use crate::pipeline::Pipeline;

/// Build the ffmpeg command line for raw RGB frames on stdin.
///
/// # Arguments
/// * `settings` - Output path, declared frame rate and frame size
/// * `codec` - ffmpeg encoder name (e.g. `mpeg4`)
/// * `fourcc` - Container codec tag (e.g. `xvid`), if any
pub fn encoder_args(settings: &VideoSettings, codec: &str, fourcc: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(format!("{}x{}", settings.width, settings.height));
    args.push("-r".to_string());
    args.push(settings.frame_rate.to_string());
    args.push("-i".to_string());
    args.push("-".to_string());

    // 4:2:0 encoders need even dimensions
    args.push("-vf".to_string());
    args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string());
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push("-c:v".to_string());
    args.push(codec.to_string());
    if let Some(tag) = fourcc {
        args.push("-vtag".to_string());
        args.push(tag.to_string());
    }
    args.push(settings.path.display().to_string());
    args
}

/// Creates [`FfmpegSink`]s with a fixed encoder choice.
#[derive(Debug, Clone)]
pub struct FfmpegSinkFactory {
    /// ffmpeg executable
    pub program: String,
    pub codec: String,
    pub fourcc: Option<String>,
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            codec: "mpeg4".to_string(),
            fourcc: Some("xvid".to_string()),
        }
    }
}

impl VideoSinkFactory for FfmpegSinkFactory {
    fn open(&mut self, settings: &VideoSettings) -> Result<Box<dyn VideoSink>, SinkError> {
        let args = encoder_args(settings, &self.codec, self.fourcc.as_deref());
        let pipeline = Pipeline::spawn(&self.program, &args)?;
        log::info!(
            "Writing {} ({}x{} @ {} fps, {})",
            settings.path.display(),
            settings.width,
            settings.height,
            settings.frame_rate,
            self.codec
        );
        Ok(Box::new(FfmpegSink {
            pipeline: Some(pipeline),
            size: (settings.width, settings.height),
            frames: 0,
        }))
    }
}

/// Raw frames piped into a running ffmpeg.
pub struct FfmpegSink {
    pipeline: Option<Pipeline>,
    size: (u32, u32),
    frames: u64,
}

impl VideoSink for FfmpegSink {
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let pipeline = self.pipeline.as_mut().ok_or(SinkError::Closed)?;
        if frame.format != PixelFormat::Rgb {
            return Err(SinkError::FormatMismatch(frame.format));
        }
        if frame.size() != self.size {
            return Err(SinkError::SizeMismatch {
                expected: self.size,
                actual: frame.size(),
            });
        }
        pipeline.write(&frame.data)?;
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let Some(mut pipeline) = self.pipeline.take() else {
            return Ok(());
        };
        pipeline.finish()?;
        log::debug!("Video finalized after {} frames", self.frames);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Video sink did not close cleanly: {}", e);
        }
    }
}
