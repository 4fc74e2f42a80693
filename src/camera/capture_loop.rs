//! Body of the camera thread.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::frame_utils::convert_to_rgb;
use super::slot::FrameSlot;
use super::types::{CameraError, CameraSettings, Resolution};

/// Open the camera, report the negotiated resolution on `ready`, then keep
/// `latest` holding the newest decoded frame until `stop` is set or the
/// camera keeps failing.
pub fn run_capture_loop(
    settings: CameraSettings,
    latest: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    ready: Sender<Result<Resolution, CameraError>>,
) {
    let mut camera = match open_streaming(&settings) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let negotiated = camera.resolution();
    let _ = ready.send(Ok(Resolution {
        width: negotiated.width(),
        height: negotiated.height(),
    }));

    let mut dropped: u64 = 0;
    while !stop.load(Ordering::Acquire) {
        let grabbed = match camera.frame() {
            Ok(raw) => convert_to_rgb(&raw).ok_or_else(|| "undecodable frame".to_string()),
            Err(e) => Err(e.to_string()),
        };
        match grabbed {
            Ok(frame) => latest.store(frame, Instant::now()),
            Err(reason) => {
                dropped += 1;
                log::debug!("Camera frame grab failed: {}", reason);
                if latest.grab_failed(&reason) {
                    log::error!("Camera lost after repeated failures: {}", reason);
                    break;
                }
            }
        }
        // camera.frame() blocks for the next frame; this only yields.
        thread::sleep(Duration::from_millis(1));
    }

    if dropped > 0 {
        log::debug!("Camera thread dropped {} frames", dropped);
    }
    if let Err(e) = camera.stop_stream() {
        log::warn!("Failed to stop camera stream: {}", e);
    }
}

fn open_streaming(settings: &CameraSettings) -> Result<Camera, CameraError> {
    let index = CameraIndex::Index(settings.device_index);
    let mut last_error = String::from("no format accepted");

    for requested in requested_formats(settings) {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => {
                return match camera.open_stream() {
                    Ok(()) => Ok(camera),
                    Err(e) => Err(CameraError::StreamFailed(e.to_string())),
                };
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(classify_open_error(last_error))
}

/// Formats to try, in order: NV12 (native on macOS), MJPEG (most USB
/// webcams), then whatever the camera offers at its highest resolution.
fn requested_formats(settings: &CameraSettings) -> [RequestedFormat<'static>; 3] {
    let wanted = nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let closest = |format| {
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            wanted,
            format,
            settings.fps,
        )))
    };
    [
        closest(NokhwaFrameFormat::NV12),
        closest(NokhwaFrameFormat::MJPEG),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ]
}

fn classify_open_error(message: String) -> CameraError {
    let lower = message.to_lowercase();
    let denied = ["permission", "denied", "authorization", "not authorized"]
        .iter()
        .any(|needle| lower.contains(needle));
    if denied {
        CameraError::PermissionDenied
    } else {
        CameraError::OpenFailed(message)
    }
}
