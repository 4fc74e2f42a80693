//! Overlay-ready frames from an optional camera.

use super::{CameraDevice, CameraProvider};
use crate::compositor::{OVERLAY_HEIGHT, OVERLAY_WIDTH};
use crate::frame::{mirror_horizontal, Frame};

/// Wraps a camera that may or may not have opened.
///
/// Opening never fails: a busy or missing device leaves the source
/// unavailable for the rest of the session and every read returns `None`.
/// Frames that do come out are RGB and exactly 150x100.
pub struct CameraOverlaySource {
    device: Option<Box<dyn CameraDevice>>,
    mirror: bool,
    read_failures: u64,
}

impl CameraOverlaySource {
    /// Try to open the camera. Failure is logged, not returned.
    pub fn open(provider: &mut dyn CameraProvider, mirror: bool) -> Self {
        let device = match provider.open_camera() {
            Ok(device) => {
                log::info!("Camera opened for overlay");
                Some(device)
            }
            Err(e) => {
                log::warn!("Camera unavailable, recording without overlay: {}", e);
                None
            }
        };
        Self {
            device,
            mirror,
            read_failures: 0,
        }
    }

    /// A source with no device behind it.
    pub fn unavailable() -> Self {
        Self {
            device: None,
            mirror: false,
            read_failures: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    /// Failed reads since the source was opened.
    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Read one frame, converted to RGB and resized to the overlay size.
    ///
    /// Returns `None` when the device never opened, the read failed, or the
    /// device had no frame ready.
    pub fn try_read_frame(&mut self) -> Option<Frame> {
        let device = self.device.as_mut()?;
        let raw = match device.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                self.read_failures += 1;
                if self.read_failures == 1 {
                    log::warn!("Camera read failed, using screen-only frames: {}", e);
                } else {
                    log::debug!("Camera read failed ({}): {}", self.read_failures, e);
                }
                return None;
            }
        };

        let mut frame = raw.into_rgb().resize(OVERLAY_WIDTH, OVERLAY_HEIGHT);
        if self.mirror {
            mirror_horizontal(&mut frame);
        }
        Some(frame)
    }

    /// Release the camera. Safe to call repeatedly, or when it never opened.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            log::debug!("Camera released");
        }
    }
}

impl Drop for CameraOverlaySource {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CameraOverlaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraOverlaySource")
            .field("available", &self.is_available())
            .field("mirror", &self.mirror)
            .field("read_failures", &self.read_failures)
            .finish()
    }
}
