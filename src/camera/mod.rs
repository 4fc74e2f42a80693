//! Camera access for the overlay.
//!
//! This module provides:
//! - The device seam, [`CameraProvider`] / [`CameraDevice`]
//! - [`CameraOverlaySource`], which turns whatever the device yields into
//!   overlay-sized RGB frames and never fails the caller
//! - [`FrameSlot`], the newest-frame hand-off used by camera threads
//! - A nokhwa backend, [`NokhwaCameras`], and [`list_devices`] (feature `devices`)

#[cfg(feature = "devices")]
mod capture;
#[cfg(feature = "devices")]
mod capture_loop;
#[cfg(feature = "devices")]
mod frame_utils;
mod overlay;
mod slot;
mod types;

#[cfg(feature = "devices")]
pub use capture::{list_devices, CameraCapture, NokhwaCameras};
pub use overlay::CameraOverlaySource;
pub use slot::FrameSlot;
pub use types::{CameraError, CameraInfo, CameraSettings, Resolution};

use crate::frame::Frame;

/// An opened camera.
pub trait CameraDevice {
    /// Read the next available frame in the device's native size and order.
    ///
    /// `Ok(None)` means the device is up but has nothing to hand out yet.
    fn read_frame(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);
}

/// Opens camera devices.
pub trait CameraProvider {
    fn open_camera(&mut self) -> Result<Box<dyn CameraDevice>, CameraError>;
}
