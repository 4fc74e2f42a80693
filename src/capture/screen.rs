//! Primary monitor grabs via xcap.

use std::fmt;

use xcap::Monitor;

use super::{CaptureError, ScreenSource};
use crate::frame::{Frame, PixelFormat};

/// A monitor as reported by the OS.
#[derive(Debug, Clone)]
pub struct ScreenInfo {
    pub index: usize,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub primary: bool,
}

impl fmt::Display for ScreenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}x{}){}",
            self.index,
            self.name,
            self.width,
            self.height,
            if self.primary { " primary" } else { "" }
        )
    }
}

/// List all monitors.
pub fn list_screens() -> Result<Vec<ScreenInfo>, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::QueryFailed(e.to_string()))?;
    Ok(monitors
        .iter()
        .enumerate()
        .map(|(index, m)| ScreenInfo {
            index,
            name: m.name().to_string(),
            width: m.width(),
            height: m.height(),
            primary: m.is_primary(),
        })
        .collect())
}

/// Grabs the primary monitor (or the first one if none is flagged primary).
pub struct PrimaryScreen {
    monitor: Monitor,
    /// Pixel size of a grab, which differs from the logical monitor size on
    /// scaled displays.
    size: (u32, u32),
}

impl PrimaryScreen {
    pub fn open() -> Result<Self, CaptureError> {
        let mut monitors =
            Monitor::all().map_err(|e| CaptureError::QueryFailed(e.to_string()))?;
        if monitors.is_empty() {
            return Err(CaptureError::NoScreens);
        }
        let index = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);
        let monitor = monitors.swap_remove(index);

        let probe = monitor
            .capture_image()
            .map_err(|e| CaptureError::GrabFailed(e.to_string()))?;
        let size = (probe.width(), probe.height());
        log::info!(
            "Capturing screen '{}' ({}x{} pixels)",
            monitor.name(),
            size.0,
            size.1
        );
        Ok(Self { monitor, size })
    }
}

impl ScreenSource for PrimaryScreen {
    fn resolution(&self) -> Result<(u32, u32), CaptureError> {
        Ok(self.size)
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let image = self
            .monitor
            .capture_image()
            .map_err(|e| CaptureError::GrabFailed(e.to_string()))?;
        let (width, height) = (image.width(), image.height());
        let frame = Frame::new(width, height, PixelFormat::Rgba, image.into_raw())?;
        Ok(frame.into_rgb())
    }
}
