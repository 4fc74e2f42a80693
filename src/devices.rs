//! Capture device discovery.
//!
//! Gathers screens (xcap), cameras (nokhwa) and microphones (cpal) for
//! `list-devices`. A backend that fails to enumerate is reported in
//! `errors` and does not hide the others.

use std::fmt;

use crate::audio::list_input_devices;
use crate::camera::{list_devices as list_cameras, CameraInfo};
use crate::capture::{list_screens, ScreenInfo};

/// Which device classes to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub video: bool,
    pub audio: bool,
}

impl DeviceFilter {
    /// `--video` and `--audio` narrow the listing; neither means both.
    pub fn from_flags(video: bool, audio: bool) -> Self {
        if !video && !audio {
            Self {
                video: true,
                audio: true,
            }
        } else {
            Self { video, audio }
        }
    }
}

/// Everything found on this machine.
#[derive(Debug, Default)]
pub struct DeviceList {
    pub screens: Vec<ScreenInfo>,
    pub cameras: Vec<CameraInfo>,
    pub microphones: Vec<String>,
    /// Backends that could not be queried, with the reason.
    pub errors: Vec<String>,
}

pub fn discover(filter: DeviceFilter) -> DeviceList {
    let mut list = DeviceList::default();

    if filter.video {
        match list_screens() {
            Ok(screens) => list.screens = screens,
            Err(e) => list.errors.push(format!("screens: {}", e)),
        }
        match list_cameras() {
            Ok(cameras) => list.cameras = cameras,
            Err(e) => list.errors.push(format!("cameras: {}", e)),
        }
    }
    if filter.audio {
        match list_input_devices() {
            Ok(mics) => list.microphones = mics,
            Err(e) => list.errors.push(format!("microphones: {}", e)),
        }
    }

    log::debug!(
        "Found {} screens, {} cameras, {} microphones",
        list.screens.len(),
        list.cameras.len(),
        list.microphones.len()
    );
    list
}

impl fmt::Display for DeviceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "Screens", &self.screens)?;
        section(f, "Cameras", &self.cameras)?;
        section(f, "Microphones", &self.microphones)?;
        for e in &self.errors {
            writeln!(f, "Could not list {}", e)?;
        }
        Ok(())
    }
}

fn section<T: fmt::Display>(f: &mut fmt::Formatter<'_>, title: &str, items: &[T]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}:", title)?;
    for item in items {
        writeln!(f, "  {}", item)?;
    }
    writeln!(f)
}
