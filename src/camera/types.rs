//! Camera descriptors, open settings and errors.

use std::fmt;

/// A camera as reported by `list-devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    /// Backend-specific detail, often the bus or driver
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "[{}] {}", self.index, self.name)
        } else {
            write!(f, "[{}] {} ({})", self.index, self.name, self.description)
        }
    }
}

/// Requested or negotiated capture size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// What most webcams deliver without negotiation. The overlay is only
    /// 150x100, so there is nothing to gain from asking for more.
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

/// How to open the overlay camera. The device may pick a different
/// resolution or rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub device_index: u32,
    pub resolution: Resolution,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::VGA,
            fps: 30,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("No cameras found")]
    NoDevices,
    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),
    #[error("Failed to open camera: {0}")]
    OpenFailed(String),
    #[error("Camera permission denied. On macOS, grant access in System Settings > Privacy & Security > Camera")]
    PermissionDenied,
    #[error("Camera device {0} not found. Run 'overlay-recorder list-devices --video' to see available devices")]
    DeviceNotFound(u32),
    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),
    #[error("Camera capture is already running")]
    AlreadyRunning,
    #[error("Failed to read camera frame: {0}")]
    ReadFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let mut info = CameraInfo {
            index: 1,
            name: "USB Camera".to_string(),
            description: "uvcvideo".to_string(),
        };
        assert_eq!(info.to_string(), "[1] USB Camera (uvcvideo)");
        info.description.clear();
        assert_eq!(info.to_string(), "[1] USB Camera");
    }

    #[test]
    fn test_settings_request_vga() {
        let settings = CameraSettings::default();
        assert_eq!(settings.resolution, Resolution::VGA);
        assert_eq!(settings.fps, 30);
    }

    #[test]
    fn test_camera_error_display() {
        assert_eq!(CameraError::NoDevices.to_string(), "No cameras found");
        assert_eq!(
            CameraError::ReadFailed("eof".to_string()).to_string(),
            "Failed to read camera frame: eof"
        );
        assert!(CameraError::DeviceNotFound(5).to_string().contains("device 5"));
    }
}
