//! Error types for screen capture.

use crate::frame::FrameError;

/// Errors that can occur while grabbing the screen
#[derive(Debug)]
pub enum CaptureError {
    /// No monitors found
    NoScreens,
    /// Failed to enumerate monitors
    QueryFailed(String),
    /// The grab itself failed
    GrabFailed(String),
    /// The grabbed image did not form a valid frame
    InvalidFrame(FrameError),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoScreens => {
                write!(
                    f,
                    "No screens found.\n\nMake sure screen recording permission is granted:\n  System Settings > Privacy & Security > Screen Recording"
                )
            }
            CaptureError::QueryFailed(msg) => write!(f, "Failed to query screens: {}", msg),
            CaptureError::GrabFailed(msg) => write!(f, "Screen grab failed: {}", msg),
            CaptureError::InvalidFrame(e) => write!(f, "Screen grab returned a bad frame: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::InvalidFrame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for CaptureError {
    fn from(e: FrameError) -> Self {
        CaptureError::InvalidFrame(e)
    }
}
