//! Screen capture.
//!
//! The recorder only needs two things from the screen: its resolution, to
//! size the video sink, and a full-screen grab per tick. [`ScreenSource`]
//! is that seam; [`PrimaryScreen`] implements it on top of xcap when the
//! `devices` feature is enabled.

mod errors;
#[cfg(feature = "devices")]
mod screen;

pub use errors::CaptureError;
#[cfg(feature = "devices")]
pub use screen::{list_screens, PrimaryScreen, ScreenInfo};

use crate::frame::Frame;

/// Source of full-screen frames.
pub trait ScreenSource {
    /// Current screen resolution as (width, height).
    fn resolution(&self) -> Result<(u32, u32), CaptureError>;

    /// Grab the whole screen. Implementations return packed RGB.
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl<S: ScreenSource + ?Sized> ScreenSource for Box<S> {
    fn resolution(&self) -> Result<(u32, u32), CaptureError> {
        (**self).resolution()
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}
