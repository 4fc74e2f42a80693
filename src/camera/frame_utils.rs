//! nokhwa buffer conversion.

use nokhwa::pixel_format::RgbFormat;

use crate::frame::{Frame, PixelFormat};

/// Decode a nokhwa buffer into an RGB [`Frame`].
///
/// nokhwa's `decode_image` handles the camera's native format (MJPEG,
/// YUYV, NV12, ...). Returns `None` for unsupported or corrupt data.
pub fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let (width, height) = (decoded.width(), decoded.height());
    Frame::new(width, height, PixelFormat::Rgb, decoded.into_raw()).ok()
}
