//! Camera overlay compositing.
//!
//! The overlay is a hard-edged 150x100 block pasted 10px from the top and
//! 10px from the right edge of the screen frame. No blending, no scaling:
//! the camera source hands over frames that are already overlay-sized.

use crate::frame::Frame;

/// Overlay width in pixels.
pub const OVERLAY_WIDTH: u32 = 150;
/// Overlay height in pixels.
pub const OVERLAY_HEIGHT: u32 = 100;
/// Gap between the overlay and the top/right edges.
pub const OVERLAY_MARGIN: u32 = 10;

/// Placement of the overlay inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl OverlayRegion {
    /// Smallest frame the overlay fits in: 170x110.
    pub const MIN_FRAME: (u32, u32) = (
        OVERLAY_WIDTH + 2 * OVERLAY_MARGIN,
        OVERLAY_HEIGHT + OVERLAY_MARGIN,
    );

    /// Top-right region for a `width` x `height` frame, or `None` when the
    /// frame is too small to hold the overlay.
    pub fn for_frame(width: u32, height: u32) -> Option<Self> {
        let (min_w, min_h) = Self::MIN_FRAME;
        if width < min_w || height < min_h {
            return None;
        }
        Some(Self {
            x: width - OVERLAY_MARGIN - OVERLAY_WIDTH,
            y: OVERLAY_MARGIN,
            width: OVERLAY_WIDTH,
            height: OVERLAY_HEIGHT,
        })
    }
}

/// Merge an optional overlay into a screen frame.
///
/// Without an overlay the screen frame comes back untouched. The result
/// always has the screen frame's size.
pub fn compose(mut screen: Frame, overlay: Option<&Frame>) -> Frame {
    if let Some(overlay) = overlay {
        paste_overlay(&mut screen, overlay);
    }
    screen
}

/// Overwrite the overlay region of `target` with `overlay`'s pixels.
///
/// Returns `false` and leaves `target` unchanged when the frame is too
/// small for the region, when the overlay is not exactly region-sized, or
/// when the two frames use different pixel formats.
pub fn paste_overlay(target: &mut Frame, overlay: &Frame) -> bool {
    let Some(region) = OverlayRegion::for_frame(target.width, target.height) else {
        return false;
    };
    if overlay.size() != (region.width, region.height) || overlay.format != target.format {
        log::debug!(
            "Skipping overlay: got {}x{} {:?}, need {}x{} {:?}",
            overlay.width,
            overlay.height,
            overlay.format,
            region.width,
            region.height,
            target.format
        );
        return false;
    }

    let bpp = target.bytes_per_pixel();
    let target_stride = target.stride();
    let row_bytes = region.width as usize * bpp;

    for (row, src) in overlay.data.chunks_exact(row_bytes).enumerate() {
        let start = (region.y as usize + row) * target_stride + region.x as usize * bpp;
        target.data[start..start + row_bytes].copy_from_slice(src);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    #[test]
    fn test_region_position_1080p() {
        let region = OverlayRegion::for_frame(1920, 1080).unwrap();
        assert_eq!(region.x, 1920 - 160);
        assert_eq!(region.y, 10);
        assert_eq!((region.width, region.height), (150, 100));
    }

    #[test]
    fn test_region_minimum_frame() {
        assert_eq!(OverlayRegion::MIN_FRAME, (170, 110));
        let region = OverlayRegion::for_frame(170, 110).unwrap();
        assert_eq!(region.x, 10);
        assert!(OverlayRegion::for_frame(169, 110).is_none());
        assert!(OverlayRegion::for_frame(170, 109).is_none());
    }

    #[test]
    fn test_compose_without_overlay_is_unchanged() {
        let screen = Frame::filled(200, 120, [1, 2, 3]);
        let expected = screen.data.clone();
        let out = compose(screen, None);
        assert_eq!(out.data, expected);
    }

    #[test]
    fn test_compose_pastes_top_right_block() {
        let screen = Frame::filled(300, 200, [0, 0, 0]);
        let overlay = Frame::filled(150, 100, [255, 0, 0]);
        let out = compose(screen, Some(&overlay));

        assert_eq!(out.size(), (300, 200));
        for y in 0..200 {
            for x in 0..300 {
                let inside = (140..290).contains(&x) && (10..110).contains(&y);
                let expected: &[u8] = if inside { &[255, 0, 0] } else { &[0, 0, 0] };
                assert_eq!(out.pixel(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_paste_overlay_guards_small_frame() {
        let mut screen = Frame::filled(100, 100, [7, 7, 7]);
        let overlay = Frame::filled(150, 100, [255, 255, 255]);
        assert!(!paste_overlay(&mut screen, &overlay));
        assert!(screen.data.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_paste_overlay_rejects_wrong_size_or_format() {
        let mut screen = Frame::filled(400, 300, [7, 7, 7]);
        let wrong_size = Frame::filled(160, 100, [255, 255, 255]);
        assert!(!paste_overlay(&mut screen, &wrong_size));

        let bgr = Frame::new(150, 100, PixelFormat::Bgr, vec![9; 150 * 100 * 3]).unwrap();
        assert!(!paste_overlay(&mut screen, &bgr));
        assert!(screen.data.iter().all(|&b| b == 7));
    }
}
