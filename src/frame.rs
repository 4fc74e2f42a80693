//! Pixel buffers shared by the screen grabber, the camera and the encoder.
//!
//! Every frame that reaches the compositor or the video sink is packed
//! RGB (`PixelFormat::Rgb`). Sources that deliver another channel order
//! go through [`Frame::into_rgb`] first.

use std::time::Instant;

/// Channel layout of a frame's pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed RGB, 3 bytes per pixel. The shared order for composited frames.
    Rgb,
    /// Packed BGR, 3 bytes per pixel.
    Bgr,
    /// Packed RGBA, 4 bytes per pixel.
    Rgba,
    /// Packed BGRA, 4 bytes per pixel.
    Bgra,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
        }
    }
}

/// Errors raised when building a frame from raw bytes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("{width}x{height} {format:?} frame needs {expected} bytes, got {actual}")]
    LengthMismatch {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
}

/// A captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw interleaved pixel data, row-major, no padding
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Channel layout of `data`
    pub format: PixelFormat,
    /// When the frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Wrap raw pixel data, checking that its length matches the geometry.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                width,
                height,
                format,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            timestamp: Instant::now(),
        })
    }

    /// A solid-color RGB frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes of one row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// Channel bytes of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.bytes_per_pixel();
        let start = y as usize * self.stride() + x as usize * bpp;
        &self.data[start..start + bpp]
    }

    /// Convert to packed RGB, consuming the frame. RGB input is returned as is.
    pub fn into_rgb(self) -> Frame {
        let data = match self.format {
            PixelFormat::Rgb => return self,
            PixelFormat::Bgr => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[2], p[1], p[0]])
                .collect(),
            PixelFormat::Rgba => self
                .data
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect(),
            PixelFormat::Bgra => self
                .data
                .chunks_exact(4)
                .flat_map(|p| [p[2], p[1], p[0]])
                .collect(),
        };
        Frame {
            data,
            format: PixelFormat::Rgb,
            ..self
        }
    }

    /// Bilinear resize to `width` x `height`, keeping the pixel format.
    ///
    /// Sample positions use pixel centers, so a 2:1 downscale averages
    /// neighbouring pixels instead of picking every other one.
    pub fn resize(&self, width: u32, height: u32) -> Frame {
        if (width, height) == (self.width, self.height) {
            return self.clone();
        }
        let bpp = self.bytes_per_pixel();
        if self.width == 0 || self.height == 0 {
            // Nothing to sample from: black.
            return Frame {
                data: vec![0; width as usize * height as usize * bpp],
                width,
                height,
                format: self.format,
                timestamp: self.timestamp,
            };
        }

        let stride = self.stride();
        let scale_x = self.width as f32 / width as f32;
        let scale_y = self.height as f32 / height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        let mut data = Vec::with_capacity(width as usize * height as usize * bpp);
        for dy in 0..height {
            let sy = ((dy as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
            let y0 = sy.floor() as usize;
            let y1 = (y0 + 1).min(self.height as usize - 1);
            let fy = sy - y0 as f32;

            for dx in 0..width {
                let sx = ((dx as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
                let x0 = sx.floor() as usize;
                let x1 = (x0 + 1).min(self.width as usize - 1);
                let fx = sx - x0 as f32;

                for c in 0..bpp {
                    let p00 = self.data[y0 * stride + x0 * bpp + c] as f32;
                    let p01 = self.data[y0 * stride + x1 * bpp + c] as f32;
                    let p10 = self.data[y1 * stride + x0 * bpp + c] as f32;
                    let p11 = self.data[y1 * stride + x1 * bpp + c] as f32;
                    let top = p00 + (p01 - p00) * fx;
                    let bottom = p10 + (p11 - p10) * fx;
                    let value = top + (bottom - top) * fy;
                    data.push(value.round().clamp(0.0, 255.0) as u8);
                }
            }
        }

        Frame {
            data,
            width,
            height,
            format: self.format,
            timestamp: self.timestamp,
        }
    }
}

/// Mirror a frame horizontally (flip left-right) for selfie mode.
pub fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}
