//! Decoded frames and their pixel buffers.
//!
//! A [`Frame`] is owned by exactly one container at a time. It is not
//! `Clone`: the only way out of a container is through its releaser.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// 8-bit BGR (24 bits per pixel), the usual decoder output for display
    Bgr24,
    /// 8-bit grayscale
    Gray8,
    /// YUV 4:2:0 planar
    Yuv420P,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, or 0 for planar.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Bgr24 => 3,
            Self::Gray8 => 1,
            Self::Yuv420P => 0,
        }
    }

    /// Number of planes for this format.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgr24 | Self::Gray8 => 1,
            Self::Yuv420P => 3,
        }
    }

    /// Unpadded size of a frame in bytes, used for memory estimates.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Rgba8 | Self::Bgr24 | Self::Gray8 => pixels * self.bytes_per_pixel(),
            Self::Yuv420P => {
                let chroma = (width as usize / 2) * (height as usize / 2);
                pixels + chroma * 2
            }
        }
    }
}

/// A plane of pixel data with stride information.
#[derive(Debug, Clone)]
pub struct FramePlane {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Bytes per row, padded to 64 bytes
    pub stride: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    bytes_per_pixel: usize,
}

impl FramePlane {
    /// Create a zeroed plane with the given dimensions.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        let min_stride = width as usize * bytes_per_pixel;
        let stride = (min_stride + 63) & !63;
        Self {
            data: vec![0u8; stride * height as usize],
            stride,
            width,
            height,
            bytes_per_pixel,
        }
    }

    /// Visible bytes of row `y`, without padding.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.bytes_per_pixel]
    }

    /// Mutable visible bytes of row `y`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * self.bytes_per_pixel;
        &mut self.data[start..start + len]
    }
}

/// Pixel memory of one decoded picture.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data planes (1 or 3 depending on format)
    pub planes: SmallVec<[FramePlane; 3]>,
}

impl FrameBuffer {
    /// Create a zeroed frame buffer with the given dimensions and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = match format {
            PixelFormat::Rgba8 | PixelFormat::Bgr24 | PixelFormat::Gray8 => {
                smallvec::smallvec![FramePlane::new(width, height, format.bytes_per_pixel())]
            }
            PixelFormat::Yuv420P => smallvec::smallvec![
                FramePlane::new(width, height, 1),
                FramePlane::new(width / 2, height / 2, 1),
                FramePlane::new(width / 2, height / 2, 1),
            ],
        };

        Self {
            format,
            width,
            height,
            planes,
        }
    }

    /// A buffer whose every byte is `value`. Handy to tell frames apart.
    pub fn solid(width: u32, height: u32, format: PixelFormat, value: u8) -> Self {
        let mut buffer = Self::new(width, height, format);
        buffer.fill(value);
        buffer
    }

    /// Overwrite every byte of every plane.
    pub fn fill(&mut self, value: u8) {
        for plane in &mut self.planes {
            plane.data.fill(value);
        }
    }

    /// Whether this buffer can be reused for a picture of the given shape.
    pub fn matches(&self, width: u32, height: u32, format: PixelFormat) -> bool {
        self.width == width && self.height == height && self.format == format
    }

    /// Total memory usage of this buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }

    /// Get the primary plane (plane 0).
    #[inline]
    pub fn primary_plane(&self) -> &FramePlane {
        &self.planes[0]
    }

    /// Get the primary plane mutably.
    #[inline]
    pub fn primary_plane_mut(&mut self) -> &mut FramePlane {
        &mut self.planes[0]
    }

    /// Paint gray bars whose positions move with `phase`.
    ///
    /// Consecutive phases give visibly different pictures, which is all
    /// the synthetic decoder needs.
    pub fn paint_test_pattern(&mut self, phase: u64) {
        let width = self.width.max(1);
        let bpp = self.format.bytes_per_pixel().max(1);
        let plane = self.primary_plane_mut();
        for y in 0..plane.height {
            let row = plane.row_mut(y);
            for x in 0..row.len() / bpp {
                let bar = ((x as u64 * 8 / width as u64) + phase) % 8;
                let level = (bar * 255 / 7) as u8;
                row[x * bpp..(x + 1) * bpp].fill(level);
            }
        }
    }
}

/// A decoded picture paired with its timestamp.
#[derive(Debug)]
pub struct Frame {
    image: FrameBuffer,
    timestamp: Timestamp,
}

impl Frame {
    pub fn new(image: FrameBuffer, timestamp: Timestamp) -> Self {
        Self { image, timestamp }
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    #[inline]
    pub fn image(&self) -> &FrameBuffer {
        &self.image
    }

    /// Give the pixel memory back, e.g. to a buffer pool.
    pub fn into_image(self) -> FrameBuffer {
        self.image
    }

    /// Exchange pictures with another frame, keeping both timestamps.
    pub fn swap_images(&mut self, other: &mut Frame) {
        std::mem::swap(&mut self.image, &mut other.image);
    }
}
