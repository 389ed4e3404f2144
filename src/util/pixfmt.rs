//! Pixel format definitions

use serde::Serialize;
use std::fmt;

/// Pixel format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PixelFormat {
    /// 8-bit palette indices; plane 1 holds 256 BGRA palette entries
    PAL8,
    /// RGB24 - 8 bits per component, packed R, G, B
    RGB24,
    /// BGR24 - packed B, G, R
    BGR24,
    /// BGRA - packed B, G, R, A
    BGRA,
    /// YUV420P - Planar YUV 4:2:0
    YUV420P,
    /// GRAY8 - 8-bit grayscale
    GRAY8,
    /// Unknown format
    Unknown,
}

impl PixelFormat {
    /// Number of data planes a frame of this format carries
    pub fn num_planes(&self) -> usize {
        match self {
            PixelFormat::PAL8 => 2,
            PixelFormat::YUV420P => 3,
            PixelFormat::RGB24 | PixelFormat::BGR24 | PixelFormat::BGRA | PixelFormat::GRAY8 => 1,
            PixelFormat::Unknown => 0,
        }
    }

    /// Bytes per pixel within a picture plane
    pub fn bytes_per_pixel(&self, plane: usize) -> usize {
        match (self, plane) {
            (PixelFormat::RGB24 | PixelFormat::BGR24, 0) => 3,
            (PixelFormat::BGRA, 0) => 4,
            (PixelFormat::PAL8, 0) => 1,
            (PixelFormat::YUV420P, 0..=2) => 1,
            (PixelFormat::GRAY8, 0) => 1,
            _ => 0,
        }
    }

    /// Horizontal and vertical subsampling shifts of a plane
    pub fn plane_shift(&self, plane: usize) -> (u32, u32) {
        match (self, plane) {
            (PixelFormat::YUV420P, 1 | 2) => (1, 1),
            _ => (0, 0),
        }
    }

    /// Whether this format carries a palette plane
    pub fn has_palette(&self) -> bool {
        matches!(self, PixelFormat::PAL8)
    }

    pub fn is_planar(&self) -> bool {
        matches!(self, PixelFormat::YUV420P)
    }

    pub fn is_yuv(&self) -> bool {
        matches!(self, PixelFormat::YUV420P)
    }

    pub fn is_rgb(&self) -> bool {
        matches!(
            self,
            PixelFormat::RGB24 | PixelFormat::BGR24 | PixelFormat::BGRA
        )
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::PAL8 => "pal8",
            PixelFormat::RGB24 => "rgb24",
            PixelFormat::BGR24 => "bgr24",
            PixelFormat::BGRA => "bgra",
            PixelFormat::YUV420P => "yuv420p",
            PixelFormat::GRAY8 => "gray8",
            PixelFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        PixelFormat::Unknown
    }
}
