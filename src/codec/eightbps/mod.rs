//! QuickTime 8BPS video decoder
//!
//! Intra-only, lossless. Each frame stores the picture as separate 8-bit
//! planes (palette indices, or R, G, B and optionally alpha), every row of
//! every plane PackBits-compressed. A table of big-endian 16-bit compressed
//! row lengths precedes the data.

pub mod decoder;

pub use decoder::EightBpsDecoder;

use crate::util::PixelFormat;

/// Output format, plane count and the byte each coded plane lands in
pub fn layout_for_depth(bits: u32) -> Option<(PixelFormat, usize, [usize; 4])> {
    match bits {
        8 => Some((PixelFormat::PAL8, 1, [0, 0, 0, 0])),
        24 => Some((PixelFormat::BGR24, 3, [2, 1, 0, 0])),
        32 => Some((PixelFormat::BGRA, 4, [2, 1, 0, 3])),
        _ => None,
    }
}
