//! Common utilities and data structures

pub mod buffer;
pub mod pixfmt;
pub mod samplefmt;
pub mod timestamp;

pub use buffer::{Buffer, BufferRef};
pub use pixfmt::PixelFormat;
pub use samplefmt::SampleFormat;
pub use timestamp::Timestamp;

use serde::Serialize;
use std::fmt;

/// Common media types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Video stream
    Video,
    /// Audio stream
    Audio,
    /// Unknown stream type
    Unknown,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Clip a value to the unsigned 8-bit range
#[inline]
pub fn clip_u8(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

/// Clip a value to the signed 8-bit range
#[inline]
pub fn clip_i8(v: i64) -> i8 {
    v.clamp(i8::MIN as i64, i8::MAX as i64) as i8
}

/// Clip a value to the signed 16-bit range
#[inline]
pub fn clip_i16(v: i64) -> i16 {
    v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}
