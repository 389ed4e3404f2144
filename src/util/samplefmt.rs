//! Audio sample format definitions

use serde::Serialize;
use std::fmt;

/// Audio sample format
///
/// Multi-byte samples are stored in native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit
    I16,
    /// Signed 32-bit
    I32,
    /// Unsigned 8-bit planar
    U8P,
    /// Signed 16-bit planar
    I16P,
    /// Signed 32-bit planar
    I32P,
    /// Unknown format
    Unknown,
}

impl SampleFormat {
    /// Get the size in bytes of one sample
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8P => 1,
            SampleFormat::I16 | SampleFormat::I16P => 2,
            SampleFormat::I32 | SampleFormat::I32P => 4,
            SampleFormat::Unknown => 0,
        }
    }

    /// Check if this is a planar format
    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            SampleFormat::U8P | SampleFormat::I16P | SampleFormat::I32P
        )
    }

    /// Check if this is a packed (interleaved) format
    pub fn is_packed(&self) -> bool {
        matches!(
            self,
            SampleFormat::U8 | SampleFormat::I16 | SampleFormat::I32
        )
    }

    /// Get the planar equivalent of this format
    pub fn to_planar(&self) -> Self {
        match self {
            SampleFormat::U8 => SampleFormat::U8P,
            SampleFormat::I16 => SampleFormat::I16P,
            SampleFormat::I32 => SampleFormat::I32P,
            _ => *self,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::I16 => "s16",
            SampleFormat::I32 => "s32",
            SampleFormat::U8P => "u8p",
            SampleFormat::I16P => "s16p",
            SampleFormat::I32P => "s32p",
            SampleFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        SampleFormat::Unknown
    }
}
