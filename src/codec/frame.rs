//! Frame representation for uncompressed media data

use crate::util::{Buffer, PixelFormat, SampleFormat, Timestamp};
use std::fmt;

/// A frame of uncompressed media data
#[derive(Debug, Clone)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl Frame {
    /// Get the presentation timestamp
    pub fn pts(&self) -> Timestamp {
        match self {
            Frame::Video(f) => f.pts,
            Frame::Audio(f) => f.pts,
        }
    }

    /// Set the presentation timestamp
    pub fn set_pts(&mut self, pts: Timestamp) {
        match self {
            Frame::Video(f) => f.pts = pts,
            Frame::Audio(f) => f.pts = pts,
        }
    }

    pub fn set_duration(&mut self, duration: i64) {
        match self {
            Frame::Video(f) => f.duration = duration,
            Frame::Audio(f) => f.duration = duration,
        }
    }

    pub fn as_video(&self) -> Option<&VideoFrame> {
        match self {
            Frame::Video(f) => Some(f),
            Frame::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioFrame> {
        match self {
            Frame::Audio(f) => Some(f),
            Frame::Video(_) => None,
        }
    }
}

/// A video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame data (one buffer per plane, palette last for PAL8)
    pub data: Vec<Buffer>,

    /// Line sizes for each plane
    pub linesize: Vec<usize>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Pixel format
    pub format: PixelFormat,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Duration
    pub duration: i64,

    /// Is keyframe
    pub keyframe: bool,

    /// Picture type (I, P, B)
    pub pict_type: PictureType,
}

impl VideoFrame {
    /// Create a new video frame without planes
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        VideoFrame {
            data: Vec::new(),
            linesize: Vec::new(),
            width,
            height,
            format,
            pts: Timestamp::none(),
            duration: 0,
            keyframe: false,
            pict_type: PictureType::None,
        }
    }

    pub fn num_planes(&self) -> usize {
        self.data.len()
    }

    pub fn plane(&self, index: usize) -> Option<&Buffer> {
        self.data.get(index)
    }

    /// Visible bytes of one row of a picture plane
    pub fn row(&self, plane: usize, y: usize) -> Option<&[u8]> {
        let (width, height) = self.plane_dims(plane)?;
        if y >= height {
            return None;
        }
        let stride = *self.linesize.get(plane)?;
        let start = y.checked_mul(stride)?;
        self.data.get(plane)?.as_slice().get(start..start + width)
    }

    /// Visible byte width and row count of a picture plane
    pub fn plane_dims(&self, plane: usize) -> Option<(usize, usize)> {
        let bpp = self.format.bytes_per_pixel(plane);
        if bpp == 0 {
            return None;
        }
        let (sx, sy) = self.format.plane_shift(plane);
        let w = ((self.width as usize) + (1 << sx) - 1) >> sx;
        let h = ((self.height as usize) + (1 << sy) - 1) >> sy;
        Some((w * bpp, h))
    }

    /// Palette entries (B, G, R, A bytes per entry) of a PAL8 frame
    pub fn palette(&self) -> Option<&[u8]> {
        if !self.format.has_palette() {
            return None;
        }
        self.data.get(1).map(|b| b.as_slice())
    }

    /// Copy the visible picture into tightly packed planes, stripping
    /// any line padding
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for plane in 0..self.format.num_planes() {
            if let Some((_, height)) = self.plane_dims(plane) {
                for y in 0..height {
                    if let Some(row) = self.row(plane, y) {
                        out.extend_from_slice(row);
                    }
                }
            } else if let Some(extra) = self.data.get(plane) {
                out.extend_from_slice(extra.as_slice());
            }
        }
        out
    }
}

/// Picture type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    /// Intra frame
    I,
    /// Predicted frame
    P,
    /// Bidirectional frame
    B,
    /// None/Unknown
    None,
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PictureType::I => write!(f, "I"),
            PictureType::P => write!(f, "P"),
            PictureType::B => write!(f, "B"),
            PictureType::None => write!(f, "?"),
        }
    }
}

/// An audio frame
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Audio data (one buffer per channel for planar formats)
    pub data: Vec<Buffer>,

    /// Number of samples per channel
    pub nb_samples: usize,

    /// Sample rate
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Sample format
    pub format: SampleFormat,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Duration
    pub duration: i64,
}

impl AudioFrame {
    /// Create a new audio frame without sample data
    pub fn new(nb_samples: usize, sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        AudioFrame {
            data: Vec::new(),
            nb_samples,
            sample_rate,
            channels,
            format,
            pts: Timestamp::none(),
            duration: 0,
        }
    }

    pub fn num_planes(&self) -> usize {
        if self.format.is_planar() {
            self.channels as usize
        } else {
            1
        }
    }

    /// Get total number of samples across all channels
    pub fn total_samples(&self) -> usize {
        self.nb_samples * self.channels as usize
    }

    /// Raw bytes of one sample, wherever the layout puts it
    pub fn sample_bytes(&self, channel: usize, index: usize) -> Option<&[u8]> {
        let size = self.format.sample_size();
        if channel >= self.channels as usize || index >= self.nb_samples || size == 0 {
            return None;
        }
        let (plane, offset) = if self.format.is_planar() {
            (channel, index * size)
        } else {
            (0, (index * self.channels as usize + channel) * size)
        };
        self.data.get(plane)?.as_slice().get(offset..offset + size)
    }

    /// Sample data in interleaved order, whatever the frame layout
    pub fn interleaved_bytes(&self) -> Vec<u8> {
        if !self.format.is_planar() {
            return self.data.first().map(|b| b.as_slice().to_vec()).unwrap_or_default();
        }
        let mut out = Vec::with_capacity(self.total_samples() * self.format.sample_size());
        for i in 0..self.nb_samples {
            for ch in 0..self.channels as usize {
                if let Some(bytes) = self.sample_bytes(ch, i) {
                    out.extend_from_slice(bytes);
                }
            }
        }
        out
    }
}
