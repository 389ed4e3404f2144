//! Packet representation for compressed media data

use crate::util::{Buffer, MediaType, Timestamp};
use std::fmt;

/// Packet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags {
    /// Packet contains a keyframe
    pub keyframe: bool,
    /// Packet is known to be damaged
    pub corrupt: bool,
    /// Packet follows a discontinuity (seek, splice)
    pub discontinuity: bool,
}

/// A packet of compressed media data, as handed over by a demuxer
#[derive(Debug, Clone)]
pub struct Packet {
    /// Stream index this packet belongs to
    pub stream_index: usize,

    /// Type of media (video, audio, etc.)
    pub codec_type: MediaType,

    /// Compressed data
    pub data: Buffer,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Decoding timestamp
    pub dts: Timestamp,

    /// Duration of this packet
    pub duration: i64,

    /// Packet flags
    pub flags: PacketFlags,

    /// Byte position in the source (-1 if unknown)
    pub position: i64,

    /// Palette side data (256 entries of 0xAARRGGBB) for paletted video
    pub palette: Option<Vec<u32>>,
}

impl Packet {
    /// Create a new packet
    pub fn new(stream_index: usize, data: Buffer) -> Self {
        Packet {
            stream_index,
            codec_type: MediaType::Unknown,
            data,
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            duration: 0,
            flags: PacketFlags::default(),
            position: -1,
            palette: None,
        }
    }

    /// Create a new video packet
    pub fn new_video(stream_index: usize, data: Buffer) -> Self {
        Packet {
            codec_type: MediaType::Video,
            ..Packet::new(stream_index, data)
        }
    }

    /// Create a new audio packet
    pub fn new_audio(stream_index: usize, data: Buffer) -> Self {
        Packet {
            codec_type: MediaType::Audio,
            ..Packet::new(stream_index, data)
        }
    }

    /// Build a packet straight from bytes, with a presentation timestamp
    pub fn from_slice(data: &[u8], pts: i64) -> Self {
        let mut packet = Packet::new(0, Buffer::from_vec(data.to_vec()));
        packet.pts = Timestamp::new(pts);
        packet.dts = Timestamp::new(pts);
        packet
    }

    pub fn is_keyframe(&self) -> bool {
        self.flags.keyframe
    }

    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.flags.keyframe = keyframe;
    }

    /// Get the size of the packet data
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet(stream={}, size={}, pts={}, key={})",
            self.stream_index,
            self.size(),
            self.pts,
            self.is_keyframe()
        )
    }
}
