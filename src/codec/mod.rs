//! Codec implementations and the shared decoding machinery
//!
//! The shared pieces (bit cursor, VLC tables, range coder, block transform,
//! output writer) sit next to the decoder framework. Each codec lives in
//! its own module built on top of them.

pub mod bitstream;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod idct;
pub mod rangecoder;
pub mod vlc;
pub mod writer;

// Video
pub mod arbc;
pub mod asv1;
pub mod eightbps;

// Audio
pub mod dfpwm;
pub mod pcm_dvd;
pub mod rka;

pub use decoder::{
    create_decoder, CodecDecoder, Decoder, DecoderContext, DecoderInstance, DecoderState,
};
pub use encoder::{create_encoder, Encoder, EncoderContext};
pub use frame::{AudioFrame, Frame, PictureType, VideoFrame};
pub use writer::{FrameAllocator, PlaneMut};

pub use arbc::ArbcDecoder;
pub use asv1::Asv1Decoder;
pub use dfpwm::{DfpwmDecoder, DfpwmEncoder};
pub use eightbps::EightBpsDecoder;
pub use pcm_dvd::{PcmDvdDecoder, PcmDvdEncoder};
pub use rka::RkaDecoder;

use crate::util::MediaType;
use serde::Serialize;

/// Codec capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecCapabilities {
    /// Codec supports lossy compression
    pub lossy: bool,
    /// Codec supports lossless compression
    pub lossless: bool,
    /// Codec supports intra-only coding
    pub intra_only: bool,
    /// Codec supports inter-frame prediction
    pub inter: bool,
    /// An encoder is available
    pub encoder: bool,
}

/// Codec information
#[derive(Debug, Clone, Serialize)]
pub struct CodecInfo {
    /// Codec identifier
    pub id: String,
    /// Codec name
    pub name: String,
    /// Long descriptive name
    pub long_name: String,
    /// Media type
    pub media_type: MediaType,
    /// Codec capabilities
    pub capabilities: CodecCapabilities,
}

/// Identifiers of every registered codec
pub const CODEC_IDS: [&str; 6] = ["8bps", "arbc", "asv1", "dfpwm", "pcm_dvd", "rka"];

/// Get codec information by ID
pub fn get_codec_info(id: &str) -> Option<CodecInfo> {
    let (id, name, long_name, media_type, capabilities) = match id {
        "8bps" => (
            "8bps",
            "8BPS",
            "QuickTime 8BPS video",
            MediaType::Video,
            CodecCapabilities {
                lossy: false,
                lossless: true,
                intra_only: true,
                inter: false,
                encoder: false,
            },
        ),
        "arbc" => (
            "arbc",
            "ARBC",
            "Gryphon's Anim Compressor",
            MediaType::Video,
            CodecCapabilities {
                lossy: false,
                lossless: true,
                intra_only: false,
                inter: true,
                encoder: false,
            },
        ),
        "asv1" => (
            "asv1",
            "ASV1",
            "ASUS V1",
            MediaType::Video,
            CodecCapabilities {
                lossy: true,
                lossless: false,
                intra_only: true,
                inter: false,
                encoder: false,
            },
        ),
        "dfpwm" => (
            "dfpwm",
            "DFPWM",
            "DFPWM1a audio",
            MediaType::Audio,
            CodecCapabilities {
                lossy: true,
                lossless: false,
                intra_only: false,
                inter: true,
                encoder: true,
            },
        ),
        "pcm_dvd" => (
            "pcm_dvd",
            "PCM-DVD",
            "PCM signed 16|20|24-bit big-endian for DVD media",
            MediaType::Audio,
            CodecCapabilities {
                lossy: false,
                lossless: true,
                intra_only: true,
                inter: false,
                encoder: true,
            },
        ),
        "rka" => (
            "rka",
            "RKA",
            "RKA (RK Audio)",
            MediaType::Audio,
            CodecCapabilities {
                lossy: false,
                lossless: true,
                intra_only: true,
                inter: false,
                encoder: false,
            },
        ),
        _ => return None,
    };

    Some(CodecInfo {
        id: id.to_string(),
        name: name.to_string(),
        long_name: long_name.to_string(),
        media_type,
        capabilities,
    })
}

/// Information on every registered codec
pub fn list_codecs() -> Vec<CodecInfo> {
    CODEC_IDS.iter().filter_map(|id| get_codec_info(id)).collect()
}
