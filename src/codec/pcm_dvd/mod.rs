//! PCM-DVD (LPCM from DVD-Video program streams)
//!
//! Every packet opens with a 3-byte header giving quantisation, sample
//! rate and channel count. 16-bit samples are plain big-endian words.
//! 20- and 24-bit samples come in groups: the top 16 bits of each sample
//! of the group as big-endian words, then the low bits of the whole group
//! packed together (a nibble per sample for 20-bit, a byte for 24-bit).

pub mod decoder;
pub mod encoder;

pub use decoder::PcmDvdDecoder;
pub use encoder::PcmDvdEncoder;

use crate::error::{Error, Result};

/// Sample rates indexed by header bits 4-5 of the second byte
pub const FREQUENCIES: [u32; 4] = [48000, 96000, 44100, 32000];

/// Length of the per-packet header
pub const HEADER_SIZE: usize = 3;

/// Decoded stream parameters and the block layout they imply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmDvdHeader {
    /// Header bytes folded into one value, for change detection
    pub raw: u32,
    pub bits_per_sample: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bytes per coded block
    pub block_size: usize,
    /// Samples per channel in one block
    pub samples_per_block: usize,
}

impl PcmDvdHeader {
    /// Fold the header bytes the way the cache compares them; the low
    /// five bits of the first byte hold the frame number and are ignored
    pub fn fold(header: &[u8; 3]) -> u32 {
        (header[0] & 0xe0) as u32 | (header[1] as u32) << 8 | (header[2] as u32) << 16
    }

    pub fn parse(header: &[u8; 3]) -> Result<Self> {
        let bits_per_sample = 16 + ((header[1] >> 6) & 3) as u32 * 4;
        if bits_per_sample == 28 {
            return Err(Error::invalid_data("PCM-DVD: reserved sample size"));
        }
        let sample_rate = FREQUENCIES[((header[1] >> 4) & 3) as usize];
        let channels = 1 + (header[1] & 7) as u16;

        let ch = channels as usize;
        let bits = bits_per_sample as usize;
        let (block_size, samples_per_block) = if bits == 16 {
            (ch * 2, 1)
        } else {
            match ch {
                1 | 2 | 4 => (4 * bits / 8, 4 / ch),
                8 => (8 * bits / 8, 1),
                _ => (4 * ch * bits / 8, 4),
            }
        };

        Ok(PcmDvdHeader {
            raw: Self::fold(header),
            bits_per_sample,
            sample_rate,
            channels,
            block_size,
            samples_per_block,
        })
    }

    /// Samples per group of packed 20/24-bit data
    pub fn group_len(&self) -> usize {
        if self.channels == 1 {
            2
        } else {
            4
        }
    }

    /// Bytes per group of packed 20/24-bit data
    pub fn group_bytes(&self) -> usize {
        self.group_len() * self.bits_per_sample as usize / 8
    }
}
