//! RKA (RK Audio) decoder
//!
//! Each channel is coded as a sequence of segments. A segment carries an
//! LPC-style filter (order up to 255) and residuals, both through adaptive
//! range-coder models. The filter predicts the first difference of the
//! signal; the decoder integrates it back. Models and history start fresh
//! in every packet. The filter-order and coefficient-width models and the
//! per-tap sign counts are shared by both channels.
//!
//! A non-zero quantiser selects the lossy mode: residuals are scaled up by
//! the quantiser and the signal is clipped to the sample range. A negative
//! quantiser adapts the scale after every residual run.

pub mod decoder;

pub use decoder::RkaDecoder;

use crate::codec::rangecoder::{AdaptiveModel, BinaryModel, Model64};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Bytes of PCM a single packet decodes to, at most
pub const FRAME_BYTES: usize = 131072;

/// Samples of history kept ahead of the decoded data
pub const HISTORY: usize = 2560;

/// Largest filter order
pub const MAX_FILTER_ORDER: usize = 255;

/// Coefficient bit-width contexts
pub const COEFF_CONTEXTS: usize = 11;

/// Position contexts
pub const POSITION_CONTEXTS: usize = 11;

/// Coefficient magnitude class that escapes to 16 raw bits
pub const COEFF_ESCAPE: u32 = 31;

/// Taps counted twice by the predictor
pub const PREDICT_SPLIT: usize = 15;

/// Explicit segment mode, length coded in units of 4
pub const MODE_EXPLICIT: u32 = 5;

/// Sign counts, one pair per filter tap
const SIGN_CONTEXTS: usize = 257;

/// Lower bound of the adaptive quantiser, by `vrq - 1`
const VRQ_QFACTORS: [u32; 8] = [3, 3, 2, 2, 1, 1, 1, 1];

/// Stream parameters from the 16-byte header carried as extradata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RkaHeader {
    /// Size of the decoded PCM in bytes, zero when unknown
    pub total_bytes: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u32,
    /// Quantiser; zero means lossless, negative means adaptive
    pub quant: i32,
    /// Second channel holds the difference to the first
    pub correlated: bool,
}

impl RkaHeader {
    pub const SIZE: usize = 16;

    pub fn parse(extradata: &[u8]) -> Result<Self> {
        if extradata.len() < Self::SIZE {
            return Err(Error::invalid_input(format!(
                "RKA: header needs {} bytes, got {}",
                Self::SIZE,
                extradata.len()
            )));
        }
        let mut quant = (extradata[14] & 0xf) as i32;
        if extradata[15] & 4 != 0 {
            quant = -quant;
        }
        Ok(RkaHeader {
            total_bytes: LittleEndian::read_u32(&extradata[4..]),
            sample_rate: LittleEndian::read_u32(&extradata[8..]),
            channels: extradata[12] as u16,
            bits_per_sample: extradata[13] as u32,
            quant,
            correlated: extradata[15] & 1 != 0,
        })
    }

    /// Build the header bytes for these parameters
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..4].copy_from_slice(b"RKA7");
        LittleEndian::write_u32(&mut out[4..], self.total_bytes);
        LittleEndian::write_u32(&mut out[8..], self.sample_rate);
        out[12] = self.channels as u8;
        out[13] = self.bits_per_sample as u8;
        out[14] = (self.quant.unsigned_abs() & 0xf) as u8;
        out[15] = (self.correlated as u8) | if self.quant < 0 { 4 } else { 0 };
        out
    }

    /// Bytes per interleaved sample frame
    pub fn align(&self) -> usize {
        self.channels as usize * self.bits_per_sample as usize / 8
    }

    /// Samples per channel in a full packet
    pub fn frame_samples(&self) -> usize {
        FRAME_BYTES / self.align().max(1)
    }

    pub fn total_samples(&self) -> u64 {
        self.total_bytes as u64 / self.align().max(1) as u64
    }

    /// Residual scale at the start of the stream, as a shift
    pub fn qfactor(&self) -> u32 {
        if self.quant < 0 {
            2
        } else {
            self.quant as u32
        }
    }

    /// Adaptive quantiser strength, zero when the scale is fixed
    pub fn vrq(&self) -> u32 {
        if self.quant < 0 {
            self.quant.unsigned_abs().clamp(1, 8)
        } else {
            0
        }
    }
}

/// Nominal segment length for a sample rate, a multiple of 4
pub fn segment_size(sample_rate: u32) -> u32 {
    ((((sample_rate as u64) << 13) / 44100) as u32) & !3
}

/// Filter block lengths for every segment mode except [`MODE_EXPLICIT`].
///
/// The first half of the segment is one block for modes 1 and 2 and two
/// quarters above that; the second half is one block for odd modes and two
/// quarters for even ones. Mode 0 is a single block.
pub fn split_segments(mode: u32, size: u32) -> Option<Vec<u32>> {
    let (half, quarter) = (size / 2, size / 4);
    match mode {
        0 => Some(vec![size]),
        1..=7 if mode != MODE_EXPLICIT => {
            let mut parts = if mode > 2 {
                vec![quarter, quarter]
            } else {
                vec![half]
            };
            if mode & 1 != 0 {
                parts.push(half);
            } else {
                parts.extend([quarter, quarter]);
            }
            Some(parts)
        }
        _ => None,
    }
}

/// Samples between position-context updates within a filter block
pub fn block_split(size: usize) -> usize {
    let split = if size < 512 { size / 2 } else { size >> 4 };
    split.max(1)
}

/// Residual model row from the previous residual, scaled down by the
/// position context
pub fn magnitude_context(last: i32, position: usize) -> usize {
    match last.unsigned_abs() >> position {
        m if m >= 15 => 3,
        m if m >= 7 => 2,
        m if m >= 4 => 1,
        _ => 0,
    }
}

/// Coefficient width for tap `index`; it drops by one at taps 8 and 20
pub fn taper_coeff_bits(bits: u32, index: usize) -> u32 {
    if (index == 8 || index == 20) && bits > 0 {
        bits - 1
    } else {
        bits
    }
}

/// Filter prediction for the sample after `past`, whose last element is
/// the most recent sample. `past` must hold at least `coeffs.len()` values.
pub fn predict(coeffs: &[i32], past: &[i32]) -> i32 {
    let tap = |i: usize| coeffs[i].wrapping_mul(past[past.len() - 1 - i]);
    let near = coeffs.len().min(PREDICT_SPLIT);
    let mut sum = 16i32;
    for i in 0..near {
        sum = sum.wrapping_add(tap(i));
    }
    sum = sum.wrapping_mul(2);
    for i in near..coeffs.len() {
        sum = sum.wrapping_add(tap(i));
    }
    sum >> 6
}

/// Undo the prediction for one sample of the difference signal
pub fn reconstruct(prediction: i32, residual: i32, shift: u32, previous: i32) -> i32 {
    if shift == 0 {
        prediction.wrapping_add(residual)
    } else {
        let low = ((1u32 << shift) - 1) & previous as u32;
        (residual.wrapping_add(prediction >> shift) as u32)
            .wrapping_shl(shift)
            .wrapping_add(low) as i32
    }
}

/// Quantiser after a residual run whose differences sum to `energy`
pub fn requantize(energy: u32, split: usize, vrq: u32) -> u32 {
    let level = energy.wrapping_shl(6) / split.max(1) as u32;
    let bits = (u32::BITS - level.leading_zeros()) as i32 - (vrq as i32 + 7);
    let floor = VRQ_QFACTORS[(vrq.clamp(1, 8) - 1) as usize];
    bits.max(floor as i32) as u32
}

/// Models shared by every channel of a packet
#[derive(Debug, Clone)]
pub struct StreamModels {
    pub filt_size: AdaptiveModel,
    pub filt_bits: AdaptiveModel,
    signs: Vec<BinaryModel>,
}

impl Default for StreamModels {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamModels {
    pub fn new() -> Self {
        StreamModels {
            filt_size: AdaptiveModel::new(MAX_FILTER_ORDER + 1),
            filt_bits: AdaptiveModel::new(16),
            signs: vec![BinaryModel::new(1, 1, 4096, 1); SIGN_CONTEXTS],
        }
    }

    /// Sign model of filter tap `index`; `true` codes a negative tap
    pub fn sign(&mut self, index: usize) -> &mut BinaryModel {
        &mut self.signs[index.min(SIGN_CONTEXTS - 1)]
    }
}

/// Adaptive models owned by one channel
#[derive(Debug, Clone)]
pub struct ChannelModels {
    pub nb_segments: AdaptiveModel,
    pub fshift: AdaptiveModel,
    pub position: AdaptiveModel,
    pub coeff_bits: Vec<AdaptiveModel>,
    residual: Vec<[Model64; POSITION_CONTEXTS]>,
    /// Running position context
    pub pos_idx: usize,
}

impl Default for ChannelModels {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelModels {
    pub fn new() -> Self {
        let widths = |extra: u32| -> [Model64; POSITION_CONTEXTS] {
            std::array::from_fn(|i| Model64::new(i as u32 + extra))
        };
        ChannelModels {
            nb_segments: AdaptiveModel::new(8),
            fshift: AdaptiveModel::new(32),
            position: AdaptiveModel::new(16),
            coeff_bits: vec![AdaptiveModel::new(32); COEFF_CONTEXTS],
            residual: vec![widths(0), widths(0), widths(1), widths(1)],
            pos_idx: 1,
        }
    }

    /// Residual model for a magnitude row and position context
    pub fn residual(&mut self, magnitude: usize, position: usize) -> &mut Model64 {
        &mut self.residual[magnitude.min(3)][position % POSITION_CONTEXTS]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parse() {
        let header = RkaHeader {
            total_bytes: 44100 * 4,
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            quant: -3,
            correlated: true,
        };
        let parsed = RkaHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.align(), 4);
        assert_eq!(parsed.frame_samples(), 32768);
        assert_eq!(parsed.total_samples(), 44100);
        assert!(RkaHeader::parse(&[0; 15]).is_err());
    }

    #[test]
    fn test_segment_size() {
        assert_eq!(segment_size(44100), 8192);
        assert_eq!(segment_size(48000) % 4, 0);
        assert_eq!(segment_size(22050), 4096);
    }

    #[test]
    fn test_split_modes_cover_segment() {
        for mode in (0..8).filter(|&m| m != MODE_EXPLICIT) {
            let parts = split_segments(mode, 8192).unwrap();
            assert_eq!(parts.iter().sum::<u32>(), 8192, "mode {}", mode);
        }
        assert_eq!(split_segments(2, 16).unwrap(), vec![8, 4, 4]);
        assert_eq!(split_segments(3, 16).unwrap(), vec![4, 4, 8]);
        assert_eq!(split_segments(6, 16).unwrap(), vec![4; 4]);
        assert_eq!(split_segments(7, 16).unwrap(), vec![4, 4, 8]);
        assert!(split_segments(MODE_EXPLICIT, 8192).is_none());
        assert!(split_segments(8, 8192).is_none());
    }

    #[test]
    fn test_predict_weights_near_taps_twice() {
        // Single tap of 32 on the last sample: ((16 + 32x) * 2) >> 6 = x
        assert_eq!(predict(&[32], &[0, 0, 100]), 100);

        let mut coeffs = vec![0; 16];
        coeffs[15] = 64;
        let mut past = vec![0; 16];
        past[0] = 10;
        assert_eq!(predict(&coeffs, &past), (32 + 640) >> 6);
    }

    #[test]
    fn test_reconstruct_keeps_low_bits() {
        assert_eq!(reconstruct(10, 5, 0, 0), 15);
        // prediction 40 >> 2 = 10, plus 1, shifted back, low bits of 7
        assert_eq!(reconstruct(40, 1, 2, 7), (11 << 2) + 3);
    }

    #[test]
    fn test_contexts() {
        assert_eq!(magnitude_context(0, 0), 0);
        assert_eq!(magnitude_context(-4, 0), 1);
        assert_eq!(magnitude_context(7, 0), 2);
        assert_eq!(magnitude_context(15, 0), 3);
        assert_eq!(magnitude_context(-60, 2), 3);
        assert_eq!(magnitude_context(59, 2), 2);
        assert_eq!(magnitude_context(i32::MIN, 10), 3);
        assert_eq!(taper_coeff_bits(5, 7), 5);
        assert_eq!(taper_coeff_bits(5, 8), 4);
        assert_eq!(taper_coeff_bits(0, 20), 0);
    }

    #[test]
    fn test_quantiser_from_header() {
        let mut header = RkaHeader {
            total_bytes: 0,
            sample_rate: 44100,
            channels: 1,
            bits_per_sample: 16,
            quant: 0,
            correlated: false,
        };
        assert_eq!((header.qfactor(), header.vrq()), (0, 0));
        header.quant = 3;
        assert_eq!((header.qfactor(), header.vrq()), (3, 0));
        header.quant = -12;
        assert_eq!((header.qfactor(), header.vrq()), (2, 8));
    }

    #[test]
    fn test_requantize_has_a_floor() {
        assert_eq!(requantize(0, 64, 1), 3);
        assert_eq!(requantize(0, 64, 8), 1);
        // Level 1000 has ten bits, two after the offset
        assert_eq!(requantize(64 * 1000, 64 << 6, 1), 3);
        assert_eq!(requantize(1 << 20, 1, 1), 19);
    }
}
