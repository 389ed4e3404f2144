//! ASUS V1 (ASV1) video decoder
//!
//! Intra-only DCT codec with 16x16 macroblocks in YUV 4:2:0. Each 8x8 block
//! codes an 8-bit DC value and up to ten groups of four AC coefficients.
//! A coded-coefficient pattern (CCP) VLC says which members of a group are
//! present, and each present one is a short level VLC or an 8-bit escape.
//! Packets are stored as little-endian 32-bit words.

pub mod decoder;

pub use decoder::Asv1Decoder;

use crate::codec::vlc::VlcCode;

/// Main table width of the CCP VLC
pub const CCP_VLC_BITS: u32 = 5;

/// Main table width of the level VLC
pub const LEVEL_VLC_BITS: u32 = 4;

/// CCP symbol that ends a block
pub const CCP_EOB: i32 = 16;

/// Level symbol followed by an 8-bit signed level
pub const LEVEL_ESCAPE: i32 = 3;

/// Inverse quantiser used when the extradata carries none
pub const DEFAULT_INV_QSCALE: u32 = 6;

/// Coefficient scan order
#[rustfmt::skip]
pub const SCANTAB: [u8; 64] = [
    0x00, 0x08, 0x01, 0x09, 0x10, 0x18, 0x11, 0x19,
    0x02, 0x0A, 0x03, 0x0B, 0x12, 0x1A, 0x13, 0x1B,
    0x04, 0x0C, 0x05, 0x0D, 0x20, 0x28, 0x21, 0x29,
    0x06, 0x0E, 0x07, 0x0F, 0x14, 0x1C, 0x15, 0x1D,
    0x22, 0x2A, 0x23, 0x2B, 0x30, 0x38, 0x31, 0x39,
    0x16, 0x1E, 0x17, 0x1F, 0x24, 0x2C, 0x25, 0x2D,
    0x32, 0x3A, 0x33, 0x3B, 0x26, 0x2E, 0x27, 0x2F,
    0x34, 0x3C, 0x35, 0x3D, 0x36, 0x3E, 0x37, 0x3F,
];

/// MPEG-1 default intra quantiser matrix, row-major
#[rustfmt::skip]
pub const MPEG1_INTRA_MATRIX: [u8; 64] = [
     8, 16, 19, 22, 26, 27, 29, 34,
    16, 16, 22, 24, 27, 29, 34, 37,
    19, 22, 26, 27, 29, 34, 34, 38,
    22, 22, 26, 27, 29, 34, 37, 40,
    22, 26, 27, 29, 32, 35, 40, 48,
    26, 27, 29, 32, 35, 40, 48, 58,
    26, 27, 29, 34, 38, 46, 56, 69,
    27, 29, 35, 38, 46, 56, 69, 83,
];

/// CCP codes; the symbol's bits 3..0 flag coefficients 0..3 of a group
pub const CCP_CODES: [VlcCode; 17] = [
    VlcCode::new(0x2, 2, 0),
    VlcCode::new(0x7, 5, 1),
    VlcCode::new(0xB, 5, 2),
    VlcCode::new(0x3, 5, 3),
    VlcCode::new(0xD, 5, 4),
    VlcCode::new(0x5, 5, 5),
    VlcCode::new(0x9, 5, 6),
    VlcCode::new(0x1, 5, 7),
    VlcCode::new(0xE, 5, 8),
    VlcCode::new(0x6, 5, 9),
    VlcCode::new(0xA, 5, 10),
    VlcCode::new(0x2, 5, 11),
    VlcCode::new(0xC, 5, 12),
    VlcCode::new(0x4, 5, 13),
    VlcCode::new(0x8, 5, 14),
    VlcCode::new(0x3, 2, 15),
    VlcCode::new(0xF, 5, CCP_EOB),
];

/// Level codes; symbol `s` is level `s - 3`, except the escape
pub const LEVEL_CODES: [VlcCode; 7] = [
    VlcCode::new(0x3, 4, 0),
    VlcCode::new(0x3, 3, 1),
    VlcCode::new(0x3, 2, 2),
    VlcCode::new(0x0, 3, LEVEL_ESCAPE),
    VlcCode::new(0x2, 2, 4),
    VlcCode::new(0x2, 3, 5),
    VlcCode::new(0x2, 4, 6),
];

/// Dequantisation factors in scan order
pub fn intra_matrix(inv_qscale: u32) -> [i32; 64] {
    let q = inv_qscale.max(1) as i32;
    std::array::from_fn(|i| 64 * MPEG1_INTRA_MATRIX[SCANTAB[i] as usize] as i32 / q)
}
