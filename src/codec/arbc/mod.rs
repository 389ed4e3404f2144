//! Gryphon's Anim Compressor (ARBC) video decoder
//!
//! Every frame paints solid-colour segments over the previous frame. A
//! segment names one RGB colour and lists tiles at up to five resolutions;
//! each tile carries a 16-bit mask of which of its 4x4 sub-blocks (or single
//! pixels, for 4x4 tiles) take the colour. Rows are stored bottom-up.

pub mod decoder;

pub use decoder::ArbcDecoder;

/// Tile sizes selected by the segment flag bits, largest first
pub const TILE_SIZES: [(u8, usize); 4] = [(0x10, 1024), (0x08, 256), (0x04, 64), (0x02, 16)];

/// Flag bit for 4x4 tiles whose mask addresses single pixels
pub const FLAG_TILE4: u8 = 0x01;
