//! Carry-less range coder and the adaptive models driven by it
//!
//! The coder keeps a 32-bit `low`/`range` pair and renormalises a byte at a
//! time whenever the top byte of the interval is settled, or when the range
//! drops to 16 bits. The decoder tracks `low` as well as `value`, so both
//! sides take exactly the same renormalisation steps.

pub mod coder;
pub mod model;

pub use coder::{RangeDecoder, RangeEncoder};
pub use model::{AdaptiveModel, BinaryModel, Model64};

/// Renormalise when the top byte of `low` and `low + range` agree
pub(crate) const TOP: u32 = 1 << 24;

/// Smallest range before a forced renormalisation
pub(crate) const BOT: u32 = 1 << 16;
