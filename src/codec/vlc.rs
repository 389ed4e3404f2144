//! Variable-length code tables
//!
//! A [`VlcTable`] maps prefix-free bit patterns to symbols with a two-level
//! lookup: a main table indexed by the next `bits` bits, and per-prefix
//! sub-tables for codes longer than that. Tables are immutable once built.
//! Codecs keep theirs in a `static OnceLock` and pass the `&'static` handle
//! into their decode functions.

use super::bitstream::BitReader;
use crate::error::{Error, Result};
use std::sync::OnceLock;
use tracing::debug;

/// Longest code a table accepts
pub const MAX_CODE_LEN: u32 = 32;

/// Upper bound on main plus sub-table entries
pub const MAX_TABLE_ENTRIES: usize = 1 << 20;

/// One code of a table description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlcCode {
    /// Code bits, right-aligned
    pub code: u32,
    /// Code length in bits
    pub len: u8,
    pub symbol: i32,
}

impl VlcCode {
    pub const fn new(code: u32, len: u8, symbol: i32) -> Self {
        VlcCode { code, len, symbol }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Empty,
    Leaf { symbol: i32, len: u8 },
    Sub { offset: u32, bits: u8 },
}

/// Two-level VLC lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlcTable {
    bits: u32,
    max_len: u32,
    entries: Vec<Entry>,
}

impl VlcTable {
    /// Build a table whose main level is indexed by `bits` bits
    pub fn build(bits: u32, codes: &[VlcCode]) -> Result<Self> {
        if bits == 0 || bits > 16 {
            return Err(Error::resource(format!("unsupported VLC index width {}", bits)));
        }
        let mut max_len = 0;
        for c in codes {
            let len = c.len as u32;
            if len == 0 || len > MAX_CODE_LEN || len > 2 * bits {
                return Err(Error::resource(format!(
                    "code length {} outside 1..={}",
                    len,
                    MAX_CODE_LEN.min(2 * bits)
                )));
            }
            if len < 32 && c.code >> len != 0 {
                return Err(Error::resource(format!(
                    "code {:#x} does not fit in {} bits",
                    c.code, len
                )));
            }
            max_len = max_len.max(len);
        }

        let mut entries = vec![Entry::Empty; 1 << bits];

        // Short codes fill every main slot they prefix
        for c in codes.iter().filter(|c| c.len as u32 <= bits) {
            let shift = bits - c.len as u32;
            let base = (c.code << shift) as usize;
            for slot in &mut entries[base..base + (1 << shift)] {
                if *slot != Entry::Empty {
                    return Err(Error::resource("VLC codes are not prefix-free"));
                }
                *slot = Entry::Leaf {
                    symbol: c.symbol,
                    len: c.len,
                };
            }
        }

        // Long codes are grouped by their first `bits` bits
        let mut long: Vec<&VlcCode> = codes.iter().filter(|c| c.len as u32 > bits).collect();
        long.sort_by_key(|c| c.code >> (c.len as u32 - bits));
        let mut i = 0;
        while i < long.len() {
            let prefix = long[i].code >> (long[i].len as u32 - bits);
            let group_end = long[i..]
                .iter()
                .position(|c| c.code >> (c.len as u32 - bits) != prefix)
                .map_or(long.len(), |n| i + n);
            let group = &long[i..group_end];
            let sub_bits = group.iter().map(|c| c.len as u32 - bits).max().unwrap_or(1);

            let offset = entries.len();
            if offset + (1 << sub_bits) > MAX_TABLE_ENTRIES {
                return Err(Error::resource("VLC table capacity exceeded"));
            }
            if entries[prefix as usize] != Entry::Empty {
                return Err(Error::resource("VLC codes are not prefix-free"));
            }
            entries[prefix as usize] = Entry::Sub {
                offset: offset as u32,
                bits: sub_bits as u8,
            };
            entries.resize(offset + (1 << sub_bits), Entry::Empty);

            for c in group {
                let rest = c.len as u32 - bits;
                let low = c.code & ((1u32 << rest) - 1);
                let shift = sub_bits - rest;
                let base = offset + ((low << shift) as usize);
                for slot in &mut entries[base..base + (1 << shift)] {
                    if *slot != Entry::Empty {
                        return Err(Error::resource("VLC codes are not prefix-free"));
                    }
                    *slot = Entry::Leaf {
                        symbol: c.symbol,
                        len: rest as u8,
                    };
                }
            }
            i = group_end;
        }

        Ok(VlcTable {
            bits,
            max_len,
            entries,
        })
    }

    /// Build a table from code lengths, assigning canonical Huffman codes
    /// in symbol order
    pub fn from_lengths(bits: u32, lengths: &[u8], symbols: &[i32]) -> Result<Self> {
        if lengths.len() != symbols.len() {
            return Err(Error::invalid_input("lengths and symbols differ in count"));
        }
        let mut order: Vec<usize> = (0..lengths.len()).filter(|&i| lengths[i] > 0).collect();
        order.sort_by_key(|&i| (lengths[i], i));

        let mut codes = Vec::with_capacity(order.len());
        let mut code: u64 = 0;
        let mut prev_len = 0u32;
        for i in order {
            let len = lengths[i] as u32;
            code <<= len - prev_len;
            if code >> len != 0 {
                return Err(Error::resource("code lengths oversubscribe the code space"));
            }
            codes.push(VlcCode::new(code as u32, lengths[i], symbols[i]));
            code += 1;
            prev_len = len;
        }
        Self::build(bits, &codes)
    }

    /// Build a table on first use and return the shared instance.
    ///
    /// Concurrent first calls may each build a table; exactly one is kept
    /// and every caller gets the same reference.
    pub fn get_or_build(
        cell: &'static OnceLock<VlcTable>,
        name: &str,
        bits: u32,
        codes: &[VlcCode],
    ) -> Result<&'static VlcTable> {
        if let Some(table) = cell.get() {
            return Ok(table);
        }
        let table = Self::build(bits, codes)?;
        debug!(
            "Built {} VLC table: {} entries, max code length {}",
            name,
            table.entries.len(),
            table.max_len
        );
        Ok(cell.get_or_init(|| table))
    }

    /// Decode one symbol
    #[inline]
    pub fn decode(&self, br: &mut BitReader<'_>) -> Result<i32> {
        let idx = br.peek_bits_padded(self.bits) as usize;
        match self.entries[idx] {
            Entry::Leaf { symbol, len } => {
                br.skip_bits(len as usize)?;
                Ok(symbol)
            }
            Entry::Sub { offset, bits } => {
                br.skip_bits(self.bits as usize)?;
                let idx = offset as usize + br.peek_bits_padded(bits as u32) as usize;
                match self.entries[idx] {
                    Entry::Leaf { symbol, len } => {
                        br.skip_bits(len as usize)?;
                        Ok(symbol)
                    }
                    _ => Err(Error::invalid_data("invalid VLC code")),
                }
            }
            Entry::Empty => Err(Error::invalid_data("invalid VLC code")),
        }
    }

    /// Main table index width
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Longest code in the table
    pub fn max_len(&self) -> u32 {
        self.max_len
    }
}
