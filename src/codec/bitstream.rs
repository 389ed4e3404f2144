//! Bounds-checked bit and byte cursors over a compressed packet.
//!
//! `BitReader` reads MSB-first. What happens when a read runs past the end
//! of the packet is chosen per codec through [`OverreadMode`]:
//!
//! - `Strict` fails the read with `Error::InvalidData`.
//! - `ZeroPad(n)` behaves as if the packet were followed by `n` zero bytes,
//!   and fails only once that padding is exhausted as well.
//!
//! Neither mode ever touches memory outside the input slice. `ByteReader`
//! offers the same choice per call: checked getters fail past the end,
//! `*_or_zero` getters read zeros and stop advancing.
//!
//! `BitWriter` produces MSB-first streams and is used by encoders and
//! tests to build input for the readers.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Zero padding most lenient codecs may read past the packet end, in bytes
pub const INPUT_PADDING: usize = 64;

/// Behaviour of a bit read that runs past the end of the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverreadMode {
    /// Reading past the end is an error
    Strict,
    /// The data is followed by this many bytes of zeros
    ZeroPad(usize),
}

/// MSB-first bit reader
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
    limit: usize,
}

impl<'a> BitReader<'a> {
    /// Create a strict reader
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_mode(data, OverreadMode::Strict)
    }

    /// Create a reader with an explicit overread policy
    pub fn with_mode(data: &'a [u8], mode: OverreadMode) -> Self {
        let padding = match mode {
            OverreadMode::Strict => 0,
            OverreadMode::ZeroPad(bytes) => bytes,
        };
        BitReader {
            data,
            bit_pos: 0,
            limit: (data.len() + padding) * 8,
        }
    }

    #[inline]
    fn check(&self, n: u32) -> Result<()> {
        if n > 32 {
            return Err(Error::invalid_input("cannot read more than 32 bits at once"));
        }
        if self.bit_pos + n as usize > self.limit {
            return Err(Error::invalid_data(format!(
                "bitstream overread at bit {} (+{})",
                self.bit_pos, n
            )));
        }
        Ok(())
    }

    /// Next `n` bits without bounds checks on the logical length; bytes past
    /// the slice read as zero
    #[inline]
    fn peek_raw(&self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let byte = self.bit_pos >> 3;
        let mut acc: u64 = 0;
        for i in 0..5 {
            acc = (acc << 8) | self.data.get(byte + i).copied().unwrap_or(0) as u64;
        }
        let shift = 40 - (self.bit_pos & 7) as u32 - n;
        ((acc >> shift) & ((1u64 << n) - 1)) as u32
    }

    /// Read `n` bits (0..=32) as an unsigned value
    #[inline]
    pub fn get_bits(&mut self, n: u32) -> Result<u32> {
        self.check(n)?;
        let v = self.peek_raw(n);
        self.bit_pos += n as usize;
        Ok(v)
    }

    /// Read `n` bits (1..=32) as a two's complement value
    #[inline]
    pub fn get_sbits(&mut self, n: u32) -> Result<i32> {
        if n == 0 {
            return Ok(0);
        }
        let v = self.get_bits(n)?;
        let shift = 32 - n;
        Ok(((v << shift) as i32) >> shift)
    }

    #[inline]
    pub fn get_bit(&mut self) -> Result<bool> {
        Ok(self.get_bits(1)? != 0)
    }

    /// Look at the next `n` bits without consuming them
    #[inline]
    pub fn peek_bits(&self, n: u32) -> Result<u32> {
        self.check(n)?;
        Ok(self.peek_raw(n))
    }

    /// Look at up to `n` bits; bits beyond the readable limit are zero.
    ///
    /// Table-driven decoders peek a fixed width and then consume only the
    /// length of the matched code, which may well fit.
    #[inline]
    pub fn peek_bits_padded(&self, n: u32) -> u32 {
        let avail = self.limit.saturating_sub(self.bit_pos);
        if avail >= n as usize {
            return self.peek_raw(n);
        }
        let take = avail as u32;
        self.peek_raw(take) << (n - take)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        if self.bit_pos + n > self.limit {
            return Err(Error::invalid_data("bitstream overread while skipping"));
        }
        self.bit_pos += n;
        Ok(())
    }

    /// Current bit position
    #[inline]
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Bits left before the end of the real data
    #[inline]
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    /// Bits consumed beyond the end of the real data
    #[inline]
    pub fn overread_bits(&self) -> usize {
        self.bit_pos.saturating_sub(self.data.len() * 8)
    }

    /// Skip to the next byte boundary
    pub fn align_to_byte(&mut self) {
        let rem = self.bit_pos % 8;
        if rem != 0 {
            self.bit_pos = (self.bit_pos + 8 - rem).min(self.limit.max(self.bit_pos));
        }
    }
}

/// Byte-granular cursor
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    #[inline]
    pub fn bytes_left(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset, clamped to the end
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// The unread part of the data
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.bytes_left() {
            return Err(Error::invalid_data(format!(
                "need {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.bytes_left()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn get_be16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    #[inline]
    pub fn get_le16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    #[inline]
    pub fn get_be32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    #[inline]
    pub fn get_le32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Read a byte, or zero once the data is exhausted
    #[inline]
    pub fn get_u8_or_zero(&mut self) -> u8 {
        self.get_u8().unwrap_or(0)
    }

    /// Read a little-endian 16-bit value, or zero if fewer than two bytes
    /// remain (the cursor then moves to the end)
    #[inline]
    pub fn get_le16_or_zero(&mut self) -> u16 {
        match self.get_le16() {
            Ok(v) => v,
            Err(_) => {
                self.pos = self.data.len();
                0
            }
        }
    }

    /// Skip up to `n` bytes, stopping at the end
    #[inline]
    pub fn skip_or_end(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }
}

/// MSB-first bit writer
pub struct BitWriter {
    data: Vec<u8>,
    current_byte: u8,
    bit_count: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            data: Vec::with_capacity(256),
            current_byte: 0,
            bit_count: 0,
        }
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.current_byte = (self.current_byte << 1) | (bit as u8);
        self.bit_count += 1;

        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// Write the low `n` bits of `value`, MSB first
    #[inline]
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "Cannot write more than 32 bits at once");
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    /// Write a two's complement value in `n` bits
    pub fn write_sbits(&mut self, value: i32, n: u32) {
        let mask = if n >= 32 { u32::MAX } else { (1u32 << n) - 1 };
        self.write_bits(value as u32 & mask, n);
    }

    /// Total bits written
    pub fn bit_position(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// Pad the last byte with zeros and return the stream
    pub fn into_bytes(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.data.push(self.current_byte);
        }
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Swap the byte order of every complete 32-bit word.
///
/// A trailing partial word is replaced by zeros.
pub fn bswap32_words(src: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    for (dst, word) in out.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        BigEndian::write_u32(dst, LittleEndian::read_u32(word));
    }
    out
}
