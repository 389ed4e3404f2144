//! Range decoder and its mirror encoder

use super::{BOT, TOP};
use crate::error::{Error, Result};

/// Decoding side of the range coder
#[derive(Debug, Clone)]
pub struct RangeDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    overread: usize,
    low: u32,
    range: u32,
    value: u32,
}

impl<'a> RangeDecoder<'a> {
    /// Start decoding; the first four bytes seed the value register.
    ///
    /// A stream shorter than four bytes is padded with zeros, an empty one
    /// is rejected.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::invalid_data("range coder needs coded data"));
        }
        let mut rc = RangeDecoder {
            data,
            pos: 0,
            overread: 0,
            low: 0,
            range: u32::MAX,
            value: 0,
        };
        for _ in 0..4 {
            rc.value = (rc.value << 8) | rc.next_byte() as u32;
        }
        Ok(rc)
    }

    /// Bytes not yet shifted into the value register
    pub fn bytes_left(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Zero bytes shifted in past the end of the stream
    pub fn overread(&self) -> usize {
        self.overread
    }

    /// Next input byte, zero once the stream is exhausted
    fn next_byte(&mut self) -> u8 {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                b
            }
            None => {
                self.overread += 1;
                0
            }
        }
    }

    /// A truncated stream keeps decoding on zero bytes rather than failing
    fn normalize(&mut self) {
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) >= TOP {
                if self.range >= BOT {
                    return;
                }
                self.range = self.low.wrapping_neg() & (BOT - 1);
            }
            self.value = (self.value << 8) | self.next_byte() as u32;
            self.range <<= 8;
            self.low <<= 8;
        }
    }

    /// Scale the range to `total` and return the cumulative frequency the
    /// next symbol falls on.
    ///
    /// A value register outside the interval, as a damaged or truncated
    /// stream produces, lands on the last frequency.
    pub fn get_freq(&mut self, total: u32) -> Result<u32> {
        if total == 0 {
            return Err(Error::invalid_data("zero total frequency"));
        }
        self.range /= total;
        if self.range == 0 {
            return Err(Error::invalid_data("range coder underflow"));
        }
        let freq = self.value.wrapping_sub(self.low) / self.range;
        Ok(freq.min(total - 1))
    }

    /// Consume the symbol spanning `[cum, cum + freq)` of the last
    /// `get_freq` total
    pub fn update(&mut self, cum: u32, freq: u32) -> Result<()> {
        self.low = self.low.wrapping_add(self.range.wrapping_mul(cum));
        self.range = self.range.wrapping_mul(freq);
        self.normalize();
        Ok(())
    }

    /// Decode a binary decision; `false` has weight `f0`, `true` weight `f1`
    pub fn decode_bool(&mut self, f0: u32, f1: u32) -> Result<bool> {
        let total = f0.wrapping_add(f1);
        if total == 0 {
            return Err(Error::invalid_data("zero total frequency"));
        }
        let help = self.range / total;
        if help == 0 {
            return Err(Error::invalid_data("range coder underflow"));
        }
        let split = f0.wrapping_mul(help);
        let bit = self.value.wrapping_sub(self.low) >= split;
        if bit {
            self.low = self.low.wrapping_add(split);
            self.range = f1.wrapping_mul(help);
        } else {
            self.range = split;
        }
        self.normalize();
        Ok(bit)
    }

    /// Decode an equiprobable bit
    pub fn decode_bit(&mut self) -> Result<bool> {
        self.range >>= 1;
        let bit = self.value.wrapping_sub(self.low) >= self.range;
        if bit {
            self.low = self.low.wrapping_add(self.range);
        }
        self.normalize();
        Ok(bit)
    }

    /// Decode a value uniformly distributed over `0..n`
    pub fn decode_uniform(&mut self, n: u32) -> Result<u32> {
        let v = self.get_freq(n)?;
        self.update(v, 1)?;
        Ok(v)
    }
}

/// Encoding side of the range coder
#[derive(Debug, Clone)]
pub struct RangeEncoder {
    out: Vec<u8>,
    low: u32,
    range: u32,
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeEncoder {
    pub fn new() -> Self {
        RangeEncoder {
            out: Vec::new(),
            low: 0,
            range: u32::MAX,
        }
    }

    fn normalize(&mut self) {
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) >= TOP {
                if self.range >= BOT {
                    return;
                }
                self.range = self.low.wrapping_neg() & (BOT - 1);
            }
            self.out.push((self.low >> 24) as u8);
            self.range <<= 8;
            self.low <<= 8;
        }
    }

    /// Encode the symbol spanning `[cum, cum + freq)` out of `total`
    pub fn encode_freq(&mut self, cum: u32, freq: u32, total: u32) {
        self.range /= total;
        self.low = self.low.wrapping_add(self.range.wrapping_mul(cum));
        self.range = self.range.wrapping_mul(freq);
        self.normalize();
    }

    pub fn encode_bool(&mut self, f0: u32, f1: u32, bit: bool) {
        let help = self.range / (f0 + f1);
        let split = f0 * help;
        if bit {
            self.low = self.low.wrapping_add(split);
            self.range = f1 * help;
        } else {
            self.range = split;
        }
        self.normalize();
    }

    pub fn encode_bit(&mut self, bit: bool) {
        self.range >>= 1;
        if bit {
            self.low = self.low.wrapping_add(self.range);
        }
        self.normalize();
    }

    pub fn encode_uniform(&mut self, value: u32, n: u32) {
        self.encode_freq(value, 1, n);
    }

    /// Flush the shortest value inside the final interval and return the
    /// stream. The decoder supplies the trailing zero bytes itself.
    pub fn finish(mut self) -> Vec<u8> {
        for bytes in 1..4u32 {
            let shift = 32 - 8 * bytes;
            let mask = (1u32 << shift) - 1;
            let value = self.low.wrapping_add(mask) & !mask;
            if value.wrapping_sub(self.low) < self.range {
                for i in 0..bytes {
                    self.out.push((value >> (24 - 8 * i)) as u8);
                }
                return self.out;
            }
        }
        for _ in 0..4 {
            self.out.push((self.low >> 24) as u8);
            self.low <<= 8;
        }
        self.out
    }
}
