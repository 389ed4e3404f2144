//! Adaptive probability models
//!
//! Every model updates after each coded symbol and rescales its counts
//! before they outgrow a limit. Each decode method has an encode twin that
//! performs identical model updates.

use super::coder::{RangeDecoder, RangeEncoder};
use crate::error::{Error, Result};

/// Two-symbol model with saturating counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryModel {
    freq: [u32; 2],
    limit: u32,
    inc: u32,
}

impl BinaryModel {
    /// Counts start at `f0`/`f1`, grow by `inc` and are halved plus one once
    /// their sum exceeds `limit`
    pub fn new(f0: u32, f1: u32, limit: u32, inc: u32) -> Self {
        BinaryModel {
            freq: [f0.max(1), f1.max(1)],
            limit,
            inc,
        }
    }

    /// Model that never rescales
    pub fn unbounded(f0: u32, f1: u32, inc: u32) -> Self {
        Self::new(f0, f1, u32::MAX, inc)
    }

    pub fn freqs(&self) -> (u32, u32) {
        (self.freq[0], self.freq[1])
    }

    fn rescale(&mut self) {
        if self.freq[0].saturating_add(self.freq[1]) > self.limit {
            self.freq[0] = (self.freq[0] >> 1) + 1;
            self.freq[1] = (self.freq[1] >> 1) + 1;
        }
    }

    fn bump(&mut self, bit: bool) {
        let f = &mut self.freq[bit as usize];
        *f = f.saturating_add(self.inc);
    }

    pub fn decode(&mut self, rc: &mut RangeDecoder<'_>) -> Result<bool> {
        self.rescale();
        let bit = rc.decode_bool(self.freq[0], self.freq[1])?;
        self.bump(bit);
        Ok(bit)
    }

    pub fn encode(&mut self, enc: &mut RangeEncoder, bit: bool) {
        self.rescale();
        enc.encode_bool(self.freq[0], self.freq[1], bit);
        self.bump(bit);
    }
}

/// Initial rescale threshold of an [`AdaptiveModel`]
pub const ADAPTIVE_INITIAL_THRESHOLD: u32 = 2000;

/// Threshold growth stops once it reaches this
pub const ADAPTIVE_MAX_THRESHOLD: u32 = 8000;

/// Multi-symbol model over `0..buf_size` that learns its alphabet.
///
/// Symbols seen before are coded by frequency from a Fenwick tree. A symbol
/// never seen before goes through an escape and is then picked by rank
/// among the unseen symbols. Below the full alphabet, the escape has one
/// slot per unseen symbol under `size` plus one for the first unseen symbol
/// at or above it, so an escaped symbol may exceed `size`.
#[derive(Debug, Clone)]
pub struct AdaptiveModel {
    counts: Vec<u32>,
    tree: Vec<u32>,
    buf_size: usize,
    total: usize,
    last: usize,
    aprob0: u32,
    aprob1: u32,
    threshold: u32,
}

impl AdaptiveModel {
    pub fn new(buf_size: usize) -> Self {
        let buf_size = buf_size.max(1);
        AdaptiveModel {
            counts: vec![0; buf_size],
            tree: vec![0; buf_size + 1],
            buf_size,
            total: 0,
            last: 0,
            aprob0: 0,
            aprob1: 0,
            threshold: ADAPTIVE_INITIAL_THRESHOLD,
        }
    }

    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    /// Current per-symbol counts
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Sum of all symbol counts
    pub fn total_freq(&self) -> u32 {
        self.aprob0
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Number of distinct symbols seen
    pub fn distinct(&self) -> usize {
        self.total
    }

    fn tree_add(&mut self, sym: usize, delta: u32) {
        let mut i = sym + 1;
        while i <= self.buf_size {
            self.tree[i] += delta;
            i += i & i.wrapping_neg();
        }
    }

    /// Sum of counts of symbols `0..end`
    fn prefix(&self, end: usize) -> u32 {
        let mut i = end;
        let mut sum = 0;
        while i > 0 {
            sum += self.tree[i];
            i &= i - 1;
        }
        sum
    }

    /// Symbol whose cumulative range contains `freq`
    fn find(&self, freq: u32) -> usize {
        let mut pos = 0;
        let mut rem = freq;
        let mut step = 1usize << (usize::BITS - 1 - self.buf_size.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= self.buf_size && self.tree[next] <= rem {
                pos = next;
                rem -= self.tree[next];
            }
            step >>= 1;
        }
        pos
    }

    fn bump(&mut self, sym: usize) {
        self.counts[sym] += 1;
        self.tree_add(sym, 1);
        self.aprob0 += 1;
    }

    fn rescale(&mut self) {
        for c in self.counts.iter_mut().filter(|c| **c > 0) {
            *c = (*c + 1) >> 1;
        }
        self.tree.iter_mut().for_each(|t| *t = 0);
        for sym in 0..self.buf_size {
            let c = self.counts[sym];
            if c > 0 {
                self.tree_add(sym, c);
            }
        }
        self.aprob0 = self.counts.iter().sum();
        self.aprob1 = (self.aprob1 + 1) >> 1;
        if self.threshold < ADAPTIVE_MAX_THRESHOLD {
            self.threshold += 200;
        }
    }

    fn clamp_size(&self, size: u32) -> usize {
        (size as usize).min(self.buf_size - 1)
    }

    /// Decode a symbol in `0..=size`.
    ///
    /// `size` is clamped to `buf_size - 1`, so no lookup ever leaves the
    /// model's alphabet.
    pub fn decode_int(&mut self, rc: &mut RangeDecoder<'_>, size: u32) -> Result<u32> {
        let size = self.clamp_size(size);
        if self.aprob0 >= self.threshold {
            self.rescale();
        }

        let seen = self.aprob1 != 0
            && (self.total == self.buf_size || !rc.decode_bool(self.aprob0, self.aprob1)?);
        if seen {
            let sym = if self.total <= 1 {
                self.last
            } else {
                let freq = rc.get_freq(self.prefix(size + 1))?;
                let sym = self.find(freq);
                rc.update(self.prefix(sym), self.counts[sym])?;
                sym
            };
            self.bump(sym);
            return Ok(sym as u32);
        }

        self.aprob1 += 1;
        let nth = rc.get_freq(self.escape_total(size))?;
        let sym = self
            .counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == 0)
            .nth(nth as usize)
            .map(|(i, _)| i)
            .ok_or_else(|| Error::invalid_data("escape past the model's alphabet"))?;
        rc.update(nth, 1)?;
        self.total += 1;
        self.last = sym;
        self.bump(sym);
        Ok(sym as u32)
    }

    /// Number of escape slots for a clamped `size`
    fn escape_total(&self, size: usize) -> u32 {
        if size == self.buf_size - 1 {
            (self.buf_size - self.total) as u32
        } else {
            1 + self.counts[..size].iter().filter(|&&c| c == 0).count() as u32
        }
    }

    /// Encode `sym`, which must lie in `0..=size` unless it is the only
    /// symbol seen so far
    pub fn encode_int(&mut self, enc: &mut RangeEncoder, size: u32, sym: u32) -> Result<()> {
        let size = self.clamp_size(size);
        let sym = sym as usize;
        if sym >= self.buf_size {
            return Err(Error::invalid_input(format!(
                "symbol {} outside model of {}",
                sym, self.buf_size
            )));
        }
        if self.aprob0 >= self.threshold {
            self.rescale();
        }

        let seen = self.counts[sym] > 0;
        if self.aprob1 != 0 && self.total != self.buf_size {
            enc.encode_bool(self.aprob0, self.aprob1, !seen);
        }
        if seen {
            if self.total > 1 {
                if sym > size {
                    return Err(Error::invalid_input("symbol above coded size"));
                }
                enc.encode_freq(self.prefix(sym), self.counts[sym], self.prefix(size + 1));
            }
            self.bump(sym);
            return Ok(());
        }

        self.aprob1 += 1;
        let total = self.escape_total(size);
        let nth = self.counts[..sym].iter().filter(|&&c| c == 0).count() as u32;
        if nth >= total {
            return Err(Error::invalid_input("symbol above coded size"));
        }
        enc.encode_freq(nth, 1, total);
        self.total += 1;
        self.last = sym;
        self.bump(sym);
        Ok(())
    }
}

/// Unary magnitude contexts before the escape
const MODEL64_CONTEXTS: usize = 65;

/// Largest escape class accepted while decoding
const MODEL64_MAX_ESCAPE: u32 = 1 << 20;

/// Signed residual model: zero flag, sign, `bits` raw low bits and a unary
/// magnitude class
#[derive(Debug, Clone)]
pub struct Model64 {
    zero: BinaryModel,
    sign: BinaryModel,
    bits: u32,
    classes: Vec<BinaryModel>,
}

impl Model64 {
    pub fn new(bits: u32) -> Self {
        let bits = bits.min(24);
        Model64 {
            zero: BinaryModel::new(1, ((1u32 << (bits >> 1)) + 3).min(20), 4000, 2),
            sign: BinaryModel::new(1, 1, 4000, 1),
            bits,
            classes: vec![BinaryModel::new(4, 1, 2000, 4); MODEL64_CONTEXTS],
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn decode(&mut self, rc: &mut RangeDecoder<'_>) -> Result<i32> {
        if !self.zero.decode(rc)? {
            return Ok(0);
        }
        let negative = self.sign.decode(rc)?;

        let bits = self.bits;
        let low = if bits == 0 {
            0
        } else if bits < 13 {
            rc.decode_uniform(1 << bits)?
        } else {
            let hbits = bits / 2;
            let lo = rc.decode_uniform(1 << hbits)?;
            let hi = rc.decode_uniform(1 << (bits - hbits))?;
            lo + (hi << hbits)
        };

        let mut class = None;
        for (i, ctx) in self.classes.iter_mut().enumerate() {
            if ctx.decode(rc)? {
                class = Some(i as u32);
                break;
            }
        }
        let class = match class {
            Some(c) => c,
            None => {
                let mut base = MODEL64_CONTEXTS as u32;
                while !rc.decode_bit()? {
                    base += 64;
                    if base > MODEL64_MAX_ESCAPE {
                        return Err(Error::invalid_data("residual escape too long"));
                    }
                }
                base + rc.decode_uniform(64)?
            }
        };

        let magnitude = low as i64 + 1 + ((class as i64) << bits);
        let value = if negative { -magnitude } else { magnitude };
        Ok(value as i32)
    }

    pub fn encode(&mut self, enc: &mut RangeEncoder, value: i32) {
        self.zero.encode(enc, value != 0);
        if value == 0 {
            return;
        }
        self.sign.encode(enc, value < 0);

        let bits = self.bits;
        let magnitude = (value as i64).abs() - 1;
        let low = (magnitude & ((1i64 << bits) - 1)) as u32;
        let class = (magnitude >> bits) as u32;
        if bits > 0 {
            if bits < 13 {
                enc.encode_uniform(low, 1 << bits);
            } else {
                let hbits = bits / 2;
                enc.encode_uniform(low & ((1 << hbits) - 1), 1 << hbits);
                enc.encode_uniform(low >> hbits, 1 << (bits - hbits));
            }
        }

        for (i, ctx) in self.classes.iter_mut().enumerate() {
            let stop = i as u32 == class;
            ctx.encode(enc, stop);
            if stop {
                return;
            }
        }
        let escape = class - MODEL64_CONTEXTS as u32;
        for _ in 0..escape / 64 {
            enc.encode_bit(false);
        }
        enc.encode_bit(true);
        enc.encode_uniform(escape % 64, 64);
    }
}
