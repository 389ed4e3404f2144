//! DFPWM audio codec
//!
//! Dynamic Filter Pulse Width Modulation: one bit per sample, least
//! significant bit first. Each bit steers an adaptive-strength charge
//! predictor towards +127 or -128 and the result passes through a fixed
//! low-pass filter. Samples are interleaved across channels bit by bit.

pub mod decoder;
pub mod encoder;

pub use decoder::DfpwmDecoder;
pub use encoder::DfpwmEncoder;

const RESP_INC: i32 = 1;
const RESP_DEC: i32 = 1;
const RESP_PREC: i32 = 10;
const LPF_STRENGTH: i32 = 140;

/// Predictor and filter state shared by the decoder and encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfpwmState {
    /// Low-pass filter output
    fq: i32,
    /// Charge
    q: i32,
    /// Response strength
    s: i32,
    /// Previous target
    lt: i32,
}

impl Default for DfpwmState {
    fn default() -> Self {
        DfpwmState {
            fq: 0,
            q: 0,
            s: 0,
            lt: -128,
        }
    }
}

impl DfpwmState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current charge, the value the encoder compares input against
    pub fn charge(&self) -> i32 {
        self.q
    }

    /// Advance by one coded bit and return the filtered output sample
    pub fn step(&mut self, bit: bool) -> i8 {
        let t = if bit { 127 } else { -128 };

        let mut nq = self.q + ((self.s * (t - self.q) + (1 << (RESP_PREC - 1))) >> RESP_PREC);
        if nq == self.q && nq != t {
            nq += if t == 127 { 1 } else { -1 };
        }
        let lq = self.q;
        self.q = nq;

        let st = if t != self.lt { 0 } else { (1 << RESP_PREC) - 1 };
        let ns = if self.s != st {
            self.s + if st != 0 { RESP_INC } else { -RESP_DEC }
        } else {
            self.s
        };
        self.s = ns.max(8);

        // Antijerk on polarity changes
        let ov = if t != self.lt { (nq + lq + 1) >> 1 } else { nq };
        self.fq += (LPF_STRENGTH * (ov - self.fq) + 0x80) >> 8;
        self.lt = t;

        self.fq as i8
    }
}
