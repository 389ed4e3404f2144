//! 8x8 inverse DCT with runtime implementation selection
//!
//! Integer "simple IDCT": a row pass with 11-bit rounding stored back as
//! 16-bit values, then a column pass with 20-bit rounding clipped to 8 bits.
//! All implementations produce identical output; [`select_idct`] picks one
//! once when a decoder is constructed.

use super::writer::PlaneMut;
use crate::util::clip_u8;
use std::fmt;
use tracing::debug;

const W1: i64 = 22725;
const W2: i64 = 21407;
const W3: i64 = 19266;
const W4: i64 = 16383;
const W5: i64 = 12873;
const W6: i64 = 8867;
const W7: i64 = 4520;
const ROW_SHIFT: u32 = 11;
const COL_SHIFT: u32 = 20;

/// Block transform capability
pub trait Idct: Send + Sync + fmt::Debug {
    /// Implementation name for logs
    fn name(&self) -> &'static str;

    /// Transform coefficients in natural order into clipped 8-bit samples.
    /// The block is used as scratch space.
    fn idct_block(&self, block: &mut [i16; 64]) -> [u8; 64];

    /// Transform and store at `(x, y)`, clipped to the plane
    fn idct_put(&self, block: &mut [i16; 64], dst: &mut PlaneMut<'_>, x: usize, y: usize) {
        let pixels = self.idct_block(block);
        dst.put_block(x, y, &pixels, 8, 8);
    }
}

fn row_pass(row: &mut [i16]) {
    let r: [i64; 8] = std::array::from_fn(|i| row[i] as i64);
    if r[1..].iter().all(|&v| v == 0) {
        let dc = (r[0] << 3) as i16;
        row[..8].fill(dc);
        return;
    }

    let mut a0 = W4 * r[0] + (1 << (ROW_SHIFT - 1));
    let mut a1 = a0;
    let mut a2 = a0;
    let mut a3 = a0;
    a0 += W2 * r[2];
    a1 += W6 * r[2];
    a2 -= W6 * r[2];
    a3 -= W2 * r[2];

    let mut b0 = W1 * r[1] + W3 * r[3];
    let mut b1 = W3 * r[1] - W7 * r[3];
    let mut b2 = W5 * r[1] - W1 * r[3];
    let mut b3 = W7 * r[1] - W5 * r[3];

    a0 += W4 * r[4] + W6 * r[6];
    a1 += -W4 * r[4] - W2 * r[6];
    a2 += -W4 * r[4] + W2 * r[6];
    a3 += W4 * r[4] - W6 * r[6];

    b0 += W5 * r[5] + W7 * r[7];
    b1 += -W1 * r[5] - W5 * r[7];
    b2 += W7 * r[5] + W3 * r[7];
    b3 += W3 * r[5] - W1 * r[7];

    row[0] = ((a0 + b0) >> ROW_SHIFT) as i16;
    row[7] = ((a0 - b0) >> ROW_SHIFT) as i16;
    row[1] = ((a1 + b1) >> ROW_SHIFT) as i16;
    row[6] = ((a1 - b1) >> ROW_SHIFT) as i16;
    row[2] = ((a2 + b2) >> ROW_SHIFT) as i16;
    row[5] = ((a2 - b2) >> ROW_SHIFT) as i16;
    row[3] = ((a3 + b3) >> ROW_SHIFT) as i16;
    row[4] = ((a3 - b3) >> ROW_SHIFT) as i16;
}

fn column(block: &[i16; 64], out: &mut [u8; 64], col: usize) {
    let c: [i64; 8] = std::array::from_fn(|i| block[i * 8 + col] as i64);

    let mut a0 = W4 * (c[0] + ((1 << (COL_SHIFT - 1)) / W4));
    let mut a1 = a0;
    let mut a2 = a0;
    let mut a3 = a0;
    a0 += W2 * c[2];
    a1 += W6 * c[2];
    a2 -= W6 * c[2];
    a3 -= W2 * c[2];

    let mut b0 = W1 * c[1] + W3 * c[3];
    let mut b1 = W3 * c[1] - W7 * c[3];
    let mut b2 = W5 * c[1] - W1 * c[3];
    let mut b3 = W7 * c[1] - W5 * c[3];

    a0 += W4 * c[4];
    a1 -= W4 * c[4];
    a2 -= W4 * c[4];
    a3 += W4 * c[4];

    b0 += W5 * c[5];
    b1 -= W1 * c[5];
    b2 += W7 * c[5];
    b3 += W3 * c[5];

    a0 += W6 * c[6];
    a1 -= W2 * c[6];
    a2 += W2 * c[6];
    a3 -= W6 * c[6];

    b0 += W7 * c[7];
    b1 -= W5 * c[7];
    b2 += W3 * c[7];
    b3 -= W1 * c[7];

    let rows = [
        a0 + b0,
        a1 + b1,
        a2 + b2,
        a3 + b3,
        a3 - b3,
        a2 - b2,
        a1 - b1,
        a0 - b0,
    ];
    for (i, v) in rows.into_iter().enumerate() {
        out[i * 8 + col] = clip_u8(v >> COL_SHIFT);
    }
}

/// Straightforward per-row, per-column implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarIdct;

impl Idct for ScalarIdct {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn idct_block(&self, block: &mut [i16; 64]) -> [u8; 64] {
        for row in block.chunks_exact_mut(8) {
            row_pass(row);
        }
        let mut out = [0u8; 64];
        for col in 0..8 {
            column(block, &mut out, col);
        }
        out
    }
}

type Lanes = [i64; 8];

#[inline(always)]
fn lanes(f: impl Fn(usize) -> i64) -> Lanes {
    std::array::from_fn(f)
}

/// Column pass over all eight columns at once, one array lane per column.
///
/// Every step is an element-wise operation on fixed-size arrays, which the
/// compiler maps onto vector registers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LaneIdct;

impl Idct for LaneIdct {
    fn name(&self) -> &'static str {
        "lanes"
    }

    fn idct_block(&self, block: &mut [i16; 64]) -> [u8; 64] {
        for row in block.chunks_exact_mut(8) {
            row_pass(row);
        }

        let c: [Lanes; 8] = std::array::from_fn(|r| lanes(|i| block[r * 8 + i] as i64));
        let bias = (1 << (COL_SHIFT - 1)) / W4;

        let base = lanes(|i| W4 * (c[0][i] + bias));
        let even2 = lanes(|i| W2 * c[2][i]);
        let odd6 = lanes(|i| W6 * c[2][i]);
        let w4c4 = lanes(|i| W4 * c[4][i]);

        let a0 = lanes(|i| base[i] + even2[i] + w4c4[i] + W6 * c[6][i]);
        let a1 = lanes(|i| base[i] + odd6[i] - w4c4[i] - W2 * c[6][i]);
        let a2 = lanes(|i| base[i] - odd6[i] - w4c4[i] + W2 * c[6][i]);
        let a3 = lanes(|i| base[i] - even2[i] + w4c4[i] - W6 * c[6][i]);

        let b0 = lanes(|i| W1 * c[1][i] + W3 * c[3][i] + W5 * c[5][i] + W7 * c[7][i]);
        let b1 = lanes(|i| W3 * c[1][i] - W7 * c[3][i] - W1 * c[5][i] - W5 * c[7][i]);
        let b2 = lanes(|i| W5 * c[1][i] - W1 * c[3][i] + W7 * c[5][i] + W3 * c[7][i]);
        let b3 = lanes(|i| W7 * c[1][i] - W5 * c[3][i] + W3 * c[5][i] - W1 * c[7][i]);

        let rows: [Lanes; 8] = [
            lanes(|i| a0[i] + b0[i]),
            lanes(|i| a1[i] + b1[i]),
            lanes(|i| a2[i] + b2[i]),
            lanes(|i| a3[i] + b3[i]),
            lanes(|i| a3[i] - b3[i]),
            lanes(|i| a2[i] - b2[i]),
            lanes(|i| a1[i] - b1[i]),
            lanes(|i| a0[i] - b0[i]),
        ];

        let mut out = [0u8; 64];
        for (r, row) in rows.iter().enumerate() {
            for (i, &v) in row.iter().enumerate() {
                out[r * 8 + i] = clip_u8(v >> COL_SHIFT);
            }
        }
        out
    }
}

static SCALAR: ScalarIdct = ScalarIdct;
static LANES: LaneIdct = LaneIdct;

/// Pick the IDCT implementation for this CPU
pub fn select_idct() -> &'static dyn Idct {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse2") {
            debug!("IDCT: using {} implementation (sse2)", LANES.name());
            return &LANES;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            debug!("IDCT: using {} implementation (neon)", LANES.name());
            return &LANES;
        }
    }
    debug!("IDCT: using {} implementation", SCALAR.name());
    &SCALAR
}

/// Every available implementation, for tests and benchmarks
pub fn all_idcts() -> [&'static dyn Idct; 2] {
    [&SCALAR, &LANES]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator so the tests need no extra crates
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    #[test]
    fn test_dc_only_block_is_flat() {
        let mut block = [0i16; 64];
        block[0] = 8 * 128;
        let out = ScalarIdct.idct_block(&mut block);
        assert!(out.iter().all(|&p| p == out[0]));
        assert_eq!(out[0], 128);
    }

    #[test]
    fn test_zero_block_is_mid_black() {
        let mut block = [0i16; 64];
        let out = ScalarIdct.idct_block(&mut block);
        assert!(out.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_implementations_are_bit_identical() {
        let mut rng = Lcg(0x1234_5678);
        for round in 0..2000 {
            let mut block = [0i16; 64];
            let density = 1 + round % 8;
            for c in block.iter_mut() {
                if rng.next() % 8 < density as u64 {
                    *c = (rng.next() % 4096) as i16 - 2048;
                }
            }
            if round % 5 == 0 {
                block[0] = i16::MAX;
                block[63] = i16::MIN;
            }
            let expected = ScalarIdct.idct_block(&mut block.clone());
            for idct in all_idcts() {
                assert_eq!(
                    idct.idct_block(&mut block.clone()),
                    expected,
                    "{} differs in round {}",
                    idct.name(),
                    round
                );
            }
        }
    }

    #[test]
    fn test_idct_put_clips_to_plane() {
        let mut data = vec![0u8; 16 * 6];
        let mut plane = PlaneMut::new(&mut data, 16, 5, 6).unwrap();
        let mut block = [0i16; 64];
        block[0] = 8 * 200;
        select_idct().idct_put(&mut block, &mut plane, 0, 0);
        for y in 0..6 {
            assert!(data[y * 16..y * 16 + 5].iter().all(|&p| p == 200));
            assert!(data[y * 16 + 5..y * 16 + 16].iter().all(|&p| p == 0));
        }
    }
}
