//! Common stream builders for the bitdec integration tests
//!
//! Each builder produces packets the matching decoder accepts, so tests can
//! state the expected picture or samples directly.

#![allow(dead_code)]

use bitdec_lib::codec::asv1::{CCP_CODES, CCP_EOB, LEVEL_CODES, LEVEL_ESCAPE};
use bitdec_lib::codec::bitstream::{bswap32_words, BitWriter};
use bitdec_lib::codec::rangecoder::RangeEncoder;
use bitdec_lib::codec::rka::{
    block_split, magnitude_context, predict, requantize, segment_size, split_segments,
    taper_coeff_bits, ChannelModels, RkaHeader, StreamModels, COEFF_ESCAPE, HISTORY,
    MODE_EXPLICIT, POSITION_CONTEXTS,
};
use bitdec_lib::codec::vlc::VlcCode;

// ============================================================================
// 8BPS
// ============================================================================

/// PackBits-compress one row: runs of 2 to 128 equal bytes, literals of up
/// to 128 bytes
pub fn packbits_row(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < row.len() {
        let mut run = 1;
        while i + run < row.len() && row[i + run] == row[i] && run < 128 {
            run += 1;
        }
        if run >= 2 {
            out.push((257 - run) as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < row.len() && i - start < 128 {
            if i + 1 < row.len() && row[i + 1] == row[i] {
                break;
            }
            i += 1;
        }
        if i == start {
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start..i]);
    }
    out
}

/// Build an 8BPS packet from coded planes, each `width * height` bytes
pub fn eightbps_packet(width: usize, height: usize, planes: &[Vec<u8>]) -> Vec<u8> {
    let mut table = Vec::new();
    let mut data = Vec::new();
    for plane in planes {
        for row in plane.chunks(width).take(height) {
            let coded = packbits_row(row);
            table.extend_from_slice(&(coded.len() as u16).to_be_bytes());
            data.extend_from_slice(&coded);
        }
    }
    table.extend_from_slice(&data);
    table
}

// ============================================================================
// ARBC
// ============================================================================

/// One ARBC tile: row, column, mask of painted sub-blocks (MSB first)
#[derive(Debug, Clone, Copy)]
pub struct ArbcTile {
    pub y: u8,
    pub x: u8,
    pub mask: u16,
}

/// A segment painting one colour through tiles of several sizes
#[derive(Debug, Clone, Default)]
pub struct ArbcSegment {
    /// 0xRRGGBB
    pub color: u32,
    /// Tiles by edge length, masks selecting 4x4 grids of sub-blocks
    pub tiles1024: Vec<ArbcTile>,
    pub tiles256: Vec<ArbcTile>,
    pub tiles64: Vec<ArbcTile>,
    pub tiles16: Vec<ArbcTile>,
    /// 4x4 tiles, masks selecting single pixels
    pub pixels: Vec<ArbcTile>,
}

fn push_tiles(out: &mut Vec<u8>, tiles: &[ArbcTile]) {
    out.extend_from_slice(&(tiles.len() as u16).to_le_bytes());
    for t in tiles {
        out.push(t.y);
        out.push(t.x);
        out.extend_from_slice(&t.mask.to_le_bytes());
    }
}

/// Build an ARBC packet from segments
pub fn arbc_packet(segments: &[ArbcSegment]) -> Vec<u8> {
    let mut out = vec![0u8; 8];
    out.extend_from_slice(&(segments.len() as u16).to_le_bytes());
    for s in segments {
        let [_, r, g, b] = s.color.to_be_bytes();
        out.extend_from_slice(&[r, 0, g, 0, b, 0]);

        let lists = [
            (0x10u8, &s.tiles1024),
            (0x08, &s.tiles256),
            (0x04, &s.tiles64),
            (0x02, &s.tiles16),
            (0x01, &s.pixels),
        ];
        let flags = lists
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .fold(0u8, |f, (bit, _)| f | bit);
        out.push(flags);
        for (_, tiles) in lists.iter().filter(|(_, t)| !t.is_empty()) {
            push_tiles(&mut out, tiles);
        }
    }
    out
}

// ============================================================================
// ASV1
// ============================================================================

/// Writes ASV1 blocks in coded order
#[derive(Default)]
pub struct Asv1Writer {
    bw: BitWriter,
}

impl Asv1Writer {
    pub fn new() -> Self {
        Self::default()
    }

    fn code(&mut self, code: VlcCode) {
        self.bw.write_bits(code.code, code.len as u32);
    }

    fn level(&mut self, level: i32) {
        if (-3..=3).contains(&level) && level != 0 {
            self.code(LEVEL_CODES[(level + 3) as usize]);
        } else {
            self.code(LEVEL_CODES[LEVEL_ESCAPE as usize]);
            self.bw.write_sbits(level, 8);
        }
    }

    /// Write one block: the DC byte and `(scan position, level)` pairs for
    /// positions below 40. A coefficient at position 0 replaces the DC.
    pub fn block(&mut self, dc: u8, coeffs: &[(usize, i32)]) -> &mut Self {
        self.bw.write_bits(dc as u32, 8);
        let last_group = coeffs.iter().map(|&(p, _)| p / 4).max();
        for group in 0..10 {
            if last_group.map_or(true, |g| group > g) {
                self.code(CCP_CODES[CCP_EOB as usize]);
                return self;
            }
            let mut ccp = 0usize;
            let mut levels = [0i32; 4];
            for &(pos, level) in coeffs.iter().filter(|(p, _)| p / 4 == group) {
                ccp |= 8 >> (pos % 4);
                levels[pos % 4] = level;
            }
            self.code(CCP_CODES[ccp]);
            for (k, &level) in levels.iter().enumerate() {
                if ccp & (8 >> k) != 0 {
                    self.level(level);
                }
            }
        }
        self.code(CCP_CODES[CCP_EOB as usize]);
        self
    }

    /// Write a macroblock whose six blocks are flat
    pub fn flat_macroblock(&mut self, y: u8, cb: u8, cr: u8) -> &mut Self {
        for _ in 0..4 {
            self.block(y, &[]);
        }
        self.block(cb, &[]).block(cr, &[])
    }

    /// Finish into a packet of little-endian words
    pub fn finish(self) -> Vec<u8> {
        let mut bytes = self.bw.into_bytes();
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bswap32_words(&bytes)
    }
}

// ============================================================================
// RKA
// ============================================================================

/// Parameters of an RKA test stream
#[derive(Debug, Clone)]
pub struct RkaParams {
    pub sample_rate: u32,
    pub bits: u32,
    pub correlated: bool,
    /// Header quantiser; zero is lossless
    pub quant: i32,
    /// Filter used for every block
    pub coeffs: Vec<i32>,
}

impl Default for RkaParams {
    fn default() -> Self {
        RkaParams {
            sample_rate: 44100,
            bits: 16,
            correlated: false,
            quant: 0,
            coeffs: vec![32],
        }
    }
}

/// An encoded RKA stream: header (extradata) and packets
pub struct RkaStream {
    pub header: RkaHeader,
    pub packets: Vec<Vec<u8>>,
    /// Residual scale of each channel after the last packet
    pub qfactor: Vec<u32>,
}

/// Segment modes cycled through for full segments
const RKA_FULL_MODES: [u32; 7] = [0, 1, 2, 3, 4, 6, 7];

struct ChannelEncoder {
    models: ChannelModels,
    qfactor: u32,
    vrq: u32,
    bits: u32,
    chunks: usize,
    signal: Vec<i32>,
    diff: Vec<i32>,
}

impl ChannelEncoder {
    fn new(qfactor: u32, vrq: u32, bits: u32) -> Self {
        ChannelEncoder {
            models: ChannelModels::new(),
            qfactor,
            vrq,
            bits,
            chunks: 0,
            signal: vec![0; HISTORY],
            diff: vec![0; HISTORY],
        }
    }

    fn coded(&self) -> usize {
        self.signal.len() - HISTORY
    }

    fn chunk(
        &mut self,
        enc: &mut RangeEncoder,
        stream: &mut StreamModels,
        input: &[i32],
        segment: u32,
        coeffs: &[i32],
    ) {
        let remaining = input.len() - self.coded();
        let units = remaining.div_ceil(4) as u32;
        if units < segment >> 2 {
            self.models
                .nb_segments
                .encode_int(enc, MODE_EXPLICIT, MODE_EXPLICIT)
                .unwrap();
            enc.encode_uniform(units, segment >> 2);
            self.filter(enc, stream, input, units as usize * 4, coeffs);
        } else {
            let mode = RKA_FULL_MODES[self.chunks % RKA_FULL_MODES.len()];
            self.models.nb_segments.encode_int(enc, MODE_EXPLICIT, mode).unwrap();
            for size in split_segments(mode, segment).unwrap() {
                self.filter(enc, stream, input, size as usize, coeffs);
            }
        }
        self.chunks += 1;
    }

    fn encode_coeffs(&mut self, enc: &mut RangeEncoder, stream: &mut StreamModels, coeffs: &[i32]) {
        stream.filt_size.encode_int(enc, 256, coeffs.len() as u32).unwrap();
        if coeffs.is_empty() {
            return;
        }
        let widest = coeffs.iter().map(|c| c.unsigned_abs()).max().unwrap_or(0);
        let mut bits = (32 - widest.leading_zeros()).saturating_sub(2).min(10);
        stream.filt_bits.encode_int(enc, 10, bits).unwrap();

        for (idx, &c) in coeffs.iter().enumerate() {
            bits = taper_coeff_bits(bits, idx);
            let magnitude = c.unsigned_abs();
            let class = if magnitude == 0 {
                0
            } else {
                ((magnitude - 1) >> bits) + 1
            };
            let model = &mut self.models.coeff_bits[bits as usize];
            if class >= COEFF_ESCAPE {
                model.encode_int(enc, COEFF_ESCAPE, COEFF_ESCAPE).unwrap();
                enc.encode_uniform(class, 1 << 16);
            } else {
                model.encode_int(enc, COEFF_ESCAPE, class).unwrap();
            }
            if class == 0 {
                continue;
            }
            if bits > 0 {
                enc.encode_uniform((magnitude - 1) & ((1 << bits) - 1), 1 << bits);
            }
            stream.sign(idx).encode(enc, c < 0);
        }
    }

    fn filter(
        &mut self,
        enc: &mut RangeEncoder,
        stream: &mut StreamModels,
        input: &[i32],
        size: usize,
        coeffs: &[i32],
    ) {
        if self.qfactor == 0 {
            self.models.fshift.encode_int(enc, 15, 0).unwrap();
        }
        self.encode_coeffs(enc, stream, coeffs);

        let split = block_split(size);
        let mut last = 0i32;
        let mut x = 0;
        let mut block = 0usize;
        while x < size {
            let delta = block % 3;
            self.models.position.encode_int(enc, 10, delta as u32).unwrap();
            let idx = (self.models.pos_idx + delta) % POSITION_CONTEXTS;
            self.models.pos_idx = idx;

            let mut energy = 0u32;
            for _ in 0..split.min(size - x) {
                let target = input.get(self.coded()).copied().unwrap_or(0);
                let end = self.diff.len();
                let previous = self.signal[end - 1];
                let prediction = predict(coeffs, &self.diff[end - coeffs.len()..]);
                let (residual, s) = if self.qfactor == 0 {
                    let d = target.wrapping_sub(previous);
                    (d.wrapping_sub(prediction), target)
                } else {
                    let base = prediction.wrapping_add(previous);
                    let residual = target.wrapping_sub(base) >> self.qfactor;
                    let (lo, hi) = if self.bits == 8 {
                        (-128, 127)
                    } else {
                        (-32768, 32767)
                    };
                    let s = base
                        .wrapping_add(residual.wrapping_shl(self.qfactor))
                        .clamp(lo, hi);
                    energy = energy.wrapping_add((s - previous).unsigned_abs());
                    (residual, s)
                };
                self.models
                    .residual(magnitude_context(last, idx), idx)
                    .encode(enc, residual);
                last = residual;
                self.diff.push(s.wrapping_sub(previous));
                self.signal.push(s);
            }

            if self.vrq != 0 {
                self.qfactor = requantize(energy, split, self.vrq);
            }
            x += split;
            block += 1;
        }
    }
}

/// Encode per-channel signed samples (8-bit samples are offset by -128)
/// into an RKA stream
pub fn rka_encode(channels: &[Vec<i32>], params: &RkaParams) -> RkaStream {
    let nb_channels = channels.len();
    let total = channels[0].len();
    let header = RkaHeader {
        total_bytes: (total * nb_channels * params.bits as usize / 8) as u32,
        sample_rate: params.sample_rate,
        channels: nb_channels as u16,
        bits_per_sample: params.bits,
        quant: params.quant,
        correlated: params.correlated,
    };
    let coded: Vec<Vec<i32>> = if params.correlated && nb_channels == 2 {
        let diff = channels[0]
            .iter()
            .zip(&channels[1])
            .map(|(&l, &r)| l.wrapping_sub(r))
            .collect();
        vec![channels[0].clone(), diff]
    } else {
        channels.to_vec()
    };

    let per_packet = header.frame_samples();
    let segment = segment_size(params.sample_rate);
    let mut qfactor = vec![header.qfactor(); nb_channels];
    let mut packets = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + per_packet).min(total);
        let mut enc = RangeEncoder::new();
        let mut stream = StreamModels::new();
        let mut chans: Vec<ChannelEncoder> = qfactor
            .iter()
            .map(|&q| ChannelEncoder::new(q, header.vrq(), params.bits))
            .collect();
        let inputs: Vec<&[i32]> = coded.iter().map(|c| &c[start..end]).collect();
        let n = end - start;
        while chans.iter().any(|c| c.coded() < n) {
            for (chan, input) in chans.iter_mut().zip(&inputs) {
                if chan.coded() < n {
                    chan.chunk(&mut enc, &mut stream, input, segment, &params.coeffs);
                }
            }
        }
        qfactor = chans.iter().map(|c| c.qfactor).collect();
        packets.push(enc.finish());
        start = end;
    }
    RkaStream {
        header,
        packets,
        qfactor,
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Deterministic test tone with a little noise, in `-amplitude..=amplitude`
pub fn test_tone(len: usize, period: f64, amplitude: f64, seed: u64) -> Vec<i32> {
    let mut state = seed;
    (0..len)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 33) % 7) as f64 - 3.0;
            let v = amplitude * (i as f64 * std::f64::consts::TAU / period).sin() + noise;
            v.round().clamp(-amplitude, amplitude) as i32
        })
        .collect()
}
