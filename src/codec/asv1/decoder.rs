//! ASV1 decoder implementation
//!
//! Parsing is sequential. Once every block of the frame is parsed, the
//! inverse transform runs on the rayon pool, one macroblock row per task,
//! each task writing its own disjoint band of the three planes.

use super::{
    intra_matrix, CCP_CODES, CCP_EOB, CCP_VLC_BITS, DEFAULT_INV_QSCALE, LEVEL_CODES, LEVEL_ESCAPE,
    LEVEL_VLC_BITS, SCANTAB,
};
use crate::codec::bitstream::{bswap32_words, BitReader, OverreadMode, INPUT_PADDING};
use crate::codec::decoder::{CodecDecoder, DecoderContext};
use crate::codec::idct::{select_idct, Idct};
use crate::codec::vlc::VlcTable;
use crate::codec::writer::FrameAllocator;
use crate::codec::{Frame, PictureType};
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::PixelFormat;
use rayon::prelude::*;
use std::sync::OnceLock;
use tracing::debug;

static CCP_VLC: OnceLock<VlcTable> = OnceLock::new();
static LEVEL_VLC: OnceLock<VlcTable> = OnceLock::new();

/// Shared CCP table, built on first use
pub fn ccp_vlc() -> Result<&'static VlcTable> {
    VlcTable::get_or_build(&CCP_VLC, "ASV1 CCP", CCP_VLC_BITS, &CCP_CODES)
}

/// Shared level table, built on first use
pub fn level_vlc() -> Result<&'static VlcTable> {
    VlcTable::get_or_build(&LEVEL_VLC, "ASV1 level", LEVEL_VLC_BITS, &LEVEL_CODES)
}

type Block = [i16; 64];

/// Parsed coefficients of one macroblock: four luma blocks, Cb, Cr
struct Macroblock {
    mb_x: usize,
    blocks: [Block; 6],
}

/// ASV1 decoder
pub struct Asv1Decoder {
    width: u32,
    height: u32,
    mb_width: usize,
    mb_height: usize,
    mb_width2: usize,
    mb_height2: usize,
    intra_matrix: [i32; 64],
    ccp: &'static VlcTable,
    level: &'static VlcTable,
    idct: &'static dyn Idct,
    alloc: FrameAllocator,
}

impl Asv1Decoder {
    /// Create a decoder; `inv_qscale` of zero selects the default
    pub fn new(width: u32, height: u32, inv_qscale: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_input(format!(
                "invalid dimensions {}x{}",
                width, height
            )));
        }
        let inv_qscale = if inv_qscale == 0 {
            DEFAULT_INV_QSCALE
        } else {
            inv_qscale
        };
        let idct = select_idct();
        debug!(
            "ASV1: {}x{}, inverse qscale {}, {} IDCT",
            width,
            height,
            inv_qscale,
            idct.name()
        );

        let (w, h) = (width as usize, height as usize);
        Ok(Asv1Decoder {
            width,
            height,
            mb_width: (w + 15) / 16,
            mb_height: (h + 15) / 16,
            mb_width2: w / 16,
            mb_height2: h / 16,
            intra_matrix: intra_matrix(inv_qscale),
            ccp: ccp_vlc()?,
            level: level_vlc()?,
            idct,
            alloc: FrameAllocator::default(),
        })
    }

    fn decode_level(&self, gb: &mut BitReader<'_>) -> Result<i32> {
        let code = self.level.decode(gb)?;
        if code == LEVEL_ESCAPE {
            gb.get_sbits(8)
        } else {
            Ok(code - 3)
        }
    }

    fn decode_block(&self, gb: &mut BitReader<'_>, block: &mut Block) -> Result<()> {
        block[0] = 8 * gb.get_bits(8)? as i16;

        for i in 0..11 {
            let ccp = self.ccp.decode(gb)?;
            if ccp == 0 {
                continue;
            }
            if ccp == CCP_EOB {
                break;
            }
            // Only ten groups fit in the coded part of a block
            if i >= 10 {
                return Err(Error::invalid_data(format!(
                    "ASV1: coefficient pattern {} in group {}",
                    ccp, i
                )));
            }
            for k in 0..4 {
                if ccp & (8 >> k) != 0 {
                    let pos = 4 * i + k;
                    let level = self.decode_level(gb)?;
                    block[SCANTAB[pos] as usize] = ((level * self.intra_matrix[pos]) >> 4) as i16;
                }
            }
        }
        Ok(())
    }

    fn decode_macroblock(&self, gb: &mut BitReader<'_>, mb_x: usize) -> Result<Macroblock> {
        let mut mb = Macroblock {
            mb_x,
            blocks: [[0; 64]; 6],
        };
        for block in mb.blocks.iter_mut() {
            self.decode_block(gb, block)?;
        }
        Ok(mb)
    }

    /// Parse every macroblock, grouped by macroblock row
    fn parse(&self, data: &[u8]) -> Result<Vec<Vec<Macroblock>>> {
        let mut gb = BitReader::with_mode(data, OverreadMode::ZeroPad(INPUT_PADDING));
        let mut rows: Vec<Vec<Macroblock>> = (0..self.mb_height).map(|_| Vec::new()).collect();

        for mb_y in 0..self.mb_height2 {
            for mb_x in 0..self.mb_width2 {
                rows[mb_y].push(self.decode_macroblock(&mut gb, mb_x)?);
            }
        }
        if self.mb_width2 != self.mb_width {
            let mb_x = self.mb_width2;
            for mb_y in 0..self.mb_height2 {
                rows[mb_y].push(self.decode_macroblock(&mut gb, mb_x)?);
            }
        }
        if self.mb_height2 != self.mb_height {
            let mb_y = self.mb_height2;
            for mb_x in 0..self.mb_width {
                rows[mb_y].push(self.decode_macroblock(&mut gb, mb_x)?);
            }
        }
        Ok(rows)
    }
}

impl CodecDecoder for Asv1Decoder {
    fn open(ctx: &DecoderContext) -> Result<Self> {
        let inv_qscale = ctx
            .extradata()
            .and_then(|e| e.first())
            .copied()
            .unwrap_or(0) as u32;
        Self::new(ctx.width(), ctx.height(), inv_qscale)
    }

    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>> {
        let buf = packet.data.as_slice();
        if buf.len() * 8 < self.mb_width * self.mb_height * 13 {
            return Err(Error::invalid_data(format!(
                "ASV1: {} byte packet too small for {}x{} macroblocks",
                buf.len(),
                self.mb_width,
                self.mb_height
            )));
        }

        let swapped = bswap32_words(buf);
        let rows = self.parse(&swapped)?;

        let mut frame = self
            .alloc
            .alloc_video(self.width, self.height, PixelFormat::YUV420P)?;
        let mut planes = frame.planes_mut()?.into_iter();
        let (Some(luma), Some(cb), Some(cr)) = (planes.next(), planes.next(), planes.next()) else {
            return Err(Error::invalid_state("ASV1: frame is missing planes"));
        };

        let idct = self.idct;
        luma.into_row_bands(16)
            .into_par_iter()
            .zip(cb.into_row_bands(8))
            .zip(cr.into_row_bands(8))
            .zip(rows.par_iter())
            .for_each(|(((mut y, mut u), mut v), mbs)| {
                for mb in mbs {
                    let x = mb.mb_x * 16;
                    let [b0, b1, b2, b3, b4, b5] = mb.blocks;
                    idct.idct_put(&mut { b0 }, &mut y, x, 0);
                    idct.idct_put(&mut { b1 }, &mut y, x + 8, 0);
                    idct.idct_put(&mut { b2 }, &mut y, x, 8);
                    idct.idct_put(&mut { b3 }, &mut y, x + 8, 8);
                    idct.idct_put(&mut { b4 }, &mut u, mb.mb_x * 8, 0);
                    idct.idct_put(&mut { b5 }, &mut v, mb.mb_x * 8, 0);
                }
            });

        let mut frame = frame.freeze();
        frame.keyframe = true;
        frame.pict_type = PictureType::I;
        Ok(Some(Frame::Video(frame)))
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::bitstream::BitWriter;

    fn write_dc_block(bw: &mut BitWriter, dc: u32) {
        bw.write_bits(dc, 8);
        let eob = CCP_CODES[CCP_EOB as usize];
        bw.write_bits(eob.code, eob.len as u32);
    }

    /// Pack MSB-first bits into the stored little-endian word order
    fn to_packet(bw: BitWriter) -> Vec<u8> {
        let mut bytes = bw.into_bytes();
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bswap32_words(&bytes)
    }

    #[test]
    fn test_tables_build_once() {
        let a = ccp_vlc().unwrap();
        let b = ccp_vlc().unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(level_vlc().is_ok());
    }

    #[test]
    fn test_dc_only_frame() {
        let mut dec = Asv1Decoder::new(16, 16, 0).unwrap();
        let mut bw = BitWriter::new();
        for dc in [100, 100, 100, 100, 60, 200] {
            write_dc_block(&mut bw, dc);
        }
        let frame = dec
            .decode_packet(&Packet::from_slice(&to_packet(bw), 0))
            .unwrap()
            .unwrap();
        let video = frame.as_video().unwrap();
        assert_eq!(video.format, PixelFormat::YUV420P);
        for y in 0..16 {
            assert!(video.row(0, y).unwrap().iter().all(|&p| p == 100));
        }
        for y in 0..8 {
            assert!(video.row(1, y).unwrap().iter().all(|&p| p == 60));
            assert!(video.row(2, y).unwrap().iter().all(|&p| p == 200));
        }
    }

    #[test]
    fn test_partial_macroblocks_are_clipped() {
        let mut dec = Asv1Decoder::new(20, 18, 0).unwrap();
        let mut bw = BitWriter::new();
        // 2x2 macroblocks: full one, right column, bottom row (two)
        for mb in 0..4u32 {
            for _ in 0..6 {
                write_dc_block(&mut bw, 10 + mb * 10);
            }
        }
        let frame = dec
            .decode_packet(&Packet::from_slice(&to_packet(bw), 0))
            .unwrap()
            .unwrap();
        let video = frame.as_video().unwrap();
        assert_eq!(video.row(0, 0).unwrap()[0], 10);
        assert_eq!(video.row(0, 0).unwrap()[19], 20);
        assert_eq!(video.row(0, 17).unwrap()[0], 30);
        assert_eq!(video.row(0, 17).unwrap()[19], 40);
        assert_eq!(video.plane_dims(1), Some((10, 9)));
    }

    #[test]
    fn test_packet_too_small() {
        let mut dec = Asv1Decoder::new(64, 64, 0).unwrap();
        // 16 macroblocks need at least 208 bits
        let packet = Packet::from_slice(&[0u8; 25], 0);
        assert!(matches!(
            dec.decode_packet(&packet),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_eleventh_group_is_invalid() {
        let mut dec = Asv1Decoder::new(16, 16, 0).unwrap();
        let mut bw = BitWriter::new();
        bw.write_bits(0, 8);
        let empty = CCP_CODES[0];
        for _ in 0..10 {
            bw.write_bits(empty.code, empty.len as u32);
        }
        let pattern = CCP_CODES[8];
        bw.write_bits(pattern.code, pattern.len as u32);
        for _ in 0..16 {
            bw.write_bits(0xFF, 8);
        }
        assert!(matches!(
            dec.decode_packet(&Packet::from_slice(&to_packet(bw), 0)),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_ac_coefficient_changes_block() {
        let mut dec = Asv1Decoder::new(16, 16, 0).unwrap();
        let mut bw = BitWriter::new();
        bw.write_bits(128, 8);
        // Group 0, first coefficient only, level +3
        let ccp = CCP_CODES[8];
        bw.write_bits(ccp.code, ccp.len as u32);
        let level = LEVEL_CODES[6];
        bw.write_bits(level.code, level.len as u32);
        let eob = CCP_CODES[CCP_EOB as usize];
        bw.write_bits(eob.code, eob.len as u32);
        for _ in 0..5 {
            write_dc_block(&mut bw, 128);
        }
        let frame = dec
            .decode_packet(&Packet::from_slice(&to_packet(bw), 0))
            .unwrap()
            .unwrap();
        let row = frame.as_video().unwrap().row(0, 0).unwrap().to_vec();
        // The coefficient at scan position 0 is the DC; group 0 member 0
        // overwrites it with 3 * matrix / 16
        assert!(row[..8].iter().all(|&p| p == row[0]));
        assert_ne!(row[0], 128);
        assert_eq!(row[8], 128);
    }
}
