//! ARBC decoder implementation
//!
//! The format is read leniently: reads past the end of a packet yield zeros,
//! tiles outside the picture are skipped, and a tile list longer than the
//! picture could hold is ignored. Only the packet header, the segment count
//! and a segment starting with no data left are hard errors.

use super::{FLAG_TILE4, TILE_SIZES};
use crate::codec::bitstream::ByteReader;
use crate::codec::decoder::{CodecDecoder, DecoderContext};
use crate::codec::writer::{FrameAllocator, PlaneMut};
use crate::codec::{Frame, PictureType, VideoFrame};
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::PixelFormat;
use tracing::{debug, trace};

/// ARBC decoder
pub struct ArbcDecoder {
    width: usize,
    height: usize,
    prev: Option<VideoFrame>,
    alloc: FrameAllocator,
}

impl ArbcDecoder {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_input(format!(
                "invalid dimensions {}x{}",
                width, height
            )));
        }
        debug!("ARBC: {}x{}", width, height);
        Ok(ArbcDecoder {
            width: width as usize,
            height: height as usize,
            prev: None,
            alloc: FrameAllocator::default(),
        })
    }

    /// Whether a previous frame is held for prediction
    pub fn has_reference(&self) -> bool {
        self.prev.is_some()
    }

    /// Store one RGB pixel at picture coordinates, rows counted from the bottom
    #[inline]
    fn put_pixel(&self, plane: &mut PlaneMut<'_>, x: usize, y: usize, color: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let Some(row) = plane.row_mut(self.height - 1 - y) else {
            return false;
        };
        row[3 * x..3 * x + 3].copy_from_slice(&color.to_be_bytes()[1..]);
        true
    }

    /// Tiles of `tw`x`th` pixels, mask bits select `tw/4`x`th/4` blocks.
    /// Returns the number of pixels painted.
    fn fill_tile_x(
        &self,
        gb: &mut ByteReader<'_>,
        plane: &mut PlaneMut<'_>,
        tw: usize,
        th: usize,
        color: u32,
    ) -> i64 {
        let nb_tiles = gb.get_le16_or_zero() as usize;
        if (self.width / tw + 1) * (self.height / th + 1) < nb_tiles {
            trace!("ARBC: ignoring {} tiles of {}x{}", nb_tiles, tw, th);
            return 0;
        }

        let (step_w, step_h) = (tw / 4, th / 4);
        let mut painted = 0i64;
        for _ in 0..nb_tiles {
            let y = gb.get_u8_or_zero() as usize;
            let x = gb.get_u8_or_zero() as usize;
            let mut mask = gb.get_le16_or_zero();
            let (start_x, start_y) = (x * tw, y * th);
            if start_x >= self.width || start_y >= self.height {
                continue;
            }

            for j in (start_y..start_y + th).step_by(step_h) {
                for k in (start_x..start_x + tw).step_by(step_w) {
                    if mask & 0x8000 != 0 {
                        for m in 0..step_h {
                            for n in 0..step_w {
                                self.put_pixel(plane, k + n, j + m, color);
                            }
                        }
                        // Blocks hanging off the picture count their visible part only
                        let rows = step_h.min(self.height.saturating_sub(j));
                        let cols = step_w.min(self.width.saturating_sub(k));
                        painted += (rows * cols) as i64;
                    }
                    mask <<= 1;
                }
            }
        }
        painted
    }

    /// 4x4 tiles, mask bits select single pixels
    fn fill_tile4(&self, gb: &mut ByteReader<'_>, plane: &mut PlaneMut<'_>, color: u32) -> i64 {
        let nb_tiles = gb.get_le16_or_zero() as usize;
        if (self.width / 4 + 1) * (self.height / 4 + 1) < nb_tiles {
            trace!("ARBC: ignoring {} tiles of 4x4", nb_tiles);
            return 0;
        }

        let mut painted = 0i64;
        for _ in 0..nb_tiles {
            let y = gb.get_u8_or_zero() as usize;
            let x = gb.get_u8_or_zero() as usize;
            let mut mask = gb.get_le16_or_zero();
            for j in y * 4..y * 4 + 4 {
                for k in x * 4..x * 4 + 4 {
                    if mask & 0x8000 != 0 && self.put_pixel(plane, k, j, color) {
                        painted += 1;
                    }
                    mask <<= 1;
                }
            }
        }
        painted
    }
}

impl CodecDecoder for ArbcDecoder {
    fn open(ctx: &DecoderContext) -> Result<Self> {
        Self::new(ctx.width(), ctx.height())
    }

    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>> {
        let buf = packet.data.as_slice();
        if buf.len() < 10 {
            return Err(Error::invalid_data(format!(
                "ARBC: packet of {} bytes is too short",
                buf.len()
            )));
        }
        let mut gb = ByteReader::new(buf);
        gb.skip(8)?;
        let nb_segments = gb.get_le16()? as usize;
        if nb_segments == 0 {
            return Ok(None);
        }
        if 7 * nb_segments > gb.bytes_left() {
            return Err(Error::invalid_data(format!(
                "ARBC: {} segments need more than {} bytes",
                nb_segments,
                gb.bytes_left()
            )));
        }

        let mut frame = match &self.prev {
            Some(prev) => self.alloc.copy_video(prev)?,
            None => self
                .alloc
                .alloc_video(self.width as u32, self.height as u32, PixelFormat::RGB24)?,
        };

        let mut untouched = (self.width * self.height) as i64;
        {
            let mut plane = frame.plane_mut(0)?;
            for segment in 0..nb_segments {
                if gb.bytes_left() == 0 {
                    return Err(Error::invalid_data(format!(
                        "ARBC: segment {} starts past the packet",
                        segment
                    )));
                }
                let mut color = (gb.get_u8_or_zero() as u32) << 16;
                gb.skip_or_end(1);
                color |= (gb.get_u8_or_zero() as u32) << 8;
                gb.skip_or_end(1);
                color |= gb.get_u8_or_zero() as u32;
                gb.skip_or_end(1);
                let flags = gb.get_u8_or_zero();

                for &(bit, size) in &TILE_SIZES {
                    if flags & bit != 0 {
                        untouched -= self.fill_tile_x(&mut gb, &mut plane, size, size, color);
                    }
                }
                if flags & FLAG_TILE4 != 0 {
                    untouched -= self.fill_tile4(&mut gb, &mut plane, color);
                }
            }
        }

        let mut frame = frame.freeze();
        let intra = untouched <= 0;
        frame.keyframe = intra;
        frame.pict_type = if intra { PictureType::I } else { PictureType::P };
        self.prev = Some(frame.clone());
        Ok(Some(Frame::Video(frame)))
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}
