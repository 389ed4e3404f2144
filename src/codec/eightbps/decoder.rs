//! 8BPS decoder implementation

use super::layout_for_depth;
use crate::codec::decoder::{CodecDecoder, DecoderContext};
use crate::codec::writer::{FrameAllocator, PlaneMut, PALETTE_SIZE};
use crate::codec::{Frame, PictureType};
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::PixelFormat;
use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

/// 8BPS decoder
pub struct EightBpsDecoder {
    width: u32,
    height: u32,
    format: PixelFormat,
    planes: usize,
    planemap: [usize; 4],
    palette: Option<Vec<u32>>,
    alloc: FrameAllocator,
}

impl EightBpsDecoder {
    /// Create a decoder for `bits` bits per pixel (8, 24 or 32)
    pub fn new(width: u32, height: u32, bits: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_input(format!(
                "invalid dimensions {}x{}",
                width, height
            )));
        }
        let (format, planes, planemap) = layout_for_depth(bits)
            .ok_or_else(|| Error::unsupported(format!("8BPS: {} bits per pixel", bits)))?;

        debug!("8BPS: {}x{} {} ({} planes)", width, height, format, planes);
        Ok(EightBpsDecoder {
            width,
            height,
            format,
            planes,
            planemap,
            palette: None,
            alloc: FrameAllocator::default(),
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Unpack every row of every plane into `dst`
    fn unpack_planes(&self, buf: &[u8], dst: &mut PlaneMut<'_>) -> Result<()> {
        let height = self.height as usize;
        let planes = self.planes;
        let row_bytes = self.width as usize * planes;
        let mut dp = planes * height * 2;

        for p in 0..planes {
            let lengths = &buf[p * height * 2..(p + 1) * height * 2];
            for row in 0..height {
                let out = dst
                    .row_mut(row)
                    .ok_or_else(|| Error::invalid_state("8BPS: output row missing"))?;
                let end = self.planemap[p] + row_bytes;
                let mut pos = self.planemap[p];
                // Remaining compressed length; wraps like the unsigned
                // counter the format was designed around
                let mut dlen = BigEndian::read_u16(&lengths[row * 2..]) as u32;

                while dlen > 0 {
                    if buf.len() - dp <= 1 {
                        return Err(Error::invalid_data(format!(
                            "8BPS: plane {} row {} runs past the packet",
                            p, row
                        )));
                    }
                    let code = buf[dp] as usize;
                    dp += 1;
                    if code <= 127 {
                        let count = code + 1;
                        dlen = dlen.wrapping_sub(count as u32 + 1);
                        // A run that would overflow the row ends the row
                        if end - pos < count * planes {
                            break;
                        }
                        if buf.len() - dp < count {
                            return Err(Error::invalid_data("8BPS: literal run past the packet"));
                        }
                        for &byte in &buf[dp..dp + count] {
                            out[pos] = byte;
                            pos += planes;
                        }
                        dp += count;
                    } else {
                        let count = 257 - code;
                        if end - pos < count * planes {
                            break;
                        }
                        let value = buf[dp];
                        for _ in 0..count {
                            out[pos] = value;
                            pos += planes;
                        }
                        dp += 1;
                        dlen = dlen.wrapping_sub(2);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Write 0xAARRGGBB entries as B, G, R, A bytes; entries not configured
/// are all zero
fn write_palette(dst: &mut [u8], palette: Option<&[u32]>) {
    let palette = palette.unwrap_or(&[]);
    for (i, entry) in dst.chunks_exact_mut(4).take(PALETTE_SIZE / 4).enumerate() {
        let argb = palette.get(i).copied().unwrap_or(0);
        entry.copy_from_slice(&argb.to_le_bytes());
    }
}

impl CodecDecoder for EightBpsDecoder {
    fn open(ctx: &DecoderContext) -> Result<Self> {
        let mut decoder = Self::new(ctx.width(), ctx.height(), ctx.bits_per_coded_sample())?;
        decoder.palette = ctx.palette().map(|p| p.to_vec());
        Ok(decoder)
    }

    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>> {
        let buf = packet.data.as_slice();
        let table_len = self.planes * self.height as usize * 2;
        if buf.len() < table_len {
            return Err(Error::invalid_data(format!(
                "8BPS: packet of {} bytes shorter than its {} byte line table",
                buf.len(),
                table_len
            )));
        }

        let mut frame = self.alloc.alloc_video(self.width, self.height, self.format)?;
        self.unpack_planes(buf, &mut frame.plane_mut(0)?)?;

        if self.format.has_palette() {
            let palette = packet.palette.as_deref().or(self.palette.as_deref());
            if let Some(dst) = frame.palette_mut() {
                write_palette(dst, palette);
            }
            if let Some(new_palette) = &packet.palette {
                self.palette = Some(new_palette.clone());
            }
        }

        let mut frame = frame.freeze();
        frame.keyframe = true;
        frame.pict_type = PictureType::I;
        Ok(Some(Frame::Video(frame)))
    }

    fn reset(&mut self) {}
}
