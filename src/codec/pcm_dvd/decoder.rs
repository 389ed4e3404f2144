//! PCM-DVD decoder implementation

use super::{PcmDvdHeader, HEADER_SIZE};
use crate::codec::bitstream::ByteReader;
use crate::codec::decoder::{CodecDecoder, DecoderContext};
use crate::codec::writer::{AudioFrameBuffer, FrameAllocator};
use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::SampleFormat;
use tracing::debug;

/// PCM-DVD decoder
///
/// Stream parameters come from the packet headers, not the context.
#[derive(Default)]
pub struct PcmDvdDecoder {
    header: Option<PcmDvdHeader>,
    /// Bytes of an incomplete block left over from the previous packet
    leftover: Vec<u8>,
    alloc: FrameAllocator,
}

impl PcmDvdDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters of the most recent header
    pub fn header(&self) -> Option<&PcmDvdHeader> {
        self.header.as_ref()
    }

    fn update_header(&mut self, bytes: &[u8; 3]) -> Result<PcmDvdHeader> {
        if let Some(h) = self.header {
            if h.raw == PcmDvdHeader::fold(bytes) {
                return Ok(h);
            }
        }
        // Any change apart from the frame number drops the carried bytes,
        // even when the new header is rejected
        self.header = None;
        if !self.leftover.is_empty() {
            debug!("PCM-DVD: header changed, dropping {} bytes", self.leftover.len());
            self.leftover.clear();
        }
        let h = PcmDvdHeader::parse(bytes)?;
        debug!(
            "PCM-DVD: {} bits, {} Hz, {} channels, {} byte blocks",
            h.bits_per_sample, h.sample_rate, h.channels, h.block_size
        );
        self.header = Some(h);
        Ok(h)
    }

    fn decode_16(h: &PcmDvdHeader, gb: &mut ByteReader<'_>, out: &mut AudioFrameBuffer) -> Result<()> {
        let ch = h.channels as usize;
        for i in 0..out.nb_samples() {
            for c in 0..ch {
                out.set_i16(c, i, gb.get_be16()? as i16);
            }
        }
        Ok(())
    }

    fn decode_packed(
        h: &PcmDvdHeader,
        gb: &mut ByteReader<'_>,
        out: &mut AudioFrameBuffer,
        blocks: usize,
    ) -> Result<()> {
        let ch = h.channels as usize;
        let group_len = h.group_len();
        let groups = blocks * (h.block_size / h.group_bytes());
        let mut words = [0i32; 4];
        let mut n = 0usize;

        for _ in 0..groups {
            for w in words.iter_mut().take(group_len) {
                *w = ((gb.get_be16()? as u32) << 16) as i32;
            }
            if h.bits_per_sample == 20 {
                for pair in words[..group_len].chunks_exact_mut(2) {
                    let t = gb.get_u8()? as i32;
                    pair[0] += (t & 0xf0) << 8;
                    pair[1] += (t & 0x0f) << 12;
                }
            } else {
                for w in words.iter_mut().take(group_len) {
                    *w += (gb.get_u8()? as i32) << 8;
                }
            }
            for &w in &words[..group_len] {
                out.set_i32(n % ch, n / ch, w);
                n += 1;
            }
        }
        Ok(())
    }
}

impl CodecDecoder for PcmDvdDecoder {
    fn open(_ctx: &DecoderContext) -> Result<Self> {
        Ok(Self::new())
    }

    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>> {
        let buf = packet.data.as_slice();
        if buf.len() < HEADER_SIZE {
            return Err(Error::invalid_data(format!(
                "PCM-DVD: {} byte packet has no header",
                buf.len()
            )));
        }
        let h = self.update_header(&[buf[0], buf[1], buf[2]])?;

        let mut data = std::mem::take(&mut self.leftover);
        data.extend_from_slice(&buf[HEADER_SIZE..]);
        let blocks = data.len() / h.block_size;
        let used = blocks * h.block_size;
        self.leftover = data[used..].to_vec();

        let nb_samples = blocks * h.samples_per_block;
        if nb_samples == 0 {
            return Ok(None);
        }

        let format = if h.bits_per_sample == 16 {
            SampleFormat::I16
        } else {
            SampleFormat::I32
        };
        let mut out = self
            .alloc
            .alloc_audio(nb_samples, h.sample_rate, h.channels, format)?;
        let mut gb = ByteReader::new(&data[..used]);
        if h.bits_per_sample == 16 {
            Self::decode_16(&h, &mut gb, &mut out)?;
        } else {
            Self::decode_packed(&h, &mut gb, &mut out, blocks)?;
        }

        let mut frame = out.freeze();
        frame.duration = nb_samples as i64;
        Ok(Some(Frame::Audio(frame)))
    }

    fn reset(&mut self) {
        self.header = None;
        self.leftover.clear();
    }
}
