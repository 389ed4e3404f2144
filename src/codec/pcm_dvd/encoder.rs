//! PCM-DVD encoder implementation

use super::{PcmDvdHeader, FREQUENCIES};
use crate::codec::encoder::{Encoder, EncoderContext};
use crate::codec::writer::{read_i16, read_i32};
use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::{Buffer, SampleFormat};
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::VecDeque;

/// PCM-DVD encoder for 16-bit (I16 input) and 24-bit (I32 input) streams
pub struct PcmDvdEncoder {
    header: [u8; 3],
    layout: PcmDvdHeader,
    packets: VecDeque<Packet>,
}

impl PcmDvdEncoder {
    pub fn new(ctx: &EncoderContext) -> Result<Self> {
        let freq = FREQUENCIES
            .iter()
            .position(|&r| r == ctx.sample_rate())
            .ok_or_else(|| {
                Error::unsupported(format!("PCM-DVD: sample rate {}", ctx.sample_rate()))
            })?;
        let channels = ctx.channels();
        if !(1..=8).contains(&channels) {
            return Err(Error::unsupported(format!("PCM-DVD: {} channels", channels)));
        }
        let quant = match ctx.bits_per_sample() {
            0 | 16 => 0u8,
            24 => 2,
            bits => {
                return Err(Error::unsupported(format!(
                    "PCM-DVD: encoding {} bit samples",
                    bits
                )))
            }
        };

        let header = [0x0c, quant << 6 | (freq as u8) << 4 | (channels - 1) as u8, 0x80];
        Ok(PcmDvdEncoder {
            header,
            layout: PcmDvdHeader::parse(&header)?,
            packets: VecDeque::new(),
        })
    }

    /// Expected input sample format
    pub fn sample_format(&self) -> SampleFormat {
        if self.layout.bits_per_sample == 16 {
            SampleFormat::I16
        } else {
            SampleFormat::I32
        }
    }

    /// Encode interleaved samples into one packet, header included.
    /// 24-bit input is taken from the top bits of each 32-bit sample.
    pub fn encode_samples(&self, samples: &[i32]) -> Result<Vec<u8>> {
        let h = &self.layout;
        let per_block = h.samples_per_block * h.channels as usize;
        if samples.len() % per_block != 0 {
            return Err(Error::invalid_input(format!(
                "PCM-DVD: {} samples do not fill whole {} sample blocks",
                samples.len(),
                per_block
            )));
        }

        let mut out = Vec::with_capacity(3 + samples.len() * h.bits_per_sample as usize / 8);
        out.extend_from_slice(&self.header);
        if h.bits_per_sample == 16 {
            for &s in samples {
                out.write_i16::<BigEndian>(s as i16)?;
            }
        } else {
            for group in samples.chunks_exact(h.group_len()) {
                for &s in group {
                    out.write_u16::<BigEndian>((s as u32 >> 16) as u16)?;
                }
                for &s in group {
                    out.write_u8((s as u32 >> 8) as u8)?;
                }
            }
        }
        Ok(out)
    }
}

impl Encoder for PcmDvdEncoder {
    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let audio = frame
            .as_audio()
            .ok_or_else(|| Error::invalid_input("PCM-DVD: expected an audio frame"))?;
        if audio.channels != self.layout.channels {
            return Err(Error::invalid_input(format!(
                "PCM-DVD: frame has {} channels, encoder {}",
                audio.channels, self.layout.channels
            )));
        }
        let format = self.sample_format();
        if audio.format != format && audio.format != format.to_planar() {
            return Err(Error::unsupported(format!(
                "PCM-DVD: expected {} samples, got {}",
                format, audio.format
            )));
        }

        let raw = audio.interleaved_bytes();
        let samples: Vec<i32> = if format == SampleFormat::I16 {
            raw.chunks_exact(2).map(|b| read_i16(b) as i32).collect()
        } else {
            raw.chunks_exact(4).map(read_i32).collect()
        };

        let mut packet = Packet::new_audio(0, Buffer::from_vec(self.encode_samples(&samples)?));
        packet.pts = audio.pts;
        packet.duration = audio.nb_samples as i64;
        packet.set_keyframe(true);
        self.packets.push_back(packet);
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Packet> {
        self.packets.pop_front().ok_or(Error::TryAgain)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
