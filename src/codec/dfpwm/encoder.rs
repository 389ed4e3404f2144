//! DFPWM encoder implementation

use super::DfpwmState;
use crate::codec::encoder::{Encoder, EncoderContext};
use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::{Buffer, SampleFormat};
use std::collections::VecDeque;

/// DFPWM encoder, unsigned 8-bit input
pub struct DfpwmEncoder {
    channels: u16,
    state: DfpwmState,
    packets: VecDeque<Packet>,
}

impl DfpwmEncoder {
    pub fn new(ctx: &EncoderContext) -> Result<Self> {
        if ctx.channels() == 0 {
            return Err(Error::invalid_input("DFPWM: channel count must be at least 1"));
        }
        Ok(DfpwmEncoder {
            channels: ctx.channels(),
            state: DfpwmState::new(),
            packets: VecDeque::new(),
        })
    }

    /// Encode interleaved unsigned 8-bit samples, a multiple of 8 in total
    pub fn encode(&mut self, samples: &[u8]) -> Result<Vec<u8>> {
        if samples.len() % 8 != 0 {
            return Err(Error::invalid_input(format!(
                "DFPWM: {} samples is not a whole number of bytes",
                samples.len()
            )));
        }
        let mut out = Vec::with_capacity(samples.len() / 8);
        for group in samples.chunks_exact(8) {
            let mut d = 0u8;
            for &sample in group {
                let level = sample as i32 - 128;
                let q = self.state.charge();
                let bit = level > q || (level == q && q == 127);
                d = (d >> 1) | if bit { 0x80 } else { 0 };
                self.state.step(bit);
            }
            out.push(d);
        }
        Ok(out)
    }
}

impl Encoder for DfpwmEncoder {
    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let audio = frame
            .as_audio()
            .ok_or_else(|| Error::invalid_input("DFPWM: expected an audio frame"))?;
        if audio.channels != self.channels {
            return Err(Error::invalid_input(format!(
                "DFPWM: frame has {} channels, encoder {}",
                audio.channels, self.channels
            )));
        }
        if !matches!(audio.format, SampleFormat::U8 | SampleFormat::U8P) {
            return Err(Error::unsupported(format!(
                "DFPWM: cannot encode {} samples",
                audio.format
            )));
        }

        let data = self.encode(&audio.interleaved_bytes())?;
        let mut packet = Packet::new_audio(0, Buffer::from_vec(data));
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
