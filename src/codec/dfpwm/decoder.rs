//! DFPWM decoder implementation

use super::DfpwmState;
use crate::codec::decoder::{CodecDecoder, DecoderContext};
use crate::codec::writer::FrameAllocator;
use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::SampleFormat;
use tracing::debug;

/// DFPWM decoder
pub struct DfpwmDecoder {
    sample_rate: u32,
    channels: u16,
    state: DfpwmState,
    alloc: FrameAllocator,
}

impl DfpwmDecoder {
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 {
            return Err(Error::invalid_input("DFPWM: channel count must be at least 1"));
        }
        if sample_rate == 0 {
            return Err(Error::invalid_input("DFPWM: sample rate must be positive"));
        }
        debug!("DFPWM: {} Hz, {} channels", sample_rate, channels);
        Ok(DfpwmDecoder {
            sample_rate,
            channels,
            state: DfpwmState::new(),
            alloc: FrameAllocator::default(),
        })
    }
}

impl CodecDecoder for DfpwmDecoder {
    fn open(ctx: &DecoderContext) -> Result<Self> {
        Self::new(ctx.sample_rate(), ctx.channels())
    }

    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>> {
        let data = packet.data.as_slice();
        let channels = self.channels as usize;
        let bits = data.len() * 8;
        if bits % channels != 0 {
            return Err(Error::unsupported(format!(
                "DFPWM: {} bytes do not split across {} channels",
                data.len(),
                channels
            )));
        }
        let nb_samples = bits / channels;
        if nb_samples == 0 {
            return Err(Error::invalid_data("DFPWM: empty packet"));
        }

        let mut out = self
            .alloc
            .alloc_audio(nb_samples, self.sample_rate, self.channels, SampleFormat::U8)?;
        let mut n = 0usize;
        for &byte in data {
            for k in 0..8 {
                let v = self.state.step(byte & (1 << k) != 0);
                out.set_u8(n % channels, n / channels, (v as i32 + 128) as u8);
                n += 1;
            }
        }

        Ok(Some(Frame::Audio(out.freeze())))
    }

    fn reset(&mut self) {
        self.state = DfpwmState::new();
    }
}
