//! Encoder interface
//!
//! Only the lossless audio formats have encoders; they exist so streams can
//! be produced for round-trip checks against the decoders.

use super::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;

/// Encoder trait for encoding frames
pub trait Encoder {
    /// Send a frame to the encoder
    fn send_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Receive an encoded packet, `Error::TryAgain` when none is pending
    fn receive_packet(&mut self) -> Result<Packet>;

    /// Flush the encoder
    fn flush(&mut self) -> Result<()>;
}

/// Encoder context with configuration
#[derive(Debug, Clone, Default)]
pub struct EncoderContext {
    codec_id: String,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u32,
}

impl EncoderContext {
    /// Create a new encoder context
    pub fn new(codec_id: impl Into<String>) -> Self {
        EncoderContext {
            codec_id: codec_id.into(),
            ..Default::default()
        }
    }

    pub fn set_audio_params(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }

    pub fn set_bits_per_sample(&mut self, bits: u32) {
        self.bits_per_sample = bits;
    }

    /// Get the codec ID
    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }
}

/// Create an encoder for the given codec
pub fn create_encoder(ctx: &EncoderContext) -> Result<Box<dyn Encoder + Send>> {
    use super::{dfpwm::DfpwmEncoder, pcm_dvd::PcmDvdEncoder};

    match ctx.codec_id() {
        "dfpwm" => Ok(Box::new(DfpwmEncoder::new(ctx)?)),
        "pcm_dvd" => Ok(Box::new(PcmDvdEncoder::new(ctx)?)),
        other => Err(Error::unsupported(format!(
            "No encoder available for codec: {}",
            other
        ))),
    }
}
