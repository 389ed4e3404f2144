//! Decoder interface and per-stream state machine
//!
//! Each codec implements [`CodecDecoder`]: one packet in, at most one frame
//! out, plus a `reset` for discontinuities. [`DecoderInstance`] wraps a codec
//! in the lifecycle every stream goes through:
//!
//! ```text
//! Uninitialized --open--> Ready --packet--> Decoding --> Ready
//!       |                   |  \--flush--> Ready
//!       \--open failed--> Closed <--close--/
//! ```
//!
//! Codecs only commit persistent state once a packet decoded successfully,
//! so a rejected packet leaves the stream exactly as it was.

use super::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Decoder trait for decoding compressed data
pub trait Decoder {
    /// Send a packet to the decoder
    fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Receive a decoded frame, `Error::TryAgain` when none is pending
    fn receive_frame(&mut self) -> Result<Frame>;

    /// Drop prediction history and pending frames
    fn flush(&mut self) -> Result<()>;

    /// Release the stream; every later call fails
    fn close(&mut self) -> Result<()>;
}

/// Per-stream configuration handed to a decoder at open
#[derive(Debug, Clone, Default)]
pub struct DecoderContext {
    codec_id: String,
    extradata: Option<Vec<u8>>,
    width: u32,
    height: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_coded_sample: u32,
    palette: Option<Vec<u32>>,
}

impl DecoderContext {
    /// Create a new decoder context
    pub fn new(codec_id: impl Into<String>) -> Self {
        DecoderContext {
            codec_id: codec_id.into(),
            ..Default::default()
        }
    }

    /// Set extradata (codec-specific configuration)
    pub fn set_extradata(&mut self, data: Vec<u8>) {
        self.extradata = Some(data);
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_audio_params(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }

    pub fn set_bits_per_coded_sample(&mut self, bits: u32) {
        self.bits_per_coded_sample = bits;
    }

    /// Set palette side data (256 entries of 0xAARRGGBB)
    pub fn set_palette(&mut self, palette: Vec<u32>) {
        self.palette = Some(palette);
    }

    /// Get the codec ID
    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    /// Get extradata
    pub fn extradata(&self) -> Option<&[u8]> {
        self.extradata.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_coded_sample(&self) -> u32 {
        self.bits_per_coded_sample
    }

    pub fn palette(&self) -> Option<&[u32]> {
        self.palette.as_deref()
    }
}

/// Codec-specific decoding logic driven by a [`DecoderInstance`]
pub trait CodecDecoder: Send {
    /// Validate the stream configuration and build the codec state
    fn open(ctx: &DecoderContext) -> Result<Self>
    where
        Self: Sized;

    /// Decode one packet. `Ok(None)` means the packet was consumed without
    /// completing a frame.
    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>>;

    /// Forget all inter-packet history
    fn reset(&mut self);
}

/// Lifecycle state of a [`DecoderInstance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Uninitialized,
    Ready,
    Decoding,
    Closed,
}

/// A codec bound to one stream
pub struct DecoderInstance<C: CodecDecoder> {
    ctx: DecoderContext,
    codec: Option<C>,
    state: DecoderState,
    pending: VecDeque<Frame>,
    packets_decoded: u64,
    packets_rejected: u64,
}

impl<C: CodecDecoder> DecoderInstance<C> {
    /// Bind a context; the codec is opened on `initialize` or the first packet
    pub fn new(ctx: DecoderContext) -> Self {
        DecoderInstance {
            ctx,
            codec: None,
            state: DecoderState::Uninitialized,
            pending: VecDeque::new(),
            packets_decoded: 0,
            packets_rejected: 0,
        }
    }

    /// Create and open in one step
    pub fn open(ctx: DecoderContext) -> Result<Self> {
        let mut instance = Self::new(ctx);
        instance.initialize()?;
        Ok(instance)
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn context(&self) -> &DecoderContext {
        &self.ctx
    }

    /// The opened codec
    pub fn codec(&self) -> Option<&C> {
        self.codec.as_ref()
    }

    /// Packets decoded successfully so far
    pub fn packets_decoded(&self) -> u64 {
        self.packets_decoded
    }

    /// Packets rejected with an error so far
    pub fn packets_rejected(&self) -> u64 {
        self.packets_rejected
    }

    /// Open the codec. A configuration error closes the stream for good.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            DecoderState::Uninitialized => {}
            DecoderState::Closed => return Err(Error::invalid_state("decoder is closed")),
            DecoderState::Ready | DecoderState::Decoding => return Ok(()),
        }
        match C::open(&self.ctx) {
            Ok(codec) => {
                debug!("Opened {} decoder", self.ctx.codec_id());
                self.codec = Some(codec);
                self.state = DecoderState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to open {} decoder: {}", self.ctx.codec_id(), e);
                self.state = DecoderState::Closed;
                Err(e)
            }
        }
    }
}

impl<C: CodecDecoder> Decoder for DecoderInstance<C> {
    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.initialize()?;
        let codec = self
            .codec
            .as_mut()
            .ok_or_else(|| Error::invalid_state("decoder has no codec"))?;

        self.state = DecoderState::Decoding;
        let result = codec.decode_packet(packet);
        self.state = DecoderState::Ready;

        match result {
            Ok(Some(mut frame)) => {
                frame.set_pts(packet.pts);
                if packet.duration != 0 {
                    frame.set_duration(packet.duration);
                }
                trace!("{}: decoded frame for {}", self.ctx.codec_id(), packet);
                self.pending.push_back(frame);
                self.packets_decoded += 1;
                Ok(())
            }
            Ok(None) => {
                trace!("{}: {} produced no frame", self.ctx.codec_id(), packet);
                self.packets_decoded += 1;
                Ok(())
            }
            Err(e) => {
                self.packets_rejected += 1;
                warn!("{}: rejected {}: {}", self.ctx.codec_id(), packet, e);
                Err(e)
            }
        }
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        if self.state == DecoderState::Closed {
            return Err(Error::invalid_state("decoder is closed"));
        }
        self.pending.pop_front().ok_or(Error::TryAgain)
    }

    fn flush(&mut self) -> Result<()> {
        if self.state == DecoderState::Closed {
            return Err(Error::invalid_state("decoder is closed"));
        }
        if let Some(codec) = self.codec.as_mut() {
            codec.reset();
        }
        self.pending.clear();
        debug!("Flushed {} decoder", self.ctx.codec_id());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.state != DecoderState::Closed {
            debug!("Closed {} decoder", self.ctx.codec_id());
        }
        self.codec = None;
        self.pending.clear();
        self.state = DecoderState::Closed;
        Ok(())
    }
}

fn open_boxed<C: CodecDecoder + 'static>(ctx: &DecoderContext) -> Result<Box<dyn Decoder + Send>> {
    Ok(Box::new(DecoderInstance::<C>::open(ctx.clone())?))
}

/// Create and open a decoder for the context's codec
pub fn create_decoder(ctx: &DecoderContext) -> Result<Box<dyn Decoder + Send>> {
    use super::{
        arbc::ArbcDecoder, asv1::Asv1Decoder, dfpwm::DfpwmDecoder, eightbps::EightBpsDecoder,
        pcm_dvd::PcmDvdDecoder, rka::RkaDecoder,
    };

    match ctx.codec_id() {
        "8bps" => open_boxed::<EightBpsDecoder>(ctx),
        "arbc" => open_boxed::<ArbcDecoder>(ctx),
        "asv1" => open_boxed::<Asv1Decoder>(ctx),
        "dfpwm" => open_boxed::<DfpwmDecoder>(ctx),
        "pcm_dvd" => open_boxed::<PcmDvdDecoder>(ctx),
        "rka" => open_boxed::<RkaDecoder>(ctx),
        other => Err(Error::unsupported(format!(
            "No decoder available for codec: {}",
            other
        ))),
    }
}
