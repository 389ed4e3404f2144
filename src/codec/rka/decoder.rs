//! RKA decoder implementation

use super::{
    block_split, magnitude_context, predict, reconstruct, requantize, segment_size,
    split_segments, taper_coeff_bits, ChannelModels, RkaHeader, StreamModels, COEFF_ESCAPE,
    FRAME_BYTES, HISTORY, MODE_EXPLICIT, POSITION_CONTEXTS,
};
use crate::codec::decoder::{CodecDecoder, DecoderContext};
use crate::codec::rangecoder::RangeDecoder;
use crate::codec::writer::FrameAllocator;
use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::format::Packet;
use crate::util::{clip_i16, clip_i8, SampleFormat};
use tracing::{debug, trace};

/// Decode the filter taps of one block
fn decode_coeffs(
    rc: &mut RangeDecoder<'_>,
    stream: &mut StreamModels,
    models: &mut ChannelModels,
) -> Result<Vec<i32>> {
    let order = stream.filt_size.decode_int(rc, 256)? as usize;
    let mut coeffs = Vec::with_capacity(order);
    if order == 0 {
        return Ok(coeffs);
    }

    let mut bits = stream.filt_bits.decode_int(rc, 10)?;
    for idx in 0..order {
        bits = taper_coeff_bits(bits, idx);
        let model = models.coeff_bits.get_mut(bits as usize).ok_or_else(|| {
            Error::invalid_data(format!("RKA: tap {} is {} bits wide", idx, bits))
        })?;
        let mut class = model.decode_int(rc, COEFF_ESCAPE)?;
        if class == COEFF_ESCAPE {
            class = rc.decode_uniform(1 << 16)?;
        }
        if class == 0 {
            coeffs.push(0);
            continue;
        }

        let low = if bits > 0 {
            rc.decode_uniform(1 << bits)?
        } else {
            0
        };
        let magnitude = (low + 1 + ((class - 1) << bits)) as i32;
        let negative = stream.sign(idx).decode(rc)?;
        coeffs.push(if negative { -magnitude } else { magnitude });
    }
    Ok(coeffs)
}

/// Decoding state of one channel within a packet
struct Channel {
    models: ChannelModels,
    /// Residual scale as a shift, zero when lossless
    qfactor: u32,
    vrq: u32,
    /// Reconstructed signal, preceded by `HISTORY` zeros
    signal: Vec<i32>,
    /// First difference of the signal, same layout
    diff: Vec<i32>,
}

impl Channel {
    fn new(capacity: usize, qfactor: u32, vrq: u32) -> Self {
        let mut signal = Vec::with_capacity(HISTORY + capacity);
        signal.resize(HISTORY, 0);
        Channel {
            models: ChannelModels::new(),
            qfactor,
            vrq,
            diff: signal.clone(),
            signal,
        }
    }

    fn decoded(&self) -> usize {
        self.signal.len() - HISTORY
    }

    fn sample(&self, index: usize) -> i32 {
        self.signal[HISTORY + index]
    }

    /// Decode one nominal segment, split as the segment mode says
    fn decode_chunk(
        &mut self,
        rc: &mut RangeDecoder<'_>,
        stream: &mut StreamModels,
        segment: u32,
        bits_per_sample: u32,
    ) -> Result<()> {
        let mode = self.models.nb_segments.decode_int(rc, MODE_EXPLICIT)?;
        if mode == MODE_EXPLICIT {
            let units = rc.decode_uniform(segment >> 2)?;
            if units == 0 {
                return Err(Error::invalid_data("RKA: empty explicit segment"));
            }
            return self.decode_filter(rc, stream, units as usize * 4, bits_per_sample);
        }

        let sizes = split_segments(mode, segment)
            .ok_or_else(|| Error::invalid_data(format!("RKA: segment mode {}", mode)))?;
        for size in sizes {
            self.decode_filter(rc, stream, size as usize, bits_per_sample)?;
        }
        Ok(())
    }

    /// Decode a filter block of `size` samples
    fn decode_filter(
        &mut self,
        rc: &mut RangeDecoder<'_>,
        stream: &mut StreamModels,
        size: usize,
        bits_per_sample: u32,
    ) -> Result<()> {
        let shift = if self.qfactor == 0 {
            self.models.fshift.decode_int(rc, 15)? & 31
        } else {
            0
        };
        let coeffs = decode_coeffs(rc, stream, &mut self.models)?;
        trace!(
            "RKA: block of {} samples, order {}, shift {}, qfactor {}",
            size,
            coeffs.len(),
            shift,
            self.qfactor
        );

        let split = block_split(size);
        let mut last = 0i32;
        let mut x = 0;
        while x < size {
            let delta = self.models.position.decode_int(rc, 10)? as usize;
            let idx = (self.models.pos_idx + delta) % POSITION_CONTEXTS;
            self.models.pos_idx = idx;

            let mut energy = 0u32;
            for _ in 0..split.min(size - x) {
                let residual = self
                    .models
                    .residual(magnitude_context(last, idx), idx)
                    .decode(rc)?;
                last = residual;

                let end = self.diff.len();
                let prediction = predict(&coeffs, &self.diff[end - coeffs.len()..]);
                let previous = self.signal[end - 1];
                let (s, d) = if self.qfactor == 0 {
                    let d = reconstruct(prediction, residual, shift, self.diff[end - 1]);
                    (d.wrapping_add(previous), d)
                } else {
                    let scaled = residual.wrapping_shl(self.qfactor);
                    let sum = prediction.wrapping_add(previous).wrapping_add(scaled) as i64;
                    let s = if bits_per_sample == 8 {
                        clip_i8(sum) as i32
                    } else {
                        clip_i16(sum) as i32
                    };
                    let d = s - previous;
                    energy = energy.wrapping_add(d.unsigned_abs());
                    (s, d)
                };
                self.diff.push(d);
                self.signal.push(s);
            }

            if self.vrq != 0 {
                self.qfactor = requantize(energy, split, self.vrq);
            }
            x += split;
        }
        Ok(())
    }
}

/// RKA decoder
pub struct RkaDecoder {
    header: RkaHeader,
    sample_rate: u32,
    segment: u32,
    /// Samples per channel still to come, `None` when the length is unknown
    samples_left: Option<u64>,
    /// Residual scale of each channel, carried from packet to packet
    qfactor: [u32; 2],
    alloc: FrameAllocator,
}

impl RkaDecoder {
    /// Create a decoder from the stream header; `sample_rate` overrides
    /// the header's when non-zero
    pub fn new(extradata: &[u8], sample_rate: u32) -> Result<Self> {
        let header = RkaHeader::parse(extradata)?;
        if !(1..=2).contains(&header.channels) {
            return Err(Error::unsupported(format!(
                "RKA: {} channels",
                header.channels
            )));
        }
        if header.bits_per_sample != 8 && header.bits_per_sample != 16 {
            return Err(Error::unsupported(format!(
                "RKA: {} bits per sample",
                header.bits_per_sample
            )));
        }

        let sample_rate = if sample_rate != 0 {
            sample_rate
        } else {
            header.sample_rate
        };
        let segment = segment_size(sample_rate);
        if segment < 16 || segment as usize > FRAME_BYTES {
            return Err(Error::unsupported(format!(
                "RKA: sample rate {} out of range",
                sample_rate
            )));
        }

        debug!(
            "RKA: {} Hz, {} channels, {} bits, {} samples, segment {}, quantiser {}{}",
            sample_rate,
            header.channels,
            header.bits_per_sample,
            header.total_samples(),
            segment,
            header.quant,
            if header.correlated { ", correlated" } else { "" }
        );
        Ok(RkaDecoder {
            header,
            sample_rate,
            segment,
            samples_left: Self::initial_samples(&header),
            qfactor: [header.qfactor(); 2],
            alloc: FrameAllocator::default(),
        })
    }

    fn initial_samples(header: &RkaHeader) -> Option<u64> {
        if header.total_bytes == 0 {
            None
        } else {
            Some(header.total_samples())
        }
    }

    pub fn header(&self) -> &RkaHeader {
        &self.header
    }

    pub fn samples_left(&self) -> Option<u64> {
        self.samples_left
    }

    /// Current residual scale of channel `ch`
    pub fn qfactor(&self, ch: usize) -> u32 {
        self.qfactor[ch.min(1)]
    }
}

impl CodecDecoder for RkaDecoder {
    fn open(ctx: &DecoderContext) -> Result<Self> {
        let extradata = ctx
            .extradata()
            .ok_or_else(|| Error::invalid_input("RKA: stream header missing"))?;
        Self::new(extradata, ctx.sample_rate())
    }

    fn decode_packet(&mut self, packet: &Packet) -> Result<Option<Frame>> {
        let frame_samples = self.header.frame_samples() as u64;
        let nb_samples = self
            .samples_left
            .map_or(frame_samples, |left| left.min(frame_samples)) as usize;
        if nb_samples == 0 {
            debug!("RKA: packet past the end of the stream");
            return Ok(None);
        }

        let mut rc = RangeDecoder::new(packet.data.as_slice())?;
        let channels = self.header.channels as usize;
        let bits = self.header.bits_per_sample;
        let capacity = nb_samples + self.segment as usize;
        let mut stream = StreamModels::new();
        let mut chans: Vec<Channel> = self.qfactor[..channels]
            .iter()
            .map(|&q| Channel::new(capacity, q, self.header.vrq()))
            .collect();

        while chans.iter().any(|c| c.decoded() < nb_samples) {
            for chan in chans.iter_mut() {
                if chan.decoded() < nb_samples {
                    chan.decode_chunk(&mut rc, &mut stream, self.segment, bits)?;
                }
            }
        }
        if rc.overread() > 0 {
            debug!("RKA: packet ran {} bytes short", rc.overread());
        }

        let format = if bits == 8 {
            SampleFormat::U8P
        } else {
            SampleFormat::I16P
        };
        let mut out = self.alloc.alloc_audio(
            nb_samples,
            self.sample_rate,
            self.header.channels,
            format,
        )?;
        for i in 0..nb_samples {
            let left = chans[0].sample(i);
            let mut values = [left, 0];
            if let Some(second) = chans.get(1) {
                let v = second.sample(i);
                values[1] = if self.header.correlated {
                    left.wrapping_sub(v)
                } else {
                    v
                };
            }
            for (ch, &v) in values.iter().take(channels).enumerate() {
                if format == SampleFormat::U8P {
                    out.set_u8(ch, i, v.wrapping_add(128) as u8);
                } else {
                    out.set_i16(ch, i, v as i16);
                }
            }
        }

        for (q, chan) in self.qfactor.iter_mut().zip(&chans) {
            *q = chan.qfactor;
        }
        if let Some(left) = self.samples_left.as_mut() {
            *left -= nb_samples as u64;
        }
        let mut frame = out.freeze();
        frame.duration = nb_samples as i64;
        Ok(Some(Frame::Audio(frame)))
    }

    fn reset(&mut self) {
        self.samples_left = Self::initial_samples(&self.header);
        self.qfactor = [self.header.qfactor(); 2];
    }
}
