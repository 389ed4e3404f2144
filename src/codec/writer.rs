//! Output writer: stride-addressed plane views and frame allocation
//!
//! Decoders never index raw frame memory directly. They receive a
//! [`PlaneMut`], a mutable view carrying its own stride and visible
//! rectangle, and every write outside that rectangle is dropped. The
//! allocator pads line sizes to an alignment, so `linesize` is generally
//! larger than `width * bytes_per_pixel` and code that assumes otherwise
//! shows up in tests.

use super::frame::{AudioFrame, VideoFrame};
use crate::error::{Error, Result};
use crate::util::{BufferRef, PixelFormat, SampleFormat, Timestamp};
use byteorder::{ByteOrder, NativeEndian};

/// Default line alignment in bytes
pub const DEFAULT_ALIGN: usize = 32;

/// Largest accepted picture dimension
pub const MAX_DIMENSION: u32 = 16384;

/// Bytes in a PAL8 palette plane (256 BGRA entries)
pub const PALETTE_SIZE: usize = 1024;

/// A mutable view of one picture plane
#[derive(Debug)]
pub struct PlaneMut<'a> {
    data: &'a mut [u8],
    stride: usize,
    width: usize,
    height: usize,
}

impl<'a> PlaneMut<'a> {
    /// Wrap raw plane memory.
    ///
    /// `width` is the visible row length in bytes, `height` the number of
    /// visible rows.
    pub fn new(data: &'a mut [u8], stride: usize, width: usize, height: usize) -> Result<Self> {
        if stride < width {
            return Err(Error::invalid_input(format!(
                "stride {} shorter than row width {}",
                stride, width
            )));
        }
        if height > 0 {
            let need = stride
                .checked_mul(height - 1)
                .and_then(|v| v.checked_add(width))
                .ok_or_else(|| Error::resource("plane size overflows"))?;
            if data.len() < need {
                return Err(Error::BufferTooSmall {
                    need,
                    have: data.len(),
                });
            }
        }
        Ok(PlaneMut {
            data,
            stride,
            width,
            height,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Visible row length in bytes
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The visible part of row `y`
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get_mut(start..start + self.width)
    }

    /// Write one byte; returns false when `(x, y)` is outside the view
    #[inline]
    pub fn put(&mut self, x: usize, y: usize, value: u8) -> bool {
        match self.row_mut(y).and_then(|row| row.get_mut(x)) {
            Some(px) => {
                *px = value;
                true
            }
            None => false,
        }
    }

    /// Copy a `bw`x`bh` block to `(x, y)`, clipped to the visible area
    pub fn put_block(&mut self, x: usize, y: usize, block: &[u8], bw: usize, bh: usize) {
        if x >= self.width {
            return;
        }
        let cols = bw.min(self.width - x);
        for j in 0..bh {
            let Some(src) = block.get(j * bw..j * bw + cols) else {
                return;
            };
            match self.row_mut(y + j) {
                Some(row) => row[x..x + cols].copy_from_slice(src),
                None => return,
            }
        }
    }

    /// Fill the whole visible area
    pub fn fill(&mut self, value: u8) {
        for y in 0..self.height {
            if let Some(row) = self.row_mut(y) {
                row.fill(value);
            }
        }
    }

    /// Split into disjoint horizontal bands of `band_height` rows
    ///
    /// Bands can be handed to different worker threads.
    pub fn into_row_bands(self, band_height: usize) -> Vec<PlaneMut<'a>> {
        let PlaneMut {
            data,
            stride,
            width,
            height,
        } = self;
        let band_height = band_height.max(1);
        let mut bands = Vec::with_capacity((height + band_height - 1) / band_height);
        let mut rest = data;
        let mut y = 0;
        while y < height {
            let rows = band_height.min(height - y);
            let take = (rows * stride).min(rest.len());
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(take);
            bands.push(PlaneMut {
                data: head,
                stride,
                width,
                height: rows,
            });
            rest = tail;
            y += rows;
        }
        bands
    }
}

/// A video frame under construction
#[derive(Debug)]
pub struct VideoFrameBuffer {
    planes: Vec<BufferRef>,
    linesize: Vec<usize>,
    dims: Vec<(usize, usize)>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl VideoFrameBuffer {
    /// Writable views of every picture plane at once
    pub fn planes_mut(&mut self) -> Result<Vec<PlaneMut<'_>>> {
        let count = self.format.num_planes() - usize::from(self.format.has_palette());
        let mut views = Vec::with_capacity(count);
        for ((buf, &stride), &(w, h)) in self
            .planes
            .iter_mut()
            .zip(self.linesize.iter())
            .zip(self.dims.iter())
            .take(count)
        {
            views.push(PlaneMut::new(buf.as_mut(), stride, w, h)?);
        }
        Ok(views)
    }

    /// Writable view of a single picture plane
    pub fn plane_mut(&mut self, plane: usize) -> Result<PlaneMut<'_>> {
        let (w, h) = *self
            .dims
            .get(plane)
            .ok_or_else(|| Error::invalid_input(format!("no plane {}", plane)))?;
        let stride = self.linesize[plane];
        PlaneMut::new(self.planes[plane].as_mut(), stride, w, h)
    }

    /// The palette plane of a PAL8 frame
    pub fn palette_mut(&mut self) -> Option<&mut [u8]> {
        if !self.format.has_palette() {
            return None;
        }
        self.planes.get_mut(1).map(|p| p.as_mut())
    }

    pub fn linesize(&self, plane: usize) -> Option<usize> {
        self.linesize.get(plane).copied()
    }

    /// Finish writing and hand the frame out as shared, read-only data
    pub fn freeze(self) -> VideoFrame {
        let mut frame = VideoFrame::new(self.width, self.height, self.format);
        frame.data = self.planes.into_iter().map(BufferRef::freeze).collect();
        frame.linesize = self.linesize;
        frame
    }
}

/// Allocates stride-aligned output frames
#[derive(Debug, Clone, Copy)]
pub struct FrameAllocator {
    align: usize,
}

impl Default for FrameAllocator {
    fn default() -> Self {
        FrameAllocator {
            align: DEFAULT_ALIGN,
        }
    }
}

impl FrameAllocator {
    /// Create an allocator padding every line to a multiple of `align`
    pub fn new(align: usize) -> Self {
        FrameAllocator {
            align: align.max(1),
        }
    }

    /// Allocate a zeroed video frame
    pub fn alloc_video(&self, width: u32, height: u32, format: PixelFormat) -> Result<VideoFrameBuffer> {
        check_dimensions(width, height)?;
        if format == PixelFormat::Unknown {
            return Err(Error::invalid_input("cannot allocate unknown pixel format"));
        }

        let mut planes = Vec::new();
        let mut linesize = Vec::new();
        let mut dims = Vec::new();
        for plane in 0..format.num_planes() {
            let bpp = format.bytes_per_pixel(plane);
            if bpp == 0 {
                planes.push(BufferRef::zeroed(PALETTE_SIZE));
                linesize.push(PALETTE_SIZE);
                continue;
            }
            let (sx, sy) = format.plane_shift(plane);
            let w = ((width as usize) + (1 << sx) - 1) >> sx;
            let h = ((height as usize) + (1 << sy) - 1) >> sy;
            let row = w * bpp;
            let stride = (row + self.align - 1) / self.align * self.align;
            let size = stride
                .checked_mul(h)
                .ok_or_else(|| Error::resource("frame size overflows"))?;
            planes.push(BufferRef::zeroed(size));
            linesize.push(stride);
            dims.push((row, h));
        }

        Ok(VideoFrameBuffer {
            planes,
            linesize,
            dims,
            width,
            height,
            format,
        })
    }

    /// Start a new frame as a private copy of a previous one
    pub fn copy_video(&self, prev: &VideoFrame) -> Result<VideoFrameBuffer> {
        let mut buf = self.alloc_video(prev.width, prev.height, prev.format)?;
        for (plane, src) in prev.data.iter().enumerate().take(buf.planes.len()) {
            let dst_stride = buf.linesize[plane];
            let src_stride = prev.linesize.get(plane).copied().unwrap_or(dst_stride);
            if src_stride == dst_stride && src.len() == buf.planes[plane].len() {
                buf.planes[plane] = src.to_mut();
                continue;
            }
            let rows = buf.dims.get(plane).map(|d| d.1).unwrap_or(1);
            let width = buf.dims.get(plane).map(|d| d.0).unwrap_or(src.len());
            let dst = buf.planes[plane].as_mut();
            for y in 0..rows {
                let (Some(s), Some(d)) = (
                    src.as_slice().get(y * src_stride..y * src_stride + width),
                    dst.get_mut(y * dst_stride..y * dst_stride + width),
                ) else {
                    break;
                };
                d.copy_from_slice(s);
            }
        }
        Ok(buf)
    }

    /// Allocate a zeroed audio frame
    pub fn alloc_audio(
        &self,
        nb_samples: usize,
        sample_rate: u32,
        channels: u16,
        format: SampleFormat,
    ) -> Result<AudioFrameBuffer> {
        if channels == 0 {
            return Err(Error::invalid_input("audio frame needs at least one channel"));
        }
        let size = format.sample_size();
        if size == 0 {
            return Err(Error::invalid_input("cannot allocate unknown sample format"));
        }
        let (count, plane_len) = if format.is_planar() {
            (channels as usize, nb_samples.checked_mul(size))
        } else {
            (
                1,
                nb_samples
                    .checked_mul(channels as usize)
                    .and_then(|v| v.checked_mul(size)),
            )
        };
        let plane_len = plane_len.ok_or_else(|| Error::resource("audio frame size overflows"))?;
        Ok(AudioFrameBuffer {
            planes: (0..count).map(|_| BufferRef::zeroed(plane_len)).collect(),
            nb_samples,
            sample_rate,
            channels,
            format,
        })
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_input(format!(
            "invalid dimensions {}x{}",
            width, height
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::resource(format!(
            "dimensions {}x{} exceed {}",
            width, height, MAX_DIMENSION
        )));
    }
    Ok(())
}

/// An audio frame under construction
#[derive(Debug)]
pub struct AudioFrameBuffer {
    planes: Vec<BufferRef>,
    nb_samples: usize,
    sample_rate: u32,
    channels: u16,
    format: SampleFormat,
}

impl AudioFrameBuffer {
    pub fn nb_samples(&self) -> usize {
        self.nb_samples
    }

    fn slot(&mut self, channel: usize, index: usize) -> Option<&mut [u8]> {
        let size = self.format.sample_size();
        if channel >= self.channels as usize || index >= self.nb_samples {
            return None;
        }
        let (plane, offset) = if self.format.is_planar() {
            (channel, index * size)
        } else {
            (0, (index * self.channels as usize + channel) * size)
        };
        self.planes
            .get_mut(plane)?
            .as_mut()
            .get_mut(offset..offset + size)
    }

    /// Store an unsigned 8-bit sample
    #[inline]
    pub fn set_u8(&mut self, channel: usize, index: usize, value: u8) {
        if let Some(slot) = self.slot(channel, index) {
            slot[0] = value;
        }
    }

    /// Store a signed 16-bit sample
    #[inline]
    pub fn set_i16(&mut self, channel: usize, index: usize, value: i16) {
        if let Some(slot) = self.slot(channel, index) {
            NativeEndian::write_i16(slot, value);
        }
    }

    /// Store a signed 32-bit sample
    #[inline]
    pub fn set_i32(&mut self, channel: usize, index: usize, value: i32) {
        if let Some(slot) = self.slot(channel, index) {
            NativeEndian::write_i32(slot, value);
        }
    }

    pub fn freeze(self) -> AudioFrame {
        let mut frame = AudioFrame::new(self.nb_samples, self.sample_rate, self.channels, self.format);
        frame.data = self.planes.into_iter().map(BufferRef::freeze).collect();
        frame.pts = Timestamp::none();
        frame
    }
}

/// Read back a native-endian 16-bit sample written by [`AudioFrameBuffer`]
pub fn read_i16(bytes: &[u8]) -> i16 {
    NativeEndian::read_i16(bytes)
}

/// Read back a native-endian 32-bit sample written by [`AudioFrameBuffer`]
pub fn read_i32(bytes: &[u8]) -> i32 {
    NativeEndian::read_i32(bytes)
}
