//! Video decoder integration tests
//!
//! Streams are built with the helpers in `common` and decoded through the
//! public decoder interface.
//!
//! Test categories:
//! 1. 8BPS plane unpacking and palettes
//! 2. ARBC tile painting and inter prediction
//! 3. ASV1 block decoding and parallel reconstruction

mod common;

use bitdec_lib::codec::{
    create_decoder, Asv1Decoder, CodecDecoder, Decoder, DecoderContext, Frame, PictureType,
    VideoFrame,
};
use bitdec_lib::error::Error;
use bitdec_lib::format::Packet;
use bitdec_lib::util::PixelFormat;
use common::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn video_decoder(codec: &str, width: u32, height: u32, bits: u32) -> Box<dyn Decoder + Send> {
    let mut ctx = DecoderContext::new(codec);
    ctx.set_dimensions(width, height);
    if bits != 0 {
        ctx.set_bits_per_coded_sample(bits);
    }
    create_decoder(&ctx).expect("Failed to create decoder")
}

/// Send one packet and take the frame it produced
fn decode_one(decoder: &mut dyn Decoder, data: &[u8], pts: i64) -> VideoFrame {
    decoder
        .send_packet(&Packet::from_slice(data, pts))
        .expect("Packet rejected");
    match decoder.receive_frame().expect("No frame") {
        Frame::Video(video) => video,
        Frame::Audio(_) => panic!("Expected a video frame"),
    }
}

fn rgb_at(video: &VideoFrame, x: usize, y: usize) -> [u8; 3] {
    let row = video.row(0, y).unwrap();
    [row[3 * x], row[3 * x + 1], row[3 * x + 2]]
}

// ============================================================================
// 8BPS
// ============================================================================

#[test]
fn test_8bps_line_length_past_buffer_is_rejected() {
    let mut decoder = video_decoder("8bps", 4, 2, 8);
    // Row 0 claims 200 compressed bytes, the packet holds two
    let packet = Packet::from_slice(&[0, 200, 0, 2, 0xFD, 0x07], 0);
    let result = decoder.send_packet(&packet);
    assert!(matches!(result, Err(Error::InvalidData(_))));
    assert!(matches!(decoder.receive_frame(), Err(Error::TryAgain)));
}

#[test]
fn test_8bps_line_table_larger_than_packet() {
    let mut decoder = video_decoder("8bps", 4, 8, 24);
    let result = decoder.send_packet(&Packet::from_slice(&[0u8; 10], 0));
    assert!(matches!(result, Err(Error::InvalidData(_))));
}

#[test]
fn test_8bps_bgra_planes() {
    let (width, height) = (5, 3);
    let count = width * height;
    let red: Vec<u8> = (0..count).map(|i| i as u8).collect();
    let green = vec![0x40u8; count];
    let blue: Vec<u8> = (0..count).map(|i| 200 - (i % 3) as u8).collect();
    let alpha = vec![0xFFu8; count];
    let packet = eightbps_packet(width, height, &[red.clone(), green, blue.clone(), alpha]);

    let mut decoder = video_decoder("8bps", width as u32, height as u32, 32);
    let video = decode_one(decoder.as_mut(), &packet, 0);
    assert_eq!(video.format, PixelFormat::BGRA);
    assert!(video.keyframe);
    assert_eq!(video.pict_type, PictureType::I);

    for y in 0..height {
        let row = video.row(0, y).unwrap();
        assert_eq!(row.len(), width * 4);
        for x in 0..width {
            let i = y * width + x;
            assert_eq!(&row[4 * x..4 * x + 4], &[blue[i], 0x40, red[i], 0xFF]);
        }
    }
}

#[test]
fn test_8bps_long_runs_and_literals() {
    let (width, height) = (300, 2);
    let mut plane = vec![9u8; width];
    plane.extend((0..width).map(|i| (i * 7) as u8));
    let packet = eightbps_packet(width, height, &[plane.clone()]);

    let mut decoder = video_decoder("8bps", width as u32, height as u32, 8);
    let video = decode_one(decoder.as_mut(), &packet, 0);
    assert_eq!(video.row(0, 0).unwrap(), &plane[..width]);
    assert_eq!(video.row(0, 1).unwrap(), &plane[width..]);
}

#[test]
fn test_8bps_palette_side_data_is_kept() {
    let plane = vec![0u8, 1, 2, 3];
    let data = eightbps_packet(2, 2, &[plane]);
    let mut decoder = video_decoder("8bps", 2, 2, 8);

    let mut packet = Packet::from_slice(&data, 0);
    packet.palette = Some(vec![0xFF11_2233; 256]);
    decoder.send_packet(&packet).unwrap();
    let first = decoder.receive_frame().unwrap();
    let pal = first.as_video().unwrap().palette().unwrap();
    assert_eq!(&pal[..4], &[0x33, 0x22, 0x11, 0xFF]);

    // A later packet without side data reuses the last palette
    let second = decode_one(decoder.as_mut(), &data, 1);
    assert_eq!(&second.palette().unwrap()[..4], &[0x33, 0x22, 0x11, 0xFF]);
}

#[test]
fn test_8bps_unsupported_depth_fails_to_open() {
    let mut ctx = DecoderContext::new("8bps");
    ctx.set_dimensions(4, 4);
    ctx.set_bits_per_coded_sample(16);
    assert!(matches!(create_decoder(&ctx), Err(Error::Unsupported(_))));
}

// ============================================================================
// ARBC
// ============================================================================

fn full_tile16(color: u32) -> ArbcSegment {
    ArbcSegment {
        color,
        tiles16: vec![ArbcTile {
            y: 0,
            x: 0,
            mask: 0xFFFF,
        }],
        ..Default::default()
    }
}

fn single_pixel(color: u32, y: u8, x: u8, mask: u16) -> ArbcSegment {
    ArbcSegment {
        color,
        pixels: vec![ArbcTile { y, x, mask }],
        ..Default::default()
    }
}

#[test]
fn test_arbc_full_paint_is_keyframe() {
    let mut decoder = video_decoder("arbc", 16, 16, 0);
    let video = decode_one(decoder.as_mut(), &arbc_packet(&[full_tile16(0x102030)]), 0);
    assert_eq!(video.format, PixelFormat::RGB24);
    assert!(video.keyframe);
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(rgb_at(&video, x, y), [0x10, 0x20, 0x30]);
        }
    }
}

#[test]
fn test_arbc_partial_update_keeps_previous_picture() {
    let mut decoder = video_decoder("arbc", 16, 16, 0);
    decode_one(decoder.as_mut(), &arbc_packet(&[full_tile16(0x102030)]), 0);

    // First pixel of the bottom-left 4x4 tile
    let video = decode_one(
        decoder.as_mut(),
        &arbc_packet(&[single_pixel(0xFF0000, 0, 0, 0x8000)]),
        1,
    );
    assert!(!video.keyframe);
    assert_eq!(video.pict_type, PictureType::P);
    assert_eq!(rgb_at(&video, 0, 15), [0xFF, 0, 0]);
    assert_eq!(rgb_at(&video, 1, 15), [0x10, 0x20, 0x30]);
    assert_eq!(rgb_at(&video, 0, 0), [0x10, 0x20, 0x30]);
}

#[test]
fn test_arbc_repainting_everything_is_keyframe_again() {
    let mut decoder = video_decoder("arbc", 16, 16, 0);
    decode_one(decoder.as_mut(), &arbc_packet(&[full_tile16(0x000000)]), 0);
    let video = decode_one(decoder.as_mut(), &arbc_packet(&[full_tile16(0xABCDEF)]), 1);
    assert!(video.keyframe);
    assert_eq!(rgb_at(&video, 7, 7), [0xAB, 0xCD, 0xEF]);
}

#[test]
fn test_arbc_flush_drops_reference() {
    let mut decoder = video_decoder("arbc", 8, 8, 0);
    decode_one(decoder.as_mut(), &arbc_packet(&[full_tile16(0x808080)]), 0);
    decoder.flush().unwrap();

    let video = decode_one(
        decoder.as_mut(),
        &arbc_packet(&[single_pixel(0x010203, 0, 0, 0x8000)]),
        1,
    );
    // No reference left: the frame starts black
    assert!(!video.keyframe);
    assert_eq!(rgb_at(&video, 0, 7), [1, 2, 3]);
    assert_eq!(rgb_at(&video, 1, 7), [0, 0, 0]);
}

#[test]
fn test_arbc_partial_first_frame_is_inter() {
    let mut decoder = video_decoder("arbc", 16, 16, 0);
    let video = decode_one(
        decoder.as_mut(),
        &arbc_packet(&[single_pixel(0x0A0B0C, 0, 0, 0x8000)]),
        0,
    );
    assert!(!video.keyframe);
    assert_eq!(video.pict_type, PictureType::P);
    assert_eq!(rgb_at(&video, 0, 15), [0x0A, 0x0B, 0x0C]);
    assert_eq!(rgb_at(&video, 15, 0), [0, 0, 0]);
}

#[test]
fn test_arbc_zero_segments_produce_no_frame() {
    let mut decoder = video_decoder("arbc", 8, 8, 0);
    decoder.send_packet(&Packet::from_slice(&arbc_packet(&[]), 0)).unwrap();
    assert!(matches!(decoder.receive_frame(), Err(Error::TryAgain)));
}

#[test]
fn test_arbc_short_header_and_segment_count() {
    let mut decoder = video_decoder("arbc", 8, 8, 0);
    let result = decoder.send_packet(&Packet::from_slice(&[0u8; 9], 0));
    assert!(matches!(result, Err(Error::InvalidData(_))));

    // Five segments announced, one segment's worth of bytes present
    let mut data = vec![0u8; 8];
    data.extend_from_slice(&5u16.to_le_bytes());
    data.extend_from_slice(&[1, 0, 2, 0, 3, 0, 0]);
    let result = decoder.send_packet(&Packet::from_slice(&data, 1));
    assert!(matches!(result, Err(Error::InvalidData(_))));
}

#[test]
fn test_arbc_tolerates_damaged_tile_lists() {
    let mut decoder = video_decoder("arbc", 4, 4, 0);

    // More 16x16 tiles than a 4x4 picture could hold: the list is ignored
    let too_many = ArbcSegment {
        color: 0xFFFFFF,
        tiles16: vec![ArbcTile { y: 0, x: 0, mask: 0xFFFF }; 2],
        ..Default::default()
    };
    let video = decode_one(decoder.as_mut(), &arbc_packet(&[too_many]), 0);
    assert_eq!(rgb_at(&video, 0, 0), [0, 0, 0]);

    // Tile outside the picture is skipped
    let outside = single_pixel(0xFFFFFF, 0, 9, 0xFFFF);
    let video = decode_one(decoder.as_mut(), &arbc_packet(&[outside]), 1);
    assert_eq!(rgb_at(&video, 3, 3), [0, 0, 0]);

    // Tile list cut short: missing bytes read as zero
    let mut data = arbc_packet(&[single_pixel(0xFFFFFF, 0, 0, 0xFFFF)]);
    data.truncate(data.len() - 3);
    let video = decode_one(decoder.as_mut(), &data, 2);
    assert_eq!(rgb_at(&video, 0, 3), [0, 0, 0]);
}

// ============================================================================
// ASV1
// ============================================================================

#[test]
fn test_asv1_short_packet_is_rejected_before_decoding() {
    let mut decoder = video_decoder("asv1", 32, 32, 0);
    // Four macroblocks need at least 52 bits
    let result = decoder.send_packet(&Packet::from_slice(&[0u8; 4], 0));
    assert!(matches!(result, Err(Error::InvalidData(_))));
    assert!(matches!(decoder.receive_frame(), Err(Error::TryAgain)));
}

#[test]
fn test_asv1_flat_macroblocks_in_coded_order() {
    let mut writer = Asv1Writer::new();
    writer
        .flat_macroblock(10, 100, 150)
        .flat_macroblock(20, 110, 160)
        .flat_macroblock(30, 120, 170)
        .flat_macroblock(40, 130, 180);
    let packet = writer.finish();

    let mut decoder = video_decoder("asv1", 32, 32, 0);
    let video = decode_one(decoder.as_mut(), &packet, 5);
    assert_eq!(video.format, PixelFormat::YUV420P);
    assert!(video.keyframe);
    assert_eq!(video.pts.value, 5);

    let luma = |x: usize, y: usize| video.row(0, y).unwrap()[x];
    assert_eq!(luma(0, 0), 10);
    assert_eq!(luma(31, 15), 20);
    assert_eq!(luma(0, 16), 30);
    assert_eq!(luma(31, 31), 40);
    assert_eq!(video.row(1, 0).unwrap()[0], 100);
    assert_eq!(video.row(2, 15).unwrap()[15], 180);
}

#[test]
fn test_asv1_inverse_qscale_from_extradata() {
    let mut writer = Asv1Writer::new();
    writer.block(128, &[(1, 3)]);
    for _ in 0..5 {
        writer.block(128, &[]);
    }
    let packet = writer.finish();

    let decode_with = |qscale: u8| {
        let mut ctx = DecoderContext::new("asv1");
        ctx.set_dimensions(16, 16);
        ctx.set_extradata(vec![qscale]);
        let mut decoder = create_decoder(&ctx).unwrap();
        decode_one(decoder.as_mut(), &packet, 0).row(0, 0).unwrap()[0]
    };

    // The dequantisation factors shrink as the inverse qscale grows
    let strong = decode_with(2);
    let weak = decode_with(12);
    assert!((strong as i32 - 128).abs() > (weak as i32 - 128).abs());
}

#[test]
fn test_asv1_parallel_reconstruction_is_deterministic() {
    let (width, height) = (48u32, 40u32);
    let mb_count = 3 * 3;
    let mut writer = Asv1Writer::new();
    for mb in 0..mb_count {
        for b in 0..6 {
            let dc = (mb * 20 + b * 7) as u8;
            writer.block(dc, &[(1, (mb % 5) as i32 - 2), (5, 40 - mb as i32), (9, -3)]);
        }
    }
    let packet = Packet::from_slice(&writer.finish(), 0);

    let decode_in = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        pool.install(|| {
            let mut ctx = DecoderContext::new("asv1");
            ctx.set_dimensions(width, height);
            let mut decoder = Asv1Decoder::open(&ctx).unwrap();
            match decoder.decode_packet(&packet).unwrap() {
                Some(Frame::Video(video)) => video.to_packed_bytes(),
                _ => panic!("Expected a video frame"),
            }
        })
    };

    let single = decode_in(1);
    assert_eq!(single.len(), 48 * 40 + 2 * 24 * 20);
    assert_eq!(single, decode_in(4));
}
