//! bitdec CLI
//!
//! Decodes raw elementary streams with the bitdec codecs and writes the
//! decoded planes or samples as raw data.

use anyhow::Context;
use bitdec_lib::codec::{create_decoder, get_codec_info, list_codecs, DecoderContext, Frame};
use bitdec_lib::format::split_packets;
use bitdec_lib::{init, Config, Error};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bitdec")]
#[command(about = "bitdec - bitstream decoders for legacy codecs", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Number of threads to use
    #[arg(short = 't', long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available codecs
    Codecs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a raw stream to raw planes or samples
    Decode {
        /// Codec identifier (see `bitdec codecs`)
        #[arg(short, long)]
        codec: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Split the input into packets of this many bytes
        #[arg(long)]
        packet_size: Option<usize>,

        /// Picture width
        #[arg(long)]
        width: Option<u32>,

        /// Picture height
        #[arg(long)]
        height: Option<u32>,

        /// Audio sample rate
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Audio channel count
        #[arg(long)]
        channels: Option<u16>,

        /// Bits per coded sample or pixel
        #[arg(long)]
        bits: Option<u32>,

        /// File holding codec extradata
        #[arg(long)]
        extradata: Option<PathBuf>,
    },
}

/// Stream parameters for the decode command
struct DecodeParams {
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    bits: Option<u32>,
    extradata: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config {
        max_threads: cli.threads,
        verbose: cli.verbose,
        debug: cli.debug,
    };
    init(config)?;

    info!("bitdec v{}", bitdec_lib::VERSION);

    match cli.command {
        Commands::Codecs { json } => cmd_codecs(json)?,
        Commands::Decode {
            codec,
            input,
            output,
            packet_size,
            width,
            height,
            sample_rate,
            channels,
            bits,
            extradata,
        } => {
            info!(
                "Decoding {} as {} -> {}",
                input.display(),
                codec,
                output.display()
            );
            let params = DecodeParams {
                width,
                height,
                sample_rate,
                channels,
                bits,
                extradata,
            };
            cmd_decode(&codec, &input, &output, packet_size.unwrap_or(0), params)?;
        }
    }

    Ok(())
}

fn cmd_codecs(json: bool) -> anyhow::Result<()> {
    let codecs = list_codecs();
    if json {
        println!("{}", serde_json::to_string_pretty(&codecs)?);
        return Ok(());
    }

    println!("Available Codecs:");
    println!("─────────────────────────────────────────────────────────");
    println!("{:<10} {:<8} {:<6} {:<30}", "ID", "Type", "Enc", "Description");
    println!("─────────────────────────────────────────────────────────");
    for info in codecs {
        println!(
            "{:<10} {:<8} {:<6} {:<30}",
            info.id,
            format!("{}", info.media_type),
            if info.capabilities.encoder { "yes" } else { "-" },
            info.long_name
        );
    }
    Ok(())
}

fn cmd_decode(
    codec: &str,
    input: &Path,
    output: &Path,
    packet_size: usize,
    params: DecodeParams,
) -> anyhow::Result<()> {
    let info = get_codec_info(codec)
        .with_context(|| format!("Unknown codec '{}', see `bitdec codecs`", codec))?;

    let mut ctx = DecoderContext::new(info.id.clone());
    if let (Some(w), Some(h)) = (params.width, params.height) {
        ctx.set_dimensions(w, h);
    }
    if params.sample_rate.is_some() || params.channels.is_some() {
        ctx.set_audio_params(
            params.sample_rate.unwrap_or(0),
            params.channels.unwrap_or(0),
        );
    }
    if let Some(bits) = params.bits {
        ctx.set_bits_per_coded_sample(bits);
    }
    if let Some(path) = params.extradata.as_deref() {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read extradata {}", path.display()))?;
        ctx.set_extradata(data);
    }

    let data =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let packets = split_packets(&data, packet_size);

    let mut decoder = create_decoder(&ctx)?;
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut out = BufWriter::new(file);

    let mut stats = DecodeStats::default();
    for packet in &packets {
        match decoder.send_packet(packet) {
            Ok(()) => {}
            Err(e @ Error::InvalidData(_)) | Err(e @ Error::Unsupported(_)) => {
                warn!("Packet {} rejected: {}", packet.pts, e);
                stats.rejected += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        drain(decoder.as_mut(), &mut out, &mut stats)?;
    }
    drain(decoder.as_mut(), &mut out, &mut stats)?;
    decoder.flush()?;
    decoder.close()?;
    out.flush()?;

    println!(
        "Decoded {} packets: {} frames, {} samples, {} bytes written, {} rejected",
        packets.len(),
        stats.frames,
        stats.samples,
        stats.bytes,
        stats.rejected
    );
    Ok(())
}

#[derive(Default)]
struct DecodeStats {
    frames: u64,
    samples: u64,
    bytes: u64,
    rejected: u64,
}

fn drain(
    decoder: &mut (dyn bitdec_lib::codec::Decoder + Send),
    out: &mut impl Write,
    stats: &mut DecodeStats,
) -> anyhow::Result<()> {
    loop {
        let frame = match decoder.receive_frame() {
            Ok(frame) => frame,
            Err(Error::TryAgain) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let bytes = match &frame {
            Frame::Video(video) => video.to_packed_bytes(),
            Frame::Audio(audio) => {
                stats.samples += audio.nb_samples as u64;
                audio.interleaved_bytes()
            }
        };
        out.write_all(&bytes)?;
        stats.frames += 1;
        stats.bytes += bytes.len() as u64;
    }
}
