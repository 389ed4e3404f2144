//! bitdec - bitstream decoders for legacy audio and video codecs
//!
//! A small set of decoders built on one shared toolkit: a bit and byte
//! cursor, variable-length-code tables, an adaptive range coder, an 8x8
//! inverse transform and a frame writer that honours padded line sizes.
//!
//! # Architecture
//!
//! - `format`: compressed packets as handed over by a demuxer
//! - `codec`: the shared toolkit, the decoder state machine and the codecs
//! - `util`: buffers, pixel and sample formats, timestamps
//!
//! Every decoder is driven through [`codec::Decoder`]: send a packet, then
//! drain frames until [`Error::TryAgain`].

pub mod codec;
pub mod error;
pub mod format;
pub mod util;

pub use error::{Error, Result};

use tracing::warn;

/// bitdec version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the bitdec library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum number of threads to use for parallel block reconstruction
    pub max_threads: Option<usize>,
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the library with the given configuration
///
/// Safe to call more than once; later calls cannot resize the thread pool
/// or replace the log subscriber and only log that.
pub fn init(config: Config) -> Result<()> {
    if let Some(threads) = config.max_threads {
        if threads == 0 {
            return Err(Error::config("thread count must be at least 1"));
        }
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            warn!("Thread pool already initialized: {}", e);
        }
    }

    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
        // A subscriber installed earlier stays in place
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    Ok(())
}
