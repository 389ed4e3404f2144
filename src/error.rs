//! Error types for bitdec

use thiserror::Error;

/// Result type alias for bitdec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bitdec
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed, truncated or out-of-range compressed data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Allocation or table construction failure
    #[error("Resource error: {0}")]
    Resource(String),

    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration outside the supported parameter space
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// End of stream
    #[error("End of stream")]
    EndOfStream,

    /// Try again later
    #[error("Try again")]
    TryAgain,

    /// Buffer too small
    #[error("Buffer too small: need {need}, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Error::InvalidData(msg.into())
    }

    /// Create a resource error
    pub fn resource<S: Into<String>>(msg: S) -> Self {
        Error::Resource(msg.into())
    }

    /// Create an unsupported error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// The caller should re-invoke rather than treat this as a failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TryAgain)
    }

    /// Whether this error stems from the compressed input itself
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, Error::InvalidData(_))
    }
}
