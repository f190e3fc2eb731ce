//! Encoder pool error types.
//!
//! Pool management itself never fails: an empty pool grows instead of
//! blocking. Errors come from three places:
//!
//! - invalid configuration (compression level, buffer size)
//! - the destination sink (I/O failures while writing or flushing)
//! - caller contract violations (foreign encoder, codec mismatch, writing
//!   after the stream was finished)
//!
//! `Flush` keeps the destination failure as its `#[source]` so a flush
//! error surfaced by [`EncoderPool::release`](crate::EncoderPool::release)
//! is never confused with a pool-side failure.

use thiserror::Error;

use crate::codec::Codec;

/// Encoder pool errors.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Compression level outside the supported `0..=9` range.
    #[error("Invalid compression level: {0} (expected 0-9)")]
    InvalidLevel(u32),

    /// The underlying compressor rejected an operation.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Operation not allowed in the encoder's current lifecycle state.
    #[error("Invalid encoder state: {0}")]
    InvalidState(String),

    /// The encoder was handed to a pool that did not issue it.
    #[error("Encoder {id} was not acquired from this pool")]
    ForeignEncoder {
        /// Owner tag of the rejected encoder.
        id: u64,
    },

    /// The encoder was released under a different codec than it encodes.
    #[error("Codec mismatch: expected {expected}, got {actual}")]
    CodecMismatch {
        /// Codec the caller asked for.
        expected: Codec,
        /// Codec of the encoder.
        actual: Codec,
    },

    /// Completing the stream on release failed at the destination.
    ///
    /// The encoder has already been returned to its pool when this is
    /// reported; only the destination is affected.
    #[error("Flush on release failed: {0}")]
    Flush(#[source] std::io::Error),

    /// Unsupported or refused content encoding.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

impl From<flate2::CompressError> for PoolError {
    fn from(err: flate2::CompressError) -> Self {
        PoolError::Compression(err.to_string())
    }
}

impl From<toml::de::Error> for PoolError {
    fn from(err: toml::de::Error) -> Self {
        PoolError::Config(err.to_string())
    }
}

impl From<PoolError> for std::io::Error {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Io(e) | PoolError::Flush(e) => e,
            other => std::io::Error::other(other),
        }
    }
}
