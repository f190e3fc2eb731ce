//! Gzip and deflate stream encoders.
//!
//! # Codecs
//!
//! | Codec       | Framing                               | `Content-Encoding` |
//! |-------------|---------------------------------------|--------------------|
//! | [`Deflate`] | raw DEFLATE (RFC 1951)                | `deflate`          |
//! | [`Gzip`]    | 10-byte header + DEFLATE + CRC/ISIZE  | `gzip`             |
//!
//! Both are produced by the same [`Encoder`], an adapter over
//! `flate2::Compress` that can be rebound to a new destination without
//! rebuilding its compression tables. The pools in [`crate::pool`] build
//! on that property.
//!
//! # Usage
//!
//! ```rust
//! use std::io::Write;
//! use flatepool::codec::{Codec, Encoder, BEST_COMPRESSION};
//!
//! let mut encoder = Encoder::new(Codec::Gzip, BEST_COMPRESSION, Vec::new()).unwrap();
//! encoder.write_all(b"hello").unwrap();
//! encoder.finish().unwrap();
//!
//! // reuse the same tables for the next stream
//! let first = encoder.reset(Vec::new());
//! assert!(!first.is_empty());
//! ```
//!
//! [`Deflate`]: Codec::Deflate
//! [`Gzip`]: Codec::Gzip

mod algorithm;
mod encoder;

pub use algorithm::Codec;
pub use encoder::{validate_level, Encoder, BEST_COMPRESSION, DEFAULT_BUFFER_SIZE};

pub(crate) use encoder::StreamState;
