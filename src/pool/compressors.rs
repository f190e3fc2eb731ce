//! One encoder pool per codec.

use std::io::Write;

use serde::Serialize;

use super::encoder_pool::{EncoderPool, PoolOptions, PooledEncoder};
use super::stats::PoolStatsSnapshot;
use crate::codec::Codec;
use crate::error::{PoolError, Result};

/// The deflate and gzip pools, shared across requests.
///
/// Owned by whatever top-level component needs compression and passed to
/// consumers by handle; cloning is cheap and clones share both pools.
#[derive(Clone, Debug)]
pub struct Compressors {
    deflate: EncoderPool,
    gzip: EncoderPool,
}

/// Statistics for both pools
#[derive(Debug, Clone, Serialize)]
pub struct CompressorStats {
    /// Deflate pool
    pub deflate: PoolStatsSnapshot,
    /// Gzip pool
    pub gzip: PoolStatsSnapshot,
}

impl Default for Compressors {
    fn default() -> Self {
        Self {
            deflate: EncoderPool::with_defaults(Codec::Deflate),
            gzip: EncoderPool::with_defaults(Codec::Gzip),
        }
    }
}

impl Compressors {
    /// Create both pools with the same options
    pub fn new(options: PoolOptions) -> Result<Self> {
        Ok(Self {
            deflate: EncoderPool::new(Codec::Deflate, options.clone())?,
            gzip: EncoderPool::new(Codec::Gzip, options)?,
        })
    }

    /// The pool for `codec`
    pub fn pool(&self, codec: Codec) -> &EncoderPool {
        match codec {
            Codec::Deflate => &self.deflate,
            Codec::Gzip => &self.gzip,
        }
    }

    /// Check out an encoder for `codec` bound to `dest`
    pub fn acquire<W: Write>(&self, codec: Codec, dest: W) -> Result<PooledEncoder<W>> {
        self.pool(codec).acquire(dest)
    }

    /// Return an encoder obtained with [`Compressors::acquire`].
    ///
    /// Fails with [`PoolError::CodecMismatch`] when `codec` is not the
    /// codec the encoder was acquired for; the encoder then goes back to
    /// its own pool.
    pub fn release<W: Write>(&self, codec: Codec, encoder: PooledEncoder<W>) -> Result<W> {
        if encoder.codec() != codec {
            return Err(PoolError::CodecMismatch {
                expected: codec,
                actual: encoder.codec(),
            });
        }
        self.pool(codec).release(encoder)
    }

    /// Compress a complete payload through a pooled encoder
    pub fn compress(&self, codec: Codec, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = self.acquire(codec, Vec::with_capacity(data.len() / 2 + 64))?;
        encoder.write_all(data)?;
        self.release(codec, encoder)
    }

    /// Drain both pools, returning the number of encoders evicted
    pub fn drain(&self) -> usize {
        self.deflate.drain() + self.gzip.drain()
    }

    /// Statistics for both pools
    pub fn stats(&self) -> CompressorStats {
        CompressorStats {
            deflate: self.deflate.snapshot(),
            gzip: self.gzip.snapshot(),
        }
    }
}
