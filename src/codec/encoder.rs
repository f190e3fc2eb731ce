//! Resettable streaming encoder over `flate2::Compress`.
//!
//! The expensive part of a best-compression encoder is the compressor
//! state (hash chains and lookup tables). [`StreamState`] owns that state
//! together with the output buffer and gzip bookkeeping, and can be
//! detached from its destination so the pool can keep it while idle.
//! [`Encoder`] binds a state to one destination at a time.
//!
//! `flate2::write::{DeflateEncoder, GzEncoder}` tie the compressor to a
//! writer type, so the write/flush/finish loop is kept here instead and
//! one idle state can serve any `W: Write`.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::{Compress, Compression, FlushCompress, Status};

use super::Codec;
use crate::error::{PoolError, Result};

/// Highest supported compression level
pub const BEST_COMPRESSION: u32 = 9;

/// Default size of the compressed output buffer
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Gzip magic, CM=8 (deflate), FLG=0
const GZIP_MAGIC: [u8; 4] = [0x1f, 0x8b, 0x08, 0x00];

/// Gzip OS byte: unknown
const GZIP_OS_UNKNOWN: u8 = 0xff;

static NEXT_ENCODER_ID: AtomicU64 = AtomicU64::new(1);

/// Reject levels the DEFLATE compressor does not define
pub fn validate_level(level: u32) -> Result<()> {
    if level > BEST_COMPRESSION {
        return Err(PoolError::InvalidLevel(level));
    }
    Ok(())
}

fn compress_err(err: flate2::CompressError) -> io::Error {
    io::Error::other(PoolError::from(err))
}

/// Destination-free compressor state.
pub(crate) struct StreamState {
    id: u64,
    codec: Codec,
    level: Compression,
    compress: Compress,
    crc: crc32fast::Hasher,
    /// Uncompressed size modulo 2^32 (gzip ISIZE)
    size: u32,
    buf: Vec<u8>,
    header_written: bool,
    finished: bool,
}

impl StreamState {
    pub(crate) fn new(codec: Codec, level: u32, buffer_size: usize) -> Result<Self> {
        validate_level(level)?;
        if buffer_size == 0 {
            return Err(PoolError::Config("buffer size must be non-zero".to_string()));
        }

        let level = Compression::new(level);
        let state = Self {
            id: NEXT_ENCODER_ID.fetch_add(1, Ordering::Relaxed),
            codec,
            level,
            compress: Compress::new(level, false),
            crc: crc32fast::Hasher::new(),
            size: 0,
            buf: Vec::with_capacity(buffer_size),
            header_written: false,
            finished: false,
        };
        tracing::debug!(id = state.id, %codec, level = level.level(), "constructed encoder");
        Ok(state)
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn codec(&self) -> Codec {
        self.codec
    }

    /// Back to the state of a freshly constructed encoder.
    pub(crate) fn reset(&mut self) {
        self.compress.reset();
        self.crc.reset();
        self.size = 0;
        self.buf.clear();
        self.header_written = false;
        self.finished = false;
    }

    fn gzip_header(&self) -> [u8; 10] {
        let xfl = if self.level.level() >= Compression::best().level() {
            2
        } else if self.level.level() <= Compression::fast().level() {
            4
        } else {
            0
        };
        let mut header = [0u8; 10];
        header[..4].copy_from_slice(&GZIP_MAGIC);
        // bytes 4..8: MTIME = 0
        header[8] = xfl;
        header[9] = GZIP_OS_UNKNOWN;
        header
    }

    fn ensure_header(&mut self) {
        if !self.header_written {
            if self.codec == Codec::Gzip {
                let header = self.gzip_header();
                self.buf.extend_from_slice(&header);
            }
            self.header_written = true;
        }
    }

    /// Push buffered output to the destination.
    fn dump<W: Write>(&mut self, dest: &mut W) -> io::Result<()> {
        while !self.buf.is_empty() {
            match dest.write(&self.buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "destination accepted no bytes",
                    ))
                },
                Ok(n) => {
                    self.buf.drain(..n);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub(crate) fn write<W: Write>(&mut self, dest: &mut W, data: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other(PoolError::InvalidState(
                "write after finish".to_string(),
            )));
        }
        self.ensure_header();

        loop {
            self.dump(dest)?;

            let before = self.compress.total_in();
            let status = self
                .compress
                .compress_vec(data, &mut self.buf, FlushCompress::None)
                .map_err(compress_err)?;
            let consumed = (self.compress.total_in() - before) as usize;

            if consumed == 0 && !data.is_empty() && status != Status::StreamEnd {
                continue;
            }

            self.crc.update(&data[..consumed]);
            self.size = self.size.wrapping_add(consumed as u32);
            return Ok(consumed);
        }
    }

    /// Sync flush: everything written so far becomes decodable at the
    /// destination, the stream stays open.
    pub(crate) fn flush<W: Write>(&mut self, dest: &mut W) -> io::Result<()> {
        if !self.finished {
            self.ensure_header();
            self.dump(dest)?;
            self.compress
                .compress_vec(&[], &mut self.buf, FlushCompress::Sync)
                .map_err(compress_err)?;

            loop {
                self.dump(dest)?;
                let before = self.compress.total_out();
                self.compress
                    .compress_vec(&[], &mut self.buf, FlushCompress::None)
                    .map_err(compress_err)?;
                if before == self.compress.total_out() {
                    break;
                }
            }
        }

        self.dump(dest)?;
        dest.flush()
    }

    /// Terminate the compressed stream. The destination is flushed but
    /// never closed.
    pub(crate) fn finish<W: Write>(&mut self, dest: &mut W) -> io::Result<()> {
        if !self.finished {
            self.ensure_header();

            loop {
                self.dump(dest)?;
                let before = self.compress.total_out();
                self.compress
                    .compress_vec(&[], &mut self.buf, FlushCompress::Finish)
                    .map_err(compress_err)?;
                if before == self.compress.total_out() {
                    break;
                }
            }

            if self.codec == Codec::Gzip {
                let crc = self.crc.clone().finalize();
                self.buf.extend_from_slice(&crc.to_le_bytes());
                self.buf.extend_from_slice(&self.size.to_le_bytes());
            }
            self.finished = true;
        }

        self.dump(dest)?;
        dest.flush()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Nothing buffered and no stream in progress
    #[cfg(test)]
    pub(crate) fn is_pristine(&self) -> bool {
        self.buf.is_empty()
            && !self.header_written
            && !self.finished
            && self.size == 0
            && self.compress.total_in() == 0
    }
}

/// A gzip or deflate stream encoder bound to one destination.
///
/// Unlike `flate2::write::GzEncoder`, the encoder can be rebound with
/// [`Encoder::reset`] without rebuilding the compressor tables, and
/// dropping it does not finish the stream; call [`Encoder::finish`].
pub struct Encoder<W: Write> {
    state: StreamState,
    dest: W,
}

impl<W: Write> Encoder<W> {
    /// Create an encoder with the default output buffer size
    pub fn new(codec: Codec, level: u32, dest: W) -> Result<Self> {
        Self::with_buffer_size(codec, level, DEFAULT_BUFFER_SIZE, dest)
    }

    /// Create an encoder with a custom output buffer size
    pub fn with_buffer_size(codec: Codec, level: u32, buffer_size: usize, dest: W) -> Result<Self> {
        let state = StreamState::new(codec, level, buffer_size)?;
        Ok(Self { state, dest })
    }

    pub(crate) fn from_parts(state: StreamState, dest: W) -> Self {
        Self { state, dest }
    }

    pub(crate) fn into_parts(self) -> (StreamState, W) {
        (self.state, self.dest)
    }

    /// Rebind to a new destination as a fresh stream.
    ///
    /// Pending output for the old destination is discarded, not written.
    /// Returns the old destination.
    pub fn reset(&mut self, dest: W) -> W {
        self.state.reset();
        std::mem::replace(&mut self.dest, dest)
    }

    /// Write the final block (and the gzip trailer) to the destination.
    ///
    /// The destination is flushed, not closed. Further writes fail until
    /// the encoder is [`reset`](Encoder::reset).
    pub fn finish(&mut self) -> Result<()> {
        self.state.finish(&mut self.dest)?;
        Ok(())
    }

    /// Owner tag, unique for the life of the process
    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Codec this encoder produces
    pub fn codec(&self) -> Codec {
        self.state.codec
    }

    /// Configured compression level
    pub fn level(&self) -> u32 {
        self.state.level.level()
    }

    /// Uncompressed bytes consumed since the last reset
    pub fn total_in(&self) -> u64 {
        self.state.compress.total_in()
    }

    /// DEFLATE bytes produced since the last reset (excludes gzip framing)
    pub fn total_out(&self) -> u64 {
        self.state.compress.total_out()
    }

    /// Whether [`finish`](Encoder::finish) completed the current stream
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Borrow the destination
    pub fn get_ref(&self) -> &W {
        &self.dest
    }

    /// Mutably borrow the destination.
    ///
    /// Writing to it directly interleaves raw bytes with the compressed
    /// stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.dest
    }

    /// Take the destination back without finishing the stream
    pub fn into_inner(self) -> W {
        self.dest
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.write(&mut self.dest, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.flush(&mut self.dest)
    }
}

impl<W: Write> std::fmt::Debug for Encoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("id", &self.id())
            .field("codec", &self.codec())
            .field("level", &self.level())
            .field("total_in", &self.total_in())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
