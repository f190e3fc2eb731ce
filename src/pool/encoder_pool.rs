//! Free-list pool of reusable encoders for one codec.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::stats::{PoolStats, PoolStatsSnapshot};
use crate::codec::{
    validate_level, Codec, Encoder, StreamState, BEST_COMPRESSION, DEFAULT_BUFFER_SIZE,
};
use crate::error::{PoolError, Result};

/// Pool tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Compression level for new encoders (0-9)
    pub level: u32,

    /// Output buffer size per encoder in bytes
    pub buffer_size: usize,

    /// Optional idle high-water mark; `None` keeps every released encoder
    pub max_idle: Option<usize>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            level: BEST_COMPRESSION,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_idle: None,
        }
    }
}

impl PoolOptions {
    /// Set the compression level
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set the output buffer size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Cap the idle list
    pub fn with_max_idle(mut self, max: usize) -> Self {
        self.max_idle = Some(max);
        self
    }

    /// Check level and buffer size
    pub fn validate(&self) -> Result<()> {
        validate_level(self.level)?;
        if self.buffer_size == 0 {
            return Err(PoolError::Config("buffer_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

struct PoolInner {
    codec: Codec,
    options: PoolOptions,
    /// Idle encoders, used as a stack
    idle: Mutex<Vec<StreamState>>,
    stats: PoolStats,
}

/// A growable pool of idle encoders for one codec.
///
/// The handle is cheap to clone; clones share the same idle list. Every
/// encoder on the idle list has finished its last stream and is not bound
/// to any destination.
///
/// The lock only guards the push/pop on the idle list. Rebinding a reused
/// encoder, and every write or flush, happens outside it.
///
/// ```rust
/// use std::io::Write;
/// use flatepool::{Codec, EncoderPool};
///
/// let pool = EncoderPool::with_defaults(Codec::Gzip);
/// let mut encoder = pool.acquire(Vec::new()).unwrap();
/// encoder.write_all(b"hello").unwrap();
/// let compressed = pool.release(encoder).unwrap();
/// assert!(!compressed.is_empty());
/// assert_eq!(pool.idle_len(), 1);
/// ```
#[derive(Clone)]
pub struct EncoderPool {
    inner: Arc<PoolInner>,
}

impl EncoderPool {
    /// Create an empty pool
    pub fn new(codec: Codec, options: PoolOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::from_valid(codec, options))
    }

    /// Create an empty pool at maximum compression
    pub fn with_defaults(codec: Codec) -> Self {
        Self::from_valid(codec, PoolOptions::default())
    }

    fn from_valid(codec: Codec, options: PoolOptions) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                codec,
                options,
                idle: Mutex::new(Vec::new()),
                stats: PoolStats::new(),
            }),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<StreamState>> {
        // the idle list is valid after any panic: push and pop are atomic
        self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out an encoder bound to `dest`.
    ///
    /// Reuses the most recently released encoder when one is idle,
    /// otherwise constructs a new one. Never waits on other callers.
    pub fn acquire<W: Write>(&self, dest: W) -> Result<PooledEncoder<W>> {
        let reused = self.lock_idle().pop();

        let state = match reused {
            Some(mut state) => {
                state.reset();
                self.inner.stats.record_reuse();
                state
            },
            None => {
                let options = &self.inner.options;
                let state = StreamState::new(self.inner.codec, options.level, options.buffer_size)?;
                self.inner.stats.record_create();
                state
            },
        };

        Ok(PooledEncoder {
            encoder: Some(Encoder::from_parts(state, dest)),
            pool: self.clone(),
        })
    }

    /// Complete the encoder's stream and return it to the idle list.
    ///
    /// The destination is handed back, flushed but not closed. If the
    /// destination fails while the stream is completed, the encoder is
    /// still pooled and the failure is returned as [`PoolError::Flush`].
    ///
    /// An encoder issued by a different pool is rejected with
    /// [`PoolError::ForeignEncoder`] and goes back to its own pool.
    pub fn release<W: Write>(&self, mut encoder: PooledEncoder<W>) -> Result<W> {
        if !Arc::ptr_eq(&self.inner, &encoder.pool.inner) {
            return Err(PoolError::ForeignEncoder { id: encoder.id() });
        }

        let Some(inner) = encoder.encoder.take() else {
            return Err(PoolError::InvalidState("encoder already released".to_string()));
        };

        let (state, mut dest) = inner.into_parts();
        match self.complete(state, &mut dest) {
            Ok(()) => Ok(dest),
            Err(e) => Err(PoolError::Flush(e)),
        }
    }

    /// Finish the stream on `dest` and check the state in, whatever the
    /// destination did. A failed stream is reset first so nothing buffered
    /// for `dest` sits on the idle list.
    fn complete<W: Write>(&self, mut state: StreamState, dest: &mut W) -> io::Result<()> {
        let completed = state.finish(dest);
        if completed.is_err() {
            state.reset();
            self.inner.stats.record_flush_error();
        }
        self.check_in(state);
        completed
    }

    fn check_in(&self, state: StreamState) {
        let mut idle = self.lock_idle();
        if self.inner.options.max_idle.is_some_and(|max| idle.len() >= max) {
            drop(idle);
            self.inner.stats.record_discard();
            tracing::debug!(
                id = state.id(),
                codec = %self.inner.codec,
                "idle limit reached, discarding encoder"
            );
            return;
        }
        idle.push(state);
        drop(idle);
        self.inner.stats.record_release();
    }

    /// Drop every idle encoder. Checked-out encoders are unaffected.
    ///
    /// Returns the number of encoders evicted.
    pub fn drain(&self) -> usize {
        let evicted = std::mem::take(&mut *self.lock_idle());
        let count = evicted.len();
        drop(evicted);

        if count > 0 {
            self.inner.stats.record_drain(count);
            tracing::debug!(codec = %self.inner.codec, count, "drained idle encoders");
        }
        count
    }

    /// Number of idle encoders
    pub fn idle_len(&self) -> usize {
        self.lock_idle().len()
    }

    /// Codec served by this pool
    pub fn codec(&self) -> Codec {
        self.inner.codec
    }

    /// Pool tuning
    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    /// Live counters
    pub fn stats(&self) -> &PoolStats {
        &self.inner.stats
    }

    /// Point-in-time statistics including the idle count
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        self.inner.stats.snapshot(self.idle_len())
    }

    /// Whether both handles refer to the same pool
    pub fn same_pool(&self, other: &EncoderPool) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for EncoderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderPool")
            .field("codec", &self.inner.codec)
            .field("options", &self.inner.options)
            .field("idle", &self.idle_len())
            .finish()
    }
}

/// An encoder checked out of an [`EncoderPool`].
///
/// Hand it back with [`EncoderPool::release`] (or [`PooledEncoder::release`])
/// to get the destination back and see flush failures. Dropping it
/// releases it as well; a failure at the destination is then only logged.
pub struct PooledEncoder<W: Write> {
    encoder: Option<Encoder<W>>,
    pool: EncoderPool,
}

fn released() -> io::Error {
    io::Error::other(PoolError::InvalidState("encoder already released".to_string()))
}

impl<W: Write> PooledEncoder<W> {
    /// Release into the issuing pool
    pub fn release(self) -> Result<W> {
        let pool = self.pool.clone();
        pool.release(self)
    }

    /// Owner tag of the underlying encoder
    pub fn id(&self) -> u64 {
        self.encoder.as_ref().map_or(0, Encoder::id)
    }

    /// Codec of the underlying encoder
    pub fn codec(&self) -> Codec {
        self.pool.codec()
    }

    /// The pool this encoder returns to
    pub fn pool(&self) -> &EncoderPool {
        &self.pool
    }

    /// Uncompressed bytes written since acquire
    pub fn total_in(&self) -> u64 {
        self.encoder.as_ref().map_or(0, Encoder::total_in)
    }

    /// Borrow the destination
    pub fn get_ref(&self) -> Option<&W> {
        self.encoder.as_ref().map(Encoder::get_ref)
    }

    /// Mutably borrow the destination
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.encoder.as_mut().map(Encoder::get_mut)
    }
}

impl<W: Write> Write for PooledEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.as_mut().ok_or_else(released)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.as_mut().ok_or_else(released)?.flush()
    }
}

impl<W: Write> Drop for PooledEncoder<W> {
    fn drop(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            let id = encoder.id();
            let (state, mut dest) = encoder.into_parts();
            if let Err(e) = self.pool.complete(state, &mut dest) {
                tracing::warn!(id, codec = %self.pool.codec(), "flush on drop failed: {e}");
            }
        }
    }
}

impl<W: Write> std::fmt::Debug for PooledEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledEncoder")
            .field("id", &self.id())
            .field("codec", &self.codec())
            .field("total_in", &self.total_in())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::{DeflateDecoder, GzDecoder};
    use std::io::Read;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[derive(Debug)]
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_acquire_release_reuses_instance() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);

        let mut first = pool.acquire(Vec::new()).unwrap();
        let id = first.id();
        first.write_all(b"one").unwrap();
        pool.release(first).unwrap();

        let second = pool.acquire(Vec::new()).unwrap();
        assert_eq!(second.id(), id);
        assert_eq!(pool.stats().created(), 1);
        assert_eq!(pool.stats().reused(), 1);
    }

    #[test]
    fn test_stack_order() {
        let pool = EncoderPool::with_defaults(Codec::Deflate);
        let a = pool.acquire(Vec::new()).unwrap();
        let b = pool.acquire(Vec::new()).unwrap();
        let (a_id, b_id) = (a.id(), b.id());
        assert_ne!(a_id, b_id);

        a.release().unwrap();
        b.release().unwrap();

        // last returned, first reused
        assert_eq!(pool.acquire(Vec::new()).unwrap().id(), b_id);
    }

    #[test]
    fn test_release_returns_destination() {
        let pool = EncoderPool::with_defaults(Codec::Deflate);
        let mut enc = pool.acquire(Vec::new()).unwrap();
        enc.write_all(b"payload").unwrap();
        let out = enc.release().unwrap();
        assert_eq!(inflate(&out), b"payload");
    }

    #[test]
    fn test_borrowed_destination() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);
        let mut buf = Vec::new();
        {
            let mut enc = pool.acquire(&mut buf).unwrap();
            enc.write_all(b"borrowed").unwrap();
            pool.release(enc).unwrap();
        }
        assert_eq!(gunzip(&buf), b"borrowed");
    }

    #[test]
    fn test_drop_releases() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);
        let mut buf = Vec::new();
        {
            let mut enc = pool.acquire(&mut buf).unwrap();
            enc.write_all(b"scoped").unwrap();
        }
        assert_eq!(pool.idle_len(), 1);
        assert_eq!(pool.stats().checked_out(), 0);
        assert_eq!(gunzip(&buf), b"scoped");
    }

    #[test]
    fn test_flush_error_still_pools() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);
        let mut enc = pool.acquire(Broken).unwrap();
        let _ = enc.write(b"lost");

        let err = pool.release(enc).unwrap_err();
        assert!(matches!(err, PoolError::Flush(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
        assert_eq!(pool.idle_len(), 1);
        assert_eq!(pool.snapshot().flush_errors, 1);

        // the pooled encoder is healthy for the next caller
        let mut enc = pool.acquire(Vec::new()).unwrap();
        enc.write_all(b"after failure").unwrap();
        assert_eq!(gunzip(&enc.release().unwrap()), b"after failure");
    }

    #[test]
    fn test_failed_release_leaves_clean_state() {
        let pool = EncoderPool::with_defaults(Codec::Deflate);
        let mut enc = pool.acquire(Broken).unwrap();
        let _ = enc.write(&[7u8; 4096]);
        assert!(pool.release(enc).is_err());

        let idle = pool.lock_idle();
        assert_eq!(idle.len(), 1);
        assert!(idle[0].is_pristine());
    }

    #[test]
    fn test_drop_with_broken_destination_still_pools() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);
        {
            let mut enc = pool.acquire(Broken).unwrap();
            let _ = enc.write(b"lost on drop");
        }

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.flush_errors, 1);
        assert_eq!(snapshot.idle, 1);
        assert_eq!(snapshot.checked_out, 0);
        assert!(pool.lock_idle()[0].is_pristine());

        let mut enc = pool.acquire(Vec::new()).unwrap();
        enc.write_all(b"next caller").unwrap();
        assert_eq!(gunzip(&enc.release().unwrap()), b"next caller");
    }

    #[test]
    fn test_foreign_encoder_rejected() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);
        let other = EncoderPool::with_defaults(Codec::Gzip);

        let enc = other.acquire(Vec::new()).unwrap();
        let id = enc.id();
        let err = pool.release(enc).unwrap_err();
        assert!(matches!(err, PoolError::ForeignEncoder { id: got } if got == id));

        assert_eq!(pool.idle_len(), 0);
        assert_eq!(other.idle_len(), 1);
    }

    #[test]
    fn test_drain() {
        let pool = EncoderPool::with_defaults(Codec::Deflate);
        assert_eq!(pool.drain(), 0);

        let a = pool.acquire(Vec::new()).unwrap();
        let b = pool.acquire(Vec::new()).unwrap();
        let old = [a.id(), b.id()];
        a.release().unwrap();
        b.release().unwrap();

        assert_eq!(pool.drain(), 2);
        assert_eq!(pool.idle_len(), 0);

        let fresh = pool.acquire(Vec::new()).unwrap();
        assert!(!old.contains(&fresh.id()));
        assert_eq!(pool.snapshot().drained, 2);
    }

    #[test]
    fn test_max_idle() {
        let pool = EncoderPool::new(Codec::Gzip, PoolOptions::default().with_max_idle(1)).unwrap();
        let a = pool.acquire(Vec::new()).unwrap();
        let b = pool.acquire(Vec::new()).unwrap();
        a.release().unwrap();
        b.release().unwrap();

        assert_eq!(pool.idle_len(), 1);
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.discarded, 1);
        assert_eq!(snapshot.checked_out, 0);
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            EncoderPool::new(Codec::Gzip, PoolOptions::default().with_level(11)),
            Err(PoolError::InvalidLevel(11))
        ));
        assert!(EncoderPool::new(Codec::Gzip, PoolOptions::default().with_buffer_size(0)).is_err());
    }

    #[test]
    fn test_clones_share_idle_list() {
        let pool = EncoderPool::with_defaults(Codec::Gzip);
        let clone = pool.clone();
        pool.acquire(Vec::new()).unwrap().release().unwrap();
        assert_eq!(clone.idle_len(), 1);
        assert!(clone.same_pool(&pool));
    }
}
