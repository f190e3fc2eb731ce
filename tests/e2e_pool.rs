//! End-to-end pool lifecycle tests.
//!
//! These tests drive acquire/write/release through the public API and
//! check the output with the standard flate2 decoders.

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, GzDecoder};
use flatepool::{Codec, Compressors, EncoderPool, PoolError, PoolOptions};

fn decode(codec: Codec, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    match codec {
        Codec::Gzip => GzDecoder::new(data).read_to_end(&mut out).unwrap(),
        Codec::Deflate => DeflateDecoder::new(data).read_to_end(&mut out).unwrap(),
    };
    out
}

/// Pseudo-random bytes that do not compress to nothing
fn noisy(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}

/// Test the gzip hello scenario, including the empty payload
#[test]
fn test_gzip_hello_and_empty() {
    let compressors = Compressors::default();

    let mut buf = Vec::new();
    let mut encoder = compressors.acquire(Codec::Gzip, &mut buf).unwrap();
    encoder.write_all(b"hello").unwrap();
    compressors.release(Codec::Gzip, encoder).unwrap();
    assert_eq!(decode(Codec::Gzip, &buf), b"hello");

    let mut buf = Vec::new();
    let mut encoder = compressors.acquire(Codec::Gzip, &mut buf).unwrap();
    encoder.write_all(b"").unwrap();
    compressors.release(Codec::Gzip, encoder).unwrap();
    assert_eq!(decode(Codec::Gzip, &buf), b"");
}

/// Test every acquisition yields a write-ready encoder, fresh or reused
#[test]
fn test_acquire_always_write_ready() {
    let pool = EncoderPool::with_defaults(Codec::Deflate);

    let held: Vec<_> = (0..8)
        .map(|i| {
            let mut encoder = pool.acquire(Vec::new()).unwrap();
            encoder.write_all(format!("held {i}").as_bytes()).unwrap();
            encoder
        })
        .collect();
    assert_eq!(pool.stats().created(), 8);
    assert_eq!(pool.stats().checked_out(), 8);

    for (i, encoder) in held.into_iter().enumerate() {
        let out = encoder.release().unwrap();
        assert_eq!(decode(Codec::Deflate, &out), format!("held {i}").as_bytes());
    }

    for _ in 0..8 {
        let mut encoder = pool.acquire(Vec::new()).unwrap();
        assert_eq!(encoder.write(b"x").unwrap(), 1);
    }
    assert_eq!(pool.stats().created(), 8);
    assert_eq!(pool.stats().reused(), 8);
}

/// Test release followed by acquire hands back the same instance
#[test]
fn test_reuse_same_instance() {
    for codec in Codec::all() {
        let pool = EncoderPool::with_defaults(*codec);
        let encoder = pool.acquire(Vec::new()).unwrap();
        let id = encoder.id();
        pool.release(encoder).unwrap();

        let again = pool.acquire(Vec::new()).unwrap();
        assert_eq!(again.id(), id, "{codec} pool constructed instead of reusing");
    }
}

/// Test payloads of assorted sizes survive the round trip on both codecs
#[test]
fn test_roundtrip_sizes() {
    let compressors = Compressors::default();
    let sizes = [0usize, 1, 2, 100, 4096, 65_535, 65_536, 65_537, 300_000];

    for codec in Codec::all() {
        for &size in &sizes {
            let payload = noisy(size);
            let mut encoder = compressors.acquire(*codec, Vec::new()).unwrap();
            encoder.write_all(&payload).unwrap();
            let out = compressors.release(*codec, encoder).unwrap();
            assert_eq!(decode(*codec, &out), payload, "{codec} payload of {size} bytes");
        }
    }

    // every iteration after the first reused the single encoder
    assert_eq!(compressors.stats().gzip.created, 1);
    assert_eq!(compressors.stats().deflate.created, 1);
}

/// Test a reused encoder carries nothing over from its previous stream
#[test]
fn test_isolation_across_reuse() {
    let pool = EncoderPool::with_defaults(Codec::Gzip);
    let first_payload = b"first destination, first payload ".repeat(100);
    let second_payload = b"second".to_vec();

    let mut first_dest = Vec::new();
    let mut encoder = pool.acquire(&mut first_dest).unwrap();
    let id = encoder.id();
    encoder.write_all(&first_payload).unwrap();
    pool.release(encoder).unwrap();

    let mut second_dest = Vec::new();
    let mut encoder = pool.acquire(&mut second_dest).unwrap();
    assert_eq!(encoder.id(), id);
    assert_eq!(encoder.total_in(), 0);
    encoder.write_all(&second_payload).unwrap();
    pool.release(encoder).unwrap();

    assert_eq!(decode(Codec::Gzip, &first_dest), first_payload);
    assert_eq!(decode(Codec::Gzip, &second_dest), second_payload);
    // a stream that leaked dictionary state would back-reference the first payload
    assert!(second_dest.len() < 64);
}

/// Test drain forces fresh construction and tolerates an empty pool
#[test]
fn test_drain_then_acquire() {
    let pool = EncoderPool::with_defaults(Codec::Gzip);
    assert_eq!(pool.drain(), 0);

    let encoder = pool.acquire(Vec::new()).unwrap();
    let old = encoder.id();
    encoder.release().unwrap();
    assert_eq!(pool.drain(), 1);

    let encoder = pool.acquire(Vec::new()).unwrap();
    assert_ne!(encoder.id(), old);
    assert_eq!(pool.stats().created(), 2);
}

/// Test drain leaves checked-out encoders alone
#[test]
fn test_drain_with_checked_out_encoder() {
    let pool = EncoderPool::with_defaults(Codec::Deflate);
    let mut encoder = pool.acquire(Vec::new()).unwrap();
    encoder.write_all(b"in flight").unwrap();

    assert_eq!(pool.drain(), 0);

    let out = encoder.release().unwrap();
    assert_eq!(decode(Codec::Deflate, &out), b"in flight");
    assert_eq!(pool.idle_len(), 1);
}

/// Test mid-stream flush leaves the encoder checked out and usable
#[test]
fn test_flush_then_continue() {
    let pool = EncoderPool::with_defaults(Codec::Gzip);
    let mut encoder = pool.acquire(Vec::new()).unwrap();

    encoder.write_all(b"event: one\n\n").unwrap();
    encoder.flush().unwrap();
    let flushed = encoder.get_ref().map_or(0, Vec::len);
    assert!(flushed > 10);

    encoder.write_all(b"event: two\n\n").unwrap();
    let out = encoder.release().unwrap();
    assert_eq!(decode(Codec::Gzip, &out), b"event: one\n\nevent: two\n\n");
}

/// Test releasing into the wrong pool is refused without losing the encoder
#[test]
fn test_wrong_pool_release() {
    let a = Compressors::default();
    let b = Compressors::default();

    let encoder = a.acquire(Codec::Gzip, Vec::new()).unwrap();
    let err = b.release(Codec::Gzip, encoder).unwrap_err();
    assert!(matches!(err, PoolError::ForeignEncoder { .. }));

    assert_eq!(a.pool(Codec::Gzip).idle_len(), 1);
    assert_eq!(b.pool(Codec::Gzip).idle_len(), 0);
}

/// Test lower levels still produce standard streams
#[test]
fn test_custom_level() {
    let compressors = Compressors::new(PoolOptions::default().with_level(1)).unwrap();
    let payload = b"level one ".repeat(1000);
    let out = compressors.compress(Codec::Gzip, &payload).unwrap();
    assert_eq!(out[8], 4, "XFL marks fastest compression");
    assert_eq!(decode(Codec::Gzip, &out), payload);
}
