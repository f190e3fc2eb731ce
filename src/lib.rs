//! # flatepool - Reusable gzip/deflate encoder pools
//!
//! A best-compression DEFLATE encoder allocates large hash tables on
//! construction. Services that compress many small responses spend a large
//! share of their time building and freeing those tables. `flatepool` keeps
//! used encoders in a pool and rebinds them to the next destination instead.
//!
//! ## Features
//!
//! - **Resettable encoders**: gzip and raw deflate over `flate2::Compress`,
//!   rebindable to any `std::io::Write` destination
//! - **Per-codec pools**: lock held only for push/pop, no waiting, LIFO reuse
//! - **Scoped release**: dropping a pooled encoder completes its stream and
//!   returns it to the pool
//! - **HTTP glue**: axum middleware and responders that negotiate
//!   `Accept-Encoding` and compress through the pools
//!
//! ## Lifecycle
//!
//! ```text
//!  caller                      EncoderPool                    destination
//!    |                              |                              |
//!    |------ acquire(dest) -------->|  pop idle / construct        |
//!    |<----- PooledEncoder ---------|  reset (outside lock)        |
//!    |                              |                              |
//!    |====== write(bytes) ===========================================>|
//!    |                              |                              |
//!    |------ release(encoder) ----->|  finish stream ------------->|
//!    |<----- dest ------------------|  push idle                   |
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::io::Write;
//! use flatepool::{Codec, Compressors};
//!
//! let compressors = Compressors::default();
//!
//! let mut encoder = compressors.acquire(Codec::Gzip, Vec::new()).unwrap();
//! encoder.write_all(b"hello").unwrap();
//! let compressed = compressors.release(Codec::Gzip, encoder).unwrap();
//!
//! assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
//! assert_eq!(compressors.pool(Codec::Gzip).idle_len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Codec negotiation and the resettable encoder
//! - [`pool`]: Encoder pools, statistics and housekeeping
//! - [`server`]: HTTP response compression (Axum-based)
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod codec;
pub mod config;
pub mod error;
pub mod pool;
pub mod server;

// Re-exports for convenience
pub use codec::{Codec, Encoder, BEST_COMPRESSION};
pub use config::Config;
pub use error::{PoolError, Result};
pub use pool::{
    spawn_housekeeping, CompressorStats, Compressors, EncoderPool, PoolOptions, PooledEncoder,
};
pub use server::{AppState, ServerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
