//! Reusable encoder pools.
//!
//! Building a best-compression encoder allocates large lookup tables, so
//! encoders are recycled instead of rebuilt per request.
//!
//! # Lifecycle
//!
//! ```text
//!   acquire(dest) ──> [checked out] ── write / flush ──> release
//!        ^                                                  │
//!        │ pop + reset                     finish + push    │
//!        └──────────────── [idle list] <────────────────────┘
//!                              │
//!                              └── drain() ──> dropped
//! ```
//!
//! - The idle list is a stack behind one mutex, held only for push/pop.
//! - An empty pool constructs a new encoder; nothing ever waits.
//! - Growth is unbounded unless [`PoolOptions::max_idle`] is set.
//! - A checked-out encoder has exactly one owner: [`PooledEncoder`] is
//!   `!Clone` and release consumes it, so double release cannot be written.
//!
//! One [`EncoderPool`] serves one codec; [`Compressors`] bundles the
//! deflate and gzip pools.

mod compressors;
mod encoder_pool;
mod housekeeping;
mod stats;

pub use compressors::{CompressorStats, Compressors};
pub use encoder_pool::{EncoderPool, PoolOptions, PooledEncoder};
pub use housekeeping::spawn_housekeeping;
pub use stats::{PoolStats, PoolStatsSnapshot};
