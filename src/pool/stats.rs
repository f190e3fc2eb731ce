//! Pool statistics tracking.
//!
//! Counts constructions, reuses and check-ins so the reuse rate and the
//! number of checked-out encoders can be observed without touching the
//! pool lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Thread-safe pool counters
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Encoders constructed because the pool was empty
    created: AtomicU64,
    /// Acquisitions served from the idle list
    reused: AtomicU64,
    /// Encoders pushed back onto the idle list
    released: AtomicU64,
    /// Encoders dropped on check-in because the idle list was full
    discarded: AtomicU64,
    /// Idle encoders evicted by drain
    drained: AtomicU64,
    /// Stream completions that failed at the destination
    flush_errors: AtomicU64,
    /// Encoders currently owned by callers
    checked_out: AtomicU64,
}

impl PoolStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_create(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.checked_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reuse(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
        self.checked_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drain(&self, count: usize) {
        self.drained.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_error(&self) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get encoders constructed so far
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Get acquisitions served by reuse
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// Get encoders currently checked out
    pub fn checked_out(&self) -> u64 {
        self.checked_out.load(Ordering::Relaxed)
    }

    /// Fraction of acquisitions served from the idle list (0.0-1.0)
    pub fn reuse_ratio(&self) -> f64 {
        let reused = self.reused();
        let total = reused + self.created();
        if total == 0 {
            0.0
        } else {
            reused as f64 / total as f64
        }
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self, idle: usize) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            created: self.created(),
            reused: self.reused(),
            released: self.released.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            checked_out: self.checked_out(),
            idle,
            reuse_ratio: self.reuse_ratio(),
        }
    }
}

/// Serializable pool statistics
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatsSnapshot {
    /// Encoders constructed
    pub created: u64,
    /// Acquisitions served by reuse
    pub reused: u64,
    /// Check-ins onto the idle list
    pub released: u64,
    /// Check-ins dropped by the idle limit
    pub discarded: u64,
    /// Idle encoders evicted by drain
    pub drained: u64,
    /// Failed stream completions
    pub flush_errors: u64,
    /// Encoders owned by callers right now
    pub checked_out: u64,
    /// Encoders waiting on the idle list
    pub idle: usize,
    /// Reuse ratio (0.0-1.0)
    pub reuse_ratio: f64,
}
