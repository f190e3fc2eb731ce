//! Server state.

use std::time::{Duration, Instant};

use super::config::ServerConfig;
use crate::error::Result;
use crate::pool::Compressors;

/// Application state shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Encoder pools
    pub compressors: Compressors,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServerConfig) -> Result<Self> {
        let compressors = Compressors::new(config.pool.clone())?;
        Ok(Self {
            config,
            compressors,
            start_time: Instant::now(),
        })
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolOptions;

    #[test]
    fn test_state_uses_pool_options() {
        let config = ServerConfig::default().with_pool(PoolOptions::default().with_level(3));
        let state = AppState::new(config).unwrap();
        assert_eq!(state.compressors.pool(crate::Codec::Gzip).options().level, 3);
    }

    #[test]
    fn test_state_rejects_bad_level() {
        let config = ServerConfig::default().with_pool(PoolOptions::default().with_level(42));
        assert!(AppState::new(config).is_err());
    }
}
