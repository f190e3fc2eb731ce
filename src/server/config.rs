//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::Config;
use crate::error::{PoolError, Result};
use crate::pool::PoolOptions;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Encoder pool tuning
    pub pool: PoolOptions,
    /// Responses smaller than this are sent uncompressed
    pub min_size: usize,
    /// Maximum response body buffered for compression (bytes)
    pub max_body_size: usize,
    /// Interval between housekeeping drains
    pub drain_interval: Option<Duration>,
    /// Enable request logging
    pub logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            pool: PoolOptions::default(),
            min_size: 0,
            max_body_size: 10 * 1024 * 1024, // 10MB
            drain_interval: Some(Duration::from_secs(300)),
            logging: true,
        }
    }
}

impl ServerConfig {
    /// Build from the file/env configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let addr = config
            .http
            .listen_addr()
            .parse()
            .map_err(|e| PoolError::Config(format!("Invalid listen address: {e}")))?;

        Ok(Self {
            addr,
            pool: config.pool.clone(),
            min_size: config.http.min_size,
            max_body_size: config.http.max_body_size,
            drain_interval: (config.http.drain_interval_secs > 0)
                .then(|| Duration::from_secs(config.http.drain_interval_secs)),
            logging: true,
        })
    }

    /// Create with custom port
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Bind to all interfaces
    pub fn bind_all(mut self) -> Self {
        self.addr = SocketAddr::from(([0, 0, 0, 0], self.addr.port()));
        self
    }

    /// Set address directly
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Set pool tuning
    pub fn with_pool(mut self, pool: PoolOptions) -> Self {
        self.pool = pool;
        self
    }

    /// Set minimum compressible size
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Set max body size
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set or disable the housekeeping interval
    pub fn with_drain_interval(mut self, interval: Option<Duration>) -> Self {
        self.drain_interval = interval;
        self
    }

    /// Disable logging
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }
}
