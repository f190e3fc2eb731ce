//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the demo server)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::pool::PoolOptions;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Encoder pool configuration
    #[serde(default)]
    pub pool: PoolOptions,

    /// HTTP configuration
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| PoolError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields with the `FLATEPOOL_*` variables that are set.
    ///
    /// Unset or unparsable variables leave the field as it is, so a value
    /// equal to its default still overrides the base.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;

        // Pool settings
        if let Some(level) = parse_var(lookup, "FLATEPOOL_LEVEL") {
            self.pool.level = level;
        }
        if let Some(size) = parse_var(lookup, "FLATEPOOL_BUFFER_SIZE") {
            self.pool.buffer_size = size;
        }
        if let Some(max) = parse_var(lookup, "FLATEPOOL_MAX_IDLE") {
            self.pool.max_idle = Some(max);
        }

        // HTTP settings
        if let Some(host) = lookup("FLATEPOOL_HOST") {
            self.http.host = host;
        }
        if let Some(port) = parse_var(lookup, "FLATEPOOL_PORT") {
            self.http.port = port;
        }
        if let Some(min_size) = parse_var(lookup, "FLATEPOOL_MIN_SIZE") {
            self.http.min_size = min_size;
        }
        if let Some(secs) = parse_var(lookup, "FLATEPOOL_DRAIN_SECS") {
            self.http.drain_interval_secs = secs;
        }

        self
    }

    /// Merge with another config.
    ///
    /// Fields of `other` that differ from their defaults take precedence,
    /// so `other` cannot reset a field back to its default. Use
    /// [`Config::apply_env`] to layer environment overrides.
    pub fn merge(self, other: Self) -> Self {
        let pool = PoolOptions::default();
        let http = HttpConfig::default();

        Self {
            pool: PoolOptions {
                level: pick(self.pool.level, other.pool.level, pool.level),
                buffer_size: pick(self.pool.buffer_size, other.pool.buffer_size, pool.buffer_size),
                max_idle: other.pool.max_idle.or(self.pool.max_idle),
            },
            http: HttpConfig {
                host: pick(self.http.host, other.http.host, http.host),
                port: pick(self.http.port, other.http.port, http.port),
                min_size: pick(self.http.min_size, other.http.min_size, http.min_size),
                max_body_size: pick(
                    self.http.max_body_size,
                    other.http.max_body_size,
                    http.max_body_size,
                ),
                drain_interval_secs: pick(
                    self.http.drain_interval_secs,
                    other.http.drain_interval_secs,
                    http.drain_interval_secs,
                ),
            },
        }
    }

    /// Reject values the pools or the server cannot run with
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        if self.http.max_body_size == 0 {
            return Err(PoolError::Config("http.max_body_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

fn pick<T: PartialEq>(base: T, other: T, default: T) -> T {
    if other == default {
        base
    } else {
        other
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

/// HTTP compression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Responses smaller than this are sent uncompressed
    pub min_size: usize,

    /// Maximum response body buffered for compression, in bytes
    pub max_body_size: usize,

    /// Seconds between housekeeping drains (0 = never)
    pub drain_interval_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            min_size: 0,
            max_body_size: 10 * 1024 * 1024, // 10 MB
            drain_interval_secs: 300,
        }
    }
}

impl HttpConfig {
    /// Get the full listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
