//! HTTP response compression.
//!
//! The pools are consumed here the way a web service would: negotiate a
//! codec from `Accept-Encoding`, set `Content-Encoding`, write the body
//! through a pooled encoder and release it once the response is built.
//!
//! Routes of the bundled demo server:
//! - `GET /health`
//! - `GET /status` (pool statistics)
//! - `POST /echo` (request body echoed, compressed on the way out)
//! - `POST /drain` (evict idle encoders)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use flatepool::server::{create_router, AppState, ServerConfig};
//!
//! let state = Arc::new(AppState::new(ServerConfig::default().with_port(8080))?);
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

mod compression;
mod config;
mod handlers;
mod state;

pub use compression::{
    compress_response, negotiate, respond_json, respond_json_pretty, respond_text,
};
pub use config::ServerConfig;
pub use handlers::{create_router, health_check};
pub use state::AppState;
