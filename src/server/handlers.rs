//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::compression::{compress_response, respond_json};
use super::state::AppState;
use crate::pool::CompressorStats;

/// Create the API router.
///
/// Every route goes through [`compress_response`]; `/status` compresses
/// its own body and is passed through unchanged.
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // Health and status
        .route("/health", get(health_check))
        .route("/status", get(status))
        // Pool operations
        .route("/echo", post(echo))
        .route("/drain", post(drain))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            compress_response,
        ));

    let router = if state.config.logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Status response
#[derive(Serialize)]
pub struct StatusResponse {
    /// Always "ok"
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Seconds since the state was created
    pub uptime_secs: u64,
    /// Counters for both pools
    pub pools: CompressorStats,
}

/// Status endpoint
async fn status(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let body = StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime().as_secs(),
        pools: state.compressors.stats(),
    };

    match respond_json(&state.compressors, &headers, &body) {
        Ok(response) => response,
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Echo the request body; the middleware compresses the reply
async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body)
}

/// Drain response
#[derive(Serialize)]
pub struct DrainResponse {
    /// Idle encoders dropped across both pools
    pub evicted: usize,
}

/// Drop all idle encoders
async fn drain(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let evicted = state.compressors.drain();
    tracing::info!(evicted, "Drained idle encoders on request");
    Json(DrainResponse { evicted })
}
