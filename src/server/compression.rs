//! Response compression over the shared encoder pools.
//!
//! Two entry points:
//!
//! - [`compress_response`]: axum middleware that compresses whatever the
//!   inner handler produced, when the client accepts gzip or deflate.
//! - [`respond_json`], [`respond_json_pretty`], [`respond_text`]: build a
//!   (possibly compressed) response straight from a value.
//!
//! In both cases the encoder is acquired for the duration of one response
//! and released on every exit path.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::{stream, StreamExt};
use serde::Serialize;

use super::state::AppState;
use crate::codec::Codec;
use crate::error::Result;
use crate::pool::Compressors;

/// Codec the client accepts, from all `Accept-Encoding` headers
pub fn negotiate(headers: &HeaderMap) -> Option<Codec> {
    let accept = headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    Codec::negotiate(&accept)
}

/// The representation depends on `Accept-Encoding`, compressed or not
fn add_vary(headers: &mut HeaderMap) {
    headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
}

/// Mark headers for an encoded body
fn apply_encoding(headers: &mut HeaderMap, codec: Codec) {
    headers.insert(
        header::CONTENT_ENCODING,
        HeaderValue::from_static(codec.content_encoding()),
    );
    add_vary(headers);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::ACCEPT_RANGES);
}

enum Buffered {
    /// Whole body, within the limit
    Complete(Vec<u8>),
    /// Over the limit; the chunks read so far are chained back in front
    Oversized(Body),
}

async fn buffer_body(body: Body, limit: usize) -> std::result::Result<Buffered, axum::Error> {
    let mut data = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut len = 0usize;

    while let Some(chunk) = data.next().await {
        let chunk = chunk?;
        len += chunk.len();
        chunks.push(chunk);

        if len > limit {
            let read = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
            return Ok(Buffered::Oversized(Body::from_stream(read.chain(data))));
        }
    }
    Ok(Buffered::Complete(chunks.concat()))
}

fn respond_bytes(
    compressors: &Compressors,
    request_headers: &HeaderMap,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<Response> {
    let mut response = match negotiate(request_headers) {
        Some(codec) => {
            let compressed = compressors.compress(codec, &body)?;
            let mut response = Response::new(Body::from(compressed));
            apply_encoding(response.headers_mut(), codec);
            response
        },
        None => Response::new(Body::from(body)),
    };

    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    Ok(response)
}

/// Serialize `value` as JSON, compressed if the request allows it
pub fn respond_json<T: Serialize>(
    compressors: &Compressors,
    request_headers: &HeaderMap,
    value: &T,
) -> Result<Response> {
    let body = serde_json::to_vec(value)?;
    respond_bytes(compressors, request_headers, "application/json", body)
}

/// Like [`respond_json`] with indented output
pub fn respond_json_pretty<T: Serialize>(
    compressors: &Compressors,
    request_headers: &HeaderMap,
    value: &T,
) -> Result<Response> {
    let body = serde_json::to_vec_pretty(value)?;
    respond_bytes(compressors, request_headers, "application/json", body)
}

/// Plain text, compressed if the request allows it
pub fn respond_text(
    compressors: &Compressors,
    request_headers: &HeaderMap,
    text: impl Into<String>,
) -> Result<Response> {
    respond_bytes(
        compressors,
        request_headers,
        "text/plain; charset=utf-8",
        text.into().into_bytes(),
    )
}

/// Middleware compressing inner responses through the pools.
///
/// Leaves the response untouched when the client accepts neither codec,
/// when it already has a `Content-Encoding` and for 204/304 responses.
/// Bodies below `min_size` or above `max_body_size` are passed through
/// uncompressed.
pub async fn compress_response(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(codec) = negotiate(request.headers()) else {
        return next.run(request).await;
    };

    let response = next.run(request).await;
    if response.headers().contains_key(header::CONTENT_ENCODING)
        || matches!(
            response.status(),
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED
        )
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match buffer_body(body, state.config.max_body_size).await {
        Ok(Buffered::Complete(bytes)) => bytes,
        Ok(Buffered::Oversized(body)) => {
            tracing::debug!(
                limit = state.config.max_body_size,
                "response body too large to buffer, sending uncompressed"
            );
            add_vary(&mut parts.headers);
            return Response::from_parts(parts, body);
        },
        Err(e) => {
            tracing::warn!("Failed to buffer response body: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        },
    };

    if bytes.len() < state.config.min_size {
        add_vary(&mut parts.headers);
        return Response::from_parts(parts, Body::from(bytes));
    }

    match state.compressors.compress(codec, &bytes) {
        Ok(compressed) => {
            apply_encoding(&mut parts.headers, codec);
            Response::from_parts(parts, Body::from(compressed))
        },
        Err(e) => {
            tracing::warn!(%codec, "Response compression failed: {e}");
            Response::from_parts(parts, Body::from(bytes))
        },
    }
}
