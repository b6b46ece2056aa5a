// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::common::safe_uri_log;

/// Middleware to log request and response bodies in debug mode
///
/// Bodies are buffered, logged (pretty-printed when they parse as JSON) and
/// reattached. Auth payloads pass through here, so this stays at debug level
/// and off in production filters.
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body_str) {
                debug!(
                    method = %parts.method,
                    uri = %safe_uri_log(&parts.uri),
                    request_body = %serde_json::to_string_pretty(&json).unwrap_or_else(|_| body_str.to_string()),
                    "Request"
                );
            } else {
                debug!(
                    method = %parts.method,
                    uri = %safe_uri_log(&parts.uri),
                    request_body = %body_str,
                    "Request"
                );
            }
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body_str) {
                debug!(
                    status = %parts.status,
                    response_body = %serde_json::to_string_pretty(&json).unwrap_or_else(|_| body_str.to_string()),
                    "Response"
                );
            } else {
                debug!(
                    status = %parts.status,
                    response_body = %body_str,
                    "Response"
                );
            }
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
