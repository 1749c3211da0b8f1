//! HTTP request handlers

pub mod board;
pub mod movements;
pub mod records;
pub mod stages;

use axum::{http::HeaderMap, Json};
use serde::Serialize;

/// Header carrying the authenticated caller's label
pub const ACTOR_HEADER: &str = "x-actor";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Plain acknowledgement body
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Actor from the `X-Actor` header, if present and readable
pub(crate) fn header_actor(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A body-supplied actor wins over the header
pub(crate) fn resolve_actor(body: Option<&str>, headers: &HeaderMap) -> Option<String> {
    body.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| header_actor(headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_body_actor_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("header-user"));
        assert_eq!(resolve_actor(Some("body-user"), &headers).as_deref(), Some("body-user"));
        assert_eq!(resolve_actor(Some("  "), &headers).as_deref(), Some("header-user"));
        assert_eq!(resolve_actor(None, &HeaderMap::new()), None);
    }
}
