//! API-key authentication for the HTTP gateway.
//!
//! A request is accepted when its `Authorization` header carries the
//! configured key, either as `Bearer <key>` or as the raw key. Without a
//! configured key the gateway runs open.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::warn;

use crate::http::GatewayState;

/// Compare without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The key in an `Authorization` header value.
pub fn extract_key(header_value: &str) -> &str {
    header_value.strip_prefix("Bearer ").unwrap_or(header_value)
}

pub fn is_authorized(expected: Option<&str>, header_value: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    header_value
        .map(extract_key)
        .is_some_and(|provided| constant_time_eq(provided.as_bytes(), expected.as_bytes()))
}

pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if is_authorized(state.api_key(), header_value) {
        return Ok(next.run(req).await);
    }

    warn!(
        path = %req.uri().path(),
        has_auth_header = header_value.is_some(),
        "Rejected request with missing or invalid API key"
    );
    Err(StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_or_raw_key() {
        assert!(is_authorized(Some("s3cret"), Some("Bearer s3cret")));
        assert!(is_authorized(Some("s3cret"), Some("s3cret")));
        assert!(!is_authorized(Some("s3cret"), Some("Bearer wrong")));
        assert!(!is_authorized(Some("s3cret"), Some("s3cre")));
        assert!(!is_authorized(Some("s3cret"), None));
    }

    #[test]
    fn open_mode_accepts_anything() {
        assert!(is_authorized(None, None));
        assert!(is_authorized(None, Some("Bearer whatever")));
    }

    #[test]
    fn constant_time_compare() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
