//! Rate-limit middleware.
//!
//! Charges every request against the caller's budget before it reaches a
//! handler. Callers are identified by the first `X-Forwarded-For` hop, then
//! the socket address, then the literal `"unknown"`.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use super::handlers::AppState;
use crate::error::{ApiError, Result};
use crate::ratelimit::RateLimitDecision;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Returns the identity a request is rate limited under.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting requests over `state.rate_limit` with HTTP 429.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer);

    match state.limiter.check(&identity, &state.rate_limit) {
        RateLimitDecision::Allowed { limit, remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            Ok(response)
        }
        RateLimitDecision::Rejected(rejection) => Err(ApiError::RateLimited(rejection)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        assert_eq!(client_identity(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn test_identity_falls_back_to_peer_then_unknown() {
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();
        assert_eq!(client_identity(&HeaderMap::new(), Some(peer)), "192.0.2.1");
        assert_eq!(client_identity(&HeaderMap::new(), None), "unknown");

        let mut blank = HeaderMap::new();
        blank.insert(X_FORWARDED_FOR, HeaderValue::from_static("  "));
        assert_eq!(client_identity(&blank, None), "unknown");
    }
}
