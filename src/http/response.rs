//! Response construction helpers.
//!
//! Error responses carry a status code and an empty body; details stay in
//! logs and security events.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use crate::security::RateDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// 308 to `target`, carrying the original query string.
pub fn permanent_redirect(target: &str, query: Option<&str>) -> Response {
    let location = match query {
        Some(q) if !q.is_empty() => format!("{}?{}", target, q),
        _ => target.to_string(),
    };
    let mut response = empty(StatusCode::PERMANENT_REDIRECT);
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

pub fn apply_rate_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit as u64));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining as u64));
}

/// 429 with the rate headers and `Retry-After`.
pub fn too_many_requests(decision: &RateDecision) -> Response {
    let mut response = empty(StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers_mut();
    apply_rate_headers(headers, decision);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after_secs()));
    response
}

/// `attachment; filename="<name>"`, quotes and backslashes escaped.
pub fn attachment(name: &str) -> Option<HeaderValue> {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped)).ok()
}
