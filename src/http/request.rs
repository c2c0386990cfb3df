//! Request identification and client facts.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Work out the client IP (peer, or X-Forwarded-For from a trusted proxy)
//! - Capture the headers security events record
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - X-Forwarded-For is ignored unless the peer is a trusted proxy

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderName, HeaderValue, Request};
use std::net::SocketAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::events::RequestMeta;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// UUID v4 request ids for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The request id set by the middleware, if any.
pub fn request_id<B>(request: &Request<B>) -> Option<&str> {
    request.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

fn header_str<B>(request: &Request<B>, name: &HeaderName) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Peer address from `ConnectInfo`, when the server provides it.
pub fn peer_addr<B>(request: &Request<B>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Collect the facts security events carry about the client.
pub fn request_meta<B>(request: &Request<B>, path: &str, trusted_proxies: &[String]) -> RequestMeta {
    let peer = peer_addr(request);
    let forwarded_for = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let peer_ip = peer.map(|a| a.ip().to_string()).unwrap_or_default();
    let trusted = !peer_ip.is_empty() && trusted_proxies.iter().any(|p| *p == peer_ip);
    let forwarded_client = forwarded_for
        .as_deref()
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let ip = match (trusted, forwarded_client) {
        (true, Some(client)) => client.to_string(),
        _ => peer_ip,
    };

    RequestMeta {
        ip,
        remote_addr: peer.map(|a| a.to_string()).unwrap_or_default(),
        forwarded_for,
        method: request.method().to_string(),
        path: path.to_string(),
        user_agent: header_str(request, &header::USER_AGENT),
        referer: header_str(request, &header::REFERER),
    }
}
