//! The per-request pipeline.
//!
//! ```text
//! RateCheck → Redirect? → Specific? → PathGuard → Exists? → If-None-Match? → MimeCheck → Serve
//!    429         308        custom       403         404          304            403       200
//! ```
//! The suspicious detector only observes; its match is reported once the
//! terminal status is known.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use std::time::Instant;

use crate::events::{EventType, RequestMeta, SecurityEvent, Severity};
use crate::handler::StaticHandler;
use crate::http::request::{request_id, request_meta};
use crate::http::response::{apply_rate_headers, attachment, empty, permanent_redirect, too_many_requests};
use crate::observability::metrics;
use crate::routing::{PathResolver, RouteAction};

/// Header values the pipeline needs after the request has been moved.
struct Conditional {
    if_none_match: Option<String>,
    query: Option<String>,
    request_id: Option<String>,
}

impl StaticHandler {
    /// Answer one request for a file under a mounted route.
    pub async fn serve(&self, req: Request<Body>) -> Response {
        let started = Instant::now();
        let path = percent_decode_str(req.uri().path())
            .decode_utf8_lossy()
            .into_owned();
        let meta = request_meta(&req, &path, &self.limiter.config().trusted_proxies);
        let conditional = Conditional {
            if_none_match: req
                .headers()
                .get(header::IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            query: req.uri().query().map(str::to_string),
            request_id: request_id(&req).map(str::to_string),
        };

        let response = self.pipeline(req, &meta, &conditional).await;
        metrics::record_request(response.status().as_u16(), started);
        response
    }

    async fn pipeline(&self, req: Request<Body>, meta: &RequestMeta, conditional: &Conditional) -> Response {
        let rate = self.limiter.check(&meta.ip, &meta.path);
        if let Some(decision) = rate.filter(|d| d.limited) {
            tracing::warn!(
                ip = %meta.ip,
                path = %meta.path,
                limit = decision.limit,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            let event = SecurityEvent::new(meta, EventType::RateLimitExceeded, Severity::Medium, 429)
                .detail("limit", decision.limit.to_string());
            self.events.notify(event).await;
            return self.observe(meta, too_many_requests(&decision)).await;
        }

        let candidate = match PathResolver::new(&self.routes).action(&meta.path) {
            RouteAction::Redirect(target) => {
                tracing::debug!(path = %meta.path, target = %target, "Redirecting");
                return permanent_redirect(&target, conditional.query.as_deref());
            }
            RouteAction::Custom(handler) => {
                tracing::debug!(path = %meta.path, "Dispatching to specific handler");
                return handler.call(req).await;
            }
            RouteAction::Serve(candidate) => candidate,
        };
        drop(req);

        let response = self.serve_file(meta, conditional, &candidate).await;
        let mut response = self.observe(meta, response).await;
        if let Some(decision) = rate {
            apply_rate_headers(response.headers_mut(), &decision);
        }
        response
    }

    async fn serve_file(&self, meta: &RequestMeta, conditional: &Conditional, candidate: &str) -> Response {
        if let Err(violation) = self.guard.check(&meta.path) {
            tracing::warn!(
                ip = %meta.ip,
                path = %meta.path,
                violation = ?violation,
                "Request path rejected"
            );
            let event = SecurityEvent::new(meta, violation.event_type(), violation.severity(), 403)
                .details(violation.details());
            self.events.notify(event).await;
            return empty(StatusCode::FORBIDDEN);
        }

        let Some(file) = PathResolver::new(&self.routes).locate(candidate, &self.files) else {
            tracing::debug!(path = %meta.path, candidate = %candidate, "File not found");
            return empty(StatusCode::NOT_FOUND);
        };

        let info = match self.files.info(&file) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => return empty(StatusCode::NOT_FOUND),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %file,
                    request_path = %meta.path,
                    request_id = conditional.request_id.as_deref().unwrap_or("-"),
                    "Failed to stat file"
                );
                return empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let negotiation = self.negotiator.negotiate(&info);
        if negotiation.is_not_modified(conditional.if_none_match.as_deref()) {
            let mut response = empty(StatusCode::NOT_MODIFIED);
            negotiation.apply_validators(response.headers_mut());
            negotiation.apply_cache(response.headers_mut());
            return response;
        }

        if let Err(rejection) = negotiation.admit() {
            tracing::warn!(
                ip = %meta.ip,
                path = %meta.path,
                mime = %negotiation.mime,
                reason = rejection.as_str(),
                "MIME type rejected"
            );
            let event = SecurityEvent::new(meta, EventType::MimeTypeDenied, Severity::Medium, 403)
                .detail("mime_type", negotiation.mime.clone())
                .detail("reason", rejection.as_str())
                .detail("file", file.clone());
            self.events.notify(event).await;
            return empty(StatusCode::FORBIDDEN);
        }

        let files = self.files.clone();
        let target = file.clone();
        let (info, content) = match tokio::task::spawn_blocking(move || files.open(&target)).await {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) if e.is_not_found() => return empty(StatusCode::NOT_FOUND),
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    path = %file,
                    request_path = %meta.path,
                    request_id = conditional.request_id.as_deref().unwrap_or("-"),
                    "Failed to open file"
                );
                return empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %file,
                    request_path = %meta.path,
                    "File read task failed"
                );
                return empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let mut response = Response::new(content.into_body());
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, negotiation.content_type());
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(info.size));
        if self.routes.is_download(&meta.path) || self.routes.is_download(&file) {
            if let Some(value) = attachment(&info.name) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }
        negotiation.apply_cache(headers);
        negotiation.apply_validators(headers);

        tracing::debug!(path = %meta.path, file = %file, size = info.size, "Serving file");
        response
    }

    /// Report a suspicious match against the final status.
    async fn observe(&self, meta: &RequestMeta, response: Response) -> Response {
        let status = response.status();
        let Some(hit) = self.detector.evaluate(&meta.path) else {
            return response;
        };
        if !self.detector.should_report(status) {
            return response;
        }

        let blocked = status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS;
        let severity = if blocked { Severity::High } else { Severity::Medium };
        tracing::warn!(
            ip = %meta.ip,
            path = %meta.path,
            pattern = %hit.pattern,
            status = status.as_u16(),
            "Suspicious request"
        );
        let event = SecurityEvent::new(meta, EventType::SuspiciousAccess, severity, status.as_u16())
            .blocked(blocked)
            .detail("pattern", hit.pattern)
            .detail("match", hit.kind.as_str());
        self.events.notify(event).await;
        response
    }
}
