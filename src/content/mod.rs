//! Response header negotiation for served files.
//!
//! # Data Flow
//! ```text
//! FileInfo (name, size, mtime)
//!     → mime.rs   (custom map → standard table → octet-stream)
//!     → etag.rs   (sha256 over identity, 16 bytes hex)
//!     → If-None-Match equal? → 304
//!     → mime.rs   (deny list → allow list) → 403
//!     → cache.rs  (Cache-Control + Expires)
//! ```

pub mod cache;
pub mod etag;
pub mod mime;

use arc_swap::ArcSwap;
use axum::http::{header, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::HeadersConfig;
use crate::fs::FileInfo;

pub use cache::apply_cache_headers;
pub use etag::{compute_etag, etag_matches};
pub use mime::{admit, base_type, resolve_mime, MimeRejection};

/// Header decisions for one file, taken against a single config snapshot.
#[derive(Debug, Clone)]
pub struct Negotiation {
    config: Arc<HeadersConfig>,
    pub mime: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Negotiation {
    /// True when the client already holds this exact ETag.
    pub fn is_not_modified(&self, if_none_match: Option<&str>) -> bool {
        match (&self.etag, if_none_match) {
            (Some(etag), Some(presented)) => etag_matches(etag, presented),
            _ => false,
        }
    }

    pub fn admit(&self) -> Result<(), MimeRejection> {
        admit(&self.config, &self.mime)
    }

    /// `ETag` and `Last-Modified`.
    pub fn apply_validators(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(header::ETAG, value);
        }
        if let Some(value) = self.last_modified.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    pub fn apply_cache(&self, headers: &mut HeaderMap) {
        apply_cache_headers(headers, &self.config, SystemTime::now());
    }

    pub fn content_type(&self) -> HeaderValue {
        HeaderValue::from_str(&self.mime)
            .unwrap_or_else(|_| HeaderValue::from_static(mime::DEFAULT_MIME))
    }
}

#[derive(Debug)]
pub struct ContentNegotiator {
    config: ArcSwap<HeadersConfig>,
}

impl ContentNegotiator {
    pub fn new(mut config: HeadersConfig) -> Self {
        config.normalize_mime_keys();
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn config(&self) -> Arc<HeadersConfig> {
        self.config.load_full()
    }

    pub fn set_config(&self, mut config: HeadersConfig) {
        config.normalize_mime_keys();
        self.config.store(Arc::new(config));
    }

    pub fn negotiate(&self, info: &FileInfo) -> Negotiation {
        let config = self.config.load_full();
        let mime = resolve_mime(&info.path, &config.custom_mime_types);
        let etag = config
            .enable_etag
            .then(|| compute_etag(&info.name, info.size, info.modified_unix()));
        let last_modified = info.modified.map(httpdate::fmt_http_date);

        Negotiation {
            config,
            mime,
            etag,
            last_modified,
        }
    }
}

impl Default for ContentNegotiator {
    fn default() -> Self {
        Self::new(HeadersConfig::default())
    }
}
