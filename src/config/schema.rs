//! Configuration schema definitions.
//!
//! This module defines the configuration blocks of a mounted static tree and
//! the server that hosts it. Every block derives Serde traits and carries
//! `#[serde(default)]`, so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::events::{SecurityCallback, Severity};

/// Root configuration for the static server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Mount point and route table seed.
    pub mount: MountConfig,

    /// Path traversal / dot-file / depth / blocklist rules.
    pub path_security: PathSecurityConfig,

    /// Per-IP distinct-path rate limiting.
    pub rate_limit: RateLimitConfig,

    /// MIME, ETag and cache header policy.
    pub headers: HeadersConfig,

    /// Suspicious request detection.
    pub suspicious: SuspiciousConfig,

    /// Security event reporting.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Re-apply the file whenever it changes on disk.
    pub hot_reload: bool,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Add `X-Content-Type-Options: nosniff` to every response.
    pub nosniff: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            nosniff: true,
        }
    }
}

/// Where the embedded tree is mounted and how its routes are seeded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MountConfig {
    /// Route prefix the tree is served under.
    pub route: String,

    /// Prefixes inside the embedded tree tried when a path is not found directly.
    pub base_paths: Vec<String>,

    /// Files at or above this size are spooled to a temporary file.
    pub spool_threshold_bytes: Option<u64>,

    /// Request paths served with `Content-Disposition: attachment`.
    pub downloads: Vec<String>,

    /// Permanent redirects.
    pub redirects: Vec<RedirectRule>,

    /// Routes answered with an index file.
    pub indexes: Vec<IndexRule>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            route: "/static".to_string(),
            base_paths: vec!["assets".to_string()],
            spool_threshold_bytes: None,
            downloads: Vec::new(),
            redirects: Vec::new(),
            indexes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RedirectRule {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct IndexRule {
    pub route: String,
    pub file: String,
}

/// Path validation rules.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathSecurityConfig {
    /// Enable path validation.
    pub enabled: bool,

    /// Allow segments starting with ".".
    pub allow_dot_files: bool,

    /// Maximum number of path segments (0 = unlimited).
    pub max_path_depth: usize,

    /// Case-sensitive substrings that reject a path.
    pub blocked_patterns: Vec<String>,
}

impl Default for PathSecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_dot_files: false,
            max_path_depth: 10,
            blocked_patterns: vec![
                ".git".to_string(),
                ".svn".to_string(),
                ".env".to_string(),
                "node_modules".to_string(),
            ],
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum distinct paths per IP within one window.
    pub max_requests: usize,

    /// Window length.
    #[serde(rename = "window_ms", with = "duration_ms")]
    pub window: Duration,

    /// Interval of the expired-window sweep (0 disables the sweep).
    #[serde(rename = "cleanup_interval_ms", with = "duration_ms")]
    pub cleanup_interval: Duration,

    /// IPs that are never limited (exact match).
    pub whitelist_ips: Vec<String>,

    /// Peers whose `X-Forwarded-For` is trusted for the client IP.
    pub trusted_proxies: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 100,
            window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(300),
            whitelist_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
            trusted_proxies: Vec::new(),
        }
    }
}

/// Response header policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeadersConfig {
    /// Emit `Cache-Control` and `Expires`.
    pub enable_cache_control: bool,

    /// max-age in seconds.
    pub max_age_secs: u64,

    /// `public` when true, `private` otherwise.
    pub public_cache: bool,

    /// Emit `ETag` and honour `If-None-Match`.
    pub enable_etag: bool,

    /// Check resolved MIME types against the allow / deny lists.
    pub enable_content_type_check: bool,

    /// Base MIME types allowed (empty = all but denied).
    pub allowed_mime_types: Vec<String>,

    /// Base MIME types rejected with 403.
    pub denied_mime_types: Vec<String>,

    /// Extension (".wasm") to MIME overrides, checked first.
    pub custom_mime_types: HashMap<String, String>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        let mut custom_mime_types = HashMap::new();
        custom_mime_types.insert(".wasm".to_string(), "application/wasm".to_string());
        custom_mime_types.insert(".webp".to_string(), "image/webp".to_string());

        Self {
            enable_cache_control: true,
            max_age_secs: 3600,
            public_cache: true,
            enable_etag: true,
            enable_content_type_check: true,
            allowed_mime_types: Vec::new(),
            denied_mime_types: vec![
                "application/x-executable".to_string(),
                "application/x-msdownload".to_string(),
                "application/x-sh".to_string(),
            ],
            custom_mime_types,
        }
    }
}

impl HeadersConfig {
    /// Rewrite the custom MIME keys to lower-cased ".ext" form. When two
    /// spellings collide, the first in byte order wins.
    pub fn normalize_mime_keys(&mut self) {
        let mut keys: Vec<String> = self.custom_mime_types.keys().cloned().collect();
        keys.sort();
        let mut normalized = HashMap::with_capacity(keys.len());
        for key in keys {
            let ext = key.trim();
            let ext = ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase();
            if ext.is_empty() {
                continue;
            }
            if let Some(mime) = self.custom_mime_types.get(&key) {
                normalized.entry(format!(".{}", ext)).or_insert_with(|| mime.clone());
            }
        }
        self.custom_mime_types = normalized;
    }
}

/// Suspicious request detection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SuspiciousConfig {
    pub enabled: bool,

    /// Report matches on requests that were ultimately served.
    pub log_successful_access: bool,

    pub patterns: Vec<String>,

    pub extensions: Vec<String>,
}

impl Default for SuspiciousConfig {
    fn default() -> Self {
        let patterns = [
            ".env", ".git", ".svn", ".htaccess", ".htpasswd", "web.config", "config.php",
            "wp-config", ".bak", ".backup", ".old", ".orig", ".save", ".swp", "wp-admin",
            "phpmyadmin", "administrator", "etc/passwd", "etc/shadow", "windows/system32",
            ".sql", ".db", ".sqlite",
        ];
        let extensions = [".php", ".asp", ".aspx", ".jsp", ".cgi", ".exe", ".sh", ".bat", ".cmd"];

        Self {
            enabled: false,
            log_successful_access: false,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Security event reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable event reporting.
    pub enabled: bool,

    /// Webhook endpoint (empty = callbacks only).
    pub webhook_url: String,

    /// Extra headers sent with every webhook POST.
    pub webhook_headers: HashMap<String, String>,

    #[serde(rename = "webhook_timeout_ms", with = "duration_ms")]
    pub webhook_timeout: Duration,

    /// Deliver single events without blocking the request.
    pub webhook_async: bool,

    /// Events below this severity are dropped.
    pub min_severity: Severity,

    /// Events per batch (0 = no batching).
    pub batch_size: usize,

    #[serde(rename = "batch_timeout_ms", with = "duration_ms")]
    pub batch_timeout: Duration,

    /// Send single events as CEF text instead of JSON.
    pub cef_format: bool,

    /// In-process receivers; not part of the file format.
    #[serde(skip)]
    pub callbacks: Vec<SecurityCallback>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: String::new(),
            webhook_headers: HashMap::new(),
            webhook_timeout: Duration::from_secs(5),
            webhook_async: true,
            min_severity: Severity::Medium,
            batch_size: 0,
            batch_timeout: Duration::from_secs(30),
            cef_format: false,
            callbacks: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Durations are written as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
