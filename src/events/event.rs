//! Security event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What kind of decision produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PathTraversal,
    NullByte,
    PathDepthExceeded,
    DotFileAccess,
    PatternBlocked,
    MimeTypeDenied,
    RateLimitExceeded,
    SuspiciousAccess,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PathTraversal => "path_traversal",
            EventType::NullByte => "null_byte",
            EventType::PathDepthExceeded => "path_depth_exceeded",
            EventType::DotFileAccess => "dot_file_access",
            EventType::PatternBlocked => "pattern_blocked",
            EventType::MimeTypeDenied => "mime_type_denied",
            EventType::RateLimitExceeded => "rate_limit_exceeded",
            EventType::SuspiciousAccess => "suspicious_access",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totally ordered: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Client facts captured once per request and copied into every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Client IP used for rate limiting (may come from X-Forwarded-For).
    pub ip: String,
    /// Connecting peer address.
    pub remote_addr: String,
    pub forwarded_for: Option<String>,
    pub method: String,
    pub path: String,
    pub user_agent: String,
    pub referer: String,
}

/// One security decision, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub severity: Severity,
    pub ip: String,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    pub user_agent: String,
    pub referer: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    pub blocked: bool,
    pub remote_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_forwarded_for: Option<String>,
}

impl SecurityEvent {
    pub fn new(meta: &RequestMeta, event_type: EventType, severity: Severity, status_code: u16) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            severity,
            ip: meta.ip.clone(),
            path: meta.path.clone(),
            method: meta.method.clone(),
            status_code,
            user_agent: meta.user_agent.clone(),
            referer: meta.referer.clone(),
            details: BTreeMap::new(),
            blocked: status_code >= 400,
            remote_addr: meta.remote_addr.clone(),
            x_forwarded_for: meta.forwarded_for.clone(),
        }
    }

    pub fn blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details.extend(details);
        self
    }
}
