//! ArcSight Common Event Format rendering.

use crate::events::event::{SecurityEvent, Severity};

const VENDOR: &str = "static-guard";
const PRODUCT: &str = "embedded-static";
const VERSION: &str = "1.0";

/// CEF severity scale (0-10).
pub fn cef_severity(severity: Severity) -> u8 {
    match severity {
        Severity::Low => 3,
        Severity::Medium => 5,
        Severity::High => 8,
        Severity::Critical => 10,
    }
}

/// Render one event as a CEF line.
pub fn format_cef(event: &SecurityEvent) -> String {
    let kind = escape_header(event.event_type.as_str());
    let outcome = if event.blocked { "blocked" } else { "allowed" };

    let mut line = format!(
        "CEF:0|{}|{}|{}|{}|{}|{}|src={} request={} requestMethod={} cs1Label=UserAgent cs1={} cs2Label=Referer cs2={} outcome={}",
        VENDOR,
        PRODUCT,
        VERSION,
        kind,
        kind,
        cef_severity(event.severity),
        escape_extension(&event.ip),
        escape_extension(&event.path),
        escape_extension(&event.method),
        escape_extension(&event.user_agent),
        escape_extension(&event.referer),
        outcome,
    );
    line.push_str(&format!(" cn1Label=StatusCode cn1={}", event.status_code));
    for (key, value) in &event.details {
        line.push_str(&format!(" cs_{}={}", sanitize_key(key), escape_extension(value)));
    }
    line
}

fn escape_header(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
}

fn escape_extension(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('=', "\\=")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

fn sanitize_key(key: &str) -> String {
    key.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
}
