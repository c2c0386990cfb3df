//! MIME resolution and admission.

use std::collections::HashMap;
use std::path::Path;

use crate::config::HeadersConfig;

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Why a MIME type was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeRejection {
    Denied,
    NotAllowed,
}

impl MimeRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeRejection::Denied => "denied",
            MimeRejection::NotAllowed => "not_allowed",
        }
    }
}

/// ".ext" lower-cased, or None for files without an extension.
fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Custom map first, then the standard table, then octet-stream.
/// `custom` keys must already be in ".ext" form
/// (see [`HeadersConfig::normalize_mime_keys`]).
pub fn resolve_mime(path: &str, custom: &HashMap<String, String>) -> String {
    if let Some(mime) = extension(path).and_then(|ext| custom.get(&ext)) {
        return mime.clone();
    }

    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME)
        .to_string()
}

/// The type without parameters: "text/html; charset=utf-8" → "text/html".
pub fn base_type(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Deny list first, then the allow list when it is non-empty.
pub fn admit(config: &HeadersConfig, mime: &str) -> Result<(), MimeRejection> {
    if !config.enable_content_type_check {
        return Ok(());
    }
    let base = base_type(mime);

    if config.denied_mime_types.iter().any(|d| base_type(d) == base) {
        return Err(MimeRejection::Denied);
    }
    if !config.allowed_mime_types.is_empty() && !config.allowed_mime_types.iter().any(|a| base_type(a) == base) {
        return Err(MimeRejection::NotAllowed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mime() {
        let custom = HeadersConfig::default().custom_mime_types;
        assert_eq!(resolve_mime("app.wasm", &custom), "application/wasm");
        assert_eq!(resolve_mime("IMG.WEBP", &custom), "image/webp");
        assert_eq!(resolve_mime("test.txt", &custom), "text/plain");
        assert_eq!(resolve_mime("index.html", &custom), "text/html");
        assert_eq!(resolve_mime("LICENSE", &custom), DEFAULT_MIME);
    }

    #[test]
    fn test_custom_map_overrides_standard_table() {
        let mut config = HeadersConfig::default();
        config.custom_mime_types.insert("TXT".to_string(), "text/x-custom; charset=utf-8".to_string());
        config.normalize_mime_keys();
        assert_eq!(resolve_mime("notes.txt", &config.custom_mime_types), "text/x-custom; charset=utf-8");
    }

    #[test]
    fn test_admit() {
        let mut config = HeadersConfig::default();
        assert_eq!(admit(&config, "application/x-sh"), Err(MimeRejection::Denied));
        assert!(admit(&config, "text/plain").is_ok());

        config.allowed_mime_types = vec!["text/html".into(), "text/css".into()];
        assert!(admit(&config, "text/html; charset=utf-8").is_ok());
        assert_eq!(admit(&config, "image/png"), Err(MimeRejection::NotAllowed));

        // deny wins over allow
        config.denied_mime_types = vec![" text/html ; charset=utf-8".into()];
        assert_eq!(admit(&config, "text/html"), Err(MimeRejection::Denied));

        config.enable_content_type_check = false;
        assert!(admit(&config, "text/html").is_ok());
    }
}
