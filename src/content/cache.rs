use axum::http::{header, HeaderMap, HeaderValue};
use std::time::{Duration, SystemTime};

use crate::config::HeadersConfig;

/// `public, max-age=N` or `private, max-age=N`.
pub fn cache_control_value(config: &HeadersConfig) -> String {
    let scope = if config.public_cache { "public" } else { "private" };
    format!("{}, max-age={}", scope, config.max_age_secs)
}

/// Add `Cache-Control` and `Expires` (now + max-age) when enabled.
pub fn apply_cache_headers(headers: &mut HeaderMap, config: &HeadersConfig, now: SystemTime) {
    if !config.enable_cache_control {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&cache_control_value(config)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    let expires = now + Duration::from_secs(config.max_age_secs);
    if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(expires)) {
        headers.insert(header::EXPIRES, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_headers() {
        let mut headers = HeaderMap::new();
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        apply_cache_headers(&mut headers, &HeadersConfig::default(), now);

        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
        assert_eq!(headers[header::EXPIRES], "Tue, 14 Nov 2023 23:13:20 GMT");
    }

    #[test]
    fn test_private_and_disabled() {
        let mut config = HeadersConfig {
            public_cache: false,
            max_age_secs: 60,
            ..Default::default()
        };
        assert_eq!(cache_control_value(&config), "private, max-age=60");

        config.enable_cache_control = false;
        let mut headers = HeaderMap::new();
        apply_cache_headers(&mut headers, &config, SystemTime::now());
        assert!(headers.is_empty());
    }
}
