//! Observational matcher for requests that look like probing.

use arc_swap::ArcSwap;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::config::SuspiciousConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Pattern,
    Extension,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Pattern => "pattern",
            MatchKind::Extension => "extension",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspiciousMatch {
    pub kind: MatchKind,
    pub pattern: String,
}

#[derive(Debug)]
pub struct SuspiciousDetector {
    config: ArcSwap<SuspiciousConfig>,
}

impl SuspiciousDetector {
    pub fn new(config: SuspiciousConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn config(&self) -> Arc<SuspiciousConfig> {
        self.config.load_full()
    }

    pub fn set_config(&self, config: SuspiciousConfig) {
        self.config.store(Arc::new(config));
    }

    /// Substring patterns are case-sensitive; extensions are compared
    /// ignoring ASCII case.
    pub fn evaluate(&self, path: &str) -> Option<SuspiciousMatch> {
        let config = self.config.load();
        if !config.enabled {
            return None;
        }

        if let Some(pattern) = config
            .patterns
            .iter()
            .find(|p| !p.is_empty() && path.contains(p.as_str()))
        {
            return Some(SuspiciousMatch {
                kind: MatchKind::Pattern,
                pattern: pattern.clone(),
            });
        }

        let lower = path.to_ascii_lowercase();
        config
            .extensions
            .iter()
            .find(|ext| !ext.is_empty() && lower.ends_with(&ext.to_ascii_lowercase()))
            .map(|ext| SuspiciousMatch {
                kind: MatchKind::Extension,
                pattern: ext.clone(),
            })
    }

    /// Whether a match should be reported for a request that ended with
    /// `status`. Anything not served successfully is always reported.
    pub fn should_report(&self, status: StatusCode) -> bool {
        let served = status.is_success() || status == StatusCode::NOT_MODIFIED;
        !served || self.config.load().log_successful_access
    }
}

impl Default for SuspiciousDetector {
    fn default() -> Self {
        Self::new(SuspiciousConfig::default())
    }
}
