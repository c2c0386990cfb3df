//! Request path validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//! null byte, `..` segment, depth, dot segment, blocked substring.

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::PathSecurityConfig;
use crate::events::{EventType, Severity};

/// Why a path was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathViolation {
    NullByte,
    Traversal,
    TooDeep { depth: usize, max: usize },
    DotFile { segment: String },
    BlockedPattern { pattern: String },
}

impl PathViolation {
    pub fn event_type(&self) -> EventType {
        match self {
            PathViolation::NullByte => EventType::NullByte,
            PathViolation::Traversal => EventType::PathTraversal,
            PathViolation::TooDeep { .. } => EventType::PathDepthExceeded,
            PathViolation::DotFile { .. } => EventType::DotFileAccess,
            PathViolation::BlockedPattern { .. } => EventType::PatternBlocked,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PathViolation::NullByte => Severity::Critical,
            PathViolation::Traversal => Severity::High,
            _ => Severity::Medium,
        }
    }

    pub fn details(&self) -> BTreeMap<String, String> {
        let mut details = BTreeMap::new();
        match self {
            PathViolation::NullByte | PathViolation::Traversal => {}
            PathViolation::TooDeep { depth, max } => {
                details.insert("depth".to_string(), depth.to_string());
                details.insert("max_depth".to_string(), max.to_string());
            }
            PathViolation::DotFile { segment } => {
                details.insert("segment".to_string(), segment.clone());
            }
            PathViolation::BlockedPattern { pattern } => {
                details.insert("pattern".to_string(), pattern.clone());
            }
        }
        details
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
}

/// Validate `path` against `config`.
pub fn check_path(config: &PathSecurityConfig, path: &str) -> Result<(), PathViolation> {
    if !config.enabled {
        return Ok(());
    }

    if path.contains('\0') {
        return Err(PathViolation::NullByte);
    }

    if segments(path).any(|s| s == "..") {
        return Err(PathViolation::Traversal);
    }

    if config.max_path_depth > 0 {
        let depth = segments(path).filter(|s| !s.is_empty() && *s != ".").count();
        if depth > config.max_path_depth {
            return Err(PathViolation::TooDeep {
                depth,
                max: config.max_path_depth,
            });
        }
    }

    if !config.allow_dot_files {
        if let Some(segment) = segments(path).find(|s| s.starts_with('.') && *s != ".") {
            return Err(PathViolation::DotFile {
                segment: segment.to_string(),
            });
        }
    }

    if let Some(pattern) = config
        .blocked_patterns
        .iter()
        .find(|p| !p.is_empty() && path.contains(p.as_str()))
    {
        return Err(PathViolation::BlockedPattern {
            pattern: pattern.clone(),
        });
    }

    Ok(())
}

/// Holds the live path security config.
#[derive(Debug)]
pub struct PathGuard {
    config: ArcSwap<PathSecurityConfig>,
}

impl PathGuard {
    pub fn new(config: PathSecurityConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn config(&self) -> Arc<PathSecurityConfig> {
        self.config.load_full()
    }

    pub fn set_config(&self, config: PathSecurityConfig) {
        self.config.store(Arc::new(config));
    }

    pub fn check(&self, path: &str) -> Result<(), PathViolation> {
        check_path(&self.config.load(), path)
    }

    pub fn is_path_safe(&self, path: &str) -> bool {
        self.check(path).is_ok()
    }
}

impl Default for PathGuard {
    fn default() -> Self {
        Self::new(PathSecurityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal() {
        let guard = PathGuard::default();
        assert_eq!(guard.check("/static/../../../etc/passwd"), Err(PathViolation::Traversal));
        assert_eq!(guard.check("..\\windows\\system32"), Err(PathViolation::Traversal));
        assert_eq!(guard.check("/a/.."), Err(PathViolation::Traversal));
        // ".." inside a name is not a segment
        assert!(guard.is_path_safe("/static/file..txt"));
    }

    #[test]
    fn test_null_byte_wins() {
        let guard = PathGuard::default();
        let violation = guard.check("/static/../x\0.txt").unwrap_err();
        assert_eq!(violation, PathViolation::NullByte);
        assert_eq!(violation.severity(), Severity::Critical);
    }

    #[test]
    fn test_depth() {
        let guard = PathGuard::new(PathSecurityConfig {
            max_path_depth: 3,
            ..Default::default()
        });
        assert!(guard.is_path_safe("/a/b/c"));
        assert!(guard.is_path_safe("/a//b/c/"));
        assert_eq!(
            guard.check("/a/b/c/d/e"),
            Err(PathViolation::TooDeep { depth: 5, max: 3 })
        );

        guard.set_config(PathSecurityConfig {
            max_path_depth: 0,
            ..Default::default()
        });
        assert!(guard.is_path_safe("/a/b/c/d/e/f/g/h/i/j/k/l"));
    }

    #[test]
    fn test_dot_files() {
        let guard = PathGuard::default();
        assert_eq!(
            guard.check("/static/.htaccess"),
            Err(PathViolation::DotFile { segment: ".htaccess".into() })
        );
        assert!(guard.is_path_safe("/static/./test.txt"));

        guard.set_config(PathSecurityConfig {
            allow_dot_files: true,
            blocked_patterns: Vec::new(),
            ..Default::default()
        });
        assert!(guard.is_path_safe("/static/.well-known/security.txt"));
    }

    #[test]
    fn test_blocked_patterns_are_case_sensitive() {
        let guard = PathGuard::new(PathSecurityConfig {
            allow_dot_files: true,
            ..Default::default()
        });
        assert_eq!(
            guard.check("/static/node_modules/x.js"),
            Err(PathViolation::BlockedPattern { pattern: "node_modules".into() })
        );
        assert!(guard.is_path_safe("/static/NODE_MODULES/x.js"));
    }

    #[test]
    fn test_disabled_allows_everything() {
        let guard = PathGuard::new(PathSecurityConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(guard.is_path_safe("/../../etc/passwd"));
        assert!(guard.is_path_safe("/.env\0"));
    }

    #[test]
    fn test_every_dotdot_path_is_unsafe() {
        let guard = PathGuard::default();
        for path in ["..", "../a", "a/../b", "/x/y/..", "a\\..\\b", "/static/../static/test.txt"] {
            assert!(!guard.is_path_safe(path), "{} should be unsafe", path);
        }
    }
}
