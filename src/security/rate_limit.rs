//! Per-IP rate limiting over distinct request paths.
//!
//! Each client IP owns a window holding the set of paths it requested since
//! the window started. Re-requesting a path is free; a new path is refused
//! once the set already holds `max_requests` entries.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;

/// Paths seen from one IP in the current window.
#[derive(Debug)]
struct PathWindow {
    started: Instant,
    paths: HashSet<String>,
}

impl PathWindow {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            paths: HashSet::new(),
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.duration_since(self.started) >= window
    }
}

/// Outcome of one check, used for the `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub limited: bool,
    pub limit: usize,
    pub remaining: usize,
    /// Time until the current window ends.
    pub reset_after: Duration,
}

impl RateDecision {
    /// `Retry-After` value in whole seconds, at least 1.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs() + u64::from(self.reset_after.subsec_nanos() > 0);
        secs.max(1)
    }
}

type Windows = DashMap<String, PathWindow>;

pub struct RateLimiter {
    config: ArcSwap<RateLimitConfig>,
    windows: Arc<Windows>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter. The cleanup sweep starts when a tokio runtime is
    /// available, otherwise on the next `set_config` made inside one.
    pub fn new(config: RateLimitConfig) -> Self {
        let limiter = Self {
            config: ArcSwap::from_pointee(RateLimitConfig::default()),
            windows: Arc::new(DashMap::new()),
            cleanup: Mutex::new(None),
        };
        limiter.set_config(config);
        limiter
    }

    pub fn config(&self) -> Arc<RateLimitConfig> {
        self.config.load_full()
    }

    /// Swap the config and restart the cleanup sweep with its interval.
    pub fn set_config(&self, config: RateLimitConfig) {
        let sweep = (config.enabled && !config.cleanup_interval.is_zero())
            .then(|| (config.cleanup_interval, config.window));
        self.config.store(Arc::new(config));

        let mut cleanup = self.cleanup.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = cleanup.take() {
            handle.abort();
        }
        if let Some((every, window)) = sweep {
            if tokio::runtime::Handle::try_current().is_ok() {
                *cleanup = Some(spawn_cleanup(Arc::downgrade(&self.windows), every, window));
            }
        }
    }

    fn exempt(config: &RateLimitConfig, ip: &str) -> bool {
        !config.enabled || config.whitelist_ips.iter().any(|w| w == ip)
    }

    /// Check `path` for `ip` and record it when admitted.
    ///
    /// Returns `None` when the limiter does not apply (disabled or
    /// whitelisted).
    pub fn check(&self, ip: &str, path: &str) -> Option<RateDecision> {
        let config = self.config.load();
        if Self::exempt(&config, ip) {
            return None;
        }

        let now = Instant::now();
        let mut window = self
            .windows
            .entry(ip.to_string())
            .or_insert_with(|| PathWindow::new(now));
        if window.expired(now, config.window) {
            *window = PathWindow::new(now);
        }

        let reset_after = config.window.saturating_sub(now.duration_since(window.started));
        let seen = window.paths.contains(path);
        if !seen && window.paths.len() >= config.max_requests {
            return Some(RateDecision {
                limited: true,
                limit: config.max_requests,
                remaining: 0,
                reset_after,
            });
        }
        if !seen {
            window.paths.insert(path.to_string());
        }

        Some(RateDecision {
            limited: false,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(window.paths.len()),
            reset_after,
        })
    }

    /// True when `ip` has used its quota for the current window.
    pub fn is_rate_limited(&self, ip: &str) -> bool {
        let config = self.config.load();
        if Self::exempt(&config, ip) {
            return false;
        }
        self.windows
            .get(ip)
            .map(|w| !w.expired(Instant::now(), config.window) && w.paths.len() >= config.max_requests)
            .unwrap_or(false)
    }

    /// Forget everything recorded for `ip`.
    pub fn reset(&self, ip: &str) {
        self.windows.remove(ip);
    }

    /// Drop every expired window; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        purge_expired(&self.windows, self.config.load().window)
    }

    pub fn tracked_ips(&self) -> usize {
        self.windows.len()
    }

    /// Distinct paths recorded for `ip` in its current window.
    pub fn recorded_paths(&self, ip: &str) -> usize {
        self.windows.get(ip).map(|w| w.paths.len()).unwrap_or(0)
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        let cleanup = self.cleanup.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = cleanup.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config.load())
            .field("tracked_ips", &self.windows.len())
            .finish()
    }
}

fn purge_expired(windows: &Windows, window: Duration) -> usize {
    let now = Instant::now();
    let before = windows.len();
    windows.retain(|_, w| !w.expired(now, window));
    before.saturating_sub(windows.len())
}

fn spawn_cleanup(windows: Weak<Windows>, every: Duration, window: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(windows) = windows.upgrade() else {
                break;
            };
            let removed = purge_expired(&windows, window);
            if removed > 0 {
                tracing::debug!(removed, remaining = windows.len(), "Expired rate limit windows removed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize, window: Duration) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests: max,
            window,
            cleanup_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_distinct_paths_consume_quota() {
        let limiter = RateLimiter::new(config(2, Duration::from_secs(60)));
        let ip = "203.0.113.5";

        let first = limiter.check(ip, "/a").unwrap();
        assert!(!first.limited);
        assert_eq!(first.remaining, 1);
        assert!(!limiter.check(ip, "/b").unwrap().limited);
        assert!(limiter.is_rate_limited(ip));

        let third = limiter.check(ip, "/c").unwrap();
        assert!(third.limited);
        assert_eq!(third.remaining, 0);
        // a refused path is not recorded
        assert_eq!(limiter.recorded_paths(ip), 2);
        // paths already in the window stay allowed
        assert!(!limiter.check(ip, "/a").unwrap().limited);
    }

    #[test]
    fn test_repeated_path_counts_once() {
        let limiter = RateLimiter::new(config(2, Duration::from_secs(60)));
        for _ in 0..50 {
            assert!(!limiter.check("198.51.100.1", "/same").unwrap().limited);
        }
        assert_eq!(limiter.recorded_paths("198.51.100.1"), 1);
        assert!(!limiter.is_rate_limited("198.51.100.1"));
    }

    #[test]
    fn test_whitelist_never_limited() {
        let limiter = RateLimiter::new(config(1, Duration::from_secs(60)));
        for i in 0..100 {
            assert!(limiter.check("127.0.0.1", &format!("/{}", i)).is_none());
        }
        assert!(!limiter.is_rate_limited("127.0.0.1"));
        assert!(!limiter.is_rate_limited("::1"));
        assert_eq!(limiter.tracked_ips(), 0);
    }

    #[test]
    fn test_disabled() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert!(limiter.check("203.0.113.5", "/a").is_none());
    }

    #[test]
    fn test_window_expiry_and_cleanup() {
        let limiter = RateLimiter::new(config(1, Duration::from_millis(30)));
        assert!(!limiter.check("203.0.113.5", "/a").unwrap().limited);
        assert!(limiter.check("203.0.113.5", "/b").unwrap().limited);

        std::thread::sleep(Duration::from_millis(50));
        assert!(!limiter.is_rate_limited("203.0.113.5"));
        assert_eq!(limiter.cleanup_expired(), 1);
        assert_eq!(limiter.tracked_ips(), 0);

        assert!(!limiter.check("203.0.113.5", "/b").unwrap().limited);
    }

    #[test]
    fn test_reset() {
        let limiter = RateLimiter::new(config(1, Duration::from_secs(60)));
        limiter.check("203.0.113.5", "/a");
        assert!(limiter.is_rate_limited("203.0.113.5"));
        limiter.reset("203.0.113.5");
        assert!(!limiter.is_rate_limited("203.0.113.5"));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateDecision {
            limited: true,
            limit: 1,
            remaining: 0,
            reset_after: Duration::from_millis(1500),
        };
        assert_eq!(decision.retry_after_secs(), 2);
        let decision = RateDecision {
            reset_after: Duration::ZERO,
            ..decision
        };
        assert_eq!(decision.retry_after_secs(), 1);
    }

    #[tokio::test]
    async fn test_background_cleanup_and_restart() {
        let limiter = RateLimiter::new(RateLimitConfig {
            cleanup_interval: Duration::from_millis(20),
            ..config(5, Duration::from_millis(10))
        });
        limiter.check("203.0.113.5", "/a");
        assert_eq!(limiter.tracked_ips(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(limiter.tracked_ips(), 0);

        // reconfiguring without a sweep cancels the running task
        limiter.set_config(config(5, Duration::from_millis(10)));
        limiter.check("203.0.113.6", "/a");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(limiter.tracked_ips(), 1);
    }
}
