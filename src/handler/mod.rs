//! The static handler: one embedded tree, its route tables and its
//! security components.
//!
//! # Data Flow
//! ```text
//! GET <mount>/*file
//!     → get.rs      serve(): the per-request state machine
//!     → mount.rs    axum registration of the catch-all routes
//!     → status.rs   monitor contract (info, health)
//! ```
//!
//! Every configuration block lives behind its own atomic swap inside the
//! component that reads it, so setters never block in-flight requests.

mod get;
mod mount;
mod status;

use rust_embed::RustEmbed;
use std::fs::File;
use std::sync::Arc;

use crate::config::{
    HeadersConfig, PathSecurityConfig, RateLimitConfig, SecurityConfig, ServerConfig, SuspiciousConfig,
};
use crate::content::ContentNegotiator;
use crate::error::StaticError;
use crate::events::{SecurityCallback, SecurityEventPipeline};
use crate::fs::{AssetFs, EmbeddedFs, FileAccessor, FileContent, FileInfo};
use crate::routing::{RouteTable, SpecificHandler};
use crate::security::{PathGuard, RateLimiter, SuspiciousDetector};

pub struct StaticHandler {
    files: FileAccessor,
    routes: RouteTable,
    guard: PathGuard,
    limiter: RateLimiter,
    detector: SuspiciousDetector,
    negotiator: ContentNegotiator,
    events: SecurityEventPipeline,
}

impl StaticHandler {
    /// Serve `fs`, falling back to each of `base_paths` in order. Every
    /// block starts from its default config.
    pub fn new<F: EmbeddedFs>(fs: F, base_paths: &[&str]) -> Self {
        Self::from_shared(Arc::new(fs), base_paths.iter().map(|b| b.to_string()).collect())
    }

    /// Serve a folder compiled in with `rust-embed`.
    pub fn from_embed<E: RustEmbed + 'static>(base_paths: &[&str]) -> Self {
        Self::new(AssetFs::<E>::new(), base_paths)
    }

    pub fn from_shared(fs: Arc<dyn EmbeddedFs>, base_paths: Vec<String>) -> Self {
        Self {
            files: FileAccessor::new(fs, base_paths),
            routes: RouteTable::new(),
            guard: PathGuard::default(),
            limiter: RateLimiter::new(RateLimitConfig::default()),
            detector: SuspiciousDetector::default(),
            negotiator: ContentNegotiator::default(),
            events: SecurityEventPipeline::new(SecurityConfig::default()),
        }
    }

    /// Apply every block of a loaded config file. In-process callbacks
    /// registered earlier are kept.
    pub fn apply_config(&self, config: &ServerConfig) {
        let mount = &config.mount;
        self.files.set_base_paths(mount.base_paths.clone());
        if let Some(threshold) = mount.spool_threshold_bytes {
            self.files.use_temp_for_file_size(threshold);
        }
        for path in &mount.downloads {
            self.routes.set_download(path, true);
        }
        for rule in &mount.redirects {
            self.routes.set_redirect("", &rule.from, "", &rule.to);
        }
        for rule in &mount.indexes {
            self.routes.set_index("", &rule.route, &rule.file);
        }

        self.set_path_security_config(config.path_security.clone());
        self.set_rate_limit_config(config.rate_limit.clone());
        self.set_headers_config(config.headers.clone());
        self.set_suspicious_config(config.suspicious.clone());

        let mut security = config.security.clone();
        if security.callbacks.is_empty() {
            security.callbacks = self.events.config().callbacks.clone();
        }
        self.set_security_config(security);
    }

    // Configuration blocks

    pub fn path_security_config(&self) -> Arc<PathSecurityConfig> {
        self.guard.config()
    }

    pub fn set_path_security_config(&self, config: PathSecurityConfig) {
        self.guard.set_config(config);
    }

    pub fn rate_limit_config(&self) -> Arc<RateLimitConfig> {
        self.limiter.config()
    }

    pub fn set_rate_limit_config(&self, config: RateLimitConfig) {
        self.limiter.set_config(config);
    }

    pub fn headers_config(&self) -> Arc<HeadersConfig> {
        self.negotiator.config()
    }

    pub fn set_headers_config(&self, config: HeadersConfig) {
        self.negotiator.set_config(config);
    }

    pub fn suspicious_config(&self) -> Arc<SuspiciousConfig> {
        self.detector.config()
    }

    pub fn set_suspicious_config(&self, config: SuspiciousConfig) {
        self.detector.set_config(config);
    }

    pub fn security_config(&self) -> Arc<SecurityConfig> {
        self.events.config()
    }

    pub fn set_security_config(&self, config: SecurityConfig) {
        self.events.set_config(config);
    }

    pub fn add_security_callback<F>(&self, callback: F)
    where
        F: Fn(&crate::events::SecurityEvent) + Send + Sync + 'static,
    {
        self.events.add_callback(SecurityCallback::new(callback));
    }

    /// Events queued for the next batch flush.
    pub fn pending_security_events(&self) -> usize {
        self.events.pending()
    }

    /// Deliver queued batch events now.
    pub async fn flush_security_events(&self) {
        self.events.flush().await;
    }

    // Route tables

    pub fn set_download(&self, path: &str, flag: bool) {
        self.routes.set_download(path, flag);
    }

    pub fn is_download(&self, path: &str) -> bool {
        self.routes.is_download(path)
    }

    pub fn set_index(&self, group: &str, route: &str, file: &str) {
        self.routes.set_index(group, route, file);
    }

    pub fn get_index(&self, group: &str, route: &str) -> Option<String> {
        self.routes.get_index(group, route)
    }

    pub fn is_index(&self, file: &str) -> bool {
        self.routes.is_index(file)
    }

    pub fn is_index_for_route(&self, group: &str, route: &str) -> bool {
        self.routes.is_index_for_route(group, route)
    }

    pub fn set_redirect(&self, src_group: &str, src_route: &str, dst_group: &str, dst_route: &str) {
        self.routes.set_redirect(src_group, src_route, dst_group, dst_route);
    }

    pub fn get_redirect(&self, group: &str, route: &str) -> Option<String> {
        self.routes.get_redirect(group, route)
    }

    pub fn is_redirect(&self, group: &str, route: &str) -> bool {
        self.routes.is_redirect(group, route)
    }

    pub fn set_specific(&self, group: &str, route: &str, handler: SpecificHandler) {
        self.routes.set_specific(group, route, handler);
    }

    pub fn get_specific(&self, group: &str, route: &str) -> Option<SpecificHandler> {
        self.routes.get_specific(group, route)
    }

    /// Mount prefixes registered through `register_router*`.
    pub fn registered_routes(&self) -> Arc<Vec<String>> {
        self.routes.prefixes()
    }

    // Files

    pub fn base_paths(&self) -> Arc<Vec<String>> {
        self.files.base_paths()
    }

    pub fn use_temp_for_file_size(&self, size: u64) {
        self.files.use_temp_for_file_size(size);
    }

    pub fn has(&self, path: &str) -> bool {
        self.files.has(path)
    }

    pub fn info(&self, path: &str) -> Result<FileInfo, StaticError> {
        self.files.info(path)
    }

    pub fn find(&self, path: &str) -> Result<(FileInfo, FileContent), StaticError> {
        self.files.open(path)
    }

    pub fn temp(&self, path: &str) -> Result<File, StaticError> {
        self.files.temp(path)
    }

    pub fn list(&self, root: &str) -> Result<Vec<String>, StaticError> {
        self.files.list(root)
    }

    pub fn map<F>(&self, visitor: F) -> Result<(), StaticError>
    where
        F: FnMut(&str, &FileInfo) -> Result<(), StaticError>,
    {
        self.files.map(visitor)
    }

    // Security

    pub fn is_path_safe(&self, path: &str) -> bool {
        self.guard.is_path_safe(path)
    }

    pub fn is_rate_limited(&self, ip: &str) -> bool {
        self.limiter.is_rate_limited(ip)
    }

    pub fn reset_rate_limit(&self, ip: &str) {
        self.limiter.reset(ip);
    }
}

impl std::fmt::Debug for StaticHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticHandler")
            .field("files", &self.files)
            .field("routes", &self.routes.prefixes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexRule, RedirectRule};
    use crate::fs::MemoryFs;

    fn handler() -> StaticHandler {
        let fs = MemoryFs::new()
            .with_file("testdata/test.txt", "This is a test file")
            .with_file("testdata/index.html", "Test Index Page");
        StaticHandler::new(fs, &["testdata"])
    }

    #[test]
    fn test_config_round_trip_through_setters() {
        let h = handler();
        assert!(h.path_security_config().enabled);

        h.set_path_security_config(PathSecurityConfig {
            max_path_depth: 3,
            ..Default::default()
        });
        assert_eq!(h.path_security_config().max_path_depth, 3);
        assert!(!h.is_path_safe("/a/b/c/d"));
    }

    #[test]
    fn test_apply_config_keeps_callbacks() {
        let h = handler();
        h.add_security_callback(|_| {});

        let mut config = ServerConfig::default();
        config.mount.base_paths = vec!["testdata".into()];
        config.mount.downloads = vec!["/static/test.txt".into()];
        config.mount.redirects = vec![RedirectRule {
            from: "/old".into(),
            to: "/static/test.txt".into(),
        }];
        config.mount.indexes = vec![IndexRule {
            route: "/static".into(),
            file: "testdata/index.html".into(),
        }];
        config.security.enabled = true;
        h.apply_config(&config);

        assert_eq!(h.security_config().callbacks.len(), 1);
        assert!(h.security_config().enabled);
        assert!(h.is_download("/static/test.txt"));
        assert_eq!(h.get_redirect("", "/old").as_deref(), Some("/static/test.txt"));
        assert!(h.is_index("testdata/index.html"));
    }

    #[test]
    fn test_file_operations() {
        let h = handler();
        assert!(h.has("testdata/test.txt"));
        assert_eq!(h.info("testdata/test.txt").unwrap().size, 19);
        assert_eq!(h.list("").unwrap(), vec!["testdata/index.html", "testdata/test.txt"]);

        let (_, content) = h.find("testdata/index.html").unwrap();
        assert_eq!(content.read_to_vec().unwrap(), b"Test Index Page");
    }
}
