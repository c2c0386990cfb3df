//! Route tables for one mounted tree.
//!
//! Five independent tables, each behind its own atomic swap. Writers clone
//! the current table, modify the copy and publish it with `rcu`; readers
//! only ever see whole tables.

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::fs::embedded::normalize;

/// A per-route handler that owns the whole response.
#[derive(Clone)]
pub struct SpecificHandler(Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>);

impl SpecificHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self(Arc::new(move |req| f(req).boxed()))
    }

    pub fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        (self.0)(req)
    }
}

impl fmt::Debug for SpecificHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpecificHandler(..)")
    }
}

/// Lexically clean a route: rooted, no empty or "." segments, ".." resolved,
/// no trailing slash.
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Inbound request path as a lookup key: rooted, empty segments and the
/// trailing slash dropped. Dot segments stay, so `a/../b` never matches `b`.
pub fn trim_route(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

/// Key for a route registered under a group.
pub fn route_key(group: &str, route: &str) -> String {
    clean_path(&format!("{}/{}", group, route))
}

#[derive(Debug, Clone)]
struct IndexEntry {
    file: String,
    routes: Vec<String>,
}

#[derive(Debug)]
pub struct RouteTable {
    redirects: ArcSwap<HashMap<String, String>>,
    indexes: ArcSwap<Vec<IndexEntry>>,
    downloads: ArcSwap<HashMap<String, bool>>,
    specifics: ArcSwap<HashMap<String, SpecificHandler>>,
    prefixes: ArcSwap<Vec<String>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            redirects: ArcSwap::from_pointee(HashMap::new()),
            indexes: ArcSwap::from_pointee(Vec::new()),
            downloads: ArcSwap::from_pointee(HashMap::new()),
            specifics: ArcSwap::from_pointee(HashMap::new()),
            prefixes: ArcSwap::from_pointee(Vec::new()),
        }
    }

    // Redirects

    pub fn set_redirect(&self, src_group: &str, src_route: &str, dst_group: &str, dst_route: &str) {
        let from = route_key(src_group, src_route);
        let to = route_key(dst_group, dst_route);
        self.redirects.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(from.clone(), to.clone());
            next
        });
    }

    pub fn get_redirect(&self, group: &str, route: &str) -> Option<String> {
        self.redirect_at(&route_key(group, route))
    }

    /// Exact lookup by an already built key.
    pub fn redirect_at(&self, key: &str) -> Option<String> {
        self.redirects.load().get(key).cloned()
    }

    pub fn is_redirect(&self, group: &str, route: &str) -> bool {
        self.get_redirect(group, route).is_some()
    }

    // Index files

    /// Serve `file` for `group`/`route`. One file may back several routes.
    pub fn set_index(&self, group: &str, route: &str, file: &str) {
        let route = route_key(group, route);
        let file = normalize(file).to_string();
        self.indexes.rcu(|current| {
            let mut next = Vec::clone(current);
            match next.iter_mut().find(|e| e.file == file) {
                Some(entry) => {
                    if !entry.routes.contains(&route) {
                        entry.routes.push(route.clone());
                    }
                }
                None => next.push(IndexEntry {
                    file: file.clone(),
                    routes: vec![route.clone()],
                }),
            }
            next
        });
    }

    /// First index file registered for the route.
    pub fn get_index(&self, group: &str, route: &str) -> Option<String> {
        self.index_at(&route_key(group, route))
    }

    pub fn index_at(&self, key: &str) -> Option<String> {
        self.indexes
            .load()
            .iter()
            .find(|e| e.routes.iter().any(|r| r == key))
            .map(|e| e.file.clone())
    }

    pub fn is_index(&self, file: &str) -> bool {
        let file = normalize(file);
        self.indexes.load().iter().any(|e| e.file == file)
    }

    pub fn is_index_for_route(&self, group: &str, route: &str) -> bool {
        self.get_index(group, route).is_some()
    }

    // Download flags

    pub fn set_download(&self, path: &str, flag: bool) {
        let key = clean_path(path);
        self.downloads.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), flag);
            next
        });
    }

    pub fn is_download(&self, path: &str) -> bool {
        self.downloads.load().get(&clean_path(path)).copied().unwrap_or(false)
    }

    // Specific handlers

    pub fn set_specific(&self, group: &str, route: &str, handler: SpecificHandler) {
        let key = route_key(group, route);
        self.specifics.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), handler.clone());
            next
        });
    }

    pub fn get_specific(&self, group: &str, route: &str) -> Option<SpecificHandler> {
        self.specific_at(&route_key(group, route))
    }

    pub fn specific_at(&self, key: &str) -> Option<SpecificHandler> {
        self.specifics.load().get(key).cloned()
    }

    // Mount prefixes

    pub fn add_prefix(&self, route: &str) {
        let route = clean_path(route);
        self.prefixes.rcu(|current| {
            let mut next = Vec::clone(current);
            if !next.contains(&route) {
                next.push(route.clone());
            }
            next
        });
    }

    pub fn prefixes(&self) -> Arc<Vec<String>> {
        self.prefixes.load_full()
    }

    /// Remove the longest registered prefix that matches on a segment
    /// boundary. `path` must already be clean.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        let prefixes = self.prefixes.load();
        let best = prefixes
            .iter()
            .filter(|p| p.as_str() != "/")
            .filter_map(|p| {
                let rest = path.strip_prefix(p.as_str())?;
                (rest.is_empty() || rest.starts_with('/')).then_some((p.len(), rest))
            })
            .max_by_key(|(len, _)| *len);
        match best {
            Some((_, rest)) => rest,
            None => path,
        }
    }
}
