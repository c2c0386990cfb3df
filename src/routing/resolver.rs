//! Request path → action / embedded file.
//!
//! # Precedence
//! ```text
//! Lookups compare the inbound path with only duplicate and trailing
//! slashes removed; dot segments are never resolved here.
//!
//! redirect   (exact route match)  → Redirect(target)
//! specific   (exact route match)  → Custom(handler)
//! otherwise                       → Serve(candidate)
//!     candidate = index file for the route
//!              or path with the mount prefix stripped
//! ```
//! The candidate is then located directly in the tree, or under each base
//! path in order.

use crate::fs::FileAccessor;
use crate::routing::table::{trim_route, RouteTable, SpecificHandler};

#[derive(Debug, Clone)]
pub enum RouteAction {
    Redirect(String),
    Custom(SpecificHandler),
    Serve(String),
}

#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    table: &'a RouteTable,
}

impl<'a> PathResolver<'a> {
    pub fn new(table: &'a RouteTable) -> Self {
        Self { table }
    }

    /// Decide what to do with a request path.
    pub fn action(&self, request_path: &str) -> RouteAction {
        let route = trim_route(request_path);

        if let Some(target) = self.table.redirect_at(&route) {
            return RouteAction::Redirect(target);
        }
        if let Some(handler) = self.table.specific_at(&route) {
            return RouteAction::Custom(handler);
        }
        RouteAction::Serve(self.candidate(&route))
    }

    /// The tree path a served route maps to, before base-path fallback.
    pub fn candidate(&self, request_path: &str) -> String {
        let route = trim_route(request_path);
        if let Some(index) = self.table.index_at(&route) {
            return index;
        }
        self.table
            .strip_prefix(&route)
            .trim_start_matches('/')
            .to_string()
    }

    /// Locate `candidate` in the tree. `None` means 404.
    pub fn locate(&self, candidate: &str, files: &FileAccessor) -> Option<String> {
        files.locate(candidate)
    }
}
