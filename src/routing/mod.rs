//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path (percent-decoded)
//!     → table.rs (clean, exact lookups: redirect, specific, index)
//!     → resolver.rs (RouteAction: Redirect | Custom | Serve(candidate))
//!     → FileAccessor::locate (direct, then each base path)
//!     → Return: embedded file path or not found
//! ```
//!
//! # Design Decisions
//! - Tables are replaced whole through atomic swaps; no locks on lookup
//! - Exact map lookups only; the only scan is over mount prefixes
//! - Deterministic: redirect beats specific beats index
//! - Longest mount prefix wins

pub mod resolver;
pub mod table;

pub use resolver::{PathResolver, RouteAction};
pub use table::{clean_path, route_key, trim_route, RouteTable, SpecificHandler};
