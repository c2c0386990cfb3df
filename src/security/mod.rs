//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (distinct paths per client IP, 429)
//!     → [redirect / specific handler lookup]
//!     → path_guard.rs (null byte, traversal, depth, dot files, patterns, 403)
//!     → suspicious.rs (observe only, reported at the terminal outcome)
//!     → Pass to file resolution
//! ```
//!
//! # Design Decisions
//! - Each component owns its config behind an atomic swap
//! - Fail closed: reject on any path check failure
//! - No trust in client input; X-Forwarded-For only from trusted proxies

pub mod path_guard;
pub mod rate_limit;
pub mod suspicious;

pub use path_guard::{check_path, PathGuard, PathViolation};
pub use rate_limit::{RateDecision, RateLimiter};
pub use suspicious::{MatchKind, SuspiciousDetector, SuspiciousMatch};
