//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → server stops accepting → watcher stops applying
//! ```
//!
//! Config reload is driven by the file watcher, not by SIGHUP.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{forward_signals, wait_for_signal};
