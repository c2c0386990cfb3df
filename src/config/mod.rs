//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → StaticHandler::apply_config (one atomic swap per block)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → apply_updates swaps each block on the live handler
//!     → in-flight requests keep the snapshot they loaded
//! ```
//!
//! # Design Decisions
//! - Each block is swapped whole; readers never see a partial block
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    HeadersConfig, IndexRule, ListenerConfig, LogFormat, MountConfig, ObservabilityConfig,
    PathSecurityConfig, RateLimitConfig, RedirectRule, SecurityConfig, ServerConfig,
    SuspiciousConfig,
};
pub use validation::{validate_config, ValidationError};
