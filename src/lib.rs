//! Embedded static file server with a security pipeline.

// Serving
pub mod content;
pub mod fs;
pub mod handler;
pub mod http;
pub mod routing;

// Security
pub mod events;
pub mod security;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServerConfig;
pub use error::StaticError;
pub use events::{EventType, SecurityEvent, Severity};
pub use fs::{EmbeddedFs, MemoryFs};
pub use handler::StaticHandler;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::SpecificHandler;
