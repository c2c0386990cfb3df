//! Embedded filesystem access.
//!
//! # Data Flow
//! ```text
//! EmbeddedFs (memory.rs / embed_assets.rs)
//!     → accessor.rs (normalise, base-path fallback, directory walk)
//!     → FileContent::Memory   (size < threshold)
//!     → FileContent::Spooled  (size >= threshold, temporary file)
//!     → response body
//! ```

pub mod accessor;
pub mod embed_assets;
pub mod embedded;
pub mod memory;

pub use accessor::{FileAccessor, FileContent, NEVER_SPOOL};
pub use embed_assets::AssetFs;
pub use embedded::{DirEntry, EmbeddedFs, FileInfo};
pub use memory::MemoryFs;
