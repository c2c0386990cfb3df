//! Security event reporting.
//!
//! # Data Flow
//! ```text
//! guard / limiter / negotiator / detector decision
//!     → event.rs (SecurityEvent built from RequestMeta)
//!     → pipeline.rs (enabled? severity >= min?)
//!         → callbacks (spawn_blocking, one task each)
//!         → webhook.rs, JSON or cef.rs (sync or spawned)
//!         → batch.rs (size or timer flush, one JSON payload)
//! ```

pub mod batch;
pub mod cef;
pub mod event;
pub mod pipeline;
pub mod webhook;

pub use batch::{BatchPhase, EventBatch};
pub use event::{EventType, RequestMeta, SecurityEvent, Severity};
pub use pipeline::{SecurityCallback, SecurityEventPipeline};
pub use webhook::{DeliveryError, WebhookClient};
