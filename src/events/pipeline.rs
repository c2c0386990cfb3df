//! Security event dispatch: severity filter, callbacks, webhook and batching.

use arc_swap::{ArcSwap, ArcSwapOption};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SecurityConfig;
use crate::events::batch::EventBatch;
use crate::events::event::SecurityEvent;
use crate::events::webhook::WebhookClient;
use crate::observability::metrics;

/// An in-process event receiver.
#[derive(Clone)]
pub struct SecurityCallback(Arc<dyn Fn(&SecurityEvent) + Send + Sync>);

impl SecurityCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SecurityEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, event: &SecurityEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for SecurityCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityCallback(..)")
    }
}

struct PipelineInner {
    config: ArcSwap<SecurityConfig>,
    batch: ArcSwapOption<EventBatch>,
    webhook: WebhookClient,
}

/// Routes admitted events to callbacks and the webhook.
///
/// Delivery is best-effort: failures are logged and counted, never returned.
#[derive(Clone)]
pub struct SecurityEventPipeline {
    inner: Arc<PipelineInner>,
}

impl SecurityEventPipeline {
    pub fn new(config: SecurityConfig) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                config: ArcSwap::from_pointee(config),
                batch: ArcSwapOption::empty(),
                webhook: WebhookClient::new(),
            }),
        }
    }

    pub fn config(&self) -> Arc<SecurityConfig> {
        self.inner.config.load_full()
    }

    /// Replace the config. Events still queued under the previous config
    /// are flushed with it.
    pub fn set_config(&self, config: SecurityConfig) {
        let previous = self.inner.config.swap(Arc::new(config));
        let Some(batch) = self.inner.batch.load_full() else {
            return;
        };
        if batch.is_empty() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(pending = batch.len(), "No runtime to flush queued security events");
            return;
        }
        let events = batch.drain();
        self.dispatch_batch(previous, events);
        self.rearm_if_queued(&batch);
    }

    pub fn add_callback(&self, callback: SecurityCallback) {
        self.inner.config.rcu(|current| {
            let mut next = SecurityConfig::clone(current);
            next.callbacks.push(callback.clone());
            next
        });
    }

    /// Events queued and not yet flushed.
    pub fn pending(&self) -> usize {
        self.inner.batch.load().as_ref().map(|b| b.len()).unwrap_or(0)
    }

    /// Admit an event and hand it to every configured receiver.
    pub async fn notify(&self, event: SecurityEvent) {
        let config = self.config();
        if !config.enabled {
            return;
        }
        if event.severity < config.min_severity {
            tracing::trace!(
                event_type = %event.event_type,
                severity = %event.severity,
                "Security event below minimum severity"
            );
            return;
        }
        metrics::record_security_event(event.event_type.as_str(), event.severity.as_str());

        for callback in &config.callbacks {
            let callback = callback.clone();
            let event = event.clone();
            tokio::task::spawn_blocking(move || callback.call(&event));
        }

        if config.webhook_url.is_empty() {
            return;
        }

        if config.batch_size > 0 {
            self.enqueue(config, event);
        } else if config.webhook_async {
            let this = self.clone();
            tokio::spawn(async move {
                this.deliver(&config, &event).await;
            });
        } else {
            self.deliver(&config, &event).await;
        }
    }

    /// Send whatever is queued right now.
    pub async fn flush(&self) {
        let Some(batch) = self.inner.batch.load_full() else {
            return;
        };
        let events = batch.drain();
        self.rearm_if_queued(&batch);
        if events.is_empty() {
            return;
        }
        let config = self.config();
        self.send_batch(&config, events).await;
    }

    async fn deliver(&self, config: &SecurityConfig, event: &SecurityEvent) {
        match self.inner.webhook.send_event(config, event).await {
            Ok(()) => tracing::debug!(event_type = %event.event_type, "Security event delivered"),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    event_type = %event.event_type,
                    url = %config.webhook_url,
                    "Security event delivery failed"
                );
                metrics::record_webhook_failure(e.reason());
            }
        }
    }

    fn batch(&self) -> Arc<EventBatch> {
        if let Some(batch) = self.inner.batch.load_full() {
            return batch;
        }
        self.inner
            .batch
            .rcu(|current| current.clone().or_else(|| Some(Arc::new(EventBatch::new()))));
        self.inner
            .batch
            .load_full()
            .unwrap_or_else(|| Arc::new(EventBatch::new()))
    }

    fn enqueue(&self, config: Arc<SecurityConfig>, event: SecurityEvent) {
        let batch = self.batch();
        let queued = batch.push(event);

        if queued >= config.batch_size {
            let events = batch.drain();
            self.dispatch_batch(config, events);
            self.rearm_if_queued(&batch);
            return;
        }
        self.arm_flush_timer(&batch, config.batch_timeout);
    }

    /// A push that lands while a drain is collecting cannot arm the timer
    /// (the phase is `Flushing`). Every drain therefore re-checks once the
    /// phase is back to `Idle`.
    fn rearm_if_queued(&self, batch: &EventBatch) {
        if !batch.is_empty() {
            self.arm_flush_timer(batch, self.config().batch_timeout);
        }
    }

    fn arm_flush_timer(&self, batch: &EventBatch, timeout: Duration) {
        let this = self.clone();
        batch.arm_timer(move || {
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                this.flush_due();
            })
        });
    }

    fn flush_due(&self) {
        let Some(batch) = self.inner.batch.load_full() else {
            return;
        };
        let events = batch.drain_due();
        self.dispatch_batch(self.config(), events);
        self.rearm_if_queued(&batch);
    }

    fn dispatch_batch(&self, config: Arc<SecurityConfig>, events: Vec<SecurityEvent>) {
        if events.is_empty() {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.send_batch(&config, events).await;
        });
    }

    async fn send_batch(&self, config: &SecurityConfig, events: Vec<SecurityEvent>) {
        if config.webhook_url.is_empty() {
            tracing::warn!(count = events.len(), "Dropping queued security events, no webhook configured");
            return;
        }
        match self.inner.webhook.send_batch(config, &events).await {
            Ok(()) => {
                tracing::debug!(count = events.len(), "Security event batch delivered");
                metrics::record_batch_flush(events.len());
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    count = events.len(),
                    url = %config.webhook_url,
                    "Security event batch delivery failed"
                );
                metrics::record_webhook_failure(e.reason());
            }
        }
    }
}

impl fmt::Debug for SecurityEventPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityEventPipeline")
            .field("config", &self.inner.config.load())
            .field("pending", &self.pending())
            .finish()
    }
}
