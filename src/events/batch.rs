//! Micro-batching queue for webhook delivery.
//!
//! # State machine
//! ```text
//!   Idle ──push (timer armed)──▶ Pending ──size reached / timer fired──▶ Flushing ──▶ Idle
//! ```
//!
//! Events live in a concurrent map keyed by a monotonic sequence number.
//! A flush removes exactly the keys it collected, so a size-triggered flush
//! racing a timer-triggered flush can never hand the same event out twice.
//! A push that lands mid-flush fails to arm the timer; the flushing caller
//! must re-arm when the queue is still non-empty after `drain`.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use tokio::task::JoinHandle;

use crate::events::event::SecurityEvent;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle = 0,
    Pending = 1,
    Flushing = 2,
}

impl From<u8> for BatchPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => BatchPhase::Pending,
            2 => BatchPhase::Flushing,
            _ => BatchPhase::Idle,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventBatch {
    seq: AtomicU64,
    events: DashMap<u64, SecurityEvent>,
    phase: AtomicU8,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event; returns the queue length afterwards.
    pub fn push(&self, event: SecurityEvent) -> usize {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.events.insert(seq, event);
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn phase(&self) -> BatchPhase {
        BatchPhase::from(self.phase.load(Ordering::Acquire))
    }

    /// Arm the flush timer unless one is already pending. `spawn` is only
    /// called when this caller wins the Idle → Pending transition.
    pub fn arm_timer<F>(&self, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        if self
            .phase
            .compare_exchange(
                BatchPhase::Idle as u8,
                BatchPhase::Pending as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        let handle = spawn();
        *self.lock_timer() = Some(handle);
        true
    }

    /// Size-triggered flush: cancel the pending timer and take every event.
    pub fn drain(&self) -> Vec<SecurityEvent> {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
        self.collect()
    }

    /// Timer-triggered flush: called from the timer task itself, so its
    /// handle is dropped rather than aborted.
    pub fn drain_due(&self) -> Vec<SecurityEvent> {
        self.lock_timer().take();
        self.collect()
    }

    fn collect(&self) -> Vec<SecurityEvent> {
        self.phase.store(BatchPhase::Flushing as u8, Ordering::Release);

        let mut keys: Vec<u64> = self.events.iter().map(|e| *e.key()).collect();
        keys.sort_unstable();
        let events = keys
            .into_iter()
            .filter_map(|k| self.events.remove(&k).map(|(_, event)| event))
            .collect();

        self.phase.store(BatchPhase::Idle as u8, Ordering::Release);
        events
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for EventBatch {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }
}
