//! Event emission to the host application's single subscriber.
//!
//! The subscriber slot is an explicit, mutex-guarded optional reference
//! set and cleared by the host — no ambient static state. Emission is
//! fire-and-forget: no queue, no retry, and internal delivery errors
//! never fail the caller.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use txnwatch_core::types::TransactionEvent;

/// Name of the outbound event channel the host subscribes to.
pub const EVENT_CHANNEL: &str = "SMSTransactionDetected";

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("subscriber channel closed")]
    Closed,

    #[error("subscriber rejected event: {0}")]
    Rejected(String),
}

/// The host application's registered listener for transaction events.
/// Implementations perform bounded local work only.
pub trait EventSubscriber: Send + Sync {
    fn on_transaction(&self, event: &TransactionEvent) -> Result<(), EmitError>;
}

/// What happened to one emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Delivered,
    /// No subscriber registered — the event is dropped, not queued.
    NoSubscriber,
    /// The subscriber failed; the error was logged, not propagated.
    Failed,
}

/// Delivers classified events to at most one registered subscriber.
#[derive(Default)]
pub struct EventEmitter {
    subscriber: Mutex<Option<Arc<dyn EventSubscriber>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the subscriber, replacing any previous one (latest wins —
    /// the host owns the single-listener lifecycle).
    pub fn register_subscriber(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut slot = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.replace(subscriber).is_some() {
            tracing::debug!("subscriber replaced");
        }
    }

    pub fn clear_subscriber(&self) {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Clear the slot only if `target` is still the registered subscriber.
    /// Lets a departing subscriber clean up without evicting a
    /// replacement that registered in the meantime.
    pub fn clear_subscriber_if(&self, target: &Arc<dyn EventSubscriber>) -> bool {
        let mut slot = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, target)) {
            slot.take();
            true
        } else {
            false
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Emit one event. Never fails the caller: a missing subscriber is a
    /// silent drop, a failing subscriber is logged. The slot lock is not
    /// held across the subscriber call.
    pub fn emit(&self, event: &TransactionEvent) -> EmitOutcome {
        let subscriber = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(subscriber) = subscriber else {
            tracing::debug!(channel = EVENT_CHANNEL, "no subscriber, event dropped");
            return EmitOutcome::NoSubscriber;
        };
        match subscriber.on_transaction(event) {
            Ok(()) => EmitOutcome::Delivered,
            Err(e) => {
                tracing::warn!(channel = EVENT_CHANNEL, "event delivery failed: {e}");
                EmitOutcome::Failed
            }
        }
    }
}
