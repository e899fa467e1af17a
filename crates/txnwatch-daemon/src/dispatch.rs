//! Best-effort alert dispatch to the local alert surface.

use std::sync::Arc;

use thiserror::Error;

use txnwatch_core::alert::{AlertPayload, ChannelSpec, TRANSACTION_CHANNEL, alert_key};
use txnwatch_core::types::TransactionEvent;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert channel setup failed: {0}")]
    Channel(String),

    #[error("alert post rejected: {0}")]
    Post(String),
}

/// The platform's local user-notification facility. Channel creation is
/// idempotent — ensuring an existing channel is a no-op.
pub trait AlertSurface: Send + Sync {
    fn ensure_channel(&self, spec: &ChannelSpec) -> Result<(), AlertError>;

    /// Post an alert under the given identity key on a channel. Posting
    /// with an existing key replaces that alert.
    fn post(&self, key: u32, channel_id: &str, payload: &AlertPayload) -> Result<(), AlertError>;

    /// Withdraw the alert with the given key, if present.
    fn clear(&self, key: u32) -> Result<(), AlertError>;
}

/// Builds and posts one local alert per transaction event.
///
/// The alert key derives from the low 32 bits of the event timestamp, so
/// events sharing the truncated timestamp collide by design (the
/// accepted identity policy). Failures are typed and returned; the
/// watcher logs them without letting them touch event emission.
pub struct AlertDispatcher {
    surface: Arc<dyn AlertSurface>,
}

impl AlertDispatcher {
    pub fn new(surface: Arc<dyn AlertSurface>) -> Self {
        Self { surface }
    }

    pub fn dispatch(&self, event: &TransactionEvent) -> Result<(), AlertError> {
        self.surface.ensure_channel(&TRANSACTION_CHANNEL)?;
        let payload = AlertPayload::for_event(event);
        self.surface
            .post(alert_key(event.timestamp_ms), TRANSACTION_CHANNEL.id, &payload)
    }
}
