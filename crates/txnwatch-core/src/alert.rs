//! Alert payload construction and channel profiles.
//!
//! Pure: builds the payload and identity key for a local user alert; the
//! posting itself happens behind the daemon's alert-surface seam.

use serde::{Deserialize, Serialize};

use crate::types::TransactionEvent;

// ─── Channel Profiles ─────────────────────────────────────────────

/// Importance profile of an alert channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelImportance {
    Low,
    High,
}

/// Static definition of an alert channel. Channels are created
/// idempotently before first use — creating one twice is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub importance: ChannelImportance,
    pub show_badge: bool,
}

/// Low-importance channel carrying the persistent "monitoring active"
/// indicator.
pub const MONITORING_CHANNEL: ChannelSpec = ChannelSpec {
    id: "txnwatch.monitoring",
    name: "Transaction Monitoring",
    description: "Monitors messages for transaction detection",
    importance: ChannelImportance::Low,
    show_badge: false,
};

/// High-importance channel for per-event transaction alerts.
pub const TRANSACTION_CHANNEL: ChannelSpec = ChannelSpec {
    id: "txnwatch.transactions",
    name: "Transaction Alerts",
    description: "Detected bank transaction messages",
    importance: ChannelImportance::High,
    show_badge: true,
};

// ─── Payload ──────────────────────────────────────────────────────

/// Maximum number of body characters shown in an alert before truncation.
pub const BODY_PREVIEW_MAX: usize = 40;

/// Ellipsis marker appended to a truncated body preview.
pub const TRUNCATION_MARKER: &str = "...";

/// String-typed event fields carried on the alert so the consuming
/// application can reconstruct the [`TransactionEvent`] when the user
/// acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertExtras {
    pub sender: String,
    pub body: String,
    pub timestamp: String,
}

/// A local user alert derived from one transaction event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub title: String,
    /// Sender-prefixed truncated body shown as the alert text.
    pub text: String,
    pub extras: AlertExtras,
}

impl AlertPayload {
    /// Build the alert for a transaction event: truncated body, sender
    /// prefix when present, string extras for deep-link reconstruction.
    pub fn for_event(event: &TransactionEvent) -> Self {
        let preview = truncate_body(&event.body);
        let text = if event.sender.is_empty() {
            preview
        } else {
            format!("{}: {}", event.sender, preview)
        };
        Self {
            title: "Transaction detected".to_owned(),
            text,
            extras: AlertExtras {
                sender: event.sender.clone(),
                body: event.body.clone(),
                timestamp: event.timestamp_ms.to_string(),
            },
        }
    }
}

/// Truncate a body to [`BODY_PREVIEW_MAX`] characters, appending the
/// ellipsis marker when anything was cut. Operates on characters, not
/// bytes.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= BODY_PREVIEW_MAX {
        return body.to_owned();
    }
    let mut preview: String = body.chars().take(BODY_PREVIEW_MAX).collect();
    preview.push_str(TRUNCATION_MARKER);
    preview
}

/// Alert identity/dedup key: the low 32 bits of the event timestamp.
///
/// Two events sharing the truncated timestamp collide by design — this is
/// the accepted tie-break policy for alert identity, not a bug.
pub fn alert_key(timestamp_ms: i64) -> u32 {
    timestamp_ms as u32
}

// ─── Tests ────────────────────────────────────────────────────────
