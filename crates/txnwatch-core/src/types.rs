use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Inbound ──────────────────────────────────────────────────────

/// One raw inbound message as handed to the pipeline by the source.
///
/// Sender and body may be absent — partial fragments are tolerated and
/// resolve to a negative classification downstream. Consumed once, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub sender: Option<String>,
    pub body: Option<String>,
    /// Receive time in epoch milliseconds.
    pub received_at_ms: i64,
}

impl RawMessage {
    /// Receive time as a UTC timestamp, if the millisecond value is in range.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.received_at_ms)
    }
}

// ─── Verdict ──────────────────────────────────────────────────────

/// Result of classifying a single raw message. No identity, no lifecycle
/// beyond the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationVerdict {
    pub is_transaction: bool,
}

impl ClassificationVerdict {
    pub const fn positive() -> Self {
        Self {
            is_transaction: true,
        }
    }

    pub const fn negative() -> Self {
        Self {
            is_transaction: false,
        }
    }
}

// ─── Event ────────────────────────────────────────────────────────

/// A classified bank-transaction event.
///
/// Created only when the classifier returns a positive verdict; owned
/// transiently by the watcher until handed to the emitter and the alert
/// dispatcher. The serialized form is the exact outbound event-channel
/// payload: `{"sender": …, "messageBody": …, "timestamp": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub sender: String,
    #[serde(rename = "messageBody")]
    pub body: String,
    /// Event time in epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

impl TransactionEvent {
    /// Event time as a UTC timestamp, if the millisecond value is in range.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

// ─── Watcher State ────────────────────────────────────────────────

/// Running state of the message watcher. Exactly one instance
/// process-wide, owned by the lifecycle manager.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherState {
    #[default]
    Stopped,
    Starting,
    Running,
}

impl WatcherState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
