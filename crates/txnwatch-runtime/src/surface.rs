//! Runtime implementations of the platform seams: a spool-file alert
//! surface and the foreground presence claim.
//!
//! The spool surface appends alert records as JSON lines for a desktop
//! integration to pick up, standing in for the OS notification facility.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use txnwatch_core::alert::{AlertExtras, AlertPayload, ChannelSpec, MONITORING_CHANNEL};
use txnwatch_daemon::dispatch::{AlertError, AlertSurface};
use txnwatch_daemon::lifecycle::{PresenceClaim, PresenceError};

/// Identity key of the persistent "monitoring active" indicator.
pub const MONITORING_KEY: u32 = 1001;

// ─── Spool Surface ───────────────────────────────────────────────

/// Alert surface writing JSON-line records to a spool file.
pub struct SpoolAlertSurface {
    path: PathBuf,
    /// Channels already announced to the spool; re-ensuring is a no-op.
    ensured: Mutex<HashSet<String>>,
}

impl SpoolAlertSurface {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn append(&self, record: serde_json::Value) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = record.to_string();
        line.push('\n');
        file.write_all(line.as_bytes())
    }
}

impl AlertSurface for SpoolAlertSurface {
    fn ensure_channel(&self, spec: &ChannelSpec) -> Result<(), AlertError> {
        let mut ensured = self.ensured.lock().unwrap_or_else(PoisonError::into_inner);
        if !ensured.insert(spec.id.to_owned()) {
            return Ok(());
        }
        self.append(serde_json::json!({
            "record": "channel",
            "id": spec.id,
            "name": spec.name,
            "description": spec.description,
            "importance": spec.importance,
            "show_badge": spec.show_badge,
        }))
        .map_err(|e| {
            // A failed announcement must not mark the channel ensured.
            ensured.remove(spec.id);
            AlertError::Channel(e.to_string())
        })
    }

    fn post(&self, key: u32, channel_id: &str, payload: &AlertPayload) -> Result<(), AlertError> {
        let record = serde_json::json!({
            "record": "alert",
            "key": key,
            "channel": channel_id,
            "title": payload.title,
            "text": payload.text,
            "extras": payload.extras,
            "posted_at_ms": Utc::now().timestamp_millis(),
        });
        tracing::info!(key, channel = channel_id, text = %payload.text, "alert posted");
        self.append(record).map_err(|e| AlertError::Post(e.to_string()))
    }

    fn clear(&self, key: u32) -> Result<(), AlertError> {
        self.append(serde_json::json!({"record": "clear", "key": key}))
            .map_err(|e| AlertError::Post(e.to_string()))
    }
}

// ─── Foreground Presence ─────────────────────────────────────────

/// Presence claim that surfaces the low-importance "monitoring active"
/// indicator while monitoring runs — the runtime's stand-in for a
/// foreground-service promotion. Best-effort: the OS may still kill the
/// process; the restart policy is a hint, not a guarantee.
pub struct ForegroundPresence {
    surface: Arc<dyn AlertSurface>,
}

impl ForegroundPresence {
    pub fn new(surface: Arc<dyn AlertSurface>) -> Self {
        Self { surface }
    }

    fn indicator() -> AlertPayload {
        AlertPayload {
            title: "Transaction monitor".to_owned(),
            text: "Monitoring messages for bank transactions".to_owned(),
            extras: AlertExtras {
                sender: String::new(),
                body: String::new(),
                timestamp: String::new(),
            },
        }
    }
}

impl PresenceClaim for ForegroundPresence {
    fn acquire(&self) -> Result<(), PresenceError> {
        self.surface
            .ensure_channel(&MONITORING_CHANNEL)
            .map_err(|e| PresenceError::Claim(e.to_string()))?;
        self.surface
            .post(MONITORING_KEY, MONITORING_CHANNEL.id, &Self::indicator())
            .map_err(|e| PresenceError::Claim(e.to_string()))
    }

    fn release(&self) -> Result<(), PresenceError> {
        self.surface
            .clear(MONITORING_KEY)
            .map_err(|e| PresenceError::Release(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use txnwatch_core::alert::TRANSACTION_CHANNEL;
    use txnwatch_core::types::TransactionEvent;

    static SPOOL_SEQ: AtomicU32 = AtomicU32::new(0);

    fn temp_spool() -> PathBuf {
        let seq = SPOOL_SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "txnwatch-test-{}-{seq}/alerts.jsonl",
            std::process::id()
        ))
    }

    fn read_records(path: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .expect("spool readable")
            .lines()
            .map(|l| serde_json::from_str(l).expect("valid record"))
            .collect()
    }

    #[test]
    fn post_appends_alert_record() {
        let path = temp_spool();
        let surface = SpoolAlertSurface::new(path.clone());
        let payload = AlertPayload::for_event(&TransactionEvent {
            sender: "HDFCBK".to_owned(),
            body: "Rs.500 DEBITED".to_owned(),
            timestamp_ms: 42,
        });
        surface
            .post(42, TRANSACTION_CHANNEL.id, &payload)
            .expect("post");

        let records = read_records(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["record"], "alert");
        assert_eq!(records[0]["key"], 42);
        assert_eq!(records[0]["extras"]["timestamp"], "42");
    }

    #[test]
    fn ensure_channel_announces_once() {
        let path = temp_spool();
        let surface = SpoolAlertSurface::new(path.clone());
        surface
            .ensure_channel(&TRANSACTION_CHANNEL)
            .expect("first ensure");
        surface
            .ensure_channel(&TRANSACTION_CHANNEL)
            .expect("second ensure is a no-op");

        let records = read_records(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["record"], "channel");
        assert_eq!(records[0]["id"], TRANSACTION_CHANNEL.id);
    }

    #[test]
    fn presence_posts_and_clears_indicator() {
        let path = temp_spool();
        let surface = Arc::new(SpoolAlertSurface::new(path.clone()));
        let presence = ForegroundPresence::new(surface as Arc<dyn AlertSurface>);

        presence.acquire().expect("acquire");
        presence.release().expect("release");

        let records = read_records(&path);
        // channel announcement, indicator post, clear
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["id"], MONITORING_CHANNEL.id);
        assert_eq!(records[1]["record"], "alert");
        assert_eq!(records[1]["key"], MONITORING_KEY);
        assert_eq!(records[2]["record"], "clear");
        assert_eq!(records[2]["key"], MONITORING_KEY);
    }
}
