//! Inbound delivery wire types and fragment decoding.

use serde::{Deserialize, Serialize};

use txnwatch_core::types::RawMessage;

/// One raw message fragment inside a delivery. Every field may be absent;
/// partial fragments are decoded, not rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsFragment {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Receive time in epoch milliseconds, when the transport supplies it.
    #[serde(default)]
    pub received_at_ms: Option<i64>,
}

/// One inbound delivery from the raw message source: zero or more
/// fragments plus an encoding-format tag. Multi-part messages arrive as
/// multiple fragments in one delivery; each fragment is classified
/// independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsDelivery {
    #[serde(default)]
    pub fragments: Vec<SmsFragment>,
    /// Encoding-format tag from the transport. May be absent.
    #[serde(default)]
    pub format: Option<String>,
}

impl SmsDelivery {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Decode one fragment into a [`RawMessage`]. A missing receive time is
/// filled from the delivery clock (`now_ms`) so every raw message carries
/// a concrete timestamp.
pub fn to_raw_message(fragment: &SmsFragment, now_ms: i64) -> RawMessage {
    RawMessage {
        sender: fragment.sender.clone(),
        body: fragment.body.clone(),
        received_at_ms: fragment.received_at_ms.unwrap_or(now_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_carries_all_fields() {
        let fragment = SmsFragment {
            sender: Some("HDFCBK".to_owned()),
            body: Some("Rs.500 DEBITED from your A/C".to_owned()),
            received_at_ms: Some(1_700_000_000_000),
        };
        let raw = to_raw_message(&fragment, 99);
        assert_eq!(raw.sender.as_deref(), Some("HDFCBK"));
        assert_eq!(raw.body.as_deref(), Some("Rs.500 DEBITED from your A/C"));
        assert_eq!(raw.received_at_ms, 1_700_000_000_000);
    }

    #[test]
    fn decode_fills_missing_timestamp_from_delivery_clock() {
        let fragment = SmsFragment {
            sender: Some("SBIINB".to_owned()),
            body: Some("hello".to_owned()),
            received_at_ms: None,
        };
        let raw = to_raw_message(&fragment, 12_345);
        assert_eq!(raw.received_at_ms, 12_345);
    }

    #[test]
    fn decode_preserves_absent_fields() {
        let raw = to_raw_message(&SmsFragment::default(), 0);
        assert!(raw.sender.is_none());
        assert!(raw.body.is_none());
    }

    #[test]
    fn delivery_deserializes_with_defaults() {
        let delivery: SmsDelivery = serde_json::from_str("{}").expect("deserialize");
        assert!(delivery.is_empty());
        assert!(delivery.format.is_none());
    }

    #[test]
    fn delivery_wire_roundtrip() {
        let delivery = SmsDelivery {
            fragments: vec![
                SmsFragment {
                    sender: Some("HDFCBK".to_owned()),
                    body: Some("part one".to_owned()),
                    received_at_ms: Some(1),
                },
                SmsFragment {
                    sender: Some("HDFCBK".to_owned()),
                    body: Some("part two".to_owned()),
                    received_at_ms: Some(2),
                },
            ],
            format: Some("3gpp".to_owned()),
        };
        let json = serde_json::to_string(&delivery).expect("serialize");
        let back: SmsDelivery = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(delivery, back);
    }
}
