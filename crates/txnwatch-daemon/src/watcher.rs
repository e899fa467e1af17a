//! Per-delivery message processing: decode fragments, classify, and fan
//! a positive verdict out to the emitter and the alert dispatcher in two
//! isolated failure domains.

use std::sync::Arc;

use txnwatch_core::classify::Classifier;
use txnwatch_core::types::TransactionEvent;
use txnwatch_source_sms::delivery::{SmsDelivery, to_raw_message};
use txnwatch_source_sms::source::DeliveryHandler;

use crate::dispatch::AlertDispatcher;
use crate::emitter::{EmitOutcome, EventEmitter};

/// Counters for one processed delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Fragments seen in the delivery.
    pub fragments: usize,
    /// Fragments classified as transactions.
    pub matched: usize,
    /// Events delivered to a subscriber.
    pub emitted: usize,
    /// Subscriber delivery failures (no-subscriber drops are not failures).
    pub emit_failures: usize,
    /// Alert dispatch failures.
    pub alert_failures: usize,
}

/// Watches the raw message stream: one classification per fragment, one
/// event per positive verdict, both downstream calls attempted
/// independently.
pub struct MessageWatcher {
    classifier: Classifier,
    emitter: Arc<EventEmitter>,
    dispatcher: Arc<AlertDispatcher>,
}

impl MessageWatcher {
    pub fn new(
        classifier: Classifier,
        emitter: Arc<EventEmitter>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            classifier,
            emitter,
            dispatcher,
        }
    }

    /// Process one delivery to completion. Fragments are classified
    /// independently — no cross-fragment correlation. Malformed or
    /// partial fragments resolve to a negative classification, never an
    /// error.
    pub fn process_delivery(&self, delivery: &SmsDelivery, now_ms: i64) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();
        if delivery.is_empty() {
            tracing::trace!("empty delivery");
            return outcome;
        }
        if delivery.format.is_none() {
            tracing::debug!("delivery has no format tag");
        }

        for fragment in &delivery.fragments {
            outcome.fragments += 1;
            let raw = to_raw_message(fragment, now_ms);
            let verdict = self
                .classifier
                .classify(raw.sender.as_deref(), raw.body.as_deref());
            if !verdict.is_transaction {
                continue;
            }
            outcome.matched += 1;

            // A positive verdict implies both fields were present.
            let event = TransactionEvent {
                sender: raw.sender.unwrap_or_default(),
                body: raw.body.unwrap_or_default(),
                timestamp_ms: raw.received_at_ms,
            };

            // Two isolated downstream scopes: a failure in one never
            // prevents the other's attempt.
            match self.emitter.emit(&event) {
                EmitOutcome::Delivered => outcome.emitted += 1,
                EmitOutcome::NoSubscriber => {}
                EmitOutcome::Failed => outcome.emit_failures += 1,
            }
            if let Err(e) = self.dispatcher.dispatch(&event) {
                outcome.alert_failures += 1;
                tracing::warn!(sender = %event.sender, "alert dispatch failed: {e}");
            }
        }
        outcome
    }
}

impl DeliveryHandler for MessageWatcher {
    fn on_delivery(&self, delivery: &SmsDelivery, now_ms: i64) {
        let outcome = self.process_delivery(delivery, now_ms);
        if outcome.matched > 0 {
            tracing::info!(
                fragments = outcome.fragments,
                matched = outcome.matched,
                emitted = outcome.emitted,
                "transaction message detected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use txnwatch_core::alert::{AlertPayload, ChannelSpec};
    use txnwatch_source_sms::delivery::SmsFragment;

    use crate::dispatch::{AlertError, AlertSurface};
    use crate::emitter::{EmitError, EventSubscriber};

    #[derive(Default)]
    struct FakeSurface {
        posted: Mutex<Vec<(u32, AlertPayload)>>,
        fail: bool,
    }

    impl FakeSurface {
        fn posted_count(&self) -> usize {
            self.posted.lock().expect("lock").len()
        }
    }

    impl AlertSurface for FakeSurface {
        fn ensure_channel(&self, _spec: &ChannelSpec) -> Result<(), AlertError> {
            Ok(())
        }

        fn post(
            &self,
            key: u32,
            _channel_id: &str,
            payload: &AlertPayload,
        ) -> Result<(), AlertError> {
            if self.fail {
                return Err(AlertError::Post("down".to_owned()));
            }
            self.posted.lock().expect("lock").push((key, payload.clone()));
            Ok(())
        }

        fn clear(&self, _key: u32) -> Result<(), AlertError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSubscriber {
        seen: Mutex<Vec<TransactionEvent>>,
        fail: bool,
    }

    impl FakeSubscriber {
        fn seen_count(&self) -> usize {
            self.seen.lock().expect("lock").len()
        }
    }

    impl EventSubscriber for FakeSubscriber {
        fn on_transaction(&self, event: &TransactionEvent) -> Result<(), EmitError> {
            if self.fail {
                return Err(EmitError::Rejected("down".to_owned()));
            }
            self.seen.lock().expect("lock").push(event.clone());
            Ok(())
        }
    }

    struct Harness {
        watcher: MessageWatcher,
        subscriber: Arc<FakeSubscriber>,
        surface: Arc<FakeSurface>,
    }

    fn harness(subscriber_fails: bool, surface_fails: bool) -> Harness {
        let subscriber = Arc::new(FakeSubscriber {
            fail: subscriber_fails,
            ..Default::default()
        });
        let surface = Arc::new(FakeSurface {
            fail: surface_fails,
            ..Default::default()
        });
        let emitter = Arc::new(EventEmitter::new());
        emitter.register_subscriber(subscriber.clone() as Arc<dyn EventSubscriber>);
        let dispatcher = Arc::new(AlertDispatcher::new(
            surface.clone() as Arc<dyn AlertSurface>
        ));
        Harness {
            watcher: MessageWatcher::new(Classifier::default(), emitter, dispatcher),
            subscriber,
            surface,
        }
    }

    fn fragment(sender: &str, body: &str, ts: i64) -> SmsFragment {
        SmsFragment {
            sender: Some(sender.to_owned()),
            body: Some(body.to_owned()),
            received_at_ms: Some(ts),
        }
    }

    fn delivery(fragments: Vec<SmsFragment>) -> SmsDelivery {
        SmsDelivery {
            fragments,
            format: Some("3gpp".to_owned()),
        }
    }

    #[test]
    fn positive_fragment_produces_one_event_and_one_alert() {
        let h = harness(false, false);
        let outcome = h.watcher.process_delivery(
            &delivery(vec![fragment(
                "HDFCBK",
                "Rs.500 DEBITED from your A/C",
                1_700_000_000_000,
            )]),
            0,
        );
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.emitted, 1);
        assert_eq!(h.subscriber.seen_count(), 1);
        assert_eq!(h.surface.posted_count(), 1);

        let seen = h.subscriber.seen.lock().expect("lock");
        assert_eq!(
            seen[0],
            TransactionEvent {
                sender: "HDFCBK".to_owned(),
                body: "Rs.500 DEBITED from your A/C".to_owned(),
                timestamp_ms: 1_700_000_000_000,
            }
        );
    }

    #[test]
    fn negative_fragment_produces_nothing() {
        let h = harness(false, false);
        let outcome = h.watcher.process_delivery(
            &delivery(vec![fragment(
                "FRIEND1",
                "DEBITED my dinner bill, pay me back",
                1,
            )]),
            0,
        );
        assert_eq!(outcome.matched, 0);
        assert_eq!(h.subscriber.seen_count(), 0);
        assert_eq!(h.surface.posted_count(), 0);
    }

    #[test]
    fn bank_sender_without_keyword_produces_nothing() {
        let h = harness(false, false);
        let outcome = h
            .watcher
            .process_delivery(&delivery(vec![fragment("SBIINB", "Your OTP is 4521", 1)]), 0);
        assert_eq!(outcome.matched, 0);
        assert_eq!(h.surface.posted_count(), 0);
    }

    #[test]
    fn alert_failure_does_not_prevent_emission() {
        let h = harness(false, true);
        let outcome = h.watcher.process_delivery(
            &delivery(vec![fragment("HDFCBK", "Rs.500 DEBITED", 1)]),
            0,
        );
        assert_eq!(outcome.emitted, 1, "event still emitted");
        assert_eq!(outcome.alert_failures, 1);
        assert_eq!(h.subscriber.seen_count(), 1);
    }

    #[test]
    fn emit_failure_does_not_prevent_alert() {
        let h = harness(true, false);
        let outcome = h.watcher.process_delivery(
            &delivery(vec![fragment("HDFCBK", "Rs.500 DEBITED", 1)]),
            0,
        );
        assert_eq!(outcome.emit_failures, 1);
        assert_eq!(outcome.alert_failures, 0);
        assert_eq!(h.surface.posted_count(), 1, "alert still posted");
    }

    #[test]
    fn multi_fragment_delivery_classifies_independently() {
        let h = harness(false, false);
        let outcome = h.watcher.process_delivery(
            &delivery(vec![
                fragment("HDFCBK", "Rs.500 DEBITED from your A/C", 1),
                fragment("FRIEND1", "lunch?", 2),
                fragment("SBIINB", "Rs.200 CREDITED to your account", 3),
            ]),
            0,
        );
        assert_eq!(outcome.fragments, 3);
        assert_eq!(outcome.matched, 2);
        assert_eq!(h.subscriber.seen_count(), 2);
        assert_eq!(h.surface.posted_count(), 2);
    }

    #[test]
    fn empty_delivery_is_a_no_op() {
        let h = harness(false, false);
        let outcome = h.watcher.process_delivery(&SmsDelivery::default(), 0);
        assert_eq!(outcome, DeliveryOutcome::default());
    }

    #[test]
    fn absent_format_tag_is_tolerated() {
        let h = harness(false, false);
        let d = SmsDelivery {
            fragments: vec![fragment("HDFCBK", "Rs.500 DEBITED", 1)],
            format: None,
        };
        let outcome = h.watcher.process_delivery(&d, 0);
        assert_eq!(outcome.matched, 1);
    }

    #[test]
    fn partial_fragment_is_classification_negative() {
        let h = harness(false, false);
        let d = delivery(vec![
            SmsFragment {
                sender: None,
                body: Some("Rs.500 DEBITED".to_owned()),
                received_at_ms: Some(1),
            },
            SmsFragment {
                sender: Some("HDFCBK".to_owned()),
                body: None,
                received_at_ms: Some(2),
            },
        ]);
        let outcome = h.watcher.process_delivery(&d, 0);
        assert_eq!(outcome.fragments, 2);
        assert_eq!(outcome.matched, 0);
    }

    #[test]
    fn missing_fragment_timestamp_uses_delivery_clock() {
        let h = harness(false, false);
        let d = delivery(vec![SmsFragment {
            sender: Some("HDFCBK".to_owned()),
            body: Some("Rs.500 DEBITED".to_owned()),
            received_at_ms: None,
        }]);
        h.watcher.process_delivery(&d, 77_000);
        let seen = h.subscriber.seen.lock().expect("lock");
        assert_eq!(seen[0].timestamp_ms, 77_000);
    }

    #[test]
    fn no_subscriber_drop_is_not_a_failure() {
        let subscriber_less = MessageWatcher::new(
            Classifier::default(),
            Arc::new(EventEmitter::new()),
            Arc::new(AlertDispatcher::new(
                Arc::new(FakeSurface::default()) as Arc<dyn AlertSurface>
            )),
        );
        let outcome = subscriber_less.process_delivery(
            &delivery(vec![fragment("HDFCBK", "Rs.500 DEBITED", 1)]),
            0,
        );
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.emitted, 0);
        assert_eq!(outcome.emit_failures, 0, "drop is not a failure");
    }
}
