//! Source registration contract and the in-process inject source.
//!
//! The lifecycle manager attaches a delivery handler to a
//! [`MessageSource`] on start and detaches it on stop. While no handler
//! is attached, deliveries are dropped at the source.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::delivery::SmsDelivery;

/// Receiver side of the source seam. Invoked sequentially for every
/// inbound delivery while registered; implementations process one
/// delivery to completion before the next is accepted.
pub trait DeliveryHandler: Send + Sync {
    fn on_delivery(&self, delivery: &SmsDelivery, now_ms: i64);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source already has a registered handler")]
    AlreadyRegistered,

    #[error("no handler registered")]
    NotRegistered,

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Registration contract of a raw message source.
pub trait MessageSource: Send + Sync {
    /// Attach the handler. Fails if a handler is already attached or the
    /// source cannot be reached.
    fn register(&self, handler: std::sync::Arc<dyn DeliveryHandler>) -> Result<(), SourceError>;

    /// Detach the current handler.
    fn unregister(&self) -> Result<(), SourceError>;
}

/// In-process source fed by explicit [`inject`](InjectSource::inject)
/// calls (the daemon's RPC surface, simulations, tests). Holds at most
/// one handler and delivers synchronously on the caller's thread.
#[derive(Default)]
pub struct InjectSource {
    handler: Mutex<Option<std::sync::Arc<dyn DeliveryHandler>>>,
    registrations: AtomicUsize,
}

impl InjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver to the registered handler, if any. Returns whether a
    /// handler received the delivery; unregistered sources drop.
    pub fn inject(&self, delivery: &SmsDelivery, now_ms: i64) -> bool {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match handler {
            Some(handler) => {
                handler.on_delivery(delivery, now_ms);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of successful registrations over the source's lifetime.
    pub fn registration_count(&self) -> usize {
        self.registrations.load(Ordering::Relaxed)
    }
}

impl MessageSource for InjectSource {
    fn register(&self, handler: std::sync::Arc<dyn DeliveryHandler>) -> Result<(), SourceError> {
        let mut slot = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(SourceError::AlreadyRegistered);
        }
        *slot = Some(handler);
        self.registrations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn unregister(&self) -> Result<(), SourceError> {
        let mut slot = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_none() {
            return Err(SourceError::NotRegistered);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    struct CountingHandler {
        deliveries: AtomicUsize,
    }

    impl CountingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                deliveries: AtomicUsize::new(0),
            })
        }
    }

    impl DeliveryHandler for CountingHandler {
        fn on_delivery(&self, _delivery: &SmsDelivery, _now_ms: i64) {
            self.deliveries.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn inject_without_handler_drops() {
        let source = InjectSource::new();
        assert!(!source.inject(&SmsDelivery::default(), 0));
    }

    #[test]
    fn inject_delivers_to_registered_handler() {
        let source = InjectSource::new();
        let handler = CountingHandler::new();
        source
            .register(handler.clone() as Arc<dyn DeliveryHandler>)
            .expect("register");
        assert!(source.inject(&SmsDelivery::default(), 0));
        assert_eq!(handler.deliveries.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn double_register_is_rejected() {
        let source = InjectSource::new();
        let handler = CountingHandler::new();
        source
            .register(handler.clone() as Arc<dyn DeliveryHandler>)
            .expect("first register");
        let err = source
            .register(handler as Arc<dyn DeliveryHandler>)
            .expect_err("second register must fail");
        assert_eq!(err, SourceError::AlreadyRegistered);
        assert_eq!(source.registration_count(), 1);
    }

    #[test]
    fn unregister_detaches() {
        let source = InjectSource::new();
        let handler = CountingHandler::new();
        source
            .register(handler.clone() as Arc<dyn DeliveryHandler>)
            .expect("register");
        source.unregister().expect("unregister");
        assert!(!source.is_registered());
        assert!(!source.inject(&SmsDelivery::default(), 0));
        assert_eq!(handler.deliveries.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unregister_without_handler_errors() {
        let source = InjectSource::new();
        assert_eq!(
            source.unregister().expect_err("nothing registered"),
            SourceError::NotRegistered
        );
    }
}
