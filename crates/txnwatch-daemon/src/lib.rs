//! txnwatch-daemon: The classification-and-dispatch pipeline. Event
//! emission to the single host subscriber, best-effort alert dispatch,
//! the per-delivery message watcher, and the monitoring lifecycle state
//! machine.

pub mod dispatch;
pub mod emitter;
pub mod lifecycle;
pub mod watcher;

pub use txnwatch_core::types;
