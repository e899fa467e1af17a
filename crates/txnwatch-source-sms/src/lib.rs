//! txnwatch-source-sms: Inbound message seam. Wire types for raw SMS
//! deliveries, fragment decoding, and the source registration contract
//! the lifecycle manager drives.

pub mod delivery;
pub mod source;

pub use txnwatch_core::types;
