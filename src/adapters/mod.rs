//! External integrations
//!
//! Adapters speak to the outside world: the MLLP/TCP transport on the inbound
//! side and Kafka on the outbound side. Everything else in the crate depends
//! on their traits and types, not on the underlying libraries.

pub mod kafka;
pub mod mllp;
