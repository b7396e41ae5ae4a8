//! MLLP transport
//!
//! Framing codec, per-connection state machine and the TCP accept loop.

pub mod codec;
pub mod connection;
pub mod server;

pub use connection::{Connection, ConnectionDeps, ConnectionState};
pub use server::MllpServer;
