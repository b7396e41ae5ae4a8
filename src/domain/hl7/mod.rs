//! HL7 v2 message model
//!
//! A typed model for pipe-delimited HL7 v2.5 messages: segments, fields,
//! repeats, components and subcomponents, with 1-based accessors matching
//! HL7 field numbering. Parsing is permissive about the protocol version and
//! strict about structure (an MSH header with a message type and control id
//! is required).

pub mod adt;
pub mod datetime;
pub mod encoding;
pub mod message;

pub use adt::AdtA05;
pub use message::{Delimiters, Field, Message, Repeat, Segment};
