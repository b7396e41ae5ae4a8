//! Business logic
//!
//! The core layer: frame parsing and acknowledgment synthesis, trigger-event
//! dispatch, and the HL7-to-FHIR projection.

pub mod dispatch;
pub mod mapping;
pub mod parser;
