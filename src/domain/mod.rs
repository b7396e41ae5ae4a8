//! Core domain types and models
//!
//! This module contains the domain layer: the error hierarchy, the HL7 v2
//! message model, the FHIR R5 wire model, terminology tables and the
//! deterministic-id scheme shared by the mappers.

pub mod errors;
pub mod fhir;
pub mod hl7;
pub mod ids;
pub mod result;
pub mod terminology;

pub use errors::{Hl7Error, HermesError};
pub use result::Result;
