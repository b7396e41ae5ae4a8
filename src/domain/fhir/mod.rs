//! FHIR R5 wire model
//!
//! Hand-rolled serde models for the resources the gateway emits, plus the
//! datatypes they are built from. Only the elements this gateway produces are
//! modelled; serialization follows the FHIR JSON rules (camelCase element
//! names, absent elements omitted).

pub mod resources;
pub mod types;

pub use resources::{
    Bundle, BundleEntry, BundleRequest, Coverage, Organization, Patient, PatientContact,
    PaymentBy, Practitioner, Resource,
};
pub use types::{
    Address, Annotation, CodeableConcept, Coding, ContactPoint, Extension, HumanName, Identifier,
    Meta, Reference,
};
