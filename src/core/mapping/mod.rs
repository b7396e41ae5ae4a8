//! HL7-to-FHIR projection
//!
//! Per-resource mappers projecting ADT_A05 segments into FHIR resources, and
//! the transaction-bundle assembly that ties them together. Mapping is
//! deterministic: the same message always yields the same resource ids and
//! the same conditional-create selectors.

pub mod bundle;
pub mod coverage;
pub mod organization;
pub mod patient;
pub mod practitioner;

use crate::domain::fhir::Bundle;
use crate::domain::hl7::AdtA05;
use crate::domain::Result;

/// Process-wide mapping parameters, immutable after startup.
#[derive(Debug, Clone)]
pub struct MappingContext {
    /// Code of the healthcare organization operating this gateway; becomes
    /// the patient's managing organization.
    pub organization_code: String,
    pub organization_name: Option<String>,
    /// Security-label system applied on merge/move events (A40/A45).
    pub confidentiality_system: String,
    pub confidentiality_code: String,
}

/// Builds the full transaction bundle for a registration message.
///
/// The bundle holds exactly one `Patient` and one managing `Organization`,
/// plus any practitioners, primary-care organizations, insurers and coverage
/// the message carries.
pub fn build_transaction(adt: &AdtA05, context: &MappingContext) -> Result<Bundle> {
    let patient = patient::map_patient(adt, context)?;
    let practitioners = practitioner::map_practitioners(adt);

    let mut organizations = vec![organization::build_organization(
        &context.organization_code,
        context.organization_name.as_deref(),
    )];

    // Primary-care units referenced from the general-practitioner roles.
    for rol in adt.rol() {
        if rol.value(3) != "FHCP" {
            continue;
        }
        let unit = rol.value(10);
        if !unit.is_empty() {
            organizations.push(organization::build_organization(unit, None));
        }
    }

    let (coverage, insurers) = coverage::map_coverage(adt, &patient.id);
    organizations.extend(insurers);

    let bundle_id = adt.msh().value(10).to_lowercase();
    Ok(bundle::assemble(
        &bundle_id,
        patient,
        practitioners,
        organizations,
        coverage,
    ))
}
