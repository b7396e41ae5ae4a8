//! Transaction-bundle assembly
//!
//! Wraps the mapped resources in a transaction bundle. Every entry is a
//! conditional create: the `If-None-Exist` selector targets a stable
//! identifier so re-submitting the same message is idempotent on the
//! receiving server.

use chrono::Utc;

use crate::domain::fhir::{Bundle, BundleEntry, BundleRequest, Coverage, Organization, Patient,
    Practitioner, Resource};
use crate::domain::terminology::Authority;

/// Assembles the transaction bundle, patient first.
pub fn assemble(
    bundle_id: &str,
    patient: Patient,
    practitioners: Vec<Practitioner>,
    organizations: Vec<Organization>,
    coverage: Option<Coverage>,
) -> Bundle {
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut bundle = Bundle::transaction(bundle_id, timestamp);

    bundle.entry.push(entry(Resource::Patient(patient)));
    for organization in organizations {
        bundle.entry.push(entry(Resource::Organization(organization)));
    }
    for practitioner in practitioners {
        bundle.entry.push(entry(Resource::Practitioner(practitioner)));
    }
    if let Some(coverage) = coverage {
        bundle.entry.push(entry(Resource::Coverage(coverage)));
    }

    bundle
}

fn entry(resource: Resource) -> BundleEntry {
    let request = build_request(&resource);
    BundleEntry {
        full_url: Some(format!("urn:uuid:{}", resource.id())),
        resource,
        request: Some(request),
    }
}

fn build_request(resource: &Resource) -> BundleRequest {
    BundleRequest {
        method: "POST".to_string(),
        url: resource.resource_type().to_string(),
        if_none_exist: if_none_exist(resource),
    }
}

/// Conditional-create selector per resource type.
fn if_none_exist(resource: &Resource) -> Option<String> {
    match resource {
        Resource::Patient(patient) => first_identifier(&patient.identifier),
        Resource::Organization(organization) => first_identifier(&organization.identifier),
        Resource::Practitioner(practitioner) => practitioner
            .name
            .first()
            .and_then(|n| n.family.as_deref())
            .map(|family| format!("name={family}")),
        Resource::Coverage(coverage) => coverage
            .beneficiary
            .reference
            .as_deref()
            .and_then(|r| r.rsplit('/').next())
            .map(|id| format!("beneficiary={id}")),
    }
}

fn first_identifier(identifiers: &[crate::domain::fhir::Identifier]) -> Option<String> {
    identifiers
        .first()
        .and_then(|i| i.value.as_deref())
        .map(|value| format!("identifier={}|{value}", Authority::Sonho.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fhir::types::{HumanName, Identifier, Reference};

    fn patient() -> Patient {
        let mut patient = Patient::new("p1");
        patient.identifier.push(Identifier::new("SONHO", "12345"));
        patient
    }

    #[test]
    fn test_bundle_shape() {
        let bundle = assemble("msg0001", patient(), Vec::new(), Vec::new(), None);
        assert_eq!(bundle.id, "msg0001");
        assert_eq!(bundle.type_, "transaction");
        assert_eq!(bundle.entry.len(), 1);
    }

    #[test]
    fn test_patient_request() {
        let bundle = assemble("msg0001", patient(), Vec::new(), Vec::new(), None);
        let request = bundle.entry[0].request.as_ref().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "Patient");
        assert_eq!(request.if_none_exist.as_deref(), Some("identifier=SONHO|12345"));
    }

    #[test]
    fn test_request_url_matches_resource_type() {
        let mut organization = Organization::new("o1");
        organization.identifier.push(Identifier::new("ACSS", "HOSP01"));
        let mut practitioner = Practitioner::new("pr1");
        practitioner.name.push(HumanName {
            use_: None,
            family: Some("GP".to_string()),
            given: Vec::new(),
        });
        let coverage = Coverage::new("c1", Reference::to("Patient", "p1"));

        let bundle = assemble(
            "msg0001",
            patient(),
            vec![practitioner],
            vec![organization],
            Some(coverage),
        );
        let urls: Vec<&str> = bundle
            .entry
            .iter()
            .map(|e| e.request.as_ref().unwrap().url.as_str())
            .collect();
        assert_eq!(urls, vec!["Patient", "Organization", "Practitioner", "Coverage"]);
    }

    #[test]
    fn test_selectors() {
        let mut organization = Organization::new("o1");
        organization.identifier.push(Identifier::new("ACSS", "HOSP01"));
        let mut practitioner = Practitioner::new("pr1");
        practitioner.name.push(HumanName {
            use_: None,
            family: Some("GP".to_string()),
            given: Vec::new(),
        });
        let coverage = Coverage::new("c1", Reference::to("Patient", "p1"));

        let bundle = assemble(
            "msg0001",
            patient(),
            vec![practitioner],
            vec![organization],
            Some(coverage),
        );
        let selector = |i: usize| bundle.entry[i].request.as_ref().unwrap().if_none_exist.clone();
        assert_eq!(selector(0).as_deref(), Some("identifier=SONHO|12345"));
        assert_eq!(selector(1).as_deref(), Some("identifier=SONHO|HOSP01"));
        assert_eq!(selector(2).as_deref(), Some("name=GP"));
        assert_eq!(selector(3).as_deref(), Some("beneficiary=p1"));
    }
}
