//! FHIR resources emitted by the gateway
//!
//! `Patient`, `Practitioner`, `Organization` and `Coverage`, plus the
//! transaction `Bundle` envelope. Every resource carries a `resourceType`
//! discriminator and a stable lower-case id.

use serde::{Deserialize, Serialize};

use crate::domain::fhir::types::{
    Address, CodeableConcept, ContactPoint, Extension, HumanName, Identifier, Meta, Reference,
};

/// Demographics and administrative information about a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extension: Vec<Extension>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub telecom: Vec<ContactPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_date_time: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub address: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub contact: Vec<PatientContact>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub general_practitioner: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managing_organization: Option<Reference>,
}

impl Patient {
    pub fn new(id: impl Into<String>) -> Patient {
        Patient {
            resource_type: "Patient".to_string(),
            id: id.into(),
            meta: None,
            extension: Vec::new(),
            identifier: Vec::new(),
            name: Vec::new(),
            telecom: Vec::new(),
            gender: None,
            birth_date: None,
            deceased_boolean: None,
            deceased_date_time: None,
            address: Vec::new(),
            marital_status: None,
            contact: Vec::new(),
            general_practitioner: Vec::new(),
            managing_organization: None,
        }
    }
}

/// A next-of-kin or emergency contact on a patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContact {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub relationship: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<HumanName>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub telecom: Vec<ContactPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// A person with a formal responsibility in care provision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    pub resource_type: String,
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub name: Vec<HumanName>,
}

impl Practitioner {
    pub fn new(id: impl Into<String>) -> Practitioner {
        Practitioner {
            resource_type: "Practitioner".to_string(),
            id: id.into(),
            identifier: Vec::new(),
            name: Vec::new(),
        }
    }
}

/// A grouping of people or organizations with a common purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub resource_type: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Organization {
    pub fn new(id: impl Into<String>) -> Organization {
        Organization {
            resource_type: "Organization".to_string(),
            id: id.into(),
            active: None,
            identifier: Vec::new(),
            name: None,
        }
    }
}

/// Insurance or self-pay coverage for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub resource_type: String,
    pub id: String,
    pub status: String,
    pub kind: String,
    pub beneficiary: Reference,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub payment_by: Vec<PaymentBy>,
}

impl Coverage {
    pub fn new(id: impl Into<String>, beneficiary: Reference) -> Coverage {
        Coverage {
            resource_type: "Coverage".to_string(),
            id: id.into(),
            status: "active".to_string(),
            kind: "insurance".to_string(),
            beneficiary,
            payment_by: Vec::new(),
        }
    }
}

/// A party responsible for paying under a coverage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<Reference>,
}

/// Any resource the gateway can place in a bundle entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    Patient(Patient),
    Practitioner(Practitioner),
    Organization(Organization),
    Coverage(Coverage),
}

impl Resource {
    pub fn resource_type(&self) -> &str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Practitioner(_) => "Practitioner",
            Resource::Organization(_) => "Organization",
            Resource::Coverage(_) => "Coverage",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Resource::Patient(r) => &r.id,
            Resource::Practitioner(r) => &r.id,
            Resource::Organization(r) => &r.id,
            Resource::Coverage(r) => &r.id,
        }
    }
}

/// A transaction envelope applied atomically by the receiving FHIR server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn transaction(id: impl Into<String>, timestamp: impl Into<String>) -> Bundle {
        Bundle {
            resource_type: "Bundle".to_string(),
            id: id.into(),
            type_: "transaction".to_string(),
            timestamp: timestamp.into(),
            entry: Vec::new(),
        }
    }
}

/// One entry in a bundle: a resource plus the request the server applies it with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    pub resource: Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleRequest>,
}

/// The HTTP action the receiving server applies to an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRequest {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_none_exist: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_serializes_resource_type() {
        let patient = Patient::new("abc");
        let value = serde_json::to_value(&patient).unwrap();
        assert_eq!(value["resourceType"], "Patient");
        assert_eq!(value["id"], "abc");
        // empty collections are omitted entirely
        assert!(value.get("identifier").is_none());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_coverage_defaults() {
        let coverage = Coverage::new("c1", Reference::to("Patient", "p1"));
        let value = serde_json::to_value(&coverage).unwrap();
        assert_eq!(value["status"], "active");
        assert_eq!(value["kind"], "insurance");
        assert_eq!(value["beneficiary"]["reference"], "Patient/p1");
    }

    #[test]
    fn test_bundle_entry_request() {
        let mut bundle = Bundle::transaction("msg0001", "2024-01-01T12:00:00Z");
        bundle.entry.push(BundleEntry {
            full_url: Some("urn:uuid:abc".to_string()),
            resource: Resource::Patient(Patient::new("abc")),
            request: Some(BundleRequest {
                method: "POST".to_string(),
                url: "Patient".to_string(),
                if_none_exist: Some("identifier=SONHO|12345".to_string()),
            }),
        });
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["type"], "transaction");
        assert_eq!(value["entry"][0]["request"]["ifNoneExist"], "identifier=SONHO|12345");
        assert_eq!(value["entry"][0]["resource"]["resourceType"], "Patient");
    }

    #[test]
    fn test_resource_accessors() {
        let resource = Resource::Organization(Organization::new("o1"));
        assert_eq!(resource.resource_type(), "Organization");
        assert_eq!(resource.id(), "o1");
    }
}
