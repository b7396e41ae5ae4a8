//! Organization projection
//!
//! Organizations are known by code: the operating healthcare organization,
//! primary-care units and insurers all become the same minimal resource with
//! a deterministic id and an ACSS identifier.

use crate::domain::fhir::types::Identifier;
use crate::domain::fhir::Organization;
use crate::domain::ids;
use crate::domain::terminology::Authority;

/// Builds an organization for a code, with the optional display name.
pub fn build_organization(code: &str, name: Option<&str>) -> Organization {
    let mut organization = Organization::new(ids::deterministic_id(code));
    organization.active = Some(true);
    organization
        .identifier
        .push(Identifier::new(Authority::Acss.as_str(), code).with_use("usual"));
    organization.name = name.map(str::to_string);
    organization
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_is_deterministic() {
        let a = build_organization("HOSP01", Some("Hospital Example"));
        let b = build_organization("HOSP01", None);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, ids::deterministic_id("HOSP01"));
    }

    #[test]
    fn test_organization_shape() {
        let organization = build_organization("HOSP01", Some("Hospital Example"));
        assert_eq!(organization.active, Some(true));
        assert_eq!(organization.name.as_deref(), Some("Hospital Example"));
        let identifier = &organization.identifier[0];
        assert_eq!(identifier.system.as_deref(), Some("ACSS"));
        assert_eq!(identifier.value.as_deref(), Some("HOSP01"));
        assert_eq!(identifier.use_.as_deref(), Some("usual"));
    }
}
