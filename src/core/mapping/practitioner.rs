//! Practitioner projection
//!
//! Family-health-care-provider roles (ROL with role code `FHCP`) become
//! `Practitioner` resources. Ids are derived from the person's identifier
//! number when present, from the concatenated name otherwise, and minted
//! randomly as a last resort; the same derivation backs the patient's
//! general-practitioner references so they line up.

use crate::domain::fhir::types::{CodeableConcept, Coding, HumanName, Identifier};
use crate::domain::fhir::Practitioner;
use crate::domain::hl7::message::{Repeat, Segment};
use crate::domain::hl7::AdtA05;
use crate::domain::terminology::{self, systems, Authority};
use crate::domain::ids;

/// Builds one practitioner per family-health role in the message.
pub fn map_practitioners(adt: &AdtA05) -> Vec<Practitioner> {
    adt.rol()
        .into_iter()
        .filter(|rol| rol.value(3) == "FHCP")
        .map(build_practitioner)
        .collect()
}

/// Stable practitioner id for a role segment.
pub(super) fn rol_practitioner_id(rol: &Segment) -> String {
    let Some(xcn) = rol.field(4).and_then(|f| f.repeats().first()) else {
        return ids::random_id();
    };
    let id_number = xcn.component(1);
    if !id_number.is_empty() {
        return ids::deterministic_id(id_number);
    }
    let family = xcn.subcomponent(2, 1);
    let given = xcn.component(3);
    if family.is_empty() && given.is_empty() {
        tracing::warn!("Role person has neither identifier nor name, minting a random id");
        return ids::random_id();
    }
    ids::deterministic_id(&format!("{family}{given}"))
}

fn build_practitioner(rol: &Segment) -> Practitioner {
    let mut practitioner = Practitioner::new(rol_practitioner_id(rol));
    for xcn in rol.field(4).into_iter().flat_map(|f| f.repeats()) {
        if xcn.is_empty() {
            continue;
        }
        practitioner.name.push(build_name(xcn));
        if let Some(identifier) = build_identifier(xcn) {
            practitioner.identifier.push(identifier);
        }
    }
    practitioner
}

fn build_name(xcn: &Repeat) -> HumanName {
    let mut given = Vec::new();
    if !xcn.component(3).is_empty() {
        given.push(xcn.component(3).to_string());
    }
    given.extend(xcn.component(4).split_whitespace().map(str::to_string));
    HumanName {
        use_: Some("usual".to_string()),
        family: match xcn.subcomponent(2, 1) {
            "" => None,
            family => Some(family.to_string()),
        },
        given,
    }
}

fn build_identifier(xcn: &Repeat) -> Option<Identifier> {
    let value = xcn.component(1);
    if value.is_empty() {
        return None;
    }
    let namespace = xcn.component(9);
    // Mechanographic numbers are registered under the HR authority.
    let system = if namespace == "N.Mecanográfico" {
        Authority::Rhv.as_str()
    } else {
        namespace
    };
    let mut identifier = Identifier {
        value: Some(value.to_string()),
        ..Identifier::default()
    };
    if !system.is_empty() {
        identifier.system = Some(system.to_string());
    }
    if let Some(code) = terminology::practitioner_identifier_type(xcn.component(13), namespace) {
        identifier.type_ = Some(CodeableConcept::from_coding(Coding::new(
            systems::V2_0203,
            code,
        )));
    }
    Some(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hl7::Message;

    fn adt(segments: &str) -> AdtA05 {
        let raw = format!(
            "MSH|^~\\&|S|SF|R|RF|20240101120000||ADT^A28^ADT_A05|MSG0001|P|2.5\r\
             EVN|A28|20240101120000\rPID|1||12345^^^SONHO^NS||DOE^JOHN||19800101|M\r{segments}"
        );
        AdtA05::new(Message::parse(&raw).unwrap()).unwrap()
    }

    #[test]
    fn test_only_fhcp_roles_are_mapped() {
        let adt = adt("ROL|1|AD|AT|11^X^Y\rROL|2|AD|FHCP|77^GP^ANNA\r");
        let practitioners = map_practitioners(&adt);
        assert_eq!(practitioners.len(), 1);
        assert_eq!(practitioners[0].id, ids::deterministic_id("77"));
    }

    #[test]
    fn test_id_falls_back_to_name() {
        let adt = adt("ROL|1|AD|FHCP|^GP^ANNA\r");
        let practitioners = map_practitioners(&adt);
        assert_eq!(practitioners[0].id, ids::deterministic_id("GPANNA"));
    }

    #[test]
    fn test_name_decomposition() {
        let adt = adt("ROL|1|AD|FHCP|77^GP^ANNA^MARIA JOSE\r");
        let practitioner = &map_practitioners(&adt)[0];
        let name = &practitioner.name[0];
        assert_eq!(name.use_.as_deref(), Some("usual"));
        assert_eq!(name.family.as_deref(), Some("GP"));
        assert_eq!(name.given, vec!["ANNA", "MARIA", "JOSE"]);
    }

    #[test]
    fn test_mechanographic_namespace_remaps_to_rhv() {
        let adt = adt("ROL|1|AD|FHCP|77^GP^ANNA^^^^^^N.Mecanográfico^^^^EI\r");
        let practitioner = &map_practitioners(&adt)[0];
        let identifier = &practitioner.identifier[0];
        assert_eq!(identifier.system.as_deref(), Some("RHV"));
        assert_eq!(identifier.value.as_deref(), Some("77"));
        // EI only maps for the SONHO and MEI authorities
        assert!(identifier.type_.is_none());
    }

    #[test]
    fn test_identifier_type_table() {
        let adt = adt("ROL|1|AD|FHCP|77^GP^ANNA^^^^^^SONHO^^^^EI\r");
        let practitioner = &map_practitioners(&adt)[0];
        let type_ = practitioner.identifier[0].type_.as_ref().unwrap();
        assert_eq!(type_.coding[0].code.as_deref(), Some("EI"));
    }
}
