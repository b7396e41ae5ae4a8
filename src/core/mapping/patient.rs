//! Patient projection
//!
//! Builds the `Patient` resource from EVN, PID, OBX, ROL and NK1 segments.
//! The mapping policy is local recovery: anything that can be skipped (a bad
//! address, an empty name) is logged and skipped, while data that signals a
//! source defect (an unknown administrative-sex code) fails the mapping so
//! the operator notices.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::mapping::{practitioner, MappingContext};
use crate::domain::fhir::types::{
    Address, Annotation, CodeableConcept, Coding, ContactPoint, Extension, HumanName, Identifier,
    Meta, Reference,
};
use crate::domain::fhir::{Patient, PatientContact};
use crate::domain::hl7::message::{Repeat, Segment};
use crate::domain::hl7::{datetime, AdtA05};
use crate::domain::terminology::{
    self, extensions, systems, AddressKind, Gender, IdentifierType, MaritalStatus, Relationship,
};
use crate::domain::{ids, HermesError, Result};

fn postal_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{3}$").expect("valid postal pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

/// Projects the patient resource for a registration message.
pub fn map_patient(adt: &AdtA05, context: &MappingContext) -> Result<Patient> {
    let pid = adt.pid();

    let mut patient = Patient::new(patient_id(pid));
    patient.meta = build_meta(adt, context);
    patient.identifier = map_identifiers(pid);
    patient.name = map_names(pid);
    patient.birth_date = datetime::to_iso_date(pid.value(7));
    patient.gender = map_gender(pid.value(8))?;
    patient.address = map_addresses(pid);
    map_birth_place(pid, &mut patient.extension);
    map_nationality(pid, &mut patient.extension);
    map_deceased(pid, &mut patient);
    patient.telecom = map_telecom(pid);
    patient.marital_status = map_marital_status(pid);
    map_general_practitioner(adt, &mut patient);
    patient.managing_organization = Some(Reference::to(
        "Organization",
        &ids::deterministic_id(&context.organization_code),
    ));
    map_notes(adt, &mut patient.extension);
    map_contacts(adt, &mut patient);

    Ok(patient)
}

/// Stable patient id: the name-based UUID of the SONHO identifier number,
/// or a random id when the message carries none.
fn patient_id(pid: &Segment) -> String {
    let sonho = pid
        .field(3)
        .into_iter()
        .flat_map(|f| f.repeats())
        .find(|r| r.component(4) == terminology::Authority::Sonho.as_str());
    match sonho {
        Some(cx) if !cx.value().is_empty() => ids::deterministic_id(cx.value()),
        _ => {
            tracing::warn!("Patient has no SONHO identifier, minting a random id");
            ids::random_id()
        }
    }
}

fn build_meta(adt: &AdtA05, context: &MappingContext) -> Option<Meta> {
    let evn = adt.evn()?;
    let mut meta = Meta {
        last_updated: datetime::to_iso_datetime(evn.value(2)),
        security: Vec::new(),
    };
    // Merge and move events carry a confidentiality label.
    if matches!(evn.value(1), "A40" | "A45") {
        meta.security.push(
            Coding::new(
                context.confidentiality_system.clone(),
                context.confidentiality_code.clone(),
            ),
        );
    }
    if meta.last_updated.is_none() && meta.security.is_empty() {
        return None;
    }
    Some(meta)
}

fn map_identifiers(pid: &Segment) -> Vec<Identifier> {
    let mut identifiers = Vec::new();
    for cx in pid.field(3).into_iter().flat_map(|f| f.repeats()) {
        if cx.value().is_empty() {
            continue;
        }
        let mut identifier = Identifier {
            value: Some(cx.value().to_string()),
            ..Identifier::default()
        };
        if !cx.component(4).is_empty() {
            identifier.system = Some(cx.component(4).to_string());
        }
        if let Some(type_) = IdentifierType::from_hl7(cx.component(5)) {
            identifier.type_ = Some(CodeableConcept::from_coding(
                Coding::new(systems::V2_0203, type_.code()).with_display(type_.display()),
            ));
        }
        identifiers.push(identifier);
    }

    // The patient account number rides separately in PID-18.
    if let Some(account) = pid.field(18) {
        if !account.value().is_empty() {
            let mut identifier = Identifier {
                value: Some(account.value().to_string()),
                ..Identifier::default()
            };
            if !account.component(4).is_empty() {
                identifier.system = Some(account.component(4).to_string());
            }
            identifier.type_ = Some(CodeableConcept::from_coding(
                Coding::new(systems::V2_0203, "MR").with_display("Medical record number"),
            ));
            identifiers.push(identifier);
        }
    }

    identifiers
}

fn map_names(pid: &Segment) -> Vec<HumanName> {
    pid.field(5)
        .into_iter()
        .flat_map(|f| f.repeats())
        .filter(|xpn| !xpn.is_empty())
        .map(build_name)
        .collect()
}

fn build_name(xpn: &Repeat) -> HumanName {
    let mut given = Vec::new();
    if !xpn.component(2).is_empty() {
        given.push(xpn.component(2).to_string());
    }
    given.extend(
        xpn.component(3)
            .split_whitespace()
            .map(str::to_string),
    );
    HumanName {
        use_: (xpn.component(7) == "L").then(|| "official".to_string()),
        family: match xpn.subcomponent(1, 1) {
            "" => None,
            family => Some(family.to_string()),
        },
        given,
    }
}

fn map_gender(code: &str) -> Result<Option<String>> {
    if code.is_empty() {
        return Ok(None);
    }
    match Gender::from_hl7(code) {
        Some(gender) => Ok(Some(gender.to_wire().to_string())),
        None => Err(HermesError::Mapping(format!(
            "Unknown administrative sex code {code}"
        ))),
    }
}

fn map_addresses(pid: &Segment) -> Vec<Address> {
    pid.field(11)
        .into_iter()
        .flat_map(|f| f.repeats())
        .filter(|xad| !xad.is_empty())
        .filter_map(build_address)
        .collect()
}

/// Builds one address from an XAD, applying the Portuguese postal-code rule.
/// Shared with next-of-kin contact addresses. Returns `None` when the
/// address must be dropped; the message itself never fails over an address.
pub(super) fn build_address(xad: &Repeat) -> Option<Address> {
    let country = match xad.component(6) {
        "PRT" | "PT" => "PT",
        other => other,
    };
    let postal_code = xad.component(5);

    if country == "PT" {
        if !postal_code_pattern().is_match(postal_code) {
            tracing::warn!(postal_code, "Invalid postal code, dropping address");
            return None;
        }
    } else if postal_code == "-" {
        tracing::warn!(country, "Placeholder postal code, dropping address");
        return None;
    }

    let kind = AddressKind::from_hl7(xad.component(7));

    let mut line = Vec::new();
    if !xad.subcomponent(1, 1).is_empty() {
        line.push(xad.subcomponent(1, 1).to_string());
    }
    if !xad.component(2).is_empty() {
        line.push(xad.component(2).to_string());
    }

    let mut address = Address {
        use_: kind.address_use().map(str::to_string),
        type_: Some(kind.address_type().to_string()),
        line,
        city: non_empty(xad.component(3)),
        district: non_empty(xad.component(4)),
        postal_code: non_empty(postal_code),
        country: non_empty(country),
        extension: Vec::new(),
    };

    let mut sub = vec![Extension::codeable(
        extensions::SUB_ADDRESS_TYPE,
        CodeableConcept::from_coding(Coding {
            system: None,
            code: Some(kind.geographic_code().to_string()),
            display: None,
        }),
    )];
    let census = xad.component(9);
    if let Some(county) = census.get(..2) {
        sub.push(ine_sub_extension(extensions::SUB_COUNTY, county));
    }
    if let Some(municipality) = census.get(..4) {
        sub.push(ine_sub_extension(extensions::SUB_MUNICIPALITY, municipality));
    }
    if !census.is_empty() {
        sub.push(ine_sub_extension(extensions::SUB_PARISH, census));
    }
    address
        .extension
        .push(Extension::nested(extensions::ADDRESS, sub));

    Some(address)
}

fn ine_sub_extension(url: &str, code: &str) -> Extension {
    Extension::codeable(
        url,
        CodeableConcept::from_coding(Coding::new(systems::INE, code)),
    )
}

/// Decomposes PID-23 into country/county/municipality/parish sub-extensions.
fn map_birth_place(pid: &Segment, extension: &mut Vec<Extension>) {
    let birth_place = pid.value(23);
    if birth_place.is_empty() {
        return;
    }
    let tokens: Vec<&str> = birth_place.split_whitespace().collect();
    let mut sub = vec![ine_sub_extension(extensions::SUB_COUNTRY, tokens[0])];

    for (position, token) in tokens.iter().enumerate().skip(1).take(2) {
        let county = token.get(..2);
        let municipality = token.get(..4);
        match token.len() {
            6 => {
                if let Some(county) = county {
                    sub.push(ine_sub_extension(extensions::SUB_COUNTY, county));
                }
                if let Some(municipality) = municipality {
                    sub.push(ine_sub_extension(extensions::SUB_MUNICIPALITY, municipality));
                }
                // the third token carries the full parish code
                if position == 2 {
                    sub.push(ine_sub_extension(extensions::SUB_PARISH, token));
                }
            }
            4 => {
                if let Some(county) = county {
                    sub.push(ine_sub_extension(extensions::SUB_COUNTY, county));
                }
                if let Some(municipality) = municipality {
                    sub.push(ine_sub_extension(extensions::SUB_MUNICIPALITY, municipality));
                }
            }
            2 => sub.push(ine_sub_extension(extensions::SUB_COUNTY, token)),
            _ => {}
        }
    }

    extension.push(Extension::nested(extensions::BIRTH_PLACE, sub));
}

fn map_nationality(pid: &Segment, extension: &mut Vec<Extension>) {
    for ce in pid.field(26).into_iter().flat_map(|f| f.repeats()) {
        if ce.value().is_empty() {
            continue;
        }
        let mut coding = Coding::new(systems::INE, ce.value());
        if !ce.component(2).is_empty() {
            coding = coding.with_display(ce.component(2));
        }
        extension.push(Extension::codeable(
            extensions::NATIONALITY,
            CodeableConcept::from_coding(coding),
        ));
    }
}

fn map_deceased(pid: &Segment, patient: &mut Patient) {
    let death_date = pid.value(29);
    if !death_date.is_empty() {
        patient.deceased_date_time = datetime::to_iso_datetime(death_date);
        if patient.deceased_date_time.is_some() {
            return;
        }
        tracing::warn!(death_date, "Unparseable death date, falling back to PID-30");
    }
    match pid.value(30) {
        "Y" => patient.deceased_boolean = Some(true),
        "N" => patient.deceased_boolean = Some(false),
        _ => {}
    }
}

fn map_telecom(pid: &Segment) -> Vec<ContactPoint> {
    let mut telecom = Vec::new();
    for field in [13, 14] {
        for xtn in pid.field(field).into_iter().flat_map(|f| f.repeats()) {
            if let Some(point) = build_contact_point(xtn) {
                telecom.push(point);
            }
        }
    }
    if let Some(first) = telecom.first_mut() {
        first.rank = Some(1);
    }
    telecom
}

/// Builds one contact point from an XTN: the unformatted phone number when
/// present, otherwise a syntactically valid email address. Shared with
/// next-of-kin contacts.
pub(super) fn build_contact_point(xtn: &Repeat) -> Option<ContactPoint> {
    let phone = xtn.component(12);
    let email = xtn.component(4);
    let value = if !phone.is_empty() {
        phone
    } else if email_pattern().is_match(email) {
        email
    } else {
        return None;
    };

    let equipment = xtn.component(3);
    Some(ContactPoint {
        system: Some(terminology::telecom_system(equipment).to_string()),
        value: Some(value.to_string()),
        use_: terminology::telecom_use(xtn.component(2), equipment).map(str::to_string),
        rank: None,
    })
}

fn map_marital_status(pid: &Segment) -> Option<CodeableConcept> {
    let code = pid.value(16);
    if code.is_empty() {
        return None;
    }
    match MaritalStatus::from_hl7(code) {
        Some(status) => Some(CodeableConcept::from_coding(
            Coding::new(systems::V3_MARITAL_STATUS, status.code).with_display(status.display),
        )),
        None => {
            tracing::debug!(code, "Unmapped marital status code");
            None
        }
    }
}

/// Adds general-practitioner references for family-health roles: the
/// practitioner itself, and the primary-care unit when the role names one.
fn map_general_practitioner(adt: &AdtA05, patient: &mut Patient) {
    for rol in adt.rol() {
        if rol.value(3) != "FHCP" {
            continue;
        }
        let practitioner_id = practitioner::rol_practitioner_id(rol);
        patient
            .general_practitioner
            .push(Reference::to("Practitioner", &practitioner_id));

        let unit = rol.value(10);
        if !unit.is_empty() {
            patient
                .general_practitioner
                .push(Reference::to("Organization", &ids::deterministic_id(unit)));
        }
    }
}

/// Appends one note extension per observation with a value.
fn map_notes(adt: &AdtA05, extension: &mut Vec<Extension>) {
    for obx in adt.obx() {
        let text = obx.value(5);
        if text.is_empty() {
            continue;
        }
        extension.push(Extension::annotation(
            extensions::PATIENT_NOTES,
            Annotation {
                text: text.to_string(),
                time: datetime::to_iso_datetime(obx.value(14)),
            },
        ));
    }
}

fn map_contacts(adt: &AdtA05, patient: &mut Patient) {
    let mut patient_has_ranked = patient.telecom.iter().any(|t| t.rank.is_some());
    for nk1 in adt.nk1() {
        let relationship = match Relationship::from_hl7(nk1.value(3)) {
            Some(relationship) => relationship,
            None => {
                tracing::warn!(code = nk1.value(3), "Unknown relationship code");
                Relationship::other()
            }
        };

        let mut contact = PatientContact {
            relationship: vec![CodeableConcept::from_coding(
                Coding::new(relationship.system, relationship.code)
                    .with_display(relationship.display),
            )],
            ..PatientContact::default()
        };

        if let Some(xpn) = nk1.field(2).and_then(|f| f.repeats().first()) {
            if !xpn.is_empty() {
                contact.name = Some(build_name(xpn));
            }
        }

        for xtn in nk1.field(5).into_iter().flat_map(|f| f.repeats()) {
            if let Some(mut point) = build_contact_point(xtn) {
                if !patient_has_ranked {
                    point.rank = Some(1);
                    patient_has_ranked = true;
                }
                contact.telecom.push(point);
            }
        }

        if let Some(xad) = nk1.field(4).and_then(|f| f.repeats().first()) {
            if !xad.is_empty() {
                contact.address = build_address(xad);
            }
        }

        patient.contact.push(contact);
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
