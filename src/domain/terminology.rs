//! Terminology tables
//!
//! Static enumerations bridging HL7 v2 table values and FHIR code systems:
//! identifier types, administrative gender, marital status, address and
//! telecom classifications, next-of-kin relationships, assigning authorities,
//! and the extension URIs used on emitted resources. Each enum offers
//! code↔code lookups (`from_hl7`) and the FHIR rendering (`code`/`system`/
//! `display`).

/// FHIR code system and identifier system URIs
pub mod systems {
    /// HL7 v2 table 0203 (identifier type)
    pub const V2_0203: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
    /// HL7 v2 table 0131 (contact role)
    pub const V2_0131: &str = "http://terminology.hl7.org/CodeSystem/v2-0131";
    /// HL7 v3 RoleCode
    pub const V3_ROLE_CODE: &str = "http://terminology.hl7.org/CodeSystem/v3-RoleCode";
    /// HL7 v3 marital status
    pub const V3_MARITAL_STATUS: &str = "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus";
    /// HL7 v3 confidentiality (patient security labels)
    pub const V3_CONFIDENTIALITY: &str =
        "http://terminology.hl7.org/CodeSystem/v3-Confidentiality";
    /// Portuguese national statistics institute (geographic codes)
    pub const INE: &str = "http://www.ine.pt";
}

/// Extension URIs carried on emitted resources
pub mod extensions {
    /// Geographic decomposition of an address (county/municipality/parish)
    pub const ADDRESS: &str = "http://spms.min-saude.pt/iop/extensions/address-geographic";
    /// Decomposed birth place
    pub const BIRTH_PLACE: &str = "http://spms.min-saude.pt/iop/extensions/birth-place";
    /// Patient nationality
    pub const NATIONALITY: &str = "http://spms.min-saude.pt/iop/extensions/nationality";
    /// Free-text clinical/administrative notes attached to the patient
    pub const PATIENT_NOTES: &str = "http://spms.min-saude.pt/iop/extensions/patient-notes";

    /// Sub-extension URLs within [`ADDRESS`] and [`BIRTH_PLACE`]
    pub const SUB_ADDRESS_TYPE: &str = "addressType";
    pub const SUB_COUNTRY: &str = "country";
    pub const SUB_COUNTY: &str = "county";
    pub const SUB_MUNICIPALITY: &str = "municipality";
    pub const SUB_PARISH: &str = "parish";
}

/// Assigning authorities recognized by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Hospital patient-administration system
    Sonho,
    /// Human-resources registry (practitioner mechanographic numbers)
    Rhv,
    /// Central administration of the health system (organization codes)
    Acss,
    /// Medical council registry
    Mei,
}

impl Authority {
    /// Identifier system string as carried on FHIR identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Authority::Sonho => "SONHO",
            Authority::Rhv => "RHV",
            Authority::Acss => "ACSS",
            Authority::Mei => "MEI",
        }
    }
}

/// Patient identifier types: HL7 table 0203 codes as used by the sending
/// system, mapped onto the FHIR v2-0203 vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    /// NS — internal patient number
    PatientInternal,
    /// SNS — national health service number
    HealthCard,
    /// B — citizen card
    CitizenCard,
    /// NIF — tax number
    Tax,
    /// NISS — social security number
    SocialSecurity,
    /// P — passport
    Passport,
    /// C — birth certificate
    BirthCertificate,
    /// PRC — permanent resident card
    ResidentCard,
}

impl IdentifierType {
    /// Looks up the type for an HL7 CX-5 code. Unknown codes yield `None`
    /// and the identifier is emitted without a type.
    pub fn from_hl7(code: &str) -> Option<Self> {
        match code {
            "NS" => Some(IdentifierType::PatientInternal),
            "SNS" => Some(IdentifierType::HealthCard),
            "B" => Some(IdentifierType::CitizenCard),
            "NIF" => Some(IdentifierType::Tax),
            "NISS" => Some(IdentifierType::SocialSecurity),
            "P" => Some(IdentifierType::Passport),
            "C" => Some(IdentifierType::BirthCertificate),
            "PRC" => Some(IdentifierType::ResidentCard),
            _ => None,
        }
    }

    /// FHIR v2-0203 code.
    pub fn code(self) -> &'static str {
        match self {
            IdentifierType::PatientInternal => "PI",
            IdentifierType::HealthCard => "HC",
            IdentifierType::CitizenCard => "CZ",
            IdentifierType::Tax => "TAX",
            IdentifierType::SocialSecurity => "SS",
            IdentifierType::Passport => "PPN",
            IdentifierType::BirthCertificate => "BCFN",
            IdentifierType::ResidentCard => "PRC",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            IdentifierType::PatientInternal => "Patient internal identifier",
            IdentifierType::HealthCard => "Health card number",
            IdentifierType::CitizenCard => "Citizenship card",
            IdentifierType::Tax => "Tax ID number",
            IdentifierType::SocialSecurity => "Social security number",
            IdentifierType::Passport => "Passport number",
            IdentifierType::BirthCertificate => "Birth certificate file number",
            IdentifierType::ResidentCard => "Permanent resident card number",
        }
    }
}

/// Administrative gender (PID-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    /// Maps an HL7 administrative-sex code. Codes outside the table yield
    /// `None`; the patient mapper treats that as a hard error so the caller
    /// notices unexpected source data.
    pub fn from_hl7(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            "A" => Some(Gender::Other),
            "U" => Some(Gender::Unknown),
            _ => None,
        }
    }

    /// FHIR administrative-gender code.
    pub fn to_wire(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

/// Marital status (PID-16), rendered on the v3-MaritalStatus code system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaritalStatus {
    pub code: &'static str,
    pub display: &'static str,
}

impl MaritalStatus {
    pub fn from_hl7(code: &str) -> Option<Self> {
        let (code, display) = match code {
            "A" => ("A", "Annulled"),
            "D" => ("D", "Divorced"),
            "I" => ("I", "Interlocutory"),
            "L" => ("L", "Legally Separated"),
            "M" => ("M", "Married"),
            "P" => ("P", "Polygamous"),
            "S" => ("S", "Never Married"),
            "T" => ("T", "Domestic partner"),
            "U" => ("U", "unmarried"),
            "W" => ("W", "Widowed"),
            _ => return None,
        };
        Some(MaritalStatus { code, display })
    }
}

/// Address classification derived from XAD-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// C — current address, postal only
    Current,
    /// O — office address
    Office,
    /// N, MA, M and anything else — main address
    Main,
}

impl AddressKind {
    pub fn from_hl7(code: &str) -> Self {
        match code {
            "C" => AddressKind::Current,
            "O" => AddressKind::Office,
            _ => AddressKind::Main,
        }
    }

    /// FHIR `Address.use`, when one applies.
    pub fn address_use(self) -> Option<&'static str> {
        match self {
            AddressKind::Current => None,
            AddressKind::Office => Some("work"),
            AddressKind::Main => Some("home"),
        }
    }

    /// FHIR `Address.type`.
    pub fn address_type(self) -> &'static str {
        match self {
            AddressKind::Current => "postal",
            AddressKind::Office => "both",
            AddressKind::Main => "both",
        }
    }

    /// Code carried in the geographic extension's address-type sub-extension.
    pub fn geographic_code(self) -> &'static str {
        match self {
            AddressKind::Current => "CURRENT",
            AddressKind::Office => "OFFICE",
            AddressKind::Main => "MAIN_ADDRESS",
        }
    }
}

/// Telecom system derived from XTN-3 equipment type.
pub fn telecom_system(equipment: &str) -> &'static str {
    match equipment {
        "PH" | "CP" => "phone",
        "X400" => "email",
        "FX" => "fax",
        _ => "other",
    }
}

/// Telecom use derived from XTN-2 use code, refined by equipment type:
/// a personal number on a cell phone is a mobile contact.
pub fn telecom_use(use_code: &str, equipment: &str) -> Option<&'static str> {
    match use_code {
        "PRN" if equipment == "CP" => Some("mobile"),
        "PRN" => Some("home"),
        "WPN" => Some("work"),
        "EMR" => Some("mobile"),
        _ => None,
    }
}

/// Next-of-kin relationship coding (NK1-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub system: &'static str,
    pub code: &'static str,
    pub display: &'static str,
}

impl Relationship {
    /// Looks up the coding for an NK1-3 code. Unknown codes yield `None`;
    /// callers fall back to [`Relationship::other`] with a warning.
    pub fn from_hl7(code: &str) -> Option<Self> {
        let (system, code, display) = match code {
            "FTH" => (systems::V3_ROLE_CODE, "FTH", "father"),
            "MTH" => (systems::V3_ROLE_CODE, "MTH", "mother"),
            "SPO" => (systems::V3_ROLE_CODE, "SPS", "spouse"),
            "EXF" => (systems::V3_ROLE_CODE, "FAMMEMB", "family member"),
            "EMC" => (systems::V2_0131, "C", "Emergency Contact"),
            "OTH" => (systems::V2_0131, "O", "Other"),
            "SEL" => (systems::V3_ROLE_CODE, "ONESELF", "self"),
            _ => return None,
        };
        Some(Relationship {
            system,
            code,
            display,
        })
    }

    /// Fallback coding for unrecognized relationship codes.
    pub fn other() -> Self {
        Relationship {
            system: systems::V2_0131,
            code: "O",
            display: "Other",
        }
    }
}

/// Practitioner identifier types, resolved from the XCN-13 type code and the
/// assigning-authority namespace.
pub fn practitioner_identifier_type(type_code: &str, namespace: &str) -> Option<&'static str> {
    match (type_code, namespace) {
        ("EI", "SONHO") => Some("EI"),
        ("EI", "MEI") => Some("MEI"),
        ("MD", _) => Some("MD"),
        ("NP", _) => Some("NP"),
        _ => None,
    }
}
