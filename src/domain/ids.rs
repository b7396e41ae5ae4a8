//! Deterministic resource identifiers
//!
//! FHIR resources emitted by the gateway carry stable logical ids so that the
//! downstream FHIR server sees the same entity under the same id across runs
//! and re-submissions. Ids are name-based UUIDs: the MD5 digest of the source
//! identifier bytes with RFC 4122 version-3 and IETF-variant bits applied, and
//! no namespace prepended. This matches the id scheme of records already
//! present downstream, so the exact algorithm must not change.
//!
//! All ids are rendered as lower-case hyphenated hex, e.g.
//! `827ccb0e-ea8a-306c-8c34-a16891f84e7b`.

use md5::{Digest, Md5};
use uuid::Uuid;

/// Derives a stable, name-based UUID from the given bytes.
///
/// The same input always yields the same UUID. Use this for ids derived from
/// source-system identifiers (patient numbers, organization codes, plan ids).
pub fn deterministic_uuid(name: &[u8]) -> Uuid {
    let digest: [u8; 16] = Md5::digest(name).into();
    uuid::Builder::from_md5_bytes(digest).into_uuid()
}

/// Derives a stable resource id string (lower-case hyphenated) from a source
/// identifier.
pub fn deterministic_id(name: &str) -> String {
    deterministic_uuid(name.as_bytes()).to_string()
}

/// Mints a fresh random (v4) resource id string, lower-case hyphenated.
///
/// Used when the source message carries no identifier to derive from.
pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}
