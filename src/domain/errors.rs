//! Domain error types
//!
//! This module defines the error hierarchy for Hermes. All errors are
//! domain-specific and don't expose third-party types. Protocol-level parse
//! failures are not errors in this sense: they are modelled as
//! [`crate::core::parser::InternalErrorData`] because the gateway answers
//! them with a CE acknowledgment and keeps running.

use thiserror::Error;

/// Main Hermes error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum HermesError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// MLLP framing violations (missing start byte, buffer overrun)
    #[error("Framing error: {0}")]
    Framing(String),

    /// HL7 decoding errors
    #[error("HL7 parse error: {0}")]
    Hl7(#[from] Hl7Error),

    /// HL7-to-FHIR projection errors
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Kafka publish errors
    #[error("Publish error: {0}")]
    Publish(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// HL7 v2 decoding errors
///
/// Errors raised while decoding a pipe-delimited message into the typed
/// model. These surface to senders as CE acknowledgments.
#[derive(Debug, Error)]
pub enum Hl7Error {
    /// The payload is empty or contains no segments
    #[error("Empty message")]
    Empty,

    /// The first segment is not a message header
    #[error("Message does not start with MSH: {0}")]
    MissingHeader(String),

    /// The MSH segment is structurally invalid
    #[error("Invalid MSH segment: {0}")]
    InvalidHeader(String),

    /// A segment identifier is not three characters
    #[error("Invalid segment identifier: {0}")]
    InvalidSegment(String),

    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for HermesError {
    fn from(err: std::io::Error) -> Self {
        HermesError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for HermesError {
    fn from(err: serde_json::Error) -> Self {
        HermesError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for HermesError {
    fn from(err: toml::de::Error) -> Self {
        HermesError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hermes_error_display() {
        let err = HermesError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_hl7_error_conversion() {
        let hl7_err = Hl7Error::MissingHeader("PID|1".to_string());
        let err: HermesError = hl7_err.into();
        assert!(matches!(err, HermesError::Hl7(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: HermesError = io_err.into();
        assert!(matches!(err, HermesError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: HermesError = json_err.into();
        assert!(matches!(err, HermesError::Serialization(_)));
    }

    #[test]
    fn test_hermes_error_implements_std_error() {
        let err = HermesError::Framing("no start byte".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
