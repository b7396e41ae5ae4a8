//! Configuration schema types
//!
//! This module defines the configuration structure for Hermes. Each section
//! maps to a table in the TOML file and validates itself; validation errors
//! carry the offending key so operators can fix the file without reading
//! code.

use serde::{Deserialize, Serialize};

/// Main Hermes configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HermesConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// MLLP listener settings
    pub tcp: TcpConfig,

    /// Kafka egress settings
    pub kafka: KafkaConfig,

    /// HL7 parser settings
    #[serde(default)]
    pub hl7: Hl7Config,

    /// Operating healthcare organization
    pub organization: OrganizationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HermesConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.tcp.validate()?;
        self.kafka.validate()?;
        self.hl7.validate()?;
        self.organization.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// MLLP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl TcpConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("tcp.host must not be empty".to_string());
        }
        Ok(())
    }
}

/// Kafka egress configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Comma-separated broker list
    pub bootstrap_servers: String,

    /// Topic receiving raw inbound payloads
    pub request_in_topic: String,

    /// Topic receiving FHIR transaction bundles
    pub fhir_transactions_topic: String,

    /// Topic receiving parse exceptions
    pub exceptions_topic: String,

    /// Producer delivery timeout in milliseconds
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

impl KafkaConfig {
    fn validate(&self) -> Result<(), String> {
        if self.bootstrap_servers.is_empty() {
            return Err("kafka.bootstrap_servers must not be empty".to_string());
        }
        for (key, topic) in [
            ("kafka.request_in_topic", &self.request_in_topic),
            ("kafka.fhir_transactions_topic", &self.fhir_transactions_topic),
            ("kafka.exceptions_topic", &self.exceptions_topic),
        ] {
            if topic.is_empty() {
                return Err(format!("{key} must not be empty"));
            }
        }
        Ok(())
    }
}

/// HL7 parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hl7Config {
    /// Protocol version stamped on synthesized acknowledgments
    #[serde(default = "default_parser_version")]
    pub parser_version: String,
}

impl Default for Hl7Config {
    fn default() -> Self {
        Hl7Config {
            parser_version: default_parser_version(),
        }
    }
}

impl Hl7Config {
    fn validate(&self) -> Result<(), String> {
        if self.parser_version.is_empty() {
            return Err("hl7.parser_version must not be empty".to_string());
        }
        Ok(())
    }
}

/// Operating healthcare organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    /// Organization code; becomes the managing organization of every patient
    pub code: String,

    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Security-label code system applied on merge/move events
    #[serde(default = "default_confidentiality_system")]
    pub confidentiality_system: String,

    /// Security-label code applied on merge/move events
    #[serde(default = "default_confidentiality_code")]
    pub confidentiality_code: String,
}

impl OrganizationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.code.is_empty() {
            return Err("organization.code must not be empty".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable the rolling file sink
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory receiving log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation period: daily or hourly
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path must not be empty when file logging is enabled".to_string());
        }
        if !["daily", "hourly"].contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be daily or hourly",
                self.local_rotation
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_message_timeout_ms() -> u64 {
    5000
}

fn default_parser_version() -> String {
    "2.5".to_string()
}

fn default_confidentiality_system() -> String {
    "http://terminology.hl7.org/CodeSystem/v3-Confidentiality".to_string()
}

fn default_confidentiality_code() -> String {
    "N".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HermesConfig {
        HermesConfig {
            application: ApplicationConfig::default(),
            tcp: TcpConfig {
                host: "0.0.0.0".to_string(),
                port: 2575,
            },
            kafka: KafkaConfig {
                bootstrap_servers: "localhost:9092".to_string(),
                request_in_topic: "hl7.request-in".to_string(),
                fhir_transactions_topic: "fhir.transactions".to_string(),
                exceptions_topic: "fhir.exceptions".to_string(),
                message_timeout_ms: 5000,
            },
            hl7: Hl7Config::default(),
            organization: OrganizationConfig {
                code: "HOSP01".to_string(),
                name: Some("Hospital Example".to_string()),
                confidentiality_system: default_confidentiality_system(),
                confidentiality_code: default_confidentiality_code(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_fails() {
        let mut config = config();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("log_level"));
    }

    #[test]
    fn test_empty_topic_fails() {
        let mut config = config();
        config.kafka.request_in_topic = String::new();
        assert!(config
            .validate()
            .unwrap_err()
            .contains("request_in_topic"));
    }

    #[test]
    fn test_empty_organization_code_fails() {
        let mut config = config();
        config.organization.code = String::new();
        assert!(config.validate().unwrap_err().contains("organization.code"));
    }

    #[test]
    fn test_defaults() {
        let hl7 = Hl7Config::default();
        assert_eq!(hl7.parser_version, "2.5");
        let logging = LoggingConfig::default();
        assert!(!logging.local_enabled);
        assert_eq!(logging.local_rotation, "daily");
    }
}
