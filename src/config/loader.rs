//! Configuration loader with TOML parsing and environment variable overrides
//!
//! Loading is a pipeline: read the TOML file, substitute `${VAR}`
//! placeholders from the environment, parse, apply `HERMES_*` overrides, and
//! validate.
//!
//! # Environment Variable Support
//!
//! ## Substitution Syntax (`${VAR}`)
//!
//! Use `${VAR_NAME}` in the TOML file for environment variable substitution:
//!
//! ```toml
//! [kafka]
//! bootstrap_servers = "${KAFKA_BROKERS}"
//! ```
//!
//! ## Override Syntax (`HERMES_*`)
//!
//! Use `HERMES_<SECTION>_<KEY>` environment variables to override a value
//! after the file is parsed:
//!
//! ```bash
//! HERMES_TCP_HOST=127.0.0.1
//! HERMES_TCP_PORT=2575
//! HERMES_KAFKA_BOOTSTRAP_SERVERS=broker-1:9092
//! HERMES_APPLICATION_LOG_LEVEL=debug
//! HERMES_ORGANIZATION_CODE=HOSP01
//! HERMES_HL7_PARSER_VERSION=2.5
//! ```

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::config::schema::HermesConfig;
use crate::domain::{HermesError, Result};

/// Loads configuration from a TOML file
///
/// # Errors
///
/// Returns an error if the file cannot be read, a referenced environment
/// variable is missing, TOML parsing fails, an override has the wrong type,
/// or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<HermesConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HermesError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| HermesError::Configuration(format!("Failed to read {}: {e}", path.display())))?;

    let substituted = substitute_env_vars(&content)?;
    let mut config: HermesConfig = toml::from_str(&substituted)?;
    apply_env_overrides(&mut config)?;

    config
        .validate()
        .map_err(HermesError::Configuration)?;

    Ok(config)
}

/// Replaces `${VAR}` placeholders with environment values.
fn substitute_env_vars(content: &str) -> Result<String> {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid substitution pattern");
    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for capture in pattern.captures_iter(content) {
        let whole = capture.get(0).expect("capture 0 always present");
        let name = &capture[1];
        let value = std::env::var(name).map_err(|_| {
            HermesError::Configuration(format!("Environment variable {name} is not set"))
        })?;
        result.push_str(&content[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&content[last..]);
    Ok(result)
}

/// Applies `HERMES_*` overrides onto a parsed configuration.
fn apply_env_overrides(config: &mut HermesConfig) -> Result<()> {
    if let Ok(value) = std::env::var("HERMES_APPLICATION_LOG_LEVEL") {
        config.application.log_level = value;
    }
    if let Ok(value) = std::env::var("HERMES_TCP_HOST") {
        config.tcp.host = value;
    }
    if let Ok(value) = std::env::var("HERMES_TCP_PORT") {
        config.tcp.port = value.parse().map_err(|_| {
            HermesError::Configuration(format!("HERMES_TCP_PORT is not a port number: {value}"))
        })?;
    }
    if let Ok(value) = std::env::var("HERMES_KAFKA_BOOTSTRAP_SERVERS") {
        config.kafka.bootstrap_servers = value;
    }
    if let Ok(value) = std::env::var("HERMES_KAFKA_REQUEST_IN_TOPIC") {
        config.kafka.request_in_topic = value;
    }
    if let Ok(value) = std::env::var("HERMES_KAFKA_FHIR_TRANSACTIONS_TOPIC") {
        config.kafka.fhir_transactions_topic = value;
    }
    if let Ok(value) = std::env::var("HERMES_KAFKA_EXCEPTIONS_TOPIC") {
        config.kafka.exceptions_topic = value;
    }
    if let Ok(value) = std::env::var("HERMES_HL7_PARSER_VERSION") {
        config.hl7.parser_version = value;
    }
    if let Ok(value) = std::env::var("HERMES_ORGANIZATION_CODE") {
        config.organization.code = value;
    }
    if let Ok(value) = std::env::var("HERMES_ORGANIZATION_NAME") {
        config.organization.name = Some(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BASE: &str = r#"
[tcp]
port = 2575

[kafka]
bootstrap_servers = "localhost:9092"
request_in_topic = "hl7.request-in"
fhir_transactions_topic = "fhir.transactions"
exceptions_topic = "fhir.exceptions"

[organization]
code = "HOSP01"
name = "Hospital Example"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(BASE);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.tcp.port, 2575);
        assert_eq!(config.tcp.host, "0.0.0.0");
        assert_eq!(config.hl7.parser_version, "2.5");
        assert_eq!(config.organization.code, "HOSP01");
        assert_eq!(config.kafka.message_timeout_ms, 5000);
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load_config("does-not-exist.toml").unwrap_err();
        assert!(matches!(err, HermesError::Configuration(_)));
    }

    #[test]
    fn test_invalid_toml_fails() {
        let file = write_config("this = is = not = toml");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("HERMES_TEST_BROKERS", "broker-a:9092");
        let content = BASE.replace("localhost:9092", "${HERMES_TEST_BROKERS}");
        let file = write_config(&content);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.kafka.bootstrap_servers, "broker-a:9092");
        std::env::remove_var("HERMES_TEST_BROKERS");
    }

    #[test]
    fn test_missing_env_substitution_fails() {
        let content = BASE.replace("localhost:9092", "${HERMES_TEST_UNSET_VARIABLE}");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("HERMES_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let content = BASE.replace("code = \"HOSP01\"", "code = \"\"");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("organization.code"));
    }
}
