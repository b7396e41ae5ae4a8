//! Check command - offline transformation of an HL7 file
//!
//! Reads a file containing one HL7 message (segment separators may be CR or
//! LF), runs it through the same parse-and-map pipeline the gateway uses,
//! and prints the resulting transaction bundle. Useful for verifying
//! mappings without a running listener or broker.

use clap::Args;

use crate::config::load_config;
use crate::core::mapping::{self, MappingContext};
use crate::core::parser::MessageParser;
use crate::domain::hl7::encoding;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to a file containing one HL7 message
    pub file: String,
}

impl CheckArgs {
    /// Transforms the file and prints the bundle JSON. Returns the exit code.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;
        let bytes = std::fs::read(&self.file)?;
        let text = encoding::decode_frame(&bytes);

        let parser = MessageParser::new(&config.hl7.parser_version);
        let inbound = match parser.parse(&text) {
            Ok(inbound) => inbound,
            Err(error_data) => {
                eprintln!("✗ Message rejected ({:?})", error_data.error);
                eprintln!("  Acknowledgment: {}", error_data.exception_ack_msg.replace('\r', " "));
                return Ok(3);
            }
        };

        if inbound.trigger_event != "A28" {
            println!(
                "Message accepted (trigger {}), but only A28 produces a bundle",
                inbound.trigger_event
            );
            return Ok(0);
        }

        let context = MappingContext {
            organization_code: config.organization.code.clone(),
            organization_name: config.organization.name.clone(),
            confidentiality_system: config.organization.confidentiality_system.clone(),
            confidentiality_code: config.organization.confidentiality_code.clone(),
        };
        let data = parser.second_pass(inbound.msg.as_deref().unwrap_or(&text))?;
        let bundle = mapping::build_transaction(&data.parsed_data, &context)?;
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        Ok(0)
    }
}
