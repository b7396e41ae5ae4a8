//! Validate-config command

use clap::Args;

use crate::config::load_config;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Loads and validates the configuration file. Returns the exit code.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match load_config(config_path) {
            Ok(config) => {
                println!("✓ Configuration is valid");
                println!("  MLLP listener: {}:{}", config.tcp.host, config.tcp.port);
                println!("  Kafka brokers: {}", config.kafka.bootstrap_servers);
                println!("  Organization:  {}", config.organization.code);
                Ok(0)
            }
            Err(e) => {
                eprintln!("✗ Configuration is invalid: {e}");
                Ok(4)
            }
        }
    }
}
