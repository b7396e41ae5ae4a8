//! Configuration management
//!
//! TOML-backed configuration with environment substitution and overrides.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, HermesConfig, Hl7Config, KafkaConfig, LoggingConfig, OrganizationConfig,
    TcpConfig,
};
