// Hermes - HL7 v2 MLLP to FHIR R5 Ingestion Gateway
// Copyright (c) 2025 Hermes Contributors
// Licensed under the MIT License

//! # Hermes - HL7 v2 MLLP to FHIR R5 Ingestion Gateway
//!
//! Hermes accepts HL7 v2.5 ADT messages over long-lived TCP connections
//! framed by the Minimal Lower Layer Protocol, translates new-patient
//! registrations (ADT^A28) into FHIR R5 transaction bundles, publishes the
//! bundles to Kafka, and answers every frame with an MLLP-framed
//! acknowledgment.
//!
//! ## Architecture
//!
//! Hermes follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (frame parsing, dispatch, HL7-to-FHIR mapping)
//! - [`adapters`] - External integrations (MLLP transport, Kafka egress)
//! - [`domain`] - Core domain types (HL7 model, FHIR model, terminology)
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Message flow
//!
//! ```text
//! TCP bytes -> MLLP framing -> HL7 parse -> trigger dispatch
//!                  |               |              |
//!                  v               v              v
//!            ACK write-back   CA/CE ACK     FHIR Bundle -> Kafka
//! ```
//!
//! Each TCP connection is served by its own task owning its receive buffer
//! and flow-control state. Buffering is watermark-based: reads suspend above
//! the high watermark and resume once acknowledged frames drain the buffer
//! below the low watermark.
//!
//! ## Idempotency
//!
//! Emitted resources carry deterministic ids (name-based UUIDs of the source
//! identifiers) and conditional-create selectors, so re-submitting a message
//! is idempotent on the receiving FHIR server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hermes::adapters::kafka::{KafkaPublisher, MessagePublisher, Topics};
//! use hermes::adapters::mllp::{ConnectionDeps, MllpServer};
//! use hermes::config::load_config;
//! use hermes::core::dispatch::OperationRegistry;
//! use hermes::core::mapping::MappingContext;
//! use hermes::core::parser::MessageParser;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("hermes.toml")?;
//!
//!     let parser = Arc::new(MessageParser::new(&config.hl7.parser_version));
//!     let publisher: Arc<dyn MessagePublisher> =
//!         Arc::new(KafkaPublisher::new(&config.kafka)?);
//!     let topics = Topics::from_config(&config.kafka);
//!     let context = MappingContext {
//!         organization_code: config.organization.code.clone(),
//!         organization_name: config.organization.name.clone(),
//!         confidentiality_system: config.organization.confidentiality_system.clone(),
//!         confidentiality_code: config.organization.confidentiality_code.clone(),
//!     };
//!     let registry = Arc::new(OperationRegistry::new(
//!         parser.clone(),
//!         context,
//!         publisher.clone(),
//!         topics.clone(),
//!     ));
//!     let deps = Arc::new(ConnectionDeps { parser, registry, publisher, topics });
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let server = MllpServer::bind(&config.tcp, deps).await?;
//!     server.serve(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
