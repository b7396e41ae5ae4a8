//! Serve command - runs the gateway until shutdown

use std::sync::Arc;

use clap::Args;
use tokio::sync::watch;

use crate::adapters::kafka::{KafkaPublisher, MessagePublisher, Topics};
use crate::adapters::mllp::{ConnectionDeps, MllpServer};
use crate::config::load_config;
use crate::core::dispatch::OperationRegistry;
use crate::core::mapping::MappingContext;
use crate::core::parser::MessageParser;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {}

impl ServeArgs {
    /// Runs the gateway. Returns the process exit code.
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;

        let parser = Arc::new(MessageParser::new(&config.hl7.parser_version));
        let publisher: Arc<dyn MessagePublisher> = Arc::new(KafkaPublisher::new(&config.kafka)?);
        let topics = Topics::from_config(&config.kafka);
        let context = MappingContext {
            organization_code: config.organization.code.clone(),
            organization_name: config.organization.name.clone(),
            confidentiality_system: config.organization.confidentiality_system.clone(),
            confidentiality_code: config.organization.confidentiality_code.clone(),
        };
        let registry = Arc::new(OperationRegistry::new(
            parser.clone(),
            context,
            publisher.clone(),
            topics.clone(),
        ));
        let deps = Arc::new(ConnectionDeps {
            parser,
            registry,
            publisher,
            topics,
        });

        // A bind failure is fatal and surfaces as a non-zero exit.
        let server = MllpServer::bind(&config.tcp, deps).await?;
        server.serve(shutdown).await?;

        tracing::info!("Gateway stopped");
        Ok(0)
    }
}
