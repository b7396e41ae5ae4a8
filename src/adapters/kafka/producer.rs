//! Kafka producer adapter
//!
//! A thin wrapper over an rdkafka [`FutureProducer`]. The producer is
//! process-wide, cheap to clone, and safe to share across connection
//! handlers.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::adapters::kafka::MessagePublisher;
use crate::config::KafkaConfig;
use crate::domain::{HermesError, Result};

/// Publishes records through a shared rdkafka producer.
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Creates the producer from configuration. Fails fast on malformed
    /// settings; broker availability is only observed on first publish.
    pub fn new(config: &KafkaConfig) -> Result<KafkaPublisher> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .map_err(|e| HermesError::Publish(format!("Failed to create producer: {e}")))?;
        Ok(KafkaPublisher { producer })
    }
}

#[async_trait]
impl MessagePublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        match self.producer.send(record, Timeout::Never).await {
            Ok((partition, offset)) => {
                tracing::debug!(topic, key, partition, offset, "Record delivered");
                Ok(())
            }
            Err((e, _)) => Err(HermesError::Publish(format!(
                "Delivery to {topic} failed: {e}"
            ))),
        }
    }
}
