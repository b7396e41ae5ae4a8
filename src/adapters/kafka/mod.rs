//! Kafka egress
//!
//! The gateway's only outbound side: raw inbound payloads, FHIR transaction
//! bundles and parse exceptions each go to their own topic. The
//! [`MessagePublisher`] trait is the seam the rest of the crate depends on;
//! [`KafkaPublisher`] is the production implementation and tests substitute
//! a capturing mock.

pub mod producer;

pub use producer::KafkaPublisher;

use async_trait::async_trait;

use crate::config::KafkaConfig;
use crate::domain::Result;

/// Publisher of `(key, value)` records to a named topic.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes one record, resolving when the broker acknowledges it.
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()>;
}

/// Topic names the gateway publishes to.
#[derive(Debug, Clone)]
pub struct Topics {
    /// Raw inbound payloads, keyed by bundle id.
    pub request_in: String,
    /// FHIR transaction bundles, keyed by the message control id.
    pub fhir_transactions: String,
    /// Parse failures, keyed by exception id.
    pub exceptions: String,
}

impl Topics {
    pub fn from_config(config: &KafkaConfig) -> Topics {
        Topics {
            request_in: config.request_in_topic.clone(),
            fhir_transactions: config.fhir_transactions_topic.clone(),
            exceptions: config.exceptions_topic.clone(),
        }
    }
}
