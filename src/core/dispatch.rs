//! Operation dispatch
//!
//! Routes accepted messages by trigger event. Registration (`A28`) is the
//! only handled operation: the stored payload is re-parsed into the typed
//! view, projected into a transaction bundle and published. Every other
//! trigger has already been acknowledged, so it is logged and dropped.
//!
//! Dispatch failures never reach the sender: by the time an operation runs,
//! the CA acknowledgment is on the wire. Errors are logged with the bundle
//! id for correlation.

use std::sync::Arc;

use crate::adapters::kafka::{MessagePublisher, Topics};
use crate::core::mapping::{self, MappingContext};
use crate::core::parser::{InboundMessage, MessageParser};
use crate::domain::{HermesError, Result};

/// Trigger-event router shared by all connection handlers.
pub struct OperationRegistry {
    parser: Arc<MessageParser>,
    context: MappingContext,
    publisher: Arc<dyn MessagePublisher>,
    topics: Topics,
}

impl OperationRegistry {
    pub fn new(
        parser: Arc<MessageParser>,
        context: MappingContext,
        publisher: Arc<dyn MessagePublisher>,
        topics: Topics,
    ) -> OperationRegistry {
        OperationRegistry {
            parser,
            context,
            publisher,
            topics,
        }
    }

    /// Routes one accepted message.
    pub async fn dispatch(&self, inbound: &InboundMessage) {
        match inbound.trigger_event.as_str() {
            "A28" => {
                if let Err(e) = self.handle_patient_new(inbound).await {
                    tracing::error!(
                        bundle_id = %inbound.bundle_id,
                        error = %e,
                        "Patient registration failed"
                    );
                }
            }
            other => {
                tracing::debug!(
                    trigger_event = other,
                    bundle_id = %inbound.bundle_id,
                    "Unsupported trigger event, dropping"
                );
            }
        }
    }

    /// New-patient flow: second-pass parse, bundle build, publish.
    async fn handle_patient_new(&self, inbound: &InboundMessage) -> Result<()> {
        let raw = inbound
            .msg
            .as_deref()
            .ok_or_else(|| HermesError::Other("Original payload unavailable".to_string()))?;

        let data = self.parser.second_pass(raw)?;
        let bundle = mapping::build_transaction(&data.parsed_data, &self.context)?;
        let payload = serde_json::to_string(&bundle)?;

        self.publisher
            .publish(&self.topics.fhir_transactions, &inbound.bundle_id, &payload)
            .await?;

        tracing::info!(
            bundle_id = %inbound.bundle_id,
            event = %data.message_event,
            entries = bundle.entry.len(),
            "Published FHIR transaction"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CapturingPublisher {
        records: Mutex<Vec<(String, String, String)>>,
    }

    impl CapturingPublisher {
        fn new() -> Arc<CapturingPublisher> {
            Arc::new(CapturingPublisher {
                records: Mutex::new(Vec::new()),
            })
        }

        fn records(&self) -> Vec<(String, String, String)> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagePublisher for CapturingPublisher {
        async fn publish(&self, topic: &str, key: &str, payload: &str) -> crate::domain::Result<()> {
            self.records
                .lock()
                .unwrap()
                .push((topic.to_string(), key.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn topics() -> Topics {
        Topics {
            request_in: "hl7.request-in".to_string(),
            fhir_transactions: "fhir.transactions".to_string(),
            exceptions: "fhir.exceptions".to_string(),
        }
    }

    fn context() -> MappingContext {
        MappingContext {
            organization_code: "HOSP01".to_string(),
            organization_name: None,
            confidentiality_system:
                "http://terminology.hl7.org/CodeSystem/v3-Confidentiality".to_string(),
            confidentiality_code: "N".to_string(),
        }
    }

    const A28: &str = "MSH|^~\\&|S|SF|R|RF|20240101120000||ADT^A28^ADT_A05|MSG0001|P|2.5\rEVN|A28|20240101120000\rPID|1||12345^^^SONHO^NS||DOE^JOHN||19800101|M\r";

    #[tokio::test]
    async fn test_a28_publishes_bundle() {
        let parser = Arc::new(MessageParser::new("2.5"));
        let publisher = CapturingPublisher::new();
        let registry =
            OperationRegistry::new(parser.clone(), context(), publisher.clone(), topics());

        let inbound = parser.parse(A28).unwrap();
        registry.dispatch(&inbound).await;

        let records = publisher.records();
        assert_eq!(records.len(), 1);
        let (topic, key, payload) = &records[0];
        assert_eq!(topic, "fhir.transactions");
        assert_eq!(key, "MSG0001");
        let bundle: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(bundle["resourceType"], "Bundle");
        assert_eq!(bundle["id"], "msg0001");
    }

    #[tokio::test]
    async fn test_other_triggers_are_dropped() {
        let parser = Arc::new(MessageParser::new("2.5"));
        let publisher = CapturingPublisher::new();
        let registry =
            OperationRegistry::new(parser.clone(), context(), publisher.clone(), topics());

        let inbound = parser.parse(&A28.replace("A28", "A01")).unwrap();
        registry.dispatch(&inbound).await;

        assert!(publisher.records().is_empty());
    }

    #[tokio::test]
    async fn test_mapping_failure_is_contained() {
        let parser = Arc::new(MessageParser::new("2.5"));
        let publisher = CapturingPublisher::new();
        let registry =
            OperationRegistry::new(parser.clone(), context(), publisher.clone(), topics());

        // unknown administrative sex fails the mapping, not the dispatcher
        let inbound = parser.parse(&A28.replace("|M\r", "|X\r")).unwrap();
        registry.dispatch(&inbound).await;

        assert!(publisher.records().is_empty());
    }
}
