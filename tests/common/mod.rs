//! Shared test harness: an in-memory publisher and a loopback gateway.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use hermes::adapters::kafka::{MessagePublisher, Topics};
use hermes::adapters::mllp::{ConnectionDeps, MllpServer};
use hermes::config::TcpConfig;
use hermes::core::dispatch::OperationRegistry;
use hermes::core::mapping::MappingContext;
use hermes::core::parser::MessageParser;
use hermes::domain::Result;

pub const REQUEST_IN: &str = "hl7.request-in";
pub const FHIR_TRANSACTIONS: &str = "fhir.transactions";
pub const EXCEPTIONS: &str = "fhir.exceptions";

/// Captures published records instead of talking to a broker.
pub struct MockPublisher {
    records: Mutex<Vec<PublishedRecord>>,
}

#[derive(Debug, Clone)]
pub struct PublishedRecord {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

impl MockPublisher {
    pub fn new() -> Arc<MockPublisher> {
        Arc::new(MockPublisher {
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<PublishedRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.topic == topic)
            .collect()
    }

    /// Polls until `topic` has at least `count` records or the timeout hits.
    pub async fn wait_for(&self, topic: &str, count: usize) -> Vec<PublishedRecord> {
        for _ in 0..200 {
            let records = self.on_topic(topic);
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "Timed out waiting for {count} record(s) on {topic}; saw {:?}",
            self.records()
        );
    }
}

#[async_trait]
impl MessagePublisher for MockPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()> {
        self.records.lock().unwrap().push(PublishedRecord {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}

/// A gateway bound to an ephemeral loopback port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub publisher: Arc<MockPublisher>,
    shutdown: watch::Sender<bool>,
}

impl TestGateway {
    pub async fn start() -> TestGateway {
        let publisher = MockPublisher::new();
        let parser = Arc::new(MessageParser::new("2.5"));
        let topics = Topics {
            request_in: REQUEST_IN.to_string(),
            fhir_transactions: FHIR_TRANSACTIONS.to_string(),
            exceptions: EXCEPTIONS.to_string(),
        };
        let context = MappingContext {
            organization_code: "HOSP01".to_string(),
            organization_name: Some("Hospital Example".to_string()),
            confidentiality_system:
                "http://terminology.hl7.org/CodeSystem/v3-Confidentiality".to_string(),
            confidentiality_code: "N".to_string(),
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
            publisher: publisher.clone(),
            topics,
        });

        let config = TcpConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = MllpServer::bind(&config, deps).await.unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(server.serve(shutdown_rx));

        TestGateway {
            addr,
            publisher,
            shutdown,
        }
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// A registration message with the given control id and PID tail.
pub fn a28_message(control_id: &str, pid_tail: &str) -> String {
    format!(
        "MSH|^~\\&|SENDER|SFAC|RECEIVER|RFAC|20240101120000||ADT^A28^ADT_A05|{control_id}|P|2.5\r\
         EVN|A28|20240101120000\r\
         PID|1||12345^^^SONHO^NS||DOE^JOHN^M||19800101|M{pid_tail}\r"
    )
}
