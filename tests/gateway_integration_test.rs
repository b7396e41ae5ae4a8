//! End-to-end gateway scenarios over loopback TCP.
//!
//! Each test connects a real MLLP client to a gateway bound on an ephemeral
//! port, exchanges frames, and observes the records the gateway publishes.

mod common;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use common::{a28_message, TestGateway, EXCEPTIONS, FHIR_TRANSACTIONS, REQUEST_IN};
use hermes::adapters::mllp::codec::MllpCodec;
use hermes::domain::hl7::Message;

async fn connect(gateway: &TestGateway) -> Framed<TcpStream, MllpCodec> {
    let stream = TcpStream::connect(gateway.addr).await.unwrap();
    Framed::new(stream, MllpCodec::new())
}

async fn exchange(client: &mut Framed<TcpStream, MllpCodec>, payload: &str) -> Message {
    client.send(Bytes::from(payload.to_string())).await.unwrap();
    let ack = client.next().await.unwrap().unwrap();
    let text: String = ack.iter().map(|b| char::from(*b)).collect();
    Message::parse(&text).unwrap()
}

#[tokio::test]
async fn test_happy_path_a28() {
    let gateway = TestGateway::start().await;
    let mut client = connect(&gateway).await;

    let message = a28_message(
        "MSG0001",
        "|||Rua A^^Lisboa^^1000-001^PT^C^^110503",
    );
    let ack = exchange(&mut client, &message).await;

    // framed acknowledgment answering our control id
    let msa = ack.segment("MSA").unwrap();
    assert_eq!(msa.value(1), "CA");
    assert_eq!(msa.value(2), "MSG0001");

    // original payload published to the request-in topic
    let raw = gateway.publisher.wait_for(REQUEST_IN, 1).await;
    assert_eq!(raw[0].key, "MSG0001");
    assert!(raw[0].payload.starts_with("MSH"));

    // transformed bundle published to the FHIR topic
    let bundles = gateway.publisher.wait_for(FHIR_TRANSACTIONS, 1).await;
    assert_eq!(bundles[0].key, "MSG0001");
    let bundle: serde_json::Value = serde_json::from_str(&bundles[0].payload).unwrap();
    assert_eq!(bundle["resourceType"], "Bundle");
    assert_eq!(bundle["type"], "transaction");
    assert_eq!(bundle["id"], "msg0001");

    let patient = bundle["entry"][0]["resource"].clone();
    assert_eq!(patient["resourceType"], "Patient");
    // name-based UUID of the SONHO identifier "12345"
    assert_eq!(patient["id"], "827ccb0e-ea8a-306c-8c34-a16891f84e7b");
    assert_eq!(patient["gender"], "male");
    assert_eq!(patient["birthDate"], "1980-01-01");
    assert_eq!(patient["name"][0]["family"], "DOE");
    assert_eq!(patient["name"][0]["given"][0], "JOHN");
    assert_eq!(patient["name"][0]["given"][1], "M");

    let address = patient["address"][0].clone();
    assert_eq!(address["type"], "postal");
    assert_eq!(address["postalCode"], "1000-001");
    let geo = address["extension"][0]["extension"].as_array().unwrap();
    let code_at = |i: usize| geo[i]["valueCodeableConcept"]["coding"][0]["code"].clone();
    assert_eq!(code_at(0), "CURRENT");
    assert_eq!(code_at(1), "11");
    assert_eq!(code_at(2), "1105");
    assert_eq!(code_at(3), "110503");
}

#[tokio::test]
async fn test_invalid_postal_code_drops_address_not_message() {
    let gateway = TestGateway::start().await;
    let mut client = connect(&gateway).await;

    let message = a28_message("MSG0002", "|||Rua A^^Lisboa^^10001^PT^C");
    let ack = exchange(&mut client, &message).await;
    assert_eq!(ack.segment("MSA").unwrap().value(1), "CA");

    let bundles = gateway.publisher.wait_for(FHIR_TRANSACTIONS, 1).await;
    let bundle: serde_json::Value = serde_json::from_str(&bundles[0].payload).unwrap();
    let patient = bundle["entry"][0]["resource"].clone();
    assert!(patient.get("address").is_none());
}

#[tokio::test]
async fn test_unknown_trigger_is_acknowledged_but_not_transformed() {
    let gateway = TestGateway::start().await;
    let mut client = connect(&gateway).await;

    let message = a28_message("MSG0003", "").replace("A28", "A01");
    let ack = exchange(&mut client, &message).await;
    assert_eq!(ack.segment("MSA").unwrap().value(1), "CA");

    // the raw payload still reaches the request-in topic
    gateway.publisher.wait_for(REQUEST_IN, 1).await;
    // but no bundle is produced
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(gateway.publisher.on_topic(FHIR_TRANSACTIONS).is_empty());
}

#[tokio::test]
async fn test_malformed_header_gets_ce_ack_and_connection_survives() {
    let gateway = TestGateway::start().await;
    let mut client = connect(&gateway).await;

    let ack = exchange(&mut client, "PID|1||12345^^^SONHO^NS\r").await;
    assert_eq!(ack.segment("MSA").unwrap().value(1), "CE");

    // failure lands on the exceptions topic
    let exceptions = gateway.publisher.wait_for(EXCEPTIONS, 1).await;
    let detail: serde_json::Value = serde_json::from_str(&exceptions[0].payload).unwrap();
    assert_eq!(detail["error"], "parseException");

    // the same connection still accepts a valid message afterwards
    let ack = exchange(&mut client, &a28_message("MSG0004", "")).await;
    assert_eq!(ack.segment("MSA").unwrap().value(1), "CA");
    assert_eq!(ack.segment("MSA").unwrap().value(2), "MSG0004");
}

#[tokio::test]
async fn test_missing_start_byte_closes_connection_without_ack() {
    let gateway = TestGateway::start().await;
    let mut stream = TcpStream::connect(gateway.addr).await.unwrap();

    // raw bytes with no 0x0B start byte
    stream.write_all(b"MSH|^~\\&|bad frame").await.unwrap();
    stream.flush().await.unwrap();

    let mut client = Framed::new(stream, MllpCodec::new());
    // the server closes without writing anything back
    let next = client.next().await;
    assert!(next.is_none());
    assert!(gateway.publisher.records().is_empty());
}

#[tokio::test]
async fn test_inbound_ack_is_not_answered() {
    let gateway = TestGateway::start().await;
    let mut client = connect(&gateway).await;

    let ack_message =
        "MSH|^~\\&|RECEIVER|RFAC|SENDER|SFAC|20240101120000||ACK^A28^ACK|A1|P|2.5\rMSA|CA|MSG0001\r";
    client
        .send(Bytes::from(ack_message.to_string()))
        .await
        .unwrap();

    // the server terminates the connection without replying
    let next = client.next().await;
    assert!(next.is_none());
    assert!(gateway.publisher.records().is_empty());
}
