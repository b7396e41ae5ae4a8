//! HL7 frame parsing and acknowledgment synthesis
//!
//! Turns a decoded MLLP frame into either an [`InboundMessage`] carrying the
//! accept acknowledgment, or an [`InternalErrorData`] carrying a CE
//! acknowledgment built from whatever header could be salvaged. Outcomes are
//! values, not exceptions: the connection handler answers both the same way
//! and never unwinds.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;

use crate::domain::hl7::{AdtA05, Message};
use crate::domain::ids;
use crate::domain::{HermesError, Result};

/// HL7 acknowledgment codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcknowledgmentCode {
    /// Application accept
    Aa,
    /// Commit accept
    Ca,
    /// Commit error
    Ce,
    /// Commit reject
    Cr,
}

impl AcknowledgmentCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AcknowledgmentCode::Aa => "AA",
            AcknowledgmentCode::Ca => "CA",
            AcknowledgmentCode::Ce => "CE",
            AcknowledgmentCode::Cr => "CR",
        }
    }

    pub fn from_str(code: &str) -> Option<Self> {
        match code {
            "AA" => Some(AcknowledgmentCode::Aa),
            "CA" => Some(AcknowledgmentCode::Ca),
            "CE" => Some(AcknowledgmentCode::Ce),
            "CR" => Some(AcknowledgmentCode::Cr),
            _ => None,
        }
    }
}

/// A successfully decoded frame, ready to acknowledge and dispatch.
///
/// Immutable after construction; lives only while its frame is processed.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Control id the downstream bundle will carry (MSA-2 of the ACK).
    pub bundle_id: String,
    /// Encoded acknowledgment, ready to frame and write back.
    pub ack_msg: String,
    /// The original encoded payload, kept for dispatch and echoing.
    pub msg: Option<String>,
    /// Trigger event from MSH-9.2, e.g. `A28`.
    pub trigger_event: String,
    /// EVN-4 action code, when present.
    pub action_code: Option<String>,
    /// PV1-2 activity area, when present.
    pub activity_area: Option<String>,
    /// MSA-4 expected sequence number, when present.
    pub sequential_number: Option<String>,
}

/// Classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ParseException,
    NotSupported,
}

/// A frame the parser could not accept, with the CE acknowledgment to send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorData {
    /// Fresh correlation id for the exceptions sink.
    pub exception_id: String,
    pub error: ErrorKind,
    /// CE acknowledgment synthesized from the salvageable header.
    pub exception_ack_msg: String,
    /// Source text with segment separators stripped, safe for logging.
    pub original_msg: String,
}

/// Outcome of parsing one frame.
pub type ParseResult = std::result::Result<InboundMessage, InternalErrorData>;

/// Second-pass parse output used by operations after dispatch.
#[derive(Debug, Clone)]
pub struct MessageData {
    pub acknowledgment_code: Option<AcknowledgmentCode>,
    /// Message event, e.g. `ADT^A28`.
    pub message_event: String,
    pub parsed_data: AdtA05,
}

/// Returns true when the payload's MSH-9 message code starts with `ACK`.
///
/// Cheap scan used by the connection handler to decide whether a frame is an
/// acknowledgment of our own outbound traffic (no publish, no reply).
pub fn is_ack(raw: &str) -> bool {
    raw.split(['\r', '\n'])
        .find(|line| line.trim_start().starts_with("MSH"))
        .and_then(|line| line.split('|').nth(8))
        .map(|field| field.split('^').next().unwrap_or("").starts_with("ACK"))
        .unwrap_or(false)
}

/// Pipe-parser front end: decodes frames, classifies the outcome, and
/// synthesizes acknowledgments.
///
/// Version acceptance is permissive for ADT traffic; incoming ACKs are only
/// short-circuited when they carry the configured version. Control ids for
/// generated acknowledgments come from an in-memory sequence.
pub struct MessageParser {
    version: String,
    control_ids: AtomicU64,
}

impl MessageParser {
    pub fn new(version: impl Into<String>) -> MessageParser {
        MessageParser {
            version: version.into(),
            control_ids: AtomicU64::new(1),
        }
    }

    /// Parses one decoded frame.
    pub fn parse(&self, raw: &str) -> ParseResult {
        let message = match Message::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                return Err(self.internal_error(raw, ErrorKind::ParseException, &e.to_string()))
            }
        };

        let (code, trigger, _) = message.message_type();

        if code.starts_with("ACK") {
            return self.accept_incoming_ack(raw, &message, trigger);
        }

        if code != "ADT" {
            let event = if trigger.is_empty() { code } else { trigger };
            let error = format!("Unknown event {event}");
            let ack = self.generate_ack(&message, AcknowledgmentCode::Ce, Some(&error));
            return Err(InternalErrorData {
                exception_id: ids::random_id(),
                error: ErrorKind::ParseException,
                exception_ack_msg: ack,
                original_msg: sanitize(raw),
            });
        }

        let ack = self.generate_ack(&message, AcknowledgmentCode::Ca, None);
        Ok(InboundMessage {
            bundle_id: message.control_id().to_string(),
            ack_msg: ack,
            msg: Some(raw.to_string()),
            trigger_event: trigger,
            action_code: segment_value(&message, "EVN", 4),
            activity_area: segment_value(&message, "PV1", 2),
            sequential_number: None,
        })
    }

    /// An incoming ACK acknowledges our own prior outbound message. It is
    /// short-circuited into an [`InboundMessage`] built from its MSA fields;
    /// versions other than the configured one are not supported.
    fn accept_incoming_ack(&self, raw: &str, message: &Message, trigger: String) -> ParseResult {
        if message.version() != self.version {
            let error = format!("Unsupported version {} for ACK", message.version());
            let ack = self.generate_ack(message, AcknowledgmentCode::Ce, Some(&error));
            return Err(InternalErrorData {
                exception_id: ids::random_id(),
                error: ErrorKind::NotSupported,
                exception_ack_msg: ack,
                original_msg: sanitize(raw),
            });
        }

        let msa = message.segment("MSA");
        Ok(InboundMessage {
            bundle_id: msa.map(|s| s.value(2).to_string()).unwrap_or_default(),
            ack_msg: raw.to_string(),
            msg: None,
            trigger_event: if trigger.is_empty() {
                "ACK".to_string()
            } else {
                trigger
            },
            action_code: None,
            activity_area: None,
            sequential_number: msa.and_then(|s| non_empty(s.value(4))),
        })
    }

    /// Re-parses the stored original payload into the typed ADT_A05 view for
    /// field access by operations.
    pub fn second_pass(&self, raw: &str) -> Result<MessageData> {
        let message = Message::parse(raw).map_err(HermesError::Hl7)?;
        let (code, trigger, _) = message.message_type();
        let parsed_data = AdtA05::new(message).map_err(HermesError::Hl7)?;
        Ok(MessageData {
            acknowledgment_code: None,
            message_event: format!("{code}^{trigger}"),
            parsed_data,
        })
    }

    /// Synthesizes an acknowledgment for a parsed message: sender and
    /// receiver swapped, fresh control id, MSA answering the original
    /// control id. The error text, when given, rides in MSA-3.
    pub fn generate_ack(
        &self,
        message: &Message,
        code: AcknowledgmentCode,
        error: Option<&str>,
    ) -> String {
        let msh = message.segment("MSH").expect("parsed message has MSH");
        let (_, trigger, _) = message.message_type();
        self.build_ack(
            msh.value(5),
            msh.value(6),
            msh.value(3),
            msh.value(4),
            &trigger,
            message.control_id(),
            code,
            error,
        )
    }

    /// Builds a CE acknowledgment from the first segment that looks like an
    /// MSH, reading its fields leniently (no structural validation). Falls
    /// back to an anonymous header when the payload has no MSH at all.
    pub fn header_ack(&self, raw: &str, error: &str) -> String {
        for line in raw.split(['\r', '\n']) {
            let Some(at) = line.find("MSH") else { continue };
            let parts: Vec<&str> = line[at..].split('|').collect();
            let get = |n: usize| parts.get(n).copied().unwrap_or("");
            // parts[0] is the segment name, so MSH-n sits at parts[n - 1]
            return self.build_ack(
                get(4),
                get(5),
                get(2),
                get(3),
                get(8).split('^').nth(1).unwrap_or(""),
                get(9),
                AcknowledgmentCode::Ce,
                Some(error),
            );
        }
        self.build_ack("", "", "", "", "", "", AcknowledgmentCode::Ce, Some(error))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_ack(
        &self,
        sending_app: &str,
        sending_facility: &str,
        receiving_app: &str,
        receiving_facility: &str,
        trigger: &str,
        original_control_id: &str,
        code: AcknowledgmentCode,
        error: Option<&str>,
    ) -> String {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let control_id = self.next_control_id();
        let event = if trigger.is_empty() {
            "ACK".to_string()
        } else {
            format!("ACK^{trigger}^ACK")
        };
        let mut ack = format!(
            "MSH|^~\\&|{sending_app}|{sending_facility}|{receiving_app}|{receiving_facility}|{timestamp}||{event}|{control_id}|P|{version}\rMSA|{code}|{original_control_id}",
            version = self.version,
            code = code.as_str(),
        );
        if let Some(error) = error {
            ack.push('|');
            ack.push_str(&sanitize(error));
        }
        ack.push('\r');
        ack
    }

    fn internal_error(&self, raw: &str, error: ErrorKind, description: &str) -> InternalErrorData {
        InternalErrorData {
            exception_id: ids::random_id(),
            error,
            exception_ack_msg: self.header_ack(raw, description),
            original_msg: sanitize(raw),
        }
    }

    fn next_control_id(&self) -> String {
        let n = self.control_ids.fetch_add(1, Ordering::Relaxed);
        format!("{n:05}")
    }
}

fn segment_value(message: &Message, segment: &str, field: usize) -> Option<String> {
    message
        .segment(segment)
        .and_then(|s| non_empty(s.value(field)))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn sanitize(raw: &str) -> String {
    raw.replace(['\r', '\n'], " ").trim().to_string()
}
