//! Typed view over an ADT_A05-structured message
//!
//! ADT^A28 shares the ADT_A05 structure in HL7 v2.5. This wrapper gives the
//! mappers named access to the segments they project from (MSH, EVN, PID,
//! PV1, and the repeating NK1/ROL/OBX/IN1 groups) instead of scanning the
//! raw segment list.

use crate::domain::errors::Hl7Error;
use crate::domain::hl7::message::{Message, Segment};

/// An ADT_A05-shaped message: header plus patient identification, with the
/// optional repeating groups an A28 registration carries.
#[derive(Debug, Clone)]
pub struct AdtA05 {
    message: Message,
}

impl AdtA05 {
    /// Wraps a parsed message, verifying the segments an ADT_A05 requires.
    pub fn new(message: Message) -> Result<AdtA05, Hl7Error> {
        if message.segment("MSH").is_none() {
            return Err(Hl7Error::MissingField("MSH".to_string()));
        }
        if message.segment("PID").is_none() {
            return Err(Hl7Error::MissingField("PID".to_string()));
        }
        Ok(AdtA05 { message })
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn msh(&self) -> &Segment {
        self.message.segment("MSH").expect("validated on construction")
    }

    pub fn pid(&self) -> &Segment {
        self.message.segment("PID").expect("validated on construction")
    }

    pub fn evn(&self) -> Option<&Segment> {
        self.message.segment("EVN")
    }

    pub fn pv1(&self) -> Option<&Segment> {
        self.message.segment("PV1")
    }

    pub fn nk1(&self) -> Vec<&Segment> {
        self.message.segments_named("NK1")
    }

    pub fn rol(&self) -> Vec<&Segment> {
        self.message.segments_named("ROL")
    }

    pub fn obx(&self) -> Vec<&Segment> {
        self.message.segments_named("OBX")
    }

    pub fn in1(&self) -> Vec<&Segment> {
        self.message.segments_named("IN1")
    }
}
