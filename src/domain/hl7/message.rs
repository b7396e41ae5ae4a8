//! Pipe-delimited message structure
//!
//! The model mirrors the HL7 v2 composite hierarchy: a [`Message`] holds
//! [`Segment`]s, a segment holds [`Field`]s, a field holds [`Repeat`]s
//! (`~`-separated), a repeat holds components (`^`-separated) which hold
//! subcomponents (`&`-separated). All positional accessors use HL7's 1-based
//! numbering, so `pid.value(3)` is PID-3. For MSH, field 1 is the field
//! separator itself and field 2 the encoding characters, per the standard.

use crate::domain::errors::Hl7Error;

/// Message delimiter set, read from MSH-1/MSH-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

/// A parsed HL7 v2 message.
#[derive(Debug, Clone)]
pub struct Message {
    pub segments: Vec<Segment>,
    pub delimiters: Delimiters,
}

/// A single segment (one `\r`-terminated line).
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    fields: Vec<Field>,
}

/// A field, possibly repeating.
#[derive(Debug, Clone)]
pub struct Field {
    repeats: Vec<Repeat>,
}

/// One repetition of a field.
#[derive(Debug, Clone)]
pub struct Repeat {
    components: Vec<Component>,
}

#[derive(Debug, Clone)]
struct Component {
    subcomponents: Vec<String>,
}

impl Message {
    /// Parses a decoded payload into the typed model.
    ///
    /// Segments are separated by `\r` (lone `\n` is tolerated). The first
    /// segment must be an MSH carrying at least a message type (MSH-9) and a
    /// control id (MSH-10); the protocol version in MSH-12 is accepted as-is.
    pub fn parse(raw: &str) -> Result<Message, Hl7Error> {
        let lines: Vec<&str> = raw
            .split(['\r', '\n'])
            .filter(|l| !l.is_empty())
            .collect();

        let header = lines.first().ok_or(Hl7Error::Empty)?;
        if !header.starts_with("MSH") {
            let head: String = header.chars().take(16).collect();
            return Err(Hl7Error::MissingHeader(head));
        }
        if header.len() < 8 {
            return Err(Hl7Error::InvalidHeader(
                "header too short to carry delimiters".to_string(),
            ));
        }

        let mut chars = header.chars().skip(3);
        let mut next_delim = || {
            chars.next().ok_or_else(|| {
                Hl7Error::InvalidHeader("header too short to carry delimiters".to_string())
            })
        };
        let field = next_delim()?;
        let component = next_delim()?;
        let repetition = next_delim()?;
        let escape = next_delim()?;
        let subcomponent = next_delim()?;
        let delimiters = Delimiters {
            field,
            component,
            repetition,
            escape,
            subcomponent,
        };

        let mut segments = Vec::with_capacity(lines.len());
        for line in &lines {
            segments.push(Segment::parse(line, &delimiters)?);
        }

        let message = Message {
            segments,
            delimiters,
        };

        let msh = message.segment("MSH").expect("first segment is MSH");
        if msh.value(9).is_empty() {
            return Err(Hl7Error::InvalidHeader("missing message type (MSH-9)".to_string()));
        }
        if msh.value(10).is_empty() {
            return Err(Hl7Error::InvalidHeader(
                "missing message control id (MSH-10)".to_string(),
            ));
        }

        Ok(message)
    }

    /// First segment with the given name.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    /// All segments with the given name, in message order.
    pub fn segments_named(&self, name: &str) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.name == name).collect()
    }

    /// Message code, trigger event and structure from MSH-9.
    pub fn message_type(&self) -> (String, String, String) {
        let msh = self.segment("MSH").expect("parsed message has MSH");
        let field = msh.field(9);
        let code = field.map(|f| f.component(1).to_string()).unwrap_or_default();
        let trigger = field.map(|f| f.component(2).to_string()).unwrap_or_default();
        let structure = field.map(|f| f.component(3).to_string()).unwrap_or_default();
        (code, trigger, structure)
    }

    /// MSH-10 message control id.
    pub fn control_id(&self) -> &str {
        self.segment("MSH").map(|s| s.value(10)).unwrap_or("")
    }

    /// MSH-12 version id.
    pub fn version(&self) -> &str {
        self.segment("MSH").map(|s| s.value(12)).unwrap_or("")
    }
}

impl Segment {
    fn parse(line: &str, delimiters: &Delimiters) -> Result<Segment, Hl7Error> {
        let parts: Vec<&str> = line.split(delimiters.field).collect();
        let name = parts[0].to_string();
        if name.len() != 3 || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Hl7Error::InvalidSegment(name));
        }

        let mut fields = Vec::with_capacity(parts.len());
        if name == "MSH" {
            // MSH-1 is the separator character and MSH-2 the encoding
            // characters; neither is subject to component splitting.
            fields.push(Field::raw(delimiters.field.to_string()));
            if let Some(encoding) = parts.get(1) {
                fields.push(Field::raw((*encoding).to_string()));
            }
            for part in parts.iter().skip(2) {
                fields.push(Field::parse(part, delimiters));
            }
        } else {
            for part in parts.iter().skip(1) {
                fields.push(Field::parse(part, delimiters));
            }
        }

        Ok(Segment { name, fields })
    }

    /// Field by 1-based HL7 number.
    pub fn field(&self, n: usize) -> Option<&Field> {
        if n == 0 {
            return None;
        }
        self.fields.get(n - 1)
    }

    /// Scalar value of a field: first repeat, first component, first
    /// subcomponent. Empty string when absent.
    pub fn value(&self, n: usize) -> &str {
        self.field(n).map(Field::value).unwrap_or("")
    }
}

impl Field {
    fn raw(value: String) -> Field {
        Field {
            repeats: vec![Repeat {
                components: vec![Component {
                    subcomponents: vec![value],
                }],
            }],
        }
    }

    fn parse(part: &str, delimiters: &Delimiters) -> Field {
        let repeats = part
            .split(delimiters.repetition)
            .map(|r| Repeat::parse(r, delimiters))
            .collect();
        Field { repeats }
    }

    /// All repetitions of this field.
    pub fn repeats(&self) -> &[Repeat] {
        &self.repeats
    }

    /// Scalar value: first repeat's first component's first subcomponent.
    pub fn value(&self) -> &str {
        self.repeats.first().map(Repeat::value).unwrap_or("")
    }

    /// Component of the first repeat, 1-based. Empty string when absent.
    pub fn component(&self, n: usize) -> &str {
        self.repeats.first().map(|r| r.component(n)).unwrap_or("")
    }

    /// Subcomponent `m` of component `n` of the first repeat.
    pub fn subcomponent(&self, n: usize, m: usize) -> &str {
        self.repeats
            .first()
            .map(|r| r.subcomponent(n, m))
            .unwrap_or("")
    }
}

impl Repeat {
    fn parse(raw: &str, delimiters: &Delimiters) -> Repeat {
        let components = raw
            .split(delimiters.component)
            .map(|c| Component {
                subcomponents: c
                    .split(delimiters.subcomponent)
                    .map(str::to_string)
                    .collect(),
            })
            .collect();
        Repeat { components }
    }

    /// Scalar value: first component's first subcomponent.
    pub fn value(&self) -> &str {
        self.component(1)
    }

    /// Component by 1-based number. Empty string when absent.
    pub fn component(&self, n: usize) -> &str {
        if n == 0 {
            return "";
        }
        self.components
            .get(n - 1)
            .and_then(|c| c.subcomponents.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Subcomponent by 1-based component and subcomponent numbers.
    pub fn subcomponent(&self, n: usize, m: usize) -> &str {
        if n == 0 || m == 0 {
            return "";
        }
        self.components
            .get(n - 1)
            .and_then(|c| c.subcomponents.get(m - 1))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// True when every component is empty.
    pub fn is_empty(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.subcomponents.iter().all(String::is_empty))
    }
}
