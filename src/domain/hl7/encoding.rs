//! Frame payload decoding
//!
//! MLLP payloads are ISO-8859-1. Decoding is a 1:1 widening of each byte to
//! the corresponding Unicode scalar (Latin-1 occupies the first 256 code
//! points). Residual framing bytes (`0x0B`, `0x1C`) are stripped, and HL7
//! `\Xhh..\` hexadecimal escape sequences are resolved to their Latin-1
//! characters. Segment separators (`\r`) are preserved.

const START_BLOCK: u8 = 0x0B;
const END_BLOCK: u8 = 0x1C;

/// Decodes a flattened MLLP frame buffer into the text handed to the parser.
pub fn decode_frame(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .filter(|b| **b != START_BLOCK && **b != END_BLOCK)
        .map(|b| char::from(*b))
        .collect();
    resolve_hex_escapes(&text)
}

/// Encodes outbound text (acknowledgments) as ISO-8859-1. Characters outside
/// Latin-1 cannot occur in synthesized acknowledgments; they are replaced
/// with `?` as a safeguard.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code < 256 {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

/// Resolves `\Xhh..\` sequences to the bytes they denote, interpreted as
/// Latin-1. Malformed sequences (no terminator, odd or non-hex digits) are
/// left verbatim.
fn resolve_hex_escapes(text: &str) -> String {
    if !text.contains("\\X") {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == 'X' {
            if let Some(end) = chars[i + 2..].iter().position(|c| *c == '\\') {
                let digits: String = chars[i + 2..i + 2 + end].iter().collect();
                if let Some(decoded) = decode_hex(&digits) {
                    out.push_str(&decoded);
                    i += end + 3;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn decode_hex(digits: &str) -> Option<String> {
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    let mut out = String::with_capacity(digits.len() / 2);
    let bytes = digits.as_bytes();
    for pair in bytes.chunks(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;
        out.push(char::from((hi * 16 + lo) as u8));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_framing_bytes() {
        let decoded = decode_frame(b"\x0BMSH|^~\\&|A\rPID|1\x1C\x0D");
        assert_eq!(decoded, "MSH|^~\\&|A\rPID|1\r");
    }

    #[test]
    fn test_latin1_bytes_widen() {
        // 0xE9 is e-acute in ISO-8859-1
        let decoded = decode_frame(&[b'J', b'o', 0xE9]);
        assert_eq!(decoded, "Jo\u{e9}");
    }

    #[test]
    fn test_hex_escape_resolution() {
        assert_eq!(decode_frame(b"A\\X0D\\B"), "A\rB");
        assert_eq!(decode_frame(b"A\\XE9\\"), "A\u{e9}");
        assert_eq!(decode_frame(b"A\\X0D0A\\B"), "A\r\nB");
    }

    #[test]
    fn test_malformed_escapes_left_verbatim() {
        assert_eq!(decode_frame(b"A\\X0"), "A\\X0");
        assert_eq!(decode_frame(b"A\\XZZ\\B"), "A\\XZZ\\B");
        assert_eq!(decode_frame(b"A\\X\\B"), "A\\X\\B");
    }

    #[test]
    fn test_preserves_segment_separators() {
        let decoded = decode_frame(b"MSH|1\rEVN|2\r");
        assert_eq!(decoded.matches('\r').count(), 2);
    }
}
