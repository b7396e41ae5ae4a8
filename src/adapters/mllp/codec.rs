//! MLLP framing codec
//!
//! MLLP wraps each HL7 payload in `0x0B <payload> 0x1C 0x0D`. The codec
//! implements tokio-util's `Encoder`/`Decoder` for use with framed
//! transports (the `check` client and the test harness); the connection
//! handler frames its acknowledgments through [`wrap`] directly because it
//! manages its own receive buffer.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Start-of-block marker (vertical tab).
pub const BLOCK_HEADER: u8 = 0x0B;
/// End-of-block marker (file separator) followed by carriage return.
pub const BLOCK_TRAILER: [u8; 2] = [0x1C, 0x0D];

/// Wraps a payload in MLLP framing bytes.
pub fn wrap(payload: &[u8]) -> Bytes {
    let mut framed = BytesMut::with_capacity(payload.len() + 3);
    framed.put_u8(BLOCK_HEADER);
    framed.extend_from_slice(payload);
    framed.extend_from_slice(&BLOCK_TRAILER);
    framed.freeze()
}

/// A tokio codec for the MLLP framing convention.
#[derive(Debug, Default)]
pub struct MllpCodec;

impl MllpCodec {
    pub fn new() -> MllpCodec {
        MllpCodec
    }
}

impl Encoder<Bytes> for MllpCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 3);
        dst.put_u8(BLOCK_HEADER);
        dst.extend_from_slice(&item);
        dst.extend_from_slice(&BLOCK_TRAILER);
        Ok(())
    }
}

impl Decoder for MllpCodec {
    type Item = BytesMut;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(start) = src.iter().position(|b| *b == BLOCK_HEADER) else {
            return Ok(None);
        };
        let Some(end) = src.iter().position(|b| *b == BLOCK_TRAILER[0]) else {
            return Ok(None);
        };
        if end < start {
            return Ok(None);
        }

        let mut frame = src.split_to(end + 1);
        // consume the trailing CR when it has already arrived
        if src.first() == Some(&BLOCK_TRAILER[1]) {
            let _ = src.split_to(1);
        }
        let payload = frame.split_off(start + 1);
        Ok(Some(BytesMut::from(&payload[..payload.len() - 1])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(s: &str) -> BytesMut {
        BytesMut::from(format!("\x0B{s}\x1C\x0D").as_bytes())
    }

    #[test]
    fn test_wrap_adds_framing() {
        let frame = wrap(b"abcd");
        assert_eq!(&frame[..], b"\x0Babcd\x1C\x0D");
    }

    #[test]
    fn test_encoder_matches_wrap() {
        let mut codec = MllpCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"abcd"), &mut dst).unwrap();
        assert_eq!(&dst[..], &wrap(b"abcd")[..]);
    }

    #[test]
    fn test_decoder_finds_message() {
        let mut codec = MllpCodec::new();
        let mut src = framed("MSH|^~\\&|A");
        let decoded = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&decoded[..], b"MSH|^~\\&|A");
        assert!(src.is_empty());
    }

    #[test]
    fn test_decoder_waits_for_complete_frame() {
        let mut codec = MllpCodec::new();
        let mut src = BytesMut::from(&b"\x0Bpartial"[..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b"\x1C\x0D");
        let decoded = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&decoded[..], b"partial");
    }

    #[test]
    fn test_decoder_handles_back_to_back_frames() {
        let mut codec = MllpCodec::new();
        let mut src = framed("one");
        src.extend_from_slice(&framed("two"));
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"one");
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"two");
    }
}
