use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};

use crate::envelope::{decode_u8vector, encode_u8vector};
use crate::error::PayloadError;

/// An application-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
}

impl Message {
    /// The message content as bytes (UTF-8 for text).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(bytes) => bytes.as_ref(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            Message::Text(_) => "text",
            Message::Binary(_) => "binary",
        }
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Message::Binary(Bytes::from(bytes))
    }
}

impl From<Bytes> for Message {
    fn from(bytes: Bytes) -> Self {
        Message::Binary(bytes)
    }
}

/// How message content is laid out inside a frame.
///
/// Both ends of a relay must agree on the mode; it is not sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PayloadMode {
    /// UTF-8 text, no extra structure.
    #[default]
    Text,
    /// Bytes passed through untouched.
    RawBinary,
    /// Bytes wrapped in a GNU Radio PMT `u8vector` envelope.
    TypedEnvelope,
}

impl PayloadMode {
    pub const ALL: [PayloadMode; 3] = [
        PayloadMode::Text,
        PayloadMode::RawBinary,
        PayloadMode::TypedEnvelope,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadMode::Text => "text",
            PayloadMode::RawBinary => "raw-binary",
            PayloadMode::TypedEnvelope => "typed-envelope",
        }
    }

    /// Serialize a message into frame payload bytes.
    ///
    /// Text mode only carries [`Message::Text`]. The byte modes carry either
    /// variant; text contributes its UTF-8 bytes.
    pub fn encode(self, message: &Message) -> Result<Bytes, PayloadError> {
        match self {
            PayloadMode::Text => encode_text(message),
            PayloadMode::RawBinary => Ok(encode_raw(message)),
            PayloadMode::TypedEnvelope => encode_envelope(message),
        }
    }

    /// Rebuild a message from frame payload bytes.
    ///
    /// Text mode yields [`Message::Text`]; the byte modes yield
    /// [`Message::Binary`].
    pub fn decode(self, payload: Bytes) -> Result<Message, PayloadError> {
        match self {
            PayloadMode::Text => decode_text(payload),
            PayloadMode::RawBinary => Ok(Message::Binary(payload)),
            PayloadMode::TypedEnvelope => decode_envelope(payload),
        }
    }
}

fn encode_text(message: &Message) -> Result<Bytes, PayloadError> {
    match message {
        Message::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        Message::Binary(_) => Err(PayloadError::ModeMismatch {
            mode: PayloadMode::Text,
            kind: message.kind(),
        }),
    }
}

fn decode_text(payload: Bytes) -> Result<Message, PayloadError> {
    let text = std::str::from_utf8(&payload)?;
    Ok(Message::Text(text.to_string()))
}

fn encode_raw(message: &Message) -> Bytes {
    match message {
        Message::Binary(bytes) => bytes.clone(),
        Message::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
    }
}

fn encode_envelope(message: &Message) -> Result<Bytes, PayloadError> {
    let mut buf = BytesMut::new();
    encode_u8vector(message.as_bytes(), &mut buf)?;
    Ok(buf.freeze())
}

fn decode_envelope(payload: Bytes) -> Result<Message, PayloadError> {
    let inner = decode_u8vector(&payload)?;
    Ok(Message::Binary(payload.slice_ref(inner)))
}

impl fmt::Display for PayloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadMode {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(PayloadMode::Text),
            "raw-binary" | "raw" | "binary" => Ok(PayloadMode::RawBinary),
            "typed-envelope" | "envelope" | "pmt" => Ok(PayloadMode::TypedEnvelope),
            _ => Err(PayloadError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(mode: PayloadMode, message: Message) {
        let wire = mode.encode(&message).unwrap();
        assert_eq!(mode.decode(wire).unwrap(), message, "mode {mode}");
    }

    #[test]
    fn text_roundtrip() {
        roundtrip(PayloadMode::Text, Message::from("Hello, world!"));
        roundtrip(PayloadMode::Text, Message::from(""));
        roundtrip(PayloadMode::Text, Message::from("grüße, 世界 🚀"));
    }

    #[test]
    fn raw_roundtrip() {
        roundtrip(PayloadMode::RawBinary, Message::from(vec![0x00, 0x01, 0xFF]));
        roundtrip(PayloadMode::RawBinary, Message::from(Vec::<u8>::new()));
        roundtrip(PayloadMode::RawBinary, Message::from((0..=255u8).collect::<Vec<_>>()));
    }

    #[test]
    fn envelope_roundtrip() {
        roundtrip(PayloadMode::TypedEnvelope, Message::from(b"Hi".to_vec()));
        roundtrip(PayloadMode::TypedEnvelope, Message::from(vec![0xFF; 4096]));
        roundtrip(PayloadMode::TypedEnvelope, Message::from(Vec::<u8>::new()));
    }

    #[test]
    fn text_encoding_adds_no_framing() {
        let wire = PayloadMode::Text.encode(&Message::from("Goodbye!")).unwrap();
        assert_eq!(wire.as_ref(), b"Goodbye!");
    }

    #[test]
    fn invalid_utf8_is_rejected_not_replaced() {
        let err = PayloadMode::Text
            .decode(Bytes::from_static(&[b'o', b'k', 0xC3, 0x28]))
            .unwrap_err();
        assert!(matches!(err, PayloadError::InvalidUtf8(_)));
    }

    #[test]
    fn text_mode_refuses_binary_messages() {
        let err = PayloadMode::Text
            .encode(&Message::from(vec![0xFF]))
            .unwrap_err();
        assert_eq!(
            err,
            PayloadError::ModeMismatch {
                mode: PayloadMode::Text,
                kind: "binary"
            }
        );
    }

    #[test]
    fn byte_modes_carry_text_as_utf8() {
        let raw = PayloadMode::RawBinary.encode(&Message::from("Hi")).unwrap();
        assert_eq!(raw.as_ref(), b"Hi");

        let wrapped = PayloadMode::TypedEnvelope.encode(&Message::from("Hi")).unwrap();
        let decoded = PayloadMode::TypedEnvelope.decode(wrapped).unwrap();
        assert_eq!(decoded, Message::Binary(Bytes::from_static(&[0x48, 0x69])));
    }

    #[test]
    fn truncated_envelope_is_a_decode_error() {
        let mut wire = PayloadMode::TypedEnvelope
            .encode(&Message::from(b"Hello".to_vec()))
            .unwrap();
        wire.truncate(wire.len() - 1);
        let err = PayloadMode::TypedEnvelope.decode(wire).unwrap_err();
        assert!(matches!(err, PayloadError::Truncated { .. }));
    }

    #[test]
    fn mode_names_parse() {
        for mode in PayloadMode::ALL {
            assert_eq!(mode.as_str().parse::<PayloadMode>().unwrap(), mode);
        }
        assert_eq!("pmt".parse::<PayloadMode>().unwrap(), PayloadMode::TypedEnvelope);
        assert_eq!("RAW".parse::<PayloadMode>().unwrap(), PayloadMode::RawBinary);
        assert!(matches!(
            "json".parse::<PayloadMode>(),
            Err(PayloadError::UnknownMode(_))
        ));
    }
}
