//! Byte transforms applied to message content around the payload codec.
//!
//! A [`Pipeline`] runs its stages in order over the bytes of a [`Message`].
//! The sending side applies it before [`PayloadMode::encode`]; the receiving
//! side applies its [`Pipeline::reversed`] counterpart after
//! [`PayloadMode::decode`]. Stages are configured independently on each end,
//! so a sender that base64-encodes needs a receiver that base64-decodes.
//!
//! [`PayloadMode::encode`]: crate::PayloadMode::encode
//! [`PayloadMode::decode`]: crate::PayloadMode::decode

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use bytes::Bytes;
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::payload::Message;

/// A transform stage rejected its input or configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The XOR key is not valid hex.
    #[error("invalid xor key: {0}")]
    InvalidKey(String),

    /// The XOR key decodes to zero bytes.
    #[error("xor key cannot be empty")]
    EmptyKey,

    /// Base64 decoding failed.
    #[error("invalid base64 input: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Unrecognized base64 direction name.
    #[error("unknown base64 direction {0:?} (expected encode or decode)")]
    UnknownDirection(String),
}

/// One step of a [`Pipeline`].
pub trait ByteTransform: fmt::Debug + Send + Sync {
    /// Short stage name for logs.
    fn name(&self) -> &'static str;

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError>;
}

/// Copies its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ByteTransform for Passthrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(input.to_vec())
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct XorKey(Vec<u8>);

/// XOR with a repeating key.
///
/// Without a pad byte the key cycles over the whole input. With one, bytes
/// past the end of the key are XORed with the pad instead. Applying the same
/// transform twice restores the input. The key is wiped when the transform is
/// dropped.
pub struct XorTransform {
    key: XorKey,
    pad: Option<u8>,
}

impl XorTransform {
    pub fn new(key: Vec<u8>, pad: Option<u8>) -> Result<Self, TransformError> {
        let key = XorKey(key);
        if key.0.is_empty() {
            return Err(TransformError::EmptyKey);
        }
        Ok(Self { key, pad })
    }

    /// Build from a hex key such as `"abcd1234"`.
    pub fn from_hex(key: &str, pad: Option<u8>) -> Result<Self, TransformError> {
        let key = hex::decode(key.trim())
            .map_err(|err| TransformError::InvalidKey(err.to_string()))?;
        Self::new(key, pad)
    }

    pub fn key_len(&self) -> usize {
        self.key.0.len()
    }

    pub fn pad(&self) -> Option<u8> {
        self.pad
    }
}

impl ByteTransform for XorTransform {
    fn name(&self) -> &'static str {
        "xor"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let key = &self.key.0;
        Ok(input
            .iter()
            .enumerate()
            .map(|(i, &byte)| match self.pad {
                Some(pad) if i >= key.len() => byte ^ pad,
                _ => byte ^ key[i % key.len()],
            })
            .collect())
    }
}

impl fmt::Debug for XorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XorTransform")
            .field("key_len", &self.key_len())
            .field("pad", &self.pad)
            .finish()
    }
}

/// Which way a [`Base64Transform`] converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Base64Direction {
    #[default]
    Encode,
    Decode,
}

impl Base64Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Base64Direction::Encode => "encode",
            Base64Direction::Decode => "decode",
        }
    }
}

impl fmt::Display for Base64Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Base64Direction {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "encode" => Ok(Base64Direction::Encode),
            "decode" => Ok(Base64Direction::Decode),
            _ => Err(TransformError::UnknownDirection(s.to_string())),
        }
    }
}

/// Standard-alphabet base64, with or without `=` padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base64Transform {
    direction: Base64Direction,
    padding: bool,
}

impl Base64Transform {
    pub fn new(direction: Base64Direction, padding: bool) -> Self {
        Self { direction, padding }
    }

    pub fn direction(&self) -> Base64Direction {
        self.direction
    }

    pub fn padding(&self) -> bool {
        self.padding
    }
}

impl ByteTransform for Base64Transform {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let engine = if self.padding { &STANDARD } else { &STANDARD_NO_PAD };
        match self.direction {
            Base64Direction::Encode => Ok(engine.encode(input).into_bytes()),
            Base64Direction::Decode => Ok(engine.decode(input)?),
        }
    }
}

/// An ordered list of transform stages. Empty means "leave messages alone".
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn ByteTransform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn with_stage<T>(mut self, stage: T) -> Self
    where
        T: ByteTransform + 'static,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Stage names in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// The same stages in the opposite order, for the receiving side.
    pub fn reversed(&self) -> Self {
        Self {
            stages: self.stages.iter().rev().cloned().collect(),
        }
    }

    /// Run every stage in order; the first failure stops the pipeline.
    pub fn process_all(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let mut data = input.to_vec();
        for stage in &self.stages {
            data = stage.apply(&data)?;
            trace!(stage = stage.name(), size = data.len(), "transform applied");
        }
        Ok(data)
    }

    /// Transform a message's content.
    ///
    /// Text stays text when the result is still valid UTF-8; anything else
    /// comes back as binary.
    pub fn apply(&self, message: &Message) -> Result<Message, TransformError> {
        if self.is_empty() {
            return Ok(message.clone());
        }

        let out = self.process_all(message.as_bytes())?;
        Ok(match message {
            Message::Text(_) => match String::from_utf8(out) {
                Ok(text) => Message::Text(text),
                Err(err) => Message::Binary(Bytes::from(err.into_bytes())),
            },
            Message::Binary(_) => Message::Binary(Bytes::from(out)),
        })
    }
}
