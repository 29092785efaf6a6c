//! Message framing and payload codecs.
//!
//! Two layers live here:
//!
//! - **Wire framing.** TCP is a byte stream, so every message travels inside
//!   a small header that restores message boundaries:
//!   - a 2-byte magic number ("PP") for stream synchronization
//!   - a 4-byte little-endian payload length
//!
//!   [`FrameWriter::send`] puts exactly one message on the wire;
//!   [`FrameReader::read_frame`] hands back exactly one.
//!
//! - **Payload modes.** [`PayloadMode`] turns an application [`Message`] into
//!   frame payload bytes and back: UTF-8 text, raw bytes, or a GNU Radio PMT
//!   `u8vector` envelope (see [`envelope`]).
//!
//! - **Transforms.** An optional [`Pipeline`] of byte stages (XOR, base64)
//!   rewrites message content before encoding and after decoding.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod reader;
pub mod transform;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, PayloadError, Result};
pub use payload::{Message, PayloadMode};
pub use reader::FrameReader;
pub use transform::{
    Base64Direction, Base64Transform, ByteTransform, Passthrough, Pipeline, TransformError,
    XorTransform,
};
pub use writer::FrameWriter;
