//! GNU Radio PMT `u8vector` envelope.
//!
//! This is the byte layout `pmt::serialize_str(pmt::init_u8vector(..))`
//! produces. Once a frame payload has been taken out of its pushpull frame
//! header, the envelope bytes are exactly what `pmt::deserialize` accepts:
//!
//! ```text
//! ┌──────┬──────┬──────────────┬──────┬───────────┬──────────────┐
//! │ 0x0a │ 0x00 │ count (4B BE)│ npad │ npad×0x00 │ count bytes  │
//! │ tag  │ u8   │              │ (1)  │           │              │
//! └──────┴──────┴──────────────┴──────┴───────────┴──────────────┘
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::error::PayloadError;

/// PMT serialization tag for a uniform (typed) vector.
pub const PST_UNIFORM_VECTOR: u8 = 0x0a;

/// Uniform vector element type: unsigned 8-bit.
pub const UVI_U8: u8 = 0x00;

/// Mask selecting the element type; the high bit carries endianness.
pub const UVI_SUBTYPE_MASK: u8 = 0x7f;

/// Padding byte count written after the element count.
pub const ENVELOPE_PAD: u8 = 1;

/// Bytes before the payload in an envelope this module writes.
pub const ENVELOPE_HEADER_SIZE: usize = FIXED_HEADER_SIZE + ENVELOPE_PAD as usize;

// tag + subtype + count + npad
const FIXED_HEADER_SIZE: usize = 1 + 1 + 4 + 1;

/// Append `payload` wrapped as a `u8vector` envelope to `dst`.
pub fn encode_u8vector(payload: &[u8], dst: &mut BytesMut) -> Result<(), PayloadError> {
    let count = u32::try_from(payload.len()).map_err(|_| PayloadError::TooLarge(payload.len()))?;

    dst.reserve(ENVELOPE_HEADER_SIZE + payload.len());
    dst.put_u8(PST_UNIFORM_VECTOR);
    dst.put_u8(UVI_U8);
    dst.put_u32(count);
    dst.put_u8(ENVELOPE_PAD);
    dst.put_bytes(0, ENVELOPE_PAD as usize);
    dst.put_slice(payload);
    Ok(())
}

/// Validate a `u8vector` envelope and return its payload.
///
/// The envelope must fill `src` exactly: a declared count larger than the
/// remaining bytes is [`PayloadError::Truncated`], and leftover bytes are
/// [`PayloadError::TrailingBytes`].
pub fn decode_u8vector(src: &[u8]) -> Result<&[u8], PayloadError> {
    let available = src.len();
    let mut buf = src;

    if buf.remaining() < FIXED_HEADER_SIZE {
        // Still report a wrong tag first when there is one to look at.
        if let Some(&found) = buf.first() {
            if found != PST_UNIFORM_VECTOR {
                return Err(PayloadError::UnexpectedTag {
                    expected: PST_UNIFORM_VECTOR,
                    found,
                });
            }
        }
        return Err(PayloadError::Truncated {
            needed: FIXED_HEADER_SIZE,
            available,
        });
    }

    let tag = buf.get_u8();
    if tag != PST_UNIFORM_VECTOR {
        return Err(PayloadError::UnexpectedTag {
            expected: PST_UNIFORM_VECTOR,
            found: tag,
        });
    }

    let subtype = buf.get_u8();
    if subtype & UVI_SUBTYPE_MASK != UVI_U8 {
        return Err(PayloadError::UnexpectedVectorType {
            expected: UVI_U8,
            found: subtype,
        });
    }

    let count = buf.get_u32();
    let npad = buf.get_u8() as usize;

    // A declared count near u32::MAX does not fit a 32-bit usize sum.
    let body = usize::try_from(count)
        .ok()
        .and_then(|count| count.checked_add(npad));
    let Some(body) = body else {
        return Err(PayloadError::Truncated {
            needed: usize::MAX,
            available,
        });
    };
    if buf.remaining() < body {
        return Err(PayloadError::Truncated {
            needed: FIXED_HEADER_SIZE.saturating_add(body),
            available,
        });
    }

    buf.advance(npad);
    let (payload, rest) = buf.split_at(body - npad);
    if !rest.is_empty() {
        return Err(PayloadError::TrailingBytes(rest.len()));
    }

    Ok(payload)
}
