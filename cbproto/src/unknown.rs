//! Preservation of unrecognized fields encountered while decoding.
//!
//! A field number absent from a message's metadata is not an error: its
//! raw wire-format bytes (key + payload) are appended verbatim and replayed
//! unchanged the next time the message is re-encoded, mirroring
//! `betterproto.Message._unknown_fields`.

use bytes::{Buf, BufMut};

/// The raw, still wire-encoded bytes of every field a message's metadata
/// does not recognize.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnknownFields(Vec<u8>);

impl UnknownFields {
    pub fn new() -> Self {
        UnknownFields(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Append the raw bytes of one skipped field, key included.
    pub fn push(&mut self, raw: &[u8]) {
        self.0.extend_from_slice(raw);
    }

    pub fn encode_raw(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Skips a value of the given wire type, returning the raw bytes consumed
/// (key excluded; callers prepend the key bytes themselves).
pub fn skip_value(
    wire_type: crate::encoding::WireType,
    buf: &mut impl Buf,
) -> Result<Vec<u8>, crate::DecodeError> {
    use crate::encoding::WireType;
    use crate::error::DecodeErrorKind;

    let mut raw = Vec::new();
    match wire_type {
        WireType::Varint => {
            let value = crate::encoding::varint::decode_varint(buf)?;
            crate::encoding::varint::encode_varint(value, &mut raw);
        }
        WireType::SixtyFourBit => {
            if buf.remaining() < 8 {
                return Err(crate::DecodeError::new(DecodeErrorKind::BufferUnderflow));
            }
            for _ in 0..8 {
                raw.push(buf.get_u8());
            }
        }
        WireType::ThirtyTwoBit => {
            if buf.remaining() < 4 {
                return Err(crate::DecodeError::new(DecodeErrorKind::BufferUnderflow));
            }
            for _ in 0..4 {
                raw.push(buf.get_u8());
            }
        }
        WireType::LengthDelimited => {
            let len = crate::encoding::varint::decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(crate::DecodeError::new(DecodeErrorKind::BufferUnderflow));
            }
            crate::encoding::varint::encode_varint(len as u64, &mut raw);
            raw.extend_from_slice(&buf.copy_to_bytes(len));
        }
        WireType::StartGroup | WireType::EndGroup => {
            return Err(crate::DecodeError::new(DecodeErrorKind::UnexpectedWireType {
                field: "<group>",
            }));
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_raw_bytes() {
        let mut unknown = UnknownFields::new();
        unknown.push(&[1, 2, 3]);
        unknown.push(&[4]);
        assert_eq!(unknown.as_slice(), &[1, 2, 3, 4]);
    }
}
