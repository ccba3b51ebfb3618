//! Low-level wire codec primitives.
//!
//! Meant to be used only from [`crate::Message`]'s own encode/decode methods.

use bytes::{Buf, BufMut};

use crate::error::DecodeErrorKind;
use crate::DecodeError;

pub mod varint;
pub mod wire_type;

pub use varint::{
    decode_signed_varint, decode_varint, decode_zigzag32, decode_zigzag64, encode_signed_varint,
    encode_varint, encode_zigzag32, encode_zigzag64, encoded_len_varint,
};
pub use wire_type::{wire_type_for, WireType};

pub const MIN_TAG: u32 = 1;
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Encodes a field key: the field number and wire type packed into one varint.
#[inline]
pub fn encode_key(field_number: u32, wire_type: WireType, buf: &mut impl BufMut) {
    debug_assert!((MIN_TAG..=MAX_TAG).contains(&field_number));
    let key = (field_number << 3) | wire_type as u32;
    encode_varint(u64::from(key), buf);
}

/// Decodes a field key into its field number and wire type.
#[inline]
pub fn decode_key(buf: &mut impl Buf) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    if key > u64::from(u32::MAX) {
        return Err(DecodeError::new(DecodeErrorKind::InvalidTag));
    }
    let field_number = (key >> 3) as u32;
    if field_number == 0 {
        return Err(DecodeError::new(DecodeErrorKind::InvalidTag));
    }
    let wire_type = WireType::try_from(key & 0x07)?;
    Ok((field_number, wire_type))
}

pub fn encoded_len_key(field_number: u32) -> usize {
    encoded_len_varint(u64::from(field_number << 3))
}

#[inline]
pub fn encode_fixed32(value: u32, buf: &mut impl BufMut) {
    buf.put_u32_le(value);
}

#[inline]
pub fn decode_fixed32(buf: &mut impl Buf) -> Result<u32, DecodeError> {
    if buf.remaining() < 4 {
        return Err(DecodeError::new(DecodeErrorKind::BufferUnderflow));
    }
    Ok(buf.get_u32_le())
}

#[inline]
pub fn encode_fixed64(value: u64, buf: &mut impl BufMut) {
    buf.put_u64_le(value);
}

#[inline]
pub fn decode_fixed64(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    if buf.remaining() < 8 {
        return Err(DecodeError::new(DecodeErrorKind::BufferUnderflow));
    }
    Ok(buf.get_u64_le())
}

/// Reads a length-delimited payload (the varint length followed by that many
/// bytes), returning the raw slice without consuming any more than that.
pub fn decode_length_delimited(buf: &mut impl Buf) -> Result<bytes::Bytes, DecodeError> {
    let len = decode_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(DecodeError::new(DecodeErrorKind::BufferUnderflow));
    }
    Ok(buf.copy_to_bytes(len))
}

/// Writes a length-delimited payload: the varint length of `payload` followed
/// by `payload` itself.
pub fn encode_length_delimited(payload: &[u8], buf: &mut impl BufMut) {
    encode_varint(payload.len() as u64, buf);
    buf.put_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips() {
        let mut buf = Vec::new();
        encode_key(5, WireType::LengthDelimited, &mut buf);
        let mut slice = buf.as_slice();
        let (number, wire_type) = decode_key(&mut slice).unwrap();
        assert_eq!(number, 5);
        assert_eq!(wire_type, WireType::LengthDelimited);
    }

    #[test]
    fn rejects_field_number_zero() {
        // key = (0 << 3) | 0, a legal varint but an illegal tag.
        let mut slice: &[u8] = &[0x00];
        assert!(decode_key(&mut slice).is_err());
    }

    #[test]
    fn fixed32_round_trips() {
        let mut buf = Vec::new();
        encode_fixed32(0xdead_beef, &mut buf);
        let mut slice = buf.as_slice();
        assert_eq!(decode_fixed32(&mut slice).unwrap(), 0xdead_beef);
    }

    #[test]
    fn fixed64_round_trips() {
        let mut buf = Vec::new();
        encode_fixed64(0x0123_4567_89ab_cdef, &mut buf);
        let mut slice = buf.as_slice();
        assert_eq!(decode_fixed64(&mut slice).unwrap(), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn length_delimited_round_trips() {
        let mut buf = Vec::new();
        encode_length_delimited(b"hello", &mut buf);
        let mut slice = buf.as_slice();
        assert_eq!(&decode_length_delimited(&mut slice).unwrap()[..], b"hello");
    }
}
