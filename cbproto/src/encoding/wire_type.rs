use crate::error::DecodeErrorKind;
use crate::DecodeError;

/// The wire type of an encoded field, carried in the low 3 bits of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    SixtyFourBit = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    ThirtyTwoBit = 5,
}

impl TryFrom<u64> for WireType {
    type Error = DecodeError;

    #[inline]
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::ThirtyTwoBit),
            _ => Err(DecodeError::new(DecodeErrorKind::InvalidWireType(value))),
        }
    }
}

/// The wire type a given field kind is expected to arrive as on the wire.
pub fn wire_type_for(kind: &crate::FieldKind) -> WireType {
    use crate::FieldKind::*;
    match kind {
        Bool | Int32 | Int64 | Uint32 | Uint64 | Sint32 | Sint64 | Enum { .. } => WireType::Varint,
        Fixed64 | Sfixed64 | Double => WireType::SixtyFourBit,
        Fixed32 | Sfixed32 | Float => WireType::ThirtyTwoBit,
        String | Bytes | Message { .. } | Map { .. } => WireType::LengthDelimited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        assert!(WireType::try_from(6).is_err());
    }

    #[test]
    fn round_trips_all_valid_values() {
        for v in 0..=5u64 {
            assert!(WireType::try_from(v).is_ok());
        }
    }
}
