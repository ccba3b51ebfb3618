//! Wire codec encoding and decoding errors.

use std::error::Error;
use std::fmt;

/// A wire-format decoding error.
///
/// `DecodeError` indicates that the input buffer does not contain a valid
/// encoded message. The `kind` is 'best effort': in general it is not
/// possible to exactly pinpoint why data is malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// A varint continued past the maximum of 10 bytes.
    VarintOverrun,
    /// The final tag/wire-type byte of a key was malformed.
    InvalidTag,
    /// A wire type value outside 0..=5 was encountered.
    InvalidWireType(u64),
    /// A field's wire type did not match what its declared kind expects.
    UnexpectedWireType { field: &'static str },
    /// A length delimiter would run past the end of the buffer.
    BufferUnderflow,
    /// A `map_entry` synthetic message carried the same key field twice.
    MapKeyDecodedTwice,
    /// The byte sequence was not valid UTF-8 where a string was expected.
    InvalidString,
    /// Recursion limit reached while decoding a nested message.
    RecursionLimitReached,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind) -> Self {
        DecodeError { kind }
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode message: ")?;
        match &self.kind {
            DecodeErrorKind::VarintOverrun => write!(f, "invalid varint"),
            DecodeErrorKind::InvalidTag => write!(f, "invalid tag value: 0"),
            DecodeErrorKind::InvalidWireType(v) => write!(f, "invalid wire type value: {v}"),
            DecodeErrorKind::UnexpectedWireType { field } => {
                write!(f, "unexpected wire type for field `{field}`")
            }
            DecodeErrorKind::BufferUnderflow => write!(f, "buffer underflow"),
            DecodeErrorKind::MapKeyDecodedTwice => {
                write!(f, "map entry key was present more than once")
            }
            DecodeErrorKind::InvalidString => {
                write!(f, "invalid string value: data is not UTF-8 encoded")
            }
            DecodeErrorKind::RecursionLimitReached => write!(f, "recursion limit reached"),
        }
    }
}

impl Error for DecodeError {}

impl From<DecodeError> for std::io::Error {
    fn from(error: DecodeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidData, error)
    }
}

/// A message encoding error.
///
/// Always indicates that the target buffer had insufficient capacity.
/// Encoding is otherwise infallible.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodeError {
    required: usize,
    remaining: usize,
}

impl EncodeError {
    pub fn new(required: usize, remaining: usize) -> EncodeError {
        EncodeError {
            required,
            remaining,
        }
    }

    pub fn required_capacity(&self) -> usize {
        self.required
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to encode message; insufficient buffer capacity (required: {}, remaining: {})",
            self.required, self.remaining
        )
    }
}

impl Error for EncodeError {}

impl From<EncodeError> for std::io::Error {
    fn from(error: EncodeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
    }
}

/// An unrecognized enumeration value.
///
/// Proto enums are open sets: this carries an integer unrecognized by the
/// presently used enum definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnknownEnumValue(pub i32);

impl fmt::Display for UnknownEnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown enumeration value {}", self.0)
    }
}

impl Error for UnknownEnumValue {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_kind() {
        let err = DecodeError::new(DecodeErrorKind::VarintOverrun);
        assert_eq!(err.to_string(), "failed to decode message: invalid varint");
    }
}
