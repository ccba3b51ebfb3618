//! The eight `google.protobuf.*Value` wrapper messages, plus `EnumValue`, a
//! local, non-standard extension wrapping a bare `int32` the same way so a
//! oneof arm can carry "an enum, or nothing" without forcing every enum field
//! in the message to become optional.

/// Identifies which wrapper message a field's type name refers to. The
/// generator uses this to unwrap the field to a native optional value
/// instead of emitting a nested message type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wrapper {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Bytes,
    /// Non-standard: wraps a bare `int32` enum value. Not part of the
    /// upstream well-known types; preserved here as a documented local
    /// extension rather than dropped.
    EnumValue,
}

impl Wrapper {
    /// Maps a fully qualified proto type name to the wrapper it names, if
    /// any.
    pub fn from_type_name(name: &str) -> Option<Wrapper> {
        Some(match name.trim_start_matches('.') {
            "google.protobuf.BoolValue" => Wrapper::Bool,
            "google.protobuf.Int32Value" => Wrapper::Int32,
            "google.protobuf.Int64Value" => Wrapper::Int64,
            "google.protobuf.UInt32Value" => Wrapper::UInt32,
            "google.protobuf.UInt64Value" => Wrapper::UInt64,
            "google.protobuf.FloatValue" => Wrapper::Float,
            "google.protobuf.DoubleValue" => Wrapper::Double,
            "google.protobuf.StringValue" => Wrapper::String,
            "google.protobuf.BytesValue" => Wrapper::Bytes,
            "cbproto.EnumValue" => Wrapper::EnumValue,
            _ => return None,
        })
    }
}

/// The local extension itself: a single `value` field, identical in shape to
/// `google.protobuf.Int32Value` but named distinctly so enum-typed oneof
/// members can be unwrapped the same way scalar wrapper types are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub value: i32,
}

impl From<i32> for EnumValue {
    fn from(value: i32) -> Self {
        EnumValue { value }
    }
}

impl From<EnumValue> for i32 {
    fn from(wrapper: EnumValue) -> Self {
        wrapper.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_standard_wrappers() {
        assert_eq!(
            Wrapper::from_type_name(".google.protobuf.StringValue"),
            Some(Wrapper::String)
        );
    }

    #[test]
    fn recognizes_enum_value_extension() {
        assert_eq!(Wrapper::from_type_name("cbproto.EnumValue"), Some(Wrapper::EnumValue));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(Wrapper::from_type_name("google.protobuf.Timestamp"), None);
    }
}
