//! Field metadata: the reflective description that drives encoding, decoding
//! and dict/JSON projection for a [`crate::Message`] field.
//!
//! Mirrors `betterproto.FieldMetadata` and its `*_field()` constructors: a
//! generated message does not hand-write its own wire handling, it declares
//! one `FieldMetadata` per field and the runtime does the rest.

/// The scalar/composite kind of a single field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
    /// Enum field, carrying the declared enum's fully qualified proto name
    /// and its member table (`name` -> numeric tag) so JSON projection can
    /// resolve a stored tag back to the member name that declared it.
    Enum {
        type_name: &'static str,
        entries: &'static [(&'static str, i32)],
    },
    /// Embedded message field, carrying the declared message's fully
    /// qualified proto name and field metadata, so a decoded instance of
    /// this field can be parsed into real fields rather than left as
    /// unknown bytes.
    Message {
        type_name: &'static str,
        fields: &'static [FieldMetadata],
    },
    /// A `map<K, V>` field. Represented on the wire as a repeated
    /// synthesized `MapEntry` message (key = field 1, value = field 2).
    Map {
        key: Box<FieldKind>,
        value: Box<FieldKind>,
    },
}

impl FieldKind {
    /// Whether this kind uses the varint wire type.
    pub fn is_varint(&self) -> bool {
        matches!(
            self,
            FieldKind::Bool
                | FieldKind::Int32
                | FieldKind::Int64
                | FieldKind::Uint32
                | FieldKind::Uint64
                | FieldKind::Sint32
                | FieldKind::Sint64
                | FieldKind::Enum { .. }
        )
    }

    /// Whether this kind uses zig-zag varint encoding.
    pub fn is_zigzag(&self) -> bool {
        matches!(self, FieldKind::Sint32 | FieldKind::Sint64)
    }

    /// Whether this kind is eligible for `packed` repeated encoding.
    pub fn is_packable(&self) -> bool {
        !matches!(
            self,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message { .. } | FieldKind::Map { .. }
        )
    }
}

/// Full metadata for one field of a message, as recorded in the generated
/// `ProtoClassMetadata` for that message type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMetadata {
    /// Declared field name, e.g. `display_name`.
    pub name: &'static str,
    /// Wire field number.
    pub number: u32,
    pub kind: FieldKind,
    /// `proto3` field presence: `repeated`.
    pub repeated: bool,
    /// `optional` scalar: distinguishes "unset" from "set to default".
    pub optional: bool,
    /// Name of the oneof group this field belongs to, if any.
    pub oneof_group: Option<&'static str>,
    /// Fully qualified name of the Google wrapper type this field was
    /// unwrapped from (e.g. `google.protobuf.StringValue`), if any.
    pub wrapped: Option<&'static str>,
}

impl FieldMetadata {
    fn new(name: &'static str, number: u32, kind: FieldKind) -> Self {
        FieldMetadata {
            name,
            number,
            kind,
            repeated: false,
            optional: false,
            oneof_group: None,
            wrapped: None,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn in_oneof(mut self, group: &'static str) -> Self {
        self.oneof_group = Some(group);
        self
    }

    pub fn wrapped(mut self, wrapper: &'static str) -> Self {
        self.wrapped = Some(wrapper);
        self
    }
}

macro_rules! scalar_field_ctor {
    ($ctor:ident, $kind:expr) => {
        pub fn $ctor(name: &'static str, number: u32) -> FieldMetadata {
            FieldMetadata::new(name, number, $kind)
        }
    };
}

scalar_field_ctor!(bool_field, FieldKind::Bool);
scalar_field_ctor!(int32_field, FieldKind::Int32);
scalar_field_ctor!(int64_field, FieldKind::Int64);
scalar_field_ctor!(uint32_field, FieldKind::Uint32);
scalar_field_ctor!(uint64_field, FieldKind::Uint64);
scalar_field_ctor!(sint32_field, FieldKind::Sint32);
scalar_field_ctor!(sint64_field, FieldKind::Sint64);
scalar_field_ctor!(fixed32_field, FieldKind::Fixed32);
scalar_field_ctor!(fixed64_field, FieldKind::Fixed64);
scalar_field_ctor!(sfixed32_field, FieldKind::Sfixed32);
scalar_field_ctor!(sfixed64_field, FieldKind::Sfixed64);
scalar_field_ctor!(float_field, FieldKind::Float);
scalar_field_ctor!(double_field, FieldKind::Double);
scalar_field_ctor!(string_field, FieldKind::String);
scalar_field_ctor!(bytes_field, FieldKind::Bytes);

pub fn enum_field(
    name: &'static str,
    number: u32,
    type_name: &'static str,
    entries: &'static [(&'static str, i32)],
) -> FieldMetadata {
    FieldMetadata::new(name, number, FieldKind::Enum { type_name, entries })
}

pub fn message_field(
    name: &'static str,
    number: u32,
    type_name: &'static str,
    fields: &'static [FieldMetadata],
) -> FieldMetadata {
    FieldMetadata::new(name, number, FieldKind::Message { type_name, fields })
}

pub fn map_field(name: &'static str, number: u32, key: FieldKind, value: FieldKind) -> FieldMetadata {
    FieldMetadata::new(
        name,
        number,
        FieldKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_compose() {
        let field = string_field("name", 1).optional();
        assert!(field.optional);
        assert_eq!(field.oneof_group, None);

        let field = int32_field("choice", 2).in_oneof("kind");
        assert_eq!(field.oneof_group, Some("kind"));
    }

    #[test]
    fn packability_excludes_length_delimited_kinds() {
        assert!(FieldKind::Int32.is_packable());
        assert!(!FieldKind::String.is_packable());
        assert!(!FieldKind::Message {
            type_name: "pkg.Msg",
            fields: &[],
        }
        .is_packable());
    }
}
