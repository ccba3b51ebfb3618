//! The reflective message base: the runtime behavior every generated
//! dataclass gets "for free", mirrored from `betterproto.Message`.
//!
//! A [`Message`] does not know its own field set at compile time; it is
//! driven entirely by a `&'static [FieldMetadata]` schema supplied by the
//! generated type. Unset fields read back their zero value without ever
//! being marked as present (`is_set`/`_serialized_on_wire` semantics);
//! assigning a field that belongs to a `oneof` clears its siblings
//! ("last write wins").

use std::collections::HashMap;

use bytes::{Buf, BufMut};
use cbproto_types::{Duration, Timestamp, Wrapper};

use crate::encoding::{self, WireType};
use crate::error::DecodeErrorKind;
use crate::metadata::{FieldKind, FieldMetadata};
use crate::unknown::{self, UnknownFields};
use crate::value::Value;
use crate::{DecodeError, EncodeError};

/// A dynamically-typed Protobuf message instance.
#[derive(Clone, Debug)]
pub struct Message {
    type_name: &'static str,
    metadata: &'static [FieldMetadata],
    fields: HashMap<&'static str, Value>,
    /// For each oneof group, the name of the field currently holding its
    /// value, if any. Mirrors `_group_current`.
    group_current: HashMap<&'static str, &'static str>,
    unknown_fields: UnknownFields,
}

impl Message {
    /// Creates an empty message for the given metadata schema. `type_name`
    /// is the fully qualified proto message name, used only for error
    /// messages and dict-projection diagnostics.
    pub fn new(type_name: &'static str, metadata: &'static [FieldMetadata]) -> Self {
        Message {
            type_name,
            metadata,
            fields: HashMap::new(),
            group_current: HashMap::new(),
            unknown_fields: UnknownFields::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn metadata(&self) -> &'static [FieldMetadata] {
        self.metadata
    }

    fn field_meta(&self, name: &str) -> Option<&'static FieldMetadata> {
        self.metadata.iter().find(|m| m.name == name)
    }

    /// Whether `name` was ever explicitly assigned.
    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Reads a field's current value, returning its zero value (without
    /// recording presence) if it was never assigned.
    pub fn get(&self, name: &str) -> Value {
        if let Some(value) = self.fields.get(name) {
            return value.clone();
        }
        let meta = self
            .field_meta(name)
            .unwrap_or_else(|| panic!("{}: no such field `{name}`", self.type_name));
        default_value(meta)
    }

    /// Assigns a field, clearing any sibling in the same `oneof` group.
    pub fn set(&mut self, name: &'static str, value: Value) {
        let meta = self
            .field_meta(name)
            .unwrap_or_else(|| panic!("{}: no such field `{name}`", self.type_name))
            .clone();

        if let Some(group) = meta.oneof_group {
            if let Some(previous) = self.group_current.insert(group, name) {
                if previous != name {
                    self.fields.remove(previous);
                }
            }
        }
        self.fields.insert(name, value);
    }

    /// Clears a field back to "never set".
    pub fn clear_field(&mut self, name: &str) {
        self.fields.remove(name);
        if let Some(meta) = self.field_meta(name) {
            if let Some(group) = meta.oneof_group {
                if self.group_current.get(group) == Some(&name) {
                    self.group_current.remove(group);
                }
            }
        }
    }

    /// Returns `(field_name, value)` for whichever field of `group` is
    /// currently set, or `("", None)` if none has ever been assigned -
    /// matching `betterproto.Message.which_one_of`'s empty-string sentinel.
    pub fn which_one_of(&self, group: &str) -> (String, Option<Value>) {
        match self.group_current.get(group) {
            Some(name) => (name.to_string(), self.fields.get(name).cloned()),
            None => (String::new(), None),
        }
    }

    pub fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    /// Whether this message is "empty": no field was ever explicitly set
    /// and no unknown bytes were preserved.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unknown_fields.is_empty()
    }

    // -- wire codec -------------------------------------------------------

    pub fn encoded_len(&self) -> usize {
        let mut len = 0;
        for meta in self.metadata {
            if let Some(value) = self.fields.get(meta.name) {
                if self.should_encode(meta, value) {
                    len += encoded_field_len(meta, value);
                }
            }
        }
        len + self.unknown_fields.len()
    }

    pub fn encode_raw(&self, buf: &mut impl BufMut) {
        for meta in self.metadata {
            if let Some(value) = self.fields.get(meta.name) {
                if self.should_encode(meta, value) {
                    encode_field(meta, value, buf);
                }
            }
        }
        self.unknown_fields.encode_raw(buf);
    }

    /// Whether a present field's value should actually go on the wire.
    ///
    /// Mirrors `betterproto`'s `_serialize_single`: a field whose value
    /// equals its type's default is skipped unless it is the currently
    /// selected member of a `oneof` (`selected_in_group`), declared
    /// `optional` (explicit presence, so "set to default" still differs
    /// from "never set"), or message-typed (`serialize_empty`, since an
    /// empty nested message still carries presence on the wire).
    fn should_encode(&self, meta: &FieldMetadata, value: &Value) -> bool {
        if meta.optional || matches!(value, Value::Message(_)) {
            return true;
        }
        if let Some(group) = meta.oneof_group {
            if self.group_current.get(group) == Some(&meta.name) {
                return true;
            }
        }
        *value != default_value(meta)
    }

    pub fn encode(&self, buf: &mut impl BufMut) -> Result<(), EncodeError> {
        let required = self.encoded_len();
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::new(required, remaining));
        }
        self.encode_raw(buf);
        Ok(())
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_raw(&mut buf);
        buf
    }

    /// Decodes into a fresh message built from `metadata`, consuming the
    /// entire buffer.
    pub fn decode(
        type_name: &'static str,
        metadata: &'static [FieldMetadata],
        mut buf: impl Buf,
    ) -> Result<Self, DecodeError> {
        let mut message = Message::new(type_name, metadata);
        message.merge(&mut buf)?;
        Ok(message)
    }

    pub fn merge(&mut self, buf: &mut impl Buf) -> Result<(), DecodeError> {
        self.merge_with_depth(buf, crate::RECURSION_LIMIT)
    }

    fn merge_with_depth(&mut self, buf: &mut impl Buf, depth: u32) -> Result<(), DecodeError> {
        while buf.has_remaining() {
            let (field_number, wire_type) = encoding::decode_key(buf)?;
            self.merge_field(field_number, wire_type, buf, depth)?;
        }
        Ok(())
    }

    fn merge_field(
        &mut self,
        field_number: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        depth: u32,
    ) -> Result<(), DecodeError> {
        let Some(meta) = self.metadata.iter().find(|m| m.number == field_number) else {
            let mut raw = Vec::new();
            encoding::encode_key(field_number, wire_type, &mut raw);
            raw.extend(unknown::skip_value(wire_type, buf)?);
            self.unknown_fields.push(&raw);
            return Ok(());
        };
        let meta = meta.clone();

        if meta.repeated && meta.kind.is_packable() && wire_type == WireType::LengthDelimited {
            let packed = encoding::decode_length_delimited(buf)?;
            let mut slice = &packed[..];
            let mut values = match self.fields.remove(meta.name) {
                Some(Value::Repeated(values)) => values,
                _ => Vec::new(),
            };
            while slice.has_remaining() {
                values.push(decode_scalar(&meta.kind, &mut slice, depth)?);
            }
            self.set(meta.name, Value::Repeated(values));
            return Ok(());
        }

        let expected = encoding::wire_type_for(&meta.kind);
        if wire_type != expected {
            return Err(DecodeError::new(DecodeErrorKind::UnexpectedWireType {
                field: meta.name,
            }));
        }

        match &meta.kind {
            FieldKind::Map { key, value } => {
                let entry_bytes = encoding::decode_length_delimited(buf)?;
                let mut entry_buf = &entry_bytes[..];
                let mut entry_key = None;
                let mut entry_value = None;
                while entry_buf.has_remaining() {
                    let (number, wt) = encoding::decode_key(&mut entry_buf)?;
                    match number {
                        1 => {
                            if entry_key.is_some() {
                                return Err(DecodeError::new(DecodeErrorKind::MapKeyDecodedTwice));
                            }
                            let _ = wt;
                            entry_key = Some(decode_scalar(key, &mut entry_buf, depth)?);
                        }
                        2 => entry_value = Some(decode_scalar(value, &mut entry_buf, depth)?),
                        _ => {
                            unknown::skip_value(wt, &mut entry_buf)?;
                        }
                    }
                }
                let k = entry_key.unwrap_or_else(|| default_for_kind(key));
                let v = entry_value.unwrap_or_else(|| default_for_kind(value));
                let mut entries = match self.fields.remove(meta.name) {
                    Some(Value::Map(entries)) => entries,
                    _ => Vec::new(),
                };
                entries.retain(|(existing_key, _)| existing_key != &k);
                entries.push((k, v));
                self.set(meta.name, Value::Map(entries));
            }
            _ if meta.repeated => {
                let decoded = decode_scalar(&meta.kind, buf, depth)?;
                let mut values = match self.fields.remove(meta.name) {
                    Some(Value::Repeated(values)) => values,
                    _ => Vec::new(),
                };
                values.push(decoded);
                self.set(meta.name, Value::Repeated(values));
            }
            _ => {
                let decoded = decode_scalar(&meta.kind, buf, depth)?;
                self.set(meta.name, decoded);
            }
        }
        Ok(())
    }

    // -- dict / JSON projection -------------------------------------------

    /// Projects this message to a `serde_json::Value`, stringifying
    /// `Timestamp`/`Duration`-wrapped fields per the JSON mapping.
    pub fn to_dict(&self, casing: Casing) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for meta in self.metadata {
            if !self.is_set(meta.name) {
                continue;
            }
            let key = casing.convert(meta.name);
            map.insert(key, value_to_json(&meta.kind, &self.get(meta.name)));
        }
        serde_json::Value::Object(map)
    }

    /// Projects this message the same way as [`Message::to_dict`], except
    /// `Timestamp`/`Duration` fields are left as native values rather than
    /// stringified. Mirrors `cbproto.to_pydict`.
    pub fn to_pydict(&self) -> HashMap<&'static str, Value> {
        let mut out = HashMap::new();
        for meta in self.metadata {
            if self.is_set(meta.name) {
                out.insert(meta.name, self.get(meta.name));
            }
        }
        out
    }

    pub fn merge_pydict(&mut self, values: HashMap<&'static str, Value>) {
        for (name, value) in values {
            self.set(name, value);
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        if self.type_name != other.type_name {
            return false;
        }
        for meta in self.metadata {
            if self.get(meta.name) != other.get(meta.name) {
                return false;
            }
        }
        self.unknown_fields == other.unknown_fields
    }
}

/// Identifier casing applied when projecting a message to a dict/JSON map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Casing {
    Camel,
    Snake,
    Pascal,
}

impl Casing {
    fn convert(self, name: &str) -> String {
        use heck::{ToLowerCamelCase, ToPascalCase, ToSnakeCase};
        match self {
            Casing::Camel => name.to_lower_camel_case(),
            Casing::Snake => name.to_snake_case(),
            Casing::Pascal => name.to_pascal_case(),
        }
    }
}

fn default_value(meta: &FieldMetadata) -> Value {
    if meta.repeated {
        return Value::Repeated(Vec::new());
    }
    if let FieldKind::Map { .. } = meta.kind {
        return Value::Map(Vec::new());
    }
    default_for_kind(&meta.kind)
}

fn default_for_kind(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Bool => Value::Bool(false),
        FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => Value::I32(0),
        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => Value::I64(0),
        FieldKind::Uint32 | FieldKind::Fixed32 => Value::U32(0),
        FieldKind::Uint64 | FieldKind::Fixed64 => Value::U64(0),
        FieldKind::Float => Value::F32(0.0),
        FieldKind::Double => Value::F64(0.0),
        FieldKind::String => Value::String(String::new()),
        FieldKind::Bytes => Value::Bytes(Vec::new()),
        FieldKind::Enum { .. } => Value::Enum(0),
        FieldKind::Message { type_name, fields } => {
            Value::Message(Box::new(Message::new(*type_name, *fields)))
        }
        FieldKind::Map { .. } => Value::Map(Vec::new()),
    }
}

fn encoded_field_len(meta: &FieldMetadata, value: &Value) -> usize {
    match value {
        Value::Repeated(values) => {
            if meta.kind.is_packable() && !values.is_empty() {
                let payload_len: usize = values.iter().map(|v| scalar_encoded_len(&meta.kind, v)).sum();
                encoding::encoded_len_key(meta.number)
                    + encoding::encoded_len_varint(payload_len as u64)
                    + payload_len
            } else {
                values
                    .iter()
                    .map(|v| encoding::encoded_len_key(meta.number) + scalar_encoded_len(&meta.kind, v))
                    .sum()
            }
        }
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| {
                let FieldKind::Map { key, value } = &meta.kind else {
                    unreachable!()
                };
                let entry_len = encoding::encoded_len_key(1)
                    + scalar_encoded_len(key, k)
                    + encoding::encoded_len_key(2)
                    + scalar_encoded_len(value, v);
                encoding::encoded_len_key(meta.number)
                    + encoding::encoded_len_varint(entry_len as u64)
                    + entry_len
            })
            .sum(),
        _ => encoding::encoded_len_key(meta.number) + scalar_encoded_len(&meta.kind, value),
    }
}

fn scalar_encoded_len(kind: &FieldKind, value: &Value) -> usize {
    match (kind, value) {
        (FieldKind::Bool, Value::Bool(b)) => encoding::encoded_len_varint(*b as u64),
        (FieldKind::Int32 | FieldKind::Enum { .. }, Value::I32(v)) => {
            encoding::encoded_len_varint(*v as i64 as u64)
        }
        (FieldKind::Int64, Value::I64(v)) => encoding::encoded_len_varint(*v as u64),
        (FieldKind::Uint32, Value::U32(v)) => encoding::encoded_len_varint(*v as u64),
        (FieldKind::Uint64, Value::U64(v)) => encoding::encoded_len_varint(*v),
        (FieldKind::Sint32, Value::I32(v)) => {
            encoding::encoded_len_varint(u64::from(encoding::encode_zigzag32(*v)))
        }
        (FieldKind::Sint64, Value::I64(v)) => {
            encoding::encoded_len_varint(encoding::encode_zigzag64(*v))
        }
        (FieldKind::Fixed32 | FieldKind::Sfixed32 | FieldKind::Float, _) => 4,
        (FieldKind::Fixed64 | FieldKind::Sfixed64 | FieldKind::Double, _) => 8,
        (FieldKind::String, Value::String(s)) => {
            encoding::encoded_len_varint(s.len() as u64) + s.len()
        }
        (FieldKind::Bytes, Value::Bytes(b)) => {
            encoding::encoded_len_varint(b.len() as u64) + b.len()
        }
        (FieldKind::Message { .. }, Value::Message(m)) => {
            let len = m.encoded_len();
            encoding::encoded_len_varint(len as u64) + len
        }
        _ => 0,
    }
}

fn encode_field(meta: &FieldMetadata, value: &Value, buf: &mut impl BufMut) {
    match value {
        Value::Repeated(values) => {
            if meta.kind.is_packable() && !values.is_empty() {
                let payload_len: usize = values.iter().map(|v| scalar_encoded_len(&meta.kind, v)).sum();
                encoding::encode_key(meta.number, WireType::LengthDelimited, buf);
                encoding::encode_varint(payload_len as u64, buf);
                for v in values {
                    encode_scalar(&meta.kind, v, buf);
                }
            } else {
                for v in values {
                    encoding::encode_key(meta.number, encoding::wire_type_for(&meta.kind), buf);
                    encode_scalar(&meta.kind, v, buf);
                }
            }
        }
        Value::Map(entries) => {
            let FieldKind::Map { key, value: val_kind } = &meta.kind else {
                unreachable!()
            };
            for (k, v) in entries {
                let entry_len = encoding::encoded_len_key(1)
                    + scalar_encoded_len(key, k)
                    + encoding::encoded_len_key(2)
                    + scalar_encoded_len(val_kind, v);
                encoding::encode_key(meta.number, WireType::LengthDelimited, buf);
                encoding::encode_varint(entry_len as u64, buf);
                encoding::encode_key(1, encoding::wire_type_for(key), buf);
                encode_scalar(key, k, buf);
                encoding::encode_key(2, encoding::wire_type_for(val_kind), buf);
                encode_scalar(val_kind, v, buf);
            }
        }
        _ => {
            encoding::encode_key(meta.number, encoding::wire_type_for(&meta.kind), buf);
            encode_scalar(&meta.kind, value, buf);
        }
    }
}

fn encode_scalar(kind: &FieldKind, value: &Value, buf: &mut impl BufMut) {
    match (kind, value) {
        (FieldKind::Bool, Value::Bool(b)) => encoding::encode_varint(*b as u64, buf),
        (FieldKind::Int32 | FieldKind::Enum { .. }, Value::I32(v)) => {
            encoding::encode_varint(*v as i64 as u64, buf)
        }
        (FieldKind::Int64, Value::I64(v)) => encoding::encode_varint(*v as u64, buf),
        (FieldKind::Uint32, Value::U32(v)) => encoding::encode_varint(*v as u64, buf),
        (FieldKind::Uint64, Value::U64(v)) => encoding::encode_varint(*v, buf),
        (FieldKind::Sint32, Value::I32(v)) => {
            encoding::encode_varint(u64::from(encoding::encode_zigzag32(*v)), buf)
        }
        (FieldKind::Sint64, Value::I64(v)) => {
            encoding::encode_varint(encoding::encode_zigzag64(*v), buf)
        }
        (FieldKind::Fixed32, Value::U32(v)) => encoding::encode_fixed32(*v, buf),
        (FieldKind::Sfixed32, Value::I32(v)) => encoding::encode_fixed32(*v as u32, buf),
        (FieldKind::Float, Value::F32(v)) => encoding::encode_fixed32(v.to_bits(), buf),
        (FieldKind::Fixed64, Value::U64(v)) => encoding::encode_fixed64(*v, buf),
        (FieldKind::Sfixed64, Value::I64(v)) => encoding::encode_fixed64(*v as u64, buf),
        (FieldKind::Double, Value::F64(v)) => encoding::encode_fixed64(v.to_bits(), buf),
        (FieldKind::String, Value::String(s)) => {
            encoding::encode_length_delimited(s.as_bytes(), buf)
        }
        (FieldKind::Bytes, Value::Bytes(b)) => encoding::encode_length_delimited(b, buf),
        (FieldKind::Message { .. }, Value::Message(m)) => {
            encoding::encode_varint(m.encoded_len() as u64, buf);
            m.encode_raw(buf);
        }
        _ => {}
    }
}

fn decode_scalar(kind: &FieldKind, buf: &mut impl Buf, depth: u32) -> Result<Value, DecodeError> {
    Ok(match kind {
        FieldKind::Bool => Value::Bool(encoding::decode_varint(buf)? != 0),
        FieldKind::Int32 => Value::I32(encoding::decode_varint(buf)? as i32),
        FieldKind::Int64 => Value::I64(encoding::decode_varint(buf)? as i64),
        FieldKind::Uint32 => Value::U32(encoding::decode_varint(buf)? as u32),
        FieldKind::Uint64 => Value::U64(encoding::decode_varint(buf)?),
        FieldKind::Sint32 => {
            Value::I32(encoding::decode_zigzag32(encoding::decode_varint(buf)? as u32))
        }
        FieldKind::Sint64 => Value::I64(encoding::decode_zigzag64(encoding::decode_varint(buf)?)),
        FieldKind::Fixed32 => Value::U32(encoding::decode_fixed32(buf)?),
        FieldKind::Sfixed32 => Value::I32(encoding::decode_fixed32(buf)? as i32),
        FieldKind::Float => Value::F32(f32::from_bits(encoding::decode_fixed32(buf)?)),
        FieldKind::Fixed64 => Value::U64(encoding::decode_fixed64(buf)?),
        FieldKind::Sfixed64 => Value::I64(encoding::decode_fixed64(buf)? as i64),
        FieldKind::Double => Value::F64(f64::from_bits(encoding::decode_fixed64(buf)?)),
        FieldKind::Enum { .. } => Value::Enum(encoding::decode_varint(buf)? as i32),
        FieldKind::String => {
            let bytes = encoding::decode_length_delimited(buf)?;
            Value::String(
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidString))?,
            )
        }
        FieldKind::Bytes => Value::Bytes(encoding::decode_length_delimited(buf)?.to_vec()),
        FieldKind::Message { type_name, fields } => {
            if depth == 0 {
                return Err(DecodeError::new(DecodeErrorKind::RecursionLimitReached));
            }
            let bytes = encoding::decode_length_delimited(buf)?;
            let mut message = Message::new(*type_name, *fields);
            message.merge_with_depth(&mut &bytes[..], depth - 1)?;
            Value::Message(Box::new(message))
        }
        FieldKind::Map { .. } => unreachable!("map fields are decoded by their own entry loop"),
    })
}

fn value_to_json(kind: &FieldKind, value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::I32(v) => serde_json::Value::from(*v),
        Value::I64(v) => serde_json::Value::String(v.to_string()),
        Value::U32(v) => serde_json::Value::from(*v),
        Value::U64(v) => serde_json::Value::String(v.to_string()),
        Value::F32(v) => float_to_json(*v as f64, || serde_json::Value::from(*v)),
        Value::F64(v) => float_to_json(*v, || serde_json::Value::from(*v)),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::String(base64_encode(b)),
        Value::Enum(v) => {
            let FieldKind::Enum { entries, .. } = kind else {
                return serde_json::Value::from(*v);
            };
            match entries.iter().find(|(_, number)| number == v) {
                Some((name, _)) => serde_json::Value::String((*name).to_string()),
                None => serde_json::Value::from(*v),
            }
        }
        Value::Message(m) => message_to_json(m),
        Value::Repeated(values) => {
            serde_json::Value::Array(values.iter().map(|v| value_to_json(kind, v)).collect())
        }
        Value::Map(entries) => {
            let FieldKind::Map { key: key_kind, value: value_kind } = kind else {
                unreachable!("map-valued field must carry FieldKind::Map")
            };
            let mut map = serde_json::Map::new();
            for (k, v) in entries {
                let key = match k {
                    Value::String(s) => s.clone(),
                    other => value_to_json(key_kind, other).to_string(),
                };
                map.insert(key, value_to_json(value_kind, v));
            }
            serde_json::Value::Object(map)
        }
    }
}

/// Projects a float per the proto3 JSON mapping: the three non-finite
/// values as their literal strings (`serde_json` cannot represent them,
/// since JSON numbers have no notion of infinity or NaN), finite values via
/// `as_finite`.
fn float_to_json(v: f64, as_finite: impl FnOnce() -> serde_json::Value) -> serde_json::Value {
    if v.is_nan() {
        serde_json::Value::String("NaN".to_string())
    } else if v == f64::INFINITY {
        serde_json::Value::String("Infinity".to_string())
    } else if v == f64::NEG_INFINITY {
        serde_json::Value::String("-Infinity".to_string())
    } else {
        as_finite()
    }
}

/// Projects a message to JSON, special-casing the well-known types whose
/// JSON mapping is a bare string rather than an object: `Timestamp` (RFC
/// 3339), `Duration` (seconds with an optional fraction) and the Google
/// wrapper types (the boxed scalar itself).
fn message_to_json(m: &Message) -> serde_json::Value {
    match m.type_name() {
        "google.protobuf.Timestamp" => {
            let seconds = as_i64(m.get("seconds"));
            let nanos = as_i32(m.get("nanos"));
            serde_json::Value::String(Timestamp { seconds, nanos }.to_json())
        }
        "google.protobuf.Duration" => {
            let seconds = as_i64(m.get("seconds"));
            let nanos = as_i32(m.get("nanos"));
            serde_json::Value::String(Duration { seconds, nanos }.to_json())
        }
        type_name => match Wrapper::from_type_name(type_name) {
            Some(_) => {
                let meta = m
                    .field_meta("value")
                    .expect("wrapper message must declare a `value` field");
                value_to_json(&meta.kind, &m.get("value"))
            }
            None => m.to_dict(Casing::Camel),
        },
    }
}

fn as_i64(value: Value) -> i64 {
    match value {
        Value::I64(v) => v,
        _ => 0,
    }
}

fn as_i32(value: Value) -> i32 {
    match value {
        Value::I32(v) => v,
        _ => 0,
    }
}

/// Minimal base64 encoder for `bytes` fields in the JSON projection, which
/// the proto3 JSON mapping requires to be base64 strings.
fn base64_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(b2 & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::*;

    fn person_metadata() -> Vec<FieldMetadata> {
        vec![string_field("name", 1), int32_field("age", 2)]
    }

    #[test]
    fn unset_field_reads_zero_value_without_marking_present() {
        let fields: &'static [FieldMetadata] = Box::leak(person_metadata().into_boxed_slice());
        let message = Message::new("test.Person", fields);
        assert_eq!(message.get("name"), Value::String(String::new()));
        assert!(!message.is_set("name"));
    }

    #[test]
    fn set_marks_presence_and_round_trips() {
        let fields: &'static [FieldMetadata] = Box::leak(person_metadata().into_boxed_slice());
        let mut message = Message::new("test.Person", fields);
        message.set("name", Value::String("Ada".into()));
        message.set("age", Value::I32(30));
        assert!(message.is_set("name"));

        let bytes = message.encode_to_vec();
        let decoded = Message::decode("test.Person", fields, bytes.as_slice()).unwrap();
        assert_eq!(decoded.get("name"), Value::String("Ada".into()));
        assert_eq!(decoded.get("age"), Value::I32(30));
        assert_eq!(message, decoded);
    }

    #[test]
    fn explicitly_setting_a_field_to_its_default_is_not_serialized() {
        let fields: &'static [FieldMetadata] = Box::leak(person_metadata().into_boxed_slice());
        let mut message = Message::new("test.Person", fields);
        message.set("age", Value::I32(0));
        assert!(message.is_set("age"));
        assert!(message.encode_to_vec().is_empty());
    }

    #[test]
    fn oneof_member_set_to_its_default_is_still_serialized() {
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![
                int32_field("code", 1).in_oneof("result"),
                string_field("message", 2).in_oneof("result"),
            ]
            .into_boxed_slice(),
        );
        let mut message = Message::new("test.Result", fields);
        message.set("code", Value::I32(0));
        assert!(!message.encode_to_vec().is_empty());

        let decoded = Message::decode("test.Result", fields, message.encode_to_vec().as_slice())
            .unwrap();
        assert_eq!(decoded.which_one_of("result").0, "code");
    }

    #[test]
    fn optional_field_set_to_its_default_is_still_serialized() {
        let fields: &'static [FieldMetadata] =
            Box::leak(vec![int32_field("age", 1).optional()].into_boxed_slice());
        let mut message = Message::new("test.Person", fields);
        message.set("age", Value::I32(0));
        assert!(!message.encode_to_vec().is_empty());
    }

    #[test]
    fn enum_field_projects_to_its_member_name_in_json() {
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![enum_field(
                "status",
                1,
                "test.Status",
                &[("UNKNOWN", 0), ("ACTIVE", 1)],
            )]
            .into_boxed_slice(),
        );
        let mut message = Message::new("test.Person", fields);
        message.set("status", Value::Enum(1));
        let json = message.to_dict(Casing::Camel);
        assert_eq!(json["status"], serde_json::json!("ACTIVE"));
    }

    #[test]
    fn non_finite_floats_project_to_their_literal_strings_in_json() {
        let fields: &'static [FieldMetadata] =
            Box::leak(vec![double_field("ratio", 1)].into_boxed_slice());
        let mut message = Message::new("test.Stat", fields);
        message.set("ratio", Value::F64(f64::NAN));
        assert_eq!(message.to_dict(Casing::Camel)["ratio"], serde_json::json!("NaN"));

        message.set("ratio", Value::F64(f64::INFINITY));
        assert_eq!(
            message.to_dict(Casing::Camel)["ratio"],
            serde_json::json!("Infinity")
        );

        message.set("ratio", Value::F64(f64::NEG_INFINITY));
        assert_eq!(
            message.to_dict(Casing::Camel)["ratio"],
            serde_json::json!("-Infinity")
        );
    }

    #[test]
    fn timestamp_field_projects_to_rfc3339_in_json() {
        let timestamp_fields: &'static [FieldMetadata] =
            Box::leak(vec![int64_field("seconds", 1), int32_field("nanos", 2)].into_boxed_slice());
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![message_field(
                "created_at",
                1,
                "google.protobuf.Timestamp",
                timestamp_fields,
            )]
            .into_boxed_slice(),
        );
        let mut inner = Message::new("google.protobuf.Timestamp", timestamp_fields);
        inner.set("seconds", Value::I64(0));
        inner.set("nanos", Value::I32(250_000_000));
        let mut message = Message::new("test.Event", fields);
        message.set("created_at", Value::Message(Box::new(inner)));

        let json = message.to_dict(Casing::Camel);
        assert_eq!(
            json["createdAt"],
            serde_json::json!("1970-01-01T00:00:00.250Z")
        );
    }

    #[test]
    fn oneof_write_resets_sibling() {
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![
                string_field("email", 1).in_oneof("contact"),
                string_field("phone", 2).in_oneof("contact"),
            ]
            .into_boxed_slice(),
        );
        let mut message = Message::new("test.Contact", fields);
        message.set("email", Value::String("a@example.com".into()));
        assert!(message.is_set("email"));
        message.set("phone", Value::String("555".into()));
        assert!(!message.is_set("email"));
        assert!(message.is_set("phone"));

        let (name, value) = message.which_one_of("contact");
        assert_eq!(name, "phone");
        assert_eq!(value, Some(Value::String("555".into())));
    }

    #[test]
    fn which_one_of_is_empty_string_when_never_set() {
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![
                string_field("email", 1).in_oneof("contact"),
                string_field("phone", 2).in_oneof("contact"),
            ]
            .into_boxed_slice(),
        );
        let message = Message::new("test.Contact", fields);
        assert_eq!(message.which_one_of("contact"), (String::new(), None));
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let known_fields: &'static [FieldMetadata] =
            Box::leak(vec![string_field("name", 1)].into_boxed_slice());
        let all_fields: &'static [FieldMetadata] =
            Box::leak(vec![string_field("name", 1), int32_field("extra", 99)].into_boxed_slice());

        let mut full = Message::new("test.Person", all_fields);
        full.set("name", Value::String("Ada".into()));
        full.set("extra", Value::I32(7));
        let bytes = full.encode_to_vec();

        let decoded = Message::decode("test.Person", known_fields, bytes.as_slice()).unwrap();
        assert!(!decoded.unknown_fields().is_empty());
        let re_encoded = decoded.encode_to_vec();

        let round_tripped =
            Message::decode("test.Person", all_fields, re_encoded.as_slice()).unwrap();
        assert_eq!(round_tripped.get("extra"), Value::I32(7));
    }

    #[test]
    fn packed_repeated_round_trips() {
        let fields: &'static [FieldMetadata] =
            Box::leak(vec![int32_field("values", 1).repeated()].into_boxed_slice());
        let mut message = Message::new("test.Numbers", fields);
        message.set(
            "values",
            Value::Repeated(vec![Value::I32(1), Value::I32(2), Value::I32(3)]),
        );
        let bytes = message.encode_to_vec();
        let decoded = Message::decode("test.Numbers", fields, bytes.as_slice()).unwrap();
        assert_eq!(decoded.get("values"), message.get("values"));
    }

    #[test]
    fn map_field_round_trips() {
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![map_field(
                "labels",
                1,
                FieldKind::String,
                FieldKind::String,
            )]
            .into_boxed_slice(),
        );
        let mut message = Message::new("test.Tagged", fields);
        message.set(
            "labels",
            Value::Map(vec![(
                Value::String("env".into()),
                Value::String("prod".into()),
            )]),
        );
        let bytes = message.encode_to_vec();
        let decoded = Message::decode("test.Tagged", fields, bytes.as_slice()).unwrap();
        assert_eq!(decoded.get("labels"), message.get("labels"));
    }

    #[test]
    fn nan_fields_compare_equal() {
        let fields: &'static [FieldMetadata] =
            Box::leak(vec![double_field("ratio", 1)].into_boxed_slice());
        let mut a = Message::new("test.Stat", fields);
        a.set("ratio", Value::F64(f64::NAN));
        let mut b = Message::new("test.Stat", fields);
        b.set("ratio", Value::F64(f64::NAN));
        assert_eq!(a, b);
    }

    #[test]
    fn nested_message_field_round_trips() {
        let inner_fields: &'static [FieldMetadata] =
            Box::leak(vec![string_field("city", 1)].into_boxed_slice());
        let outer_fields: &'static [FieldMetadata] = Box::leak(
            vec![message_field("address", 1, "test.Address", inner_fields)].into_boxed_slice(),
        );

        let mut inner = Message::new("test.Address", inner_fields);
        inner.set("city", Value::String("Ada".into()));
        let mut outer = Message::new("test.Person", outer_fields);
        outer.set("address", Value::Message(Box::new(inner)));

        let bytes = outer.encode_to_vec();
        let decoded = Message::decode("test.Person", outer_fields, bytes.as_slice()).unwrap();
        let decoded_inner = decoded.get("address");
        let decoded_inner = decoded_inner.as_message().unwrap();
        assert_eq!(decoded_inner.get("city"), Value::String("Ada".into()));
        assert!(decoded_inner.unknown_fields().is_empty());
        assert_eq!(decoded, outer);
    }

    #[test]
    fn merge_rejects_recursion_past_the_limit() {
        let grandchild_fields: &'static [FieldMetadata] = &[];
        let fields: &'static [FieldMetadata] = Box::leak(
            vec![message_field(
                "child",
                1,
                "test.Node",
                grandchild_fields,
            )]
            .into_boxed_slice(),
        );
        let mut message = Message::new("test.Node", fields);
        assert!(message.merge_with_depth(&mut &[][..], 0).is_ok());

        message.set(
            "child",
            Value::Message(Box::new(Message::new("test.Node", fields))),
        );
        let bytes = message.encode_to_vec();
        let err = Message::new("test.Node", fields)
            .merge_with_depth(&mut bytes.as_slice(), 0)
            .unwrap_err();
        assert_eq!(*err.kind(), DecodeErrorKind::RecursionLimitReached);
    }
}
