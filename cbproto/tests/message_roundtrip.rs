//! Whole-message behavior exercised through the public API only, the way a
//! consumer of a generated dataclass would use this runtime.

use cbproto::metadata::*;
use cbproto::{FieldKind, FieldMetadata, Message, Value};

fn contact_metadata() -> &'static [FieldMetadata] {
    Box::leak(
        vec![
            string_field("name", 1),
            string_field("email", 2).in_oneof("contact"),
            string_field("phone", 3).in_oneof("contact"),
            map_field("labels", 4, FieldKind::String, FieldKind::Int32),
            int32_field("priority", 5).optional(),
        ]
        .into_boxed_slice(),
    )
}

#[test]
fn unset_message_round_trips_as_empty_bytes() {
    let fields = contact_metadata();
    let message = Message::new("test.Contact", fields);
    assert!(message.is_empty());
    let bytes = message.encode_to_vec();
    assert!(bytes.is_empty());
}

#[test]
fn mixed_fields_round_trip_through_the_wire() {
    let fields = contact_metadata();
    let mut message = Message::new("test.Contact", fields);
    message.set("name", Value::String("Ada Lovelace".into()));
    message.set("phone", Value::String("555-0100".into()));
    message.set("priority", Value::I32(2));
    message.set(
        "labels",
        Value::Map(vec![(Value::String("team".into()), Value::I32(7))]),
    );

    let bytes = message.encode_to_vec();
    let decoded = Message::decode("test.Contact", fields, bytes.as_slice()).unwrap();

    assert_eq!(message, decoded);
    assert!(!decoded.is_set("email"));
    assert_eq!(decoded.which_one_of("contact").0, "phone");
}

#[test]
fn unknown_field_survives_a_decode_then_reencode_cycle() {
    let narrow: &'static [FieldMetadata] = Box::leak(vec![string_field("name", 1)].into_boxed_slice());
    let wide: &'static [FieldMetadata] =
        Box::leak(vec![string_field("name", 1), bool_field("archived", 2)].into_boxed_slice());

    let mut full = Message::new("test.Contact", wide);
    full.set("name", Value::String("Grace Hopper".into()));
    full.set("archived", Value::Bool(true));
    let bytes = full.encode_to_vec();

    let narrowed = Message::decode("test.Contact", narrow, bytes.as_slice()).unwrap();
    assert!(!narrowed.unknown_fields().is_empty());

    let re_encoded = narrowed.encode_to_vec();
    let widened = Message::decode("test.Contact", wide, re_encoded.as_slice()).unwrap();
    assert_eq!(widened.get("archived"), Value::Bool(true));
}

#[test]
fn clearing_a_field_drops_its_oneof_membership() {
    let fields: &'static [FieldMetadata] = Box::leak(
        vec![
            string_field("email", 1).in_oneof("contact"),
            string_field("phone", 2).in_oneof("contact"),
        ]
        .into_boxed_slice(),
    );
    let mut message = Message::new("test.Contact", fields);
    message.set("email", Value::String("a@example.com".into()));
    message.clear_field("email");
    assert_eq!(message.which_one_of("contact"), (String::new(), None));
    assert!(message.is_empty());
}
