//! Dynamic, metadata-driven message runtime for the cbproto ecosystem.
//!
//! This crate is the behavioral contract that `protoc-gen-cbproto` assumes
//! when it emits dataclasses, enums and gRPC stubs: a [`Message`] is not a
//! statically generated Rust struct, it is a reflective bag of [`Value`]s
//! driven by [`FieldMetadata`], the same way the generated target-language
//! runtime is. The crate is never invoked by the generator itself; its
//! round-trip and oneof semantics are exercised directly by this repo's
//! tests.

mod error;
mod message;
pub mod metadata;
mod unknown;
mod value;

pub mod encoding;

pub use crate::error::{DecodeError, EncodeError, UnknownEnumValue};
pub use crate::message::Message;
pub use crate::metadata::{FieldKind, FieldMetadata};
pub use crate::unknown::UnknownFields;
pub use crate::value::Value;

const RECURSION_LIMIT: u32 = 100;
