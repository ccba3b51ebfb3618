//! Renders a `ProtoFile` group (one per output package) into the target
//! runtime's source text: enums, message dataclasses, and service
//! client/server stubs. Grounded on `cbiproto/plugin/models.py`'s compiler
//! classes and `cbiproto/plugin/compiler.py`'s `outputfile_compiler`.

use prost_types::field_descriptor_proto::Type;

use cbproto_types::Wrapper;

use crate::descriptor::{ProtoEnum, ProtoField, ProtoMessage, ProtoService};
use crate::ident::safe_snake_case;
use crate::options::{Mode, Options};
use crate::type_manager::TypeManager;

const HEADER_BANNER: &str = "\
# Generated by the protoc-gen-cbproto plugin. DO NOT EDIT!
# sources: see the CodeGeneratorRequest this file was produced from
# plugin: python-cbproto
# type: ignore
# flake8: noqa
";

/// Renders one output unit: every `.proto` file sharing `package`, already
/// merged by the caller.
pub fn emit_package(
    package: &str,
    messages: &[ProtoMessage],
    enums: &[ProtoEnum],
    services: &[ProtoService],
    options: &Options,
) -> String {
    let mut tm = TypeManager::new(package);
    let mut body = String::new();

    for e in enums {
        emit_enum(e, &mut body);
    }

    let mut ordered: Vec<&ProtoMessage> = messages.iter().collect();
    ordered.sort_by_key(|m| m.fq_name.len());
    for m in &ordered {
        emit_message(m, 0, &mut tm, &mut body);
    }

    for s in services {
        emit_service_client(s, package, &mut tm, options, &mut body);
    }
    for s in services {
        emit_service_server(s, package, &mut tm, options, &mut body);
    }

    if !enums.is_empty() || messages.iter().any(has_nested_enum) {
        tm.from_import("enum", "Enum");
    }
    if messages.iter().any(has_deprecated_message) {
        tm.from_import("cbproto", "deprecated_message");
    }
    if !services.is_empty() {
        tm.module_import("abc", "ABC");
        tm.from_import("cbproto", "Handler");
        tm.from_import("cbproto", "Cardinality");
    }
    tm.from_import("dataclasses", "dataclass");
    tm.module_import("cbproto", "cbproto");

    let mut out = String::new();
    out.push_str(HEADER_BANNER);
    out.push('\n');
    for line in tm.all_imports() {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&body);
    out
}

fn has_nested_enum(m: &ProtoMessage) -> bool {
    !m.nested_enums.is_empty() || m.nested_messages.iter().any(has_nested_enum)
}

fn has_deprecated_message(m: &ProtoMessage) -> bool {
    m.deprecated || m.nested_messages.iter().any(has_deprecated_message)
}

fn emit_enum(e: &ProtoEnum, out: &mut String) {
    emit_enum_at(e, 0, out);
}

fn emit_enum_at(e: &ProtoEnum, depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    if let Some(comment) = &e.comment {
        write_comment(comment, depth, out);
    }
    out.push_str(&format!("{indent}class {}(Enum):\n", e.name));
    for entry in &e.entries {
        if let Some(comment) = &entry.comment {
            write_comment(comment, depth + 1, out);
        }
        out.push_str(&format!("{indent}    {} = {}\n", entry.name, entry.number));
    }
    out.push('\n');
}

fn emit_message(m: &ProtoMessage, depth: usize, tm: &mut TypeManager, out: &mut String) {
    let indent = "    ".repeat(depth);
    if let Some(comment) = &m.comment {
        write_comment(comment, depth, out);
    }
    if m.deprecated {
        out.push_str(&format!("{indent}@deprecated_message\n"));
    }
    out.push_str(&format!("{indent}@dataclass\n"));
    out.push_str(&format!("{indent}class {}(cbproto.Message):\n", m.name));

    if m.fields.is_empty() && m.nested_messages.is_empty() && m.nested_enums.is_empty() {
        out.push_str(&format!("{indent}    pass\n\n"));
        return;
    }

    for nested_enum in &m.nested_enums {
        emit_enum_at(nested_enum, depth + 1, out);
    }
    for nested in &m.nested_messages {
        emit_message(nested, depth + 1, tm, out);
    }
    for field in &m.fields {
        emit_field(field, depth + 1, tm, out);
    }
    out.push('\n');
}

fn emit_field(field: &ProtoField, depth: usize, tm: &mut TypeManager, out: &mut String) {
    let indent = "    ".repeat(depth);
    let py_name = safe_snake_case(&field.name);

    if let Some(comment) = &field.comment {
        write_comment(comment, depth, out);
    }

    let mut annotation = field_annotation(field, tm);
    let mut ctor = field_ctor(field, tm);

    if !field.is_map() {
        if field.is_repeated() {
            annotation = tm.list_of(&annotation);
        } else if field.proto3_optional && field.oneof_name.is_none() {
            annotation = tm.optional_of(&annotation);
        }
    }

    if let Some(group) = &field.oneof_name {
        ctor.push_str(&format!(", group=\"{group}\""));
    }
    if let Some(wrapper) = field
        .type_name
        .as_deref()
        .and_then(Wrapper::from_type_name)
    {
        ctor.push_str(&format!(", wraps=\"{}\"", wrapper_tag(wrapper)));
    }
    if field.proto3_optional {
        ctor.push_str(", optional=True");
    }

    out.push_str(&format!("{indent}{py_name}: {annotation} = {ctor}\n"));
}

fn field_annotation(field: &ProtoField, tm: &mut TypeManager) -> String {
    if field.is_map() {
        let (key_ty, _) = field.map_key.as_ref().expect("map field has a key type");
        let (value_ty, value_name) = field.map_value.as_ref().expect("map field has a value type");
        let key_annotation = scalar_annotation(*key_ty);
        let value_annotation = match value_ty {
            Type::Message | Type::Enum => tm.resolve(value_name.as_deref().unwrap_or_default(), true),
            other => scalar_annotation(*other).to_string(),
        };
        return tm.dict_of(&key_annotation, &value_annotation);
    }
    match field.proto_type {
        Type::Message | Type::Group => tm.resolve(field.type_name.as_deref().unwrap_or_default(), true),
        Type::Enum => tm.resolve(field.type_name.as_deref().unwrap_or_default(), false),
        other => scalar_annotation(other).to_string(),
    }
}

fn scalar_annotation(t: Type) -> &'static str {
    match t {
        Type::Double | Type::Float => "float",
        Type::Bool => "bool",
        Type::String => "str",
        Type::Bytes => "bytes",
        _ => "int",
    }
}

fn field_ctor(field: &ProtoField, tm: &mut TypeManager) -> String {
    if field.is_map() {
        let (key_ty, _) = field.map_key.as_ref().expect("map field has a key type");
        let (value_ty, _) = field.map_value.as_ref().expect("map field has a value type");
        return format!(
            "cbproto.map_field({}, cbproto.{}, cbproto.{})",
            field.number,
            proto_type_tag(*key_ty),
            proto_type_tag(*value_ty)
        );
    }
    match field.proto_type {
        Type::Enum => format!(
            "cbproto.enum_field({}, \"{}\")",
            field.number,
            field.type_name.clone().unwrap_or_default()
        ),
        Type::Message | Type::Group => {
            let type_name = field.type_name.clone().unwrap_or_default();
            if let Some(wrapper) = Wrapper::from_type_name(&type_name) {
                let _ = tm; // wrapper fields don't need an import of their own
                format!("cbproto.{}_field({})", wrapper_ctor_name(wrapper), field.number)
            } else {
                format!("cbproto.message_field({}, \"{}\")", field.number, type_name)
            }
        }
        other => format!("cbproto.{}_field({})", scalar_ctor_name(other), field.number),
    }
}

fn scalar_ctor_name(t: Type) -> &'static str {
    match t {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::Enum | Type::Message | Type::Group => unreachable!("handled by dedicated branches"),
    }
}

fn wrapper_ctor_name(wrapper: Wrapper) -> &'static str {
    match wrapper {
        Wrapper::Bool => "bool",
        Wrapper::Int32 => "int32",
        Wrapper::Int64 => "int64",
        Wrapper::UInt32 => "uint32",
        Wrapper::UInt64 => "uint64",
        Wrapper::Float => "float",
        Wrapper::Double => "double",
        Wrapper::String => "string",
        Wrapper::Bytes => "bytes",
        Wrapper::EnumValue => "enum_value",
    }
}

fn wrapper_tag(wrapper: Wrapper) -> &'static str {
    wrapper_ctor_name(wrapper)
}

fn proto_type_tag(t: Type) -> &'static str {
    match t {
        Type::Double => "TYPE_DOUBLE",
        Type::Float => "TYPE_FLOAT",
        Type::Int64 => "TYPE_INT64",
        Type::Uint64 => "TYPE_UINT64",
        Type::Int32 => "TYPE_INT32",
        Type::Fixed64 => "TYPE_FIXED64",
        Type::Fixed32 => "TYPE_FIXED32",
        Type::Bool => "TYPE_BOOL",
        Type::String => "TYPE_STRING",
        Type::Group => "TYPE_GROUP",
        Type::Message => "TYPE_MESSAGE",
        Type::Bytes => "TYPE_BYTES",
        Type::Uint32 => "TYPE_UINT32",
        Type::Enum => "TYPE_ENUM",
        Type::Sfixed32 => "TYPE_SFIXED32",
        Type::Sfixed64 => "TYPE_SFIXED64",
        Type::Sint32 => "TYPE_SINT32",
        Type::Sint64 => "TYPE_SINT64",
    }
}

/// The four RPC shapes, derived from a method's streaming flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    UnaryUnary,
    UnaryStream,
    StreamUnary,
    StreamStream,
}

impl Cardinality {
    pub fn of(client_streaming: bool, server_streaming: bool) -> Cardinality {
        match (client_streaming, server_streaming) {
            (false, false) => Cardinality::UnaryUnary,
            (false, true) => Cardinality::UnaryStream,
            (true, false) => Cardinality::StreamUnary,
            (true, true) => Cardinality::StreamStream,
        }
    }

    fn transport_method(self) -> &'static str {
        match self {
            Cardinality::UnaryUnary => "unary_unary",
            Cardinality::UnaryStream => "unary_stream",
            Cardinality::StreamUnary => "stream_unary",
            Cardinality::StreamStream => "stream_stream",
        }
    }
}

fn emit_service_client(service: &ProtoService, package: &str, tm: &mut TypeManager, options: &Options, out: &mut String) {
    if let Some(comment) = &service.comment {
        write_comment(comment, 0, out);
    }
    out.push_str(&format!("class {}Stub:\n", service.name));
    out.push_str("    def __init__(self, channel):\n");
    out.push_str("        self.channel = channel\n\n");

    for method in &service.methods {
        let cardinality = Cardinality::of(method.client_streaming, method.server_streaming);
        let request_type = tm.resolve(&method.input_type, true);
        let response_type = tm.resolve(&method.output_type, true);
        let py_name = safe_snake_case(&method.name);

        let request_annotation = if method.client_streaming {
            tm.iterable_of(&request_type, options.mode == Mode::Async)
        } else {
            request_type.clone()
        };
        let mut response_annotation = if method.server_streaming {
            tm.iterator_of(&response_type, options.mode == Mode::Async)
        } else {
            response_type.clone()
        };
        if options.mode == Mode::Async && !method.server_streaming {
            response_annotation = tm.awaitable_of(&response_annotation);
        }

        let async_kw = if options.mode == Mode::Async { "async " } else { "" };
        out.push_str(&format!(
            "    {async_kw}def {py_name}(self, request: {request_annotation}, timeout=None, metadata=None, credentials=None) -> {response_annotation}:\n"
        ));
        out.push_str(&format!(
            "        return self.channel.{}(\"{}\", request, {}, {}, timeout=timeout, metadata=metadata, credentials=credentials)\n\n",
            cardinality.transport_method(),
            route(package, service, method),
            request_type,
            response_type,
        ));
    }
}

fn emit_service_server(
    service: &ProtoService,
    package: &str,
    tm: &mut TypeManager,
    options: &Options,
    out: &mut String,
) {
    out.push_str(&format!("class {}Base(abc.ABC):\n", service.name));
    for method in &service.methods {
        let cardinality = Cardinality::of(method.client_streaming, method.server_streaming);
        let request_type = tm.resolve(&method.input_type, true);
        let response_type = tm.resolve(&method.output_type, true);
        let py_name = safe_snake_case(&method.name);
        let async_kw = if options.mode == Mode::Async { "async " } else { "" };
        let request_annotation = if method.client_streaming {
            tm.iterable_of(&request_type, options.mode == Mode::Async)
        } else {
            request_type
        };
        let response_annotation = if method.server_streaming {
            tm.iterator_of(&response_type, options.mode == Mode::Async)
        } else {
            response_type
        };
        out.push_str(&format!(
            "    @abc.abstractmethod\n    {async_kw}def {py_name}(self, request: {request_annotation}) -> {response_annotation}:\n        ...\n\n"
        ));
    }

    out.push_str("    def __mapping__(self):\n        return {\n");
    for method in &service.methods {
        let cardinality = Cardinality::of(method.client_streaming, method.server_streaming);
        out.push_str(&format!(
            "            \"{}\": Handler(self.{}, Cardinality.{:?}, {}, {}),\n",
            route(package, service, method),
            safe_snake_case(&method.name),
            cardinality,
            method.input_type,
            method.output_type,
        ));
    }
    out.push_str("        }\n\n");
}

fn route(package: &str, service: &ProtoService, method: &crate::descriptor::ProtoMethod) -> String {
    if package.is_empty() {
        format!("/{}/{}", service.name, method.name)
    } else {
        format!("/{}.{}/{}", package, service.name, method.name)
    }
}

fn write_comment(comment: &str, depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    for line in comment.split('\n') {
        out.push_str(&indent);
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ProtoMessage;

    fn empty_message(name: &str) -> ProtoMessage {
        ProtoMessage {
            name: name.to_string(),
            fq_name: format!(".{name}"),
            index_path: vec![],
            fields: vec![],
            nested_messages: vec![],
            nested_enums: vec![],
            oneof_names: vec![],
            is_map_entry: false,
            deprecated: false,
            comment: None,
        }
    }

    #[test]
    fn empty_message_emits_pass_body() {
        let mut tm = TypeManager::new("pkg");
        let mut out = String::new();
        emit_message(&empty_message("Empty"), 0, &mut tm, &mut out);
        assert!(out.contains("class Empty(cbproto.Message):"));
        assert!(out.contains("pass"));
    }
}
