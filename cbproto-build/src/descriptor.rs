//! Normalized descriptor tree: turns the flat, index-addressed descriptors a
//! compiler delivers into a tree of files, messages, fields, enums and
//! services with fully-qualified names, index paths (for comment lookup) and
//! map fields already resolved.

use std::collections::HashMap;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto, ServiceDescriptorProto, SourceCodeInfo};

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct ProtoFile {
    pub name: String,
    pub package: String,
    pub messages: Vec<ProtoMessage>,
    pub enums: Vec<ProtoEnum>,
    pub services: Vec<ProtoService>,
}

#[derive(Clone, Debug)]
pub struct ProtoMessage {
    pub name: String,
    pub fq_name: String,
    pub index_path: Vec<i32>,
    pub fields: Vec<ProtoField>,
    pub nested_messages: Vec<ProtoMessage>,
    pub nested_enums: Vec<ProtoEnum>,
    pub oneof_names: Vec<String>,
    pub is_map_entry: bool,
    pub deprecated: bool,
    pub comment: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ProtoField {
    pub name: String,
    pub number: i32,
    pub label: Label,
    pub proto_type: Type,
    /// Fully qualified reference, present for `Message`/`Enum`/`Group` fields.
    pub type_name: Option<String>,
    /// Name of the containing `oneof`, absent for synthetic proto3-optional
    /// oneofs and for fields outside any oneof.
    pub oneof_name: Option<String>,
    pub proto3_optional: bool,
    pub deprecated: bool,
    pub comment: Option<String>,
    pub map_key: Option<(Type, Option<String>)>,
    pub map_value: Option<(Type, Option<String>)>,
}

impl ProtoField {
    pub fn is_map(&self) -> bool {
        self.map_key.is_some()
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated && !self.is_map()
    }
}

#[derive(Clone, Debug)]
pub struct EnumEntry {
    pub name: String,
    pub number: i32,
    pub comment: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ProtoEnum {
    pub name: String,
    pub fq_name: String,
    pub index_path: Vec<i32>,
    pub entries: Vec<EnumEntry>,
    pub comment: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ProtoMethod {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub comment: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ProtoService {
    pub name: String,
    pub methods: Vec<ProtoMethod>,
    pub comment: Option<String>,
}

/// Builds the normalized tree for one input file. `extensions_by_extendee`
/// collects every extension field seen across the whole request, keyed by
/// the FQ name of the message it extends; matching ones are spliced into
/// that message's field list here.
pub fn build_file(
    fd: &FileDescriptorProto,
    extensions_by_extendee: &HashMap<String, Vec<FieldDescriptorProto>>,
) -> Result<ProtoFile, Error> {
    let package = fd.package().to_string();
    let root = if package.is_empty() { String::new() } else { format!(".{package}") };
    let comments = fd
        .source_code_info
        .as_ref()
        .map(comment_map)
        .unwrap_or_default();

    let enums = fd
        .enum_type
        .iter()
        .enumerate()
        .map(|(i, e)| build_enum(e, &root, &[5, i as i32], &comments))
        .collect::<Result<Vec<_>, _>>()?;

    let messages = fd
        .message_type
        .iter()
        .enumerate()
        .map(|(i, m)| build_message(m, &root, &[4, i as i32], &comments, extensions_by_extendee))
        .collect::<Result<Vec<_>, _>>()?;

    let services = fd
        .service
        .iter()
        .enumerate()
        .map(|(i, s)| build_service(s, &[6, i as i32], &comments))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProtoFile {
        name: fd.name().to_string(),
        package,
        messages,
        enums,
        services,
    })
}

fn join_fq(parent: &str, name: &str) -> String {
    format!("{parent}.{name}")
}

type MapEntryInfo = (Type, Option<String>, Type, Option<String>);

fn build_message(
    desc: &DescriptorProto,
    parent_fq: &str,
    index_path: &[i32],
    comments: &HashMap<Vec<i32>, String>,
    extensions: &HashMap<String, Vec<FieldDescriptorProto>>,
) -> Result<ProtoMessage, Error> {
    let name = desc.name().to_string();
    if name.is_empty() {
        return Err(Error::MalformedDescriptor {
            file: parent_fq.to_string(),
            detail: "message is missing a name".to_string(),
        });
    }
    let fq_name = join_fq(parent_fq, &name);

    let mut map_entries: HashMap<String, MapEntryInfo> = HashMap::new();
    for nested in &desc.nested_type {
        if nested.options.as_ref().map(|o| o.map_entry()).unwrap_or(false) {
            let entry_fq = join_fq(&fq_name, nested.name());
            let key = nested.field.iter().find(|f| f.number() == 1);
            let value = nested.field.iter().find(|f| f.number() == 2);
            if let (Some(key), Some(value)) = (key, value) {
                map_entries.insert(
                    entry_fq,
                    (key.r#type(), key.type_name.clone(), value.r#type(), value.type_name.clone()),
                );
            }
        }
    }

    let oneof_names: Vec<String> = desc.oneof_decl.iter().map(|o| o.name().to_string()).collect();

    let mut fields = Vec::with_capacity(desc.field.len());
    for (i, f) in desc.field.iter().enumerate() {
        fields.push(build_field(f, &oneof_names, index_path, i, &map_entries, comments));
    }

    if let Some(extra) = extensions.get(&fq_name) {
        let base = desc.field.len();
        for (i, f) in extra.iter().enumerate() {
            fields.push(build_field(f, &oneof_names, index_path, base + i, &map_entries, comments));
        }
    }

    let mut nested_enums = Vec::new();
    for (i, e) in desc.enum_type.iter().enumerate() {
        let mut path = index_path.to_vec();
        path.push(4);
        path.push(i as i32);
        nested_enums.push(build_enum(e, &fq_name, &path, comments)?);
    }

    let mut nested_messages = Vec::new();
    for (i, m) in desc.nested_type.iter().enumerate() {
        if m.options.as_ref().map(|o| o.map_entry()).unwrap_or(false) {
            continue;
        }
        let mut path = index_path.to_vec();
        path.push(3);
        path.push(i as i32);
        nested_messages.push(build_message(m, &fq_name, &path, comments, extensions)?);
    }

    Ok(ProtoMessage {
        name,
        fq_name,
        index_path: index_path.to_vec(),
        fields,
        nested_messages,
        nested_enums,
        oneof_names,
        is_map_entry: desc.options.as_ref().map(|o| o.map_entry()).unwrap_or(false),
        deprecated: desc.options.as_ref().map(|o| o.deprecated()).unwrap_or(false),
        comment: comments.get(index_path).cloned(),
    })
}

fn build_field(
    f: &FieldDescriptorProto,
    oneof_names: &[String],
    msg_index_path: &[i32],
    field_index: usize,
    map_entries: &HashMap<String, MapEntryInfo>,
    comments: &HashMap<Vec<i32>, String>,
) -> ProtoField {
    let mut path = msg_index_path.to_vec();
    path.push(2);
    path.push(field_index as i32);

    let oneof_name = if f.proto3_optional() {
        None
    } else {
        f.oneof_index.and_then(|idx| oneof_names.get(idx as usize).cloned())
    };

    let type_name = f.type_name.clone().filter(|s| !s.is_empty());
    let map_info = type_name.as_deref().and_then(|tn| map_entries.get(tn));

    ProtoField {
        name: f.name().to_string(),
        number: f.number(),
        label: f.label(),
        proto_type: f.r#type(),
        type_name,
        oneof_name,
        proto3_optional: f.proto3_optional(),
        deprecated: f.options.as_ref().map(|o| o.deprecated()).unwrap_or(false),
        comment: comments.get(&path).cloned(),
        map_key: map_info.map(|(k, kn, _, _)| (*k, kn.clone())),
        map_value: map_info.map(|(_, _, v, vn)| (*v, vn.clone())),
    }
}

fn build_enum(
    e: &EnumDescriptorProto,
    parent_fq: &str,
    index_path: &[i32],
    comments: &HashMap<Vec<i32>, String>,
) -> Result<ProtoEnum, Error> {
    let name = e.name().to_string();
    if name.is_empty() {
        return Err(Error::MalformedDescriptor {
            file: parent_fq.to_string(),
            detail: "enum is missing a name".to_string(),
        });
    }
    let fq_name = join_fq(parent_fq, &name);

    let mut entries = Vec::with_capacity(e.value.len());
    for (i, v) in e.value.iter().enumerate() {
        let mut path = index_path.to_vec();
        path.push(2);
        path.push(i as i32);
        entries.push(EnumEntry {
            name: v.name().to_string(),
            number: v.number(),
            comment: comments.get(&path).cloned(),
        });
    }

    Ok(ProtoEnum {
        name,
        fq_name,
        index_path: index_path.to_vec(),
        entries,
        comment: comments.get(index_path).cloned(),
    })
}

fn build_service(
    s: &ServiceDescriptorProto,
    index_path: &[i32],
    comments: &HashMap<Vec<i32>, String>,
) -> Result<ProtoService, Error> {
    let name = s.name().to_string();
    let mut methods = Vec::with_capacity(s.method.len());
    for (i, m) in s.method.iter().enumerate() {
        let mut path = index_path.to_vec();
        path.push(2);
        path.push(i as i32);
        methods.push(ProtoMethod {
            name: m.name().to_string(),
            input_type: m.input_type().to_string(),
            output_type: m.output_type().to_string(),
            client_streaming: m.client_streaming(),
            server_streaming: m.server_streaming(),
            comment: comments.get(&path).cloned(),
        });
    }
    Ok(ProtoService {
        name,
        methods,
        comment: comments.get(index_path).cloned(),
    })
}

/// Builds the `index_path -> leading comment` map from a file's
/// `SourceCodeInfo`, dedenting each comment line by `n % 4` leading spaces
/// (preserving relative indentation of nested blocks).
fn comment_map(info: &SourceCodeInfo) -> HashMap<Vec<i32>, String> {
    let mut map = HashMap::new();
    for location in &info.location {
        let Some(raw) = &location.leading_comments else { continue };
        let trimmed = raw.trim_matches('\n');
        if trimmed.is_empty() {
            continue;
        }
        map.insert(location.path.clone(), dedent_comment(trimmed));
    }
    map
}

fn dedent_comment(raw: &str) -> String {
    raw.split('\n')
        .map(|line| {
            let leading = line.chars().take_while(|c| *c == ' ').count();
            let strip = leading % 4;
            line[strip..].to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_preserves_relative_indentation() {
        let raw = " a\n     b";
        // first line: 1 leading space -> strip 1 % 4 = 1
        // second line: 5 leading spaces -> strip 5 % 4 = 1
        assert_eq!(dedent_comment(raw), "a\n    b");
    }

    #[test]
    fn join_fq_handles_empty_package() {
        assert_eq!(join_fq("", "Foo"), ".Foo");
        assert_eq!(join_fq(".pkg", "Foo"), ".pkg.Foo");
    }
}
