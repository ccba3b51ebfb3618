//! Turns a `protoc` `CodeGeneratorRequest` into a `CodeGeneratorResponse` whose
//! files are the target runtime's source modules: one package per `.proto`
//! `package` declaration, plus placeholder `__init__.py` files for every
//! ancestor package directory.
//!
//! This crate only builds the descriptor tree and renders it; reading the
//! request from stdin and writing the response to stdout is the job of the
//! `protoc-gen-cbproto` binary.

pub mod descriptor;
pub mod emitter;
pub mod error;
pub mod ident;
pub mod options;
pub mod type_manager;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::FieldDescriptorProto;

pub use descriptor::{ProtoEnum, ProtoField, ProtoFile, ProtoMessage, ProtoMethod, ProtoService};
pub use error::Error;
pub use options::{Mode, Options};

#[derive(Default)]
struct PackageUnit {
    messages: Vec<ProtoMessage>,
    enums: Vec<ProtoEnum>,
    services: Vec<ProtoService>,
}

/// Compiles a single `protoc` plugin invocation end to end.
pub fn compile_request(request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse, Error> {
    let options = Options::parse(request.parameter());

    let mut extensions_by_extendee: HashMap<String, Vec<FieldDescriptorProto>> = HashMap::new();
    for file in &request.proto_file {
        for ext in &file.extension {
            let extendee = ext.extendee().to_string();
            if !extendee.is_empty() {
                extensions_by_extendee.entry(extendee).or_default().push(ext.clone());
            }
        }
    }

    let mut built = Vec::with_capacity(request.proto_file.len());
    for proto in &request.proto_file {
        if proto.package() == "google.protobuf" && !options.include_google {
            continue;
        }
        built.push(descriptor::build_file(proto, &extensions_by_extendee)?);
    }

    let known_messages: HashSet<&str> = built.iter().flat_map(|f| message_fq_names(&f.messages)).collect();
    for extendee in extensions_by_extendee.keys() {
        if !known_messages.contains(extendee.as_str()) {
            log::warn!("extendee {extendee} was not found among the compiled messages; its extension fields are dropped");
        }
    }

    let to_generate: HashSet<&str> = request.file_to_generate.iter().map(String::as_str).collect();

    let mut by_package: HashMap<String, PackageUnit> = HashMap::new();
    for file in built {
        if !to_generate.contains(file.name.as_str()) {
            continue;
        }
        let unit = by_package.entry(file.package.clone()).or_default();
        unit.messages.extend(file.messages);
        unit.enums.extend(file.enums);
        unit.services.extend(file.services);
    }

    let mut response_files = Vec::new();
    let mut package_dirs = BTreeSet::new();

    for (package, unit) in &by_package {
        let source = emitter::emit_package(package, &unit.messages, &unit.enums, &unit.services, &options);
        let path = package_init_path(package);
        package_dirs.extend(ancestor_dirs(&path));
        response_files.push(File {
            name: Some(path_to_string(&path)),
            content: Some(source),
            ..Default::default()
        });
    }

    let generated: HashSet<String> = response_files.iter().filter_map(|f| f.name.clone()).collect();
    for dir in package_dirs {
        let init_path = path_to_string(&dir.join("__init__.py"));
        if generated.contains(&init_path) {
            continue;
        }
        response_files.push(File {
            name: Some(init_path),
            content: Some(String::new()),
            ..Default::default()
        });
    }

    Ok(CodeGeneratorResponse {
        error: None,
        supported_features: Some(Feature::Proto3Optional as u64),
        file: response_files,
        ..Default::default()
    })
}

fn message_fq_names(messages: &[ProtoMessage]) -> Vec<&str> {
    let mut names = Vec::new();
    for m in messages {
        names.push(m.fq_name.as_str());
        names.extend(message_fq_names(&m.nested_messages));
    }
    names
}

fn package_init_path(package: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in package.split('.').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push("__init__.py");
    path
}

/// Every ancestor package directory above the leaf package's own directory
/// (which already gets its `__init__.py` from the emitted source).
fn ancestor_dirs(leaf_init: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = leaf_init.parent().and_then(Path::parent);
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() {
            break;
        }
        dirs.push(dir.to_path_buf());
        current = dir.parent();
    }
    dirs
}

fn path_to_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_init_path_nests_by_dot() {
        assert_eq!(path_to_string(&package_init_path("a.b.c")), "a/b/c/__init__.py");
        assert_eq!(path_to_string(&package_init_path("")), "__init__.py");
    }

    #[test]
    fn ancestor_dirs_excludes_leaf() {
        let leaf = package_init_path("a.b.c");
        let dirs: Vec<String> = ancestor_dirs(&leaf).iter().map(|d| path_to_string(d)).collect();
        assert_eq!(dirs, vec!["a/b".to_string(), "a".to_string()]);
    }

    #[test]
    fn ancestor_dirs_empty_for_top_level_package() {
        let leaf = package_init_path("a");
        assert!(ancestor_dirs(&leaf).is_empty());
    }
}
