//! Proto type reference -> target identifier resolution, plus the import
//! set that makes the resulting expression valid. One instance is owned by
//! each [`crate::descriptor::ProtoFile`], scoped to that file's package.
//!
//! Grounded on `cbiproto/plugin/utils.py`'s `TypeManager`, generalized from
//! a single hard-coded language's import syntax into the same shape kept
//! here (the emitted source is still Python, so the import syntax itself is
//! unchanged from the original).

use std::collections::{BTreeMap, BTreeSet};

use cbproto_types::Wrapper;

use crate::ident::{pascal_case, safe_snake_case};

#[derive(Clone, Debug, Default)]
pub struct TypeManager {
    package: Vec<String>,
    imports: BTreeSet<String>,
    from_imports: BTreeMap<String, BTreeSet<String>>,
}

impl TypeManager {
    pub fn new(package: &str) -> TypeManager {
        TypeManager {
            package: split_package(package),
            imports: BTreeSet::new(),
            from_imports: BTreeMap::new(),
        }
    }

    /// Every import line this file needs, in deterministic (sorted) order.
    pub fn all_imports(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.imports.iter().cloned().collect();
        for (module, names) in &self.from_imports {
            let names = names.iter().cloned().collect::<Vec<_>>().join(", ");
            lines.push(format!("from {module} import {names}"));
        }
        lines
    }

    pub fn typing_import(&mut self, name: &str) -> String {
        self.from_import("typing", name)
    }

    pub fn from_import(&mut self, module: &str, name: &str) -> String {
        self.from_imports
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string());
        name.to_string()
    }

    pub fn module_import(&mut self, module: &str, name: &str) -> String {
        self.imports.insert(format!("import {module}"));
        format!("{module}.{name}")
    }

    pub fn list_of(&mut self, typ: &str) -> String {
        let list = self.typing_import("List");
        format!("{list}[{typ}]")
    }

    pub fn dict_of(&mut self, key: &str, value: &str) -> String {
        let dict = self.typing_import("Dict");
        format!("{dict}[{key}, {value}]")
    }

    pub fn optional_of(&mut self, typ: &str) -> String {
        let optional = self.typing_import("Optional");
        format!("{optional}[{typ}]")
    }

    pub fn iterable_of(&mut self, typ: &str, aio: bool) -> String {
        let it = self.typing_import(if aio { "AsyncIterable" } else { "Iterable" });
        format!("{it}[{typ}]")
    }

    pub fn iterator_of(&mut self, typ: &str, aio: bool) -> String {
        let it = self.typing_import(if aio { "AsyncIterator" } else { "Iterator" });
        format!("{it}[{typ}]")
    }

    pub fn awaitable_of(&mut self, typ: &str) -> String {
        let awaitable = self.typing_import("Awaitable");
        format!("{awaitable}[{typ}]")
    }

    /// Resolves a fully qualified proto reference to a target-language
    /// expression, recording whatever import makes it valid.
    pub fn resolve(&mut self, type_name: &str, unwrap: bool) -> String {
        if unwrap {
            if let Some(wrapper) = Wrapper::from_type_name(type_name) {
                let scalar = scalar_name(wrapper);
                return self.optional_of(scalar);
            }
            match type_name.trim_start_matches('.') {
                "google.protobuf.Duration" => return self.from_import("datetime", "timedelta"),
                "google.protobuf.Timestamp" => return self.from_import("datetime", "datetime"),
                _ => {}
            }
        }

        let (source_package, source_name) = split_type_name(type_name);
        let py_type = pascal_case(&source_name);
        let mut target_package = split_package(&source_package);

        let compiling_google_protobuf = self.package == ["google", "protobuf"];
        let importing_google_protobuf = target_package == ["google", "protobuf"];
        if importing_google_protobuf && !compiling_google_protobuf {
            let mut prefixed = vec!["cbproto".to_string(), "lib".to_string()];
            prefixed.append(&mut target_package);
            target_package = prefixed;
        }

        if target_package.first().map(String::as_str) == Some("cbproto") {
            return self.reference_absolute(&target_package, &py_type);
        }
        if target_package == self.package {
            return py_type;
        }
        if target_package.len() > self.package.len() && target_package[..self.package.len()] == self.package[..] {
            return self.reference_descendant(&target_package, &py_type);
        }
        if self.package.len() > target_package.len() && self.package[..target_package.len()] == target_package[..] {
            return self.reference_ancestor(&target_package, &py_type);
        }
        self.reference_cousin(&target_package, &py_type)
    }

    fn reference_absolute(&mut self, target_package: &[String], py_type: &str) -> String {
        let module = target_package.join(".");
        let alias = safe_snake_case(&module);
        self.imports.insert(format!("import {module} as {alias}"));
        format!("{alias}.{py_type}")
    }

    fn reference_descendant(&mut self, target_package: &[String], py_type: &str) -> String {
        let descendant = &target_package[self.package.len()..];
        let (head, leaf_slice) = descendant.split_at(descendant.len() - 1);
        let leaf = &leaf_slice[0];
        if head.is_empty() {
            self.imports.insert(format!("from . import {leaf}"));
            format!("{leaf}.{py_type}")
        } else {
            let from_module = head.join(".");
            let alias = descendant.join("_");
            self.imports
                .insert(format!("from .{from_module} import {leaf} as {alias}"));
            format!("{alias}.{py_type}")
        }
    }

    fn reference_ancestor(&mut self, target_package: &[String], py_type: &str) -> String {
        let distance_up = self.package.len() - target_package.len();
        if let Some(leaf) = target_package.last() {
            let alias = format!("_{}{}", "_".repeat(distance_up), leaf);
            let from_module = format!("..{}", ".".repeat(distance_up));
            self.imports
                .insert(format!("from {from_module} import {leaf} as {alias}"));
            format!("\"{alias}.{py_type}\"")
        } else {
            let alias = format!("{}{}", "_".repeat(distance_up), py_type);
            self.imports.insert(format!(
                "from .{} import {py_type} as {alias}",
                ".".repeat(distance_up)
            ));
            alias
        }
    }

    fn reference_cousin(&mut self, target_package: &[String], py_type: &str) -> String {
        let shared = common_prefix_len(&self.package, target_package);
        let distance_up = self.package.len() - shared;
        let middle = &target_package[shared..target_package.len() - 1];
        let from_module = format!(".{}{}", ".".repeat(distance_up), middle.join("."));
        let leaf = target_package.last().cloned().unwrap_or_default();
        let alias_suffix = safe_snake_case(&target_package[shared..].join("."));
        let alias = format!("{}{}", "_".repeat(distance_up), alias_suffix);
        self.imports
            .insert(format!("from {from_module} import {leaf} as {alias}"));
        format!("{alias}.{py_type}")
    }
}

fn scalar_name(wrapper: Wrapper) -> &'static str {
    match wrapper {
        Wrapper::Bool => "bool",
        Wrapper::Int32 | Wrapper::Int64 | Wrapper::UInt32 | Wrapper::UInt64 | Wrapper::EnumValue => "int",
        Wrapper::Float | Wrapper::Double => "float",
        Wrapper::String => "str",
        Wrapper::Bytes => "bytes",
    }
}

fn split_package(package: &str) -> Vec<String> {
    if package.is_empty() {
        Vec::new()
    } else {
        package.split('.').map(String::from).collect()
    }
}

fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Splits a FQ proto reference into its package and type-name parts, using
/// the convention that package segments are lowercase and the leading
/// uppercase segment starts the (possibly dotted, for nested types) name.
fn split_type_name(type_name: &str) -> (String, String) {
    let trimmed = type_name.trim_start_matches('.');
    let parts: Vec<&str> = trimmed.split('.').collect();
    let split_at = parts
        .iter()
        .position(|p| p.chars().next().map(|c| c.is_uppercase()).unwrap_or(false));
    match split_at {
        Some(idx) => (parts[..idx].join("."), parts[idx..].join(".")),
        None => (String::new(), trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_package_has_no_import() {
        let mut tm = TypeManager::new("my.pkg");
        assert_eq!(tm.resolve(".my.pkg.Msg", true), "Msg");
        assert!(tm.all_imports().is_empty());
    }

    #[test]
    fn wrapper_unwraps_to_optional_scalar() {
        let mut tm = TypeManager::new("my.pkg");
        assert_eq!(tm.resolve(".google.protobuf.StringValue", true), "Optional[str]");
    }

    #[test]
    fn timestamp_unwraps_to_datetime() {
        let mut tm = TypeManager::new("my.pkg");
        assert_eq!(tm.resolve(".google.protobuf.Timestamp", true), "datetime");
    }

    #[test]
    fn cousin_reference_is_aliased() {
        let mut tm = TypeManager::new("a.b");
        let resolved = tm.resolve(".a.c.Msg", true);
        assert_eq!(resolved, "_c.Msg");
        assert!(tm.all_imports().iter().any(|l| l.starts_with("from .. import c as _c")));
    }

    #[test]
    fn descendant_reference_imports_child_module() {
        let mut tm = TypeManager::new("a");
        let resolved = tm.resolve(".a.b.Msg", true);
        assert_eq!(resolved, "b.Msg");
        assert!(tm.all_imports().iter().any(|l| l == "from . import b"));
    }
}
