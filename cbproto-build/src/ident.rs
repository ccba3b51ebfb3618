//! Identifier casing, grounded on `prost-build`'s `ident` module but using
//! `heck`'s casing conversions directly (the original source hand-rolls its
//! own `_casing.py`; the ecosystem equivalent here is `heck`).

use heck::{ToPascalCase, ToSnakeCase};

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Converts a `camelCase`/`PascalCase`/`SCREAMING_SNAKE_CASE` proto identifier
/// to a safe `snake_case` target identifier, escaping keyword collisions with
/// a trailing underscore.
pub fn safe_snake_case(s: &str) -> String {
    let ident = s.to_snake_case();
    if PYTHON_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Converts a `snake_case`/dotted proto identifier into a `PascalCase`
/// target type identifier, preserving internal dots (nested type names).
pub fn pascal_case(s: &str) -> String {
    s.split('.').map(|part| part.to_pascal_case()).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_keyword_collisions() {
        assert_eq!(safe_snake_case("class"), "class_");
        assert_eq!(safe_snake_case("FooBar"), "foo_bar");
    }

    #[test]
    fn pascal_case_preserves_dots() {
        assert_eq!(pascal_case("outer.inner_type"), "Outer.InnerType");
    }
}
