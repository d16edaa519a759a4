//! Naming conventions of the native library, as pure functions on strings.
//!
//! libclang names its records `CX...`, its functions `clang_...`, its count fields
//! `num...`/`Num...`/`..._size`, and its truth-returning functions `is...`/`has...`.
//! None of this is encoded in the type system, so every rule lives here where it can be
//! tested on its own.

/// Derive the logical name of an array from the name of its companion length field.
///
/// Rules are tried in order and the first matching one wins:
/// `num_` prefix, `num` prefix, `Num` prefix followed by an uppercase letter,
/// `_size` suffix. `None` means no rule applies and the caller picks a default name.
pub fn derive_array_name(length_field_name: &str) -> Option<&str> {
    if let Some(name) = length_field_name.strip_prefix("num_") {
        return non_empty(name);
    }
    if let Some(name) = length_field_name.strip_prefix("num") {
        return non_empty(name);
    }
    if let Some(name) = length_field_name.strip_prefix("Num") {
        if name.chars().next().is_some_and(char::is_uppercase) {
            return Some(name);
        }
    }
    if let Some(name) = length_field_name.strip_suffix("_size") {
        return non_empty(name);
    }
    None
}

fn non_empty(name: &str) -> Option<&str> {
    (!name.is_empty()).then_some(name)
}

/// Strip a C elaboration keyword such as `struct ` or `enum `
pub fn strip_elaboration(spelling: &str) -> &str {
    ["struct ", "enum ", "union "]
        .iter()
        .find_map(|keyword| spelling.strip_prefix(keyword))
        .unwrap_or(spelling)
}

/// Trim the library prefix (e.g. `CX` or `CX_`) from a record, enum or typedef name.
///
/// A name consisting of the prefix alone is returned unchanged.
pub fn trim_library_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    let name = strip_elaboration(name);
    if prefix.is_empty() {
        return name;
    }
    let trimmed = name
        .strip_prefix(prefix)
        .map(|rest| rest.strip_prefix('_').unwrap_or(rest))
        .unwrap_or(name);
    if trimmed.is_empty() {
        name
    } else {
        trimmed
    }
}

/// Receiver-style variable name for a type: its uppercase letters, lowercased.
///
/// `TranslationUnit` becomes `tu`, `SourceLocation` becomes `sl`.
pub fn receiver_name(type_name: &str) -> Option<String> {
    let name: String = type_name
        .chars()
        .filter(|c| c.is_uppercase())
        .flat_map(char::to_lowercase)
        .collect();
    non_empty(&name).map(str::to_string)
}

/// Whether a function name follows the `is...`/`has...` truth-flag convention.
pub fn has_boolean_prefix(function_name: &str) -> bool {
    function_name.starts_with("has") || function_name.starts_with("is")
}

/// Method name for a native function bound to `receiver_type`.
///
/// Strips the function prefix, a leading `get`/`create`, the library prefix and the
/// receiver type name (as prefix, or as suffix of a `dispose` function), then
/// converts to snake case: `clang_getTranslationUnitSpelling` on `TranslationUnit`
/// becomes `spelling`.
pub fn method_name(
    function_name: &str,
    function_prefix: &str,
    library_prefix: &str,
    receiver_type: Option<&str>,
) -> String {
    let mut name = function_name
        .strip_prefix(function_prefix)
        .unwrap_or(function_name);
    name = trim_verb_prefix(name, library_prefix);

    if let Some(receiver) = receiver_type {
        if let Some(rest) = name.strip_prefix(receiver) {
            // `Cursor_getTranslationUnit`: the separator already ends the receiver name
            let (rest, separated) = match rest.strip_prefix('_') {
                Some(rest) => (rest, true),
                None => (rest, false),
            };
            let trimmed = trim_verb_prefix(rest, library_prefix);
            if rest.starts_with(char::is_uppercase) || (separated && !trimmed.is_empty()) {
                name = trimmed;
            }
        } else if name.strip_prefix("dispose") == Some(receiver) {
            name = "dispose";
        }
    }

    sanitize_identifier(&to_snake_case(name))
}

fn trim_verb_prefix<'a>(name: &'a str, library_prefix: &str) -> &'a str {
    let mut name = name;
    for verb in ["get", "create"] {
        if let Some(rest) = name.strip_prefix(verb) {
            if rest.starts_with(char::is_uppercase) {
                name = rest;
                break;
            }
        }
    }
    match name.strip_prefix(library_prefix) {
        Some(rest) if rest.starts_with(char::is_uppercase) => rest,
        _ => name,
    }
}

/// Convert a camel-case or mixed native identifier to snake case.
///
/// Acronyms stay together: `TUResourceUsage` becomes `tu_resource_usage`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 && !out.ends_with('_') {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Append `_` to identifiers that collide with Rust keywords.
pub fn sanitize_identifier(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}
