use convert_case::{Boundary, Case, Casing};

/// Quotes text as a C++ string literal.
///
/// JSON string escaping is a subset of what C++ accepts, so the serde_json
/// rendering can be pasted into generated code as-is.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Prefixes `name` with `namespace` unless it is already qualified.
pub fn qualify(namespace: &str, name: &str) -> String {
    if name.contains("::") || namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", namespace, name)
    }
}

/// Last path segment of a possibly qualified name (`a::b::Status` -> `Status`).
pub fn bare_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Word breaks for derived table names. Digits stay glued to the letters
/// before them (`UserV2` -> `user_v2`); a capital after a digit still
/// starts a word (`Item2Log` -> `item2_log`).
const TABLE_NAME_BOUNDARIES: [Boundary; 4] = [
    Boundary::Underscore,
    Boundary::LowerUpper,
    Boundary::DigitUpper,
    Boundary::Acronym,
];

/// Table name derived from a class name (`TestItem` -> `test_item`).
pub fn to_snake_case(s: &str) -> String {
    s.set_boundaries(&TABLE_NAME_BOUNDARIES).to_case(Case::Snake)
}

/// PostgreSQL array element type for a C++ scalar, used to cast `unnest` inputs.
pub fn sql_array_type(cpp_type: &str) -> Option<&'static str> {
    match cpp_type {
        "int64_t" | "std::int64_t" | "long long" => Some("bigint"),
        "int32_t" | "std::int32_t" | "int" => Some("integer"),
        "int16_t" | "std::int16_t" | "short" => Some("smallint"),
        "bool" => Some("boolean"),
        "double" => Some("double precision"),
        "float" => Some("real"),
        "std::string" => Some("text"),
        _ => None,
    }
}

/// Joins `items` with `,` and one item per line at the given indentation.
pub fn comma_lines(items: &[String], indent: &str) -> Vec<String> {
    let last = items.len().saturating_sub(1);
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let comma = if i < last { "," } else { "" };
            format!("{}{}{}", indent, item, comma)
        })
        .collect()
}
