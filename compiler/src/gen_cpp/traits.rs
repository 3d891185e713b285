use crate::{
    types::{EntityDescriptor, FieldDescriptor},
    utils::quote,
};

fn has_field_enum(entity: &EntityDescriptor) -> bool {
    !entity.annotation.read_only && !entity.updateable_fields().is_empty()
}

/// Nested `TraitsType`, with a `Field` enum over the fields partial updates may touch.
pub fn generate_traits_type(entity: &EntityDescriptor) -> Vec<String> {
    let mut lines = vec!["    struct TraitsType {".to_string()];
    if has_field_enum(entity) {
        let names: Vec<String> = entity
            .updateable_fields()
            .iter()
            .map(|f| f.name.clone())
            .collect();
        lines.push("        enum class Field : uint8_t {".to_string());
        lines.extend(crate::utils::comma_lines(&names, "            "));
        lines.push("        };".to_string());
        lines.push(String::new());
        lines.push("        template<Field> struct FieldInfo;".to_string());
    }
    lines.push("    };".to_string());
    lines
}

/// Type a partial update binds for this field. Enums and raw JSON travel as text.
fn value_type<'a>(entity: &EntityDescriptor, field: &'a FieldDescriptor) -> &'a str {
    if entity.enum_for(&field.name).is_some() || entity.is_raw_json(field) {
        "std::string"
    } else {
        field.inner_type()
    }
}

/// `FieldInfo` specializations at namespace scope, one per updateable field.
pub fn generate_field_info(entity: &EntityDescriptor, mapping_name: &str) -> Vec<String> {
    if !has_field_enum(entity) {
        return Vec::new();
    }
    let traits = format!("{}::TraitsType", mapping_name);
    let mut lines = Vec::new();
    for field in entity.updateable_fields() {
        let column = format!("\"{}\"", field.column_name());
        lines.push("template<>".to_string());
        lines.push(format!(
            "struct {}::FieldInfo<{}::Field::{}> {{",
            traits, traits, field.name
        ));
        lines.push(format!("    using value_type = {};", value_type(entity, field)));
        lines.push(format!(
            "    static constexpr const char* column_name = {};",
            quote(&column)
        ));
        lines.push(format!(
            "    static constexpr bool is_timestamp = {};",
            entity.is_timestamp(&field.name)
        ));
        lines.push(format!(
            "    static constexpr bool is_nullable = {};",
            field.is_optional()
        ));
        lines.push("};".to_string());
        lines.push(String::new());
    }
    lines
}
