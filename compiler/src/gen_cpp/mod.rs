//! C++ emission.
//!
//! Every pass reads an [`EntityDescriptor`] and returns lines; none of them
//! can fail. [`compile_entity_to_cpp`] stitches the passes into one header:
//!
//!  - `sql`: the nested `SQL` struct,
//!  - `decode`: the `Col` enum and `fromRow`,
//!  - `encode`: `toInsertParams` / `toUpdateParams`,
//!  - `keys`: key constants, `key()` and partition hints,
//!  - `traits`: `TraitsType` and `FieldInfo`,
//!  - `list`: the embedded `ListDescriptor`,
//!  - `meta`: `glaze_value` and `glz::meta` specializations.

pub mod decode;
pub mod encode;
pub mod keys;
pub mod list;
pub mod meta;
pub mod sql;
pub mod traits;

use crate::types::EntityDescriptor;

const SECTION_RULE: &str =
    "// ============================================================================";

/// What the assembler needs to know about where the annotated header lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenOptions {
    /// Include path of the annotated header, as seen from the generated file.
    pub source_include: String,
    /// Shown in the banner.
    pub source_name:    String,
}

/// `<Class>Wrapper.h`
pub fn output_file_name(entity: &EntityDescriptor) -> String {
    format!("{}Wrapper.h", entity.class_name)
}

fn generate_includes(entity: &EntityDescriptor, options: &GenOptions) -> Vec<String> {
    let a = &entity.annotation;
    let mut lines = vec![
        "#include <cstdint>".to_string(),
        "#include <optional>".to_string(),
        "#include <string>".to_string(),
    ];
    if a.is_composite_key() {
        lines.push("#include <array>".to_string());
        lines.push("#include <tuple>".to_string());
    }
    if entity
        .fields
        .iter()
        .any(|f| f.inner_type() == "std::vector<char>")
    {
        lines.push("#include <vector>".to_string());
    }
    if !a.json_fields.is_empty() {
        lines.push("#include <glaze/glaze.hpp>".to_string());
    }
    lines.push("#include <jcailloux/relais/wrapper/EntityWrapper.h>".to_string());
    lines.push(format!("#include \"{}\"", options.source_include));
    if a.has_list() {
        lines.push("#include <jcailloux/relais/wrapper/ListWrapper.h>".to_string());
        lines.push("#include <jcailloux/relais/list/decl/FilterDescriptor.h>".to_string());
        lines.push("#include <jcailloux/relais/list/decl/SortDescriptor.h>".to_string());
    }
    lines
}

/// Appends `section` preceded by a blank line, unless it is empty.
fn push_section(lines: &mut Vec<String>, section: Vec<String>) {
    if !section.is_empty() {
        lines.push(String::new());
        lines.extend(section);
    }
}

fn generate_mapping(entity: &EntityDescriptor, mapping_name: &str) -> Vec<String> {
    let a = &entity.annotation;
    let mut lines = vec![
        format!("struct {} {{", mapping_name),
        format!("    static constexpr bool read_only = {};", a.read_only),
        format!(
            "    static constexpr const char* table_name = {};",
            crate::utils::quote(&a.table_name)
        ),
    ];
    lines.extend(keys::generate_key_members(entity));
    lines.push(String::new());
    lines.push(decode::generate_col_enum(entity));

    push_section(&mut lines, sql::generate_sql_struct(entity));
    push_section(&mut lines, traits::generate_traits_type(entity));
    push_section(&mut lines, keys::generate_key_fn(entity));
    push_section(&mut lines, keys::generate_partition_hint(entity));
    push_section(&mut lines, decode::generate_from_row(entity));
    push_section(&mut lines, encode::generate_write_params(entity));
    push_section(&mut lines, meta::generate_glaze_value(entity));
    push_section(&mut lines, list::generate_list_descriptor(entity));

    lines.push("};".to_string());
    lines
}

/// Renders the complete generated header for one entity.
pub fn compile_entity_to_cpp(entity: &EntityDescriptor, options: &GenOptions) -> String {
    let mapping_name = format!("{}Mapping", entity.class_name);
    let wrapper_name = format!("{}Wrapper", entity.class_name);
    let struct_name = entity.qualified_struct_name();

    let mut lines = vec![
        "// GENERATED AUTOMATICALLY - DO NOT MODIFY".to_string(),
        format!("// Source: {}", options.source_name),
        String::new(),
        "#pragma once".to_string(),
        String::new(),
    ];
    lines.extend(generate_includes(entity, options));
    lines.push(String::new());
    lines.push("namespace entity::generated {".to_string());
    lines.push(String::new());

    lines.extend(generate_mapping(entity, &mapping_name));
    lines.push(String::new());
    lines.extend(traits::generate_field_info(entity, &mapping_name));

    lines.push(SECTION_RULE.to_string());
    lines.push(format!("// {}: public API type", wrapper_name));
    lines.push(SECTION_RULE.to_string());
    lines.push(String::new());
    lines.push(format!(
        "using {} = jcailloux::relais::wrapper::EntityWrapper<",
        wrapper_name
    ));
    lines.push(format!("    {}, {}>;", struct_name, mapping_name));
    if entity.annotation.has_list() {
        lines.push(String::new());
        lines.push(format!(
            "using {}ListWrapper = jcailloux::relais::wrapper::ListWrapper<{}>;",
            entity.class_name, wrapper_name
        ));
    }
    lines.push(String::new());
    lines.push("}  // namespace entity::generated".to_string());

    push_section(&mut lines, meta::generate_struct_meta(entity));
    push_section(&mut lines, meta::generate_enum_metas(entity));

    lines.push(String::new());
    lines.join("\n")
}
