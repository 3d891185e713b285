use crate::{
    types::EntityDescriptor,
    utils::{comma_lines, qualify, quote},
};

fn object_entries(entity: &EntityDescriptor) -> Vec<String> {
    entity
        .columns
        .iter()
        .map(|c| format!("{}, &T::{}", quote(&c.field), c.field))
        .collect()
}

/// `glaze_value` variable template inside the mapping, in column order.
pub fn generate_glaze_value(entity: &EntityDescriptor) -> Vec<String> {
    let mut lines = vec![
        "    template<typename T>".to_string(),
        "    static constexpr auto glaze_value = glz::object(".to_string(),
    ];
    lines.extend(comma_lines(&object_entries(entity), "        "));
    lines.push("    );".to_string());
    lines
}

/// `glz::meta<Struct>`, unless the source header already has one.
pub fn generate_struct_meta(entity: &EntityDescriptor) -> Vec<String> {
    if entity.annotation.has_struct_meta {
        return Vec::new();
    }
    let struct_name = entity.qualified_struct_name();
    let mut lines = vec![
        "template<>".to_string(),
        format!("struct glz::meta<{}> {{", struct_name),
        format!("    using T = {};", struct_name),
        "    static constexpr auto value = glz::object(".to_string(),
    ];
    lines.extend(comma_lines(&object_entries(entity), "        "));
    lines.push("    );".to_string());
    lines.push("};".to_string());
    lines
}

/// `glz::meta<Enum>` for each distinct enum type the source header leaves unspecialized.
pub fn generate_enum_metas(entity: &EntityDescriptor) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut lines = Vec::new();

    for mapping in &entity.annotation.enums {
        let enum_type = qualify(&entity.namespace, &mapping.enum_type);
        if mapping.has_external_meta || seen.contains(&enum_type) {
            continue;
        }
        let entries: Vec<String> = mapping
            .pairs
            .iter()
            .map(|p| format!("{}, {}", quote(&p.external), p.local))
            .collect();

        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("template<>".to_string());
        lines.push(format!("struct glz::meta<{}> {{", enum_type));
        lines.push(format!("    using enum {};", enum_type));
        lines.push("    static constexpr auto value = glz::enumerate(".to_string());
        lines.extend(comma_lines(&entries, "        "));
        lines.push("    );".to_string());
        lines.push("};".to_string());
        seen.push(enum_type);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::build_entity, parser::scan_source};

    fn entity(src: &str) -> EntityDescriptor {
        build_entity(&scan_source(src)[0], src, "Test.h").unwrap()
    }

    #[test]
    fn test_glaze_value_in_column_order() {
        let e = entity("// @relais table=t\nstruct T {\n    int64_t id;\n    std::string name; // @relais column=label\n};\n");
        assert_eq!(
            generate_glaze_value(&e),
            vec![
                "    template<typename T>",
                "    static constexpr auto glaze_value = glz::object(",
                "        \"id\", &T::id,",
                "        \"name\", &T::name",
                "    );",
            ]
        );
    }

    #[test]
    fn test_struct_meta_skipped_when_present() {
        let src = r#"
namespace app {
// @relais table=t
struct T { int64_t id; };
}
template<> struct glz::meta<app::T> { using T = app::T; static constexpr auto value = glz::object("id", &T::id); };
"#;
        assert!(generate_struct_meta(&entity(src)).is_empty());

        let bare = entity("namespace app {\n// @relais table=t\nstruct T { int64_t id; };\n}\n");
        let lines = generate_struct_meta(&bare);
        assert_eq!(lines[1], "struct glz::meta<app::T> {");
        assert_eq!(lines[4], "        \"id\", &T::id");
    }

    #[test]
    fn test_enum_metas_dedupe_and_skip_external() {
        let src = r#"
namespace app {
// @relais table=t
struct T {
    int64_t id;
    Status a;      // @relais enum=on:On,off:Off
    Status b;      // @relais enum=on:On,off:Off
    Level level;   // @relais enum
};
}
template<> struct glz::meta<app::Level> {
    using enum app::Level;
    static constexpr auto value = glz::enumerate("lo", Low);
};
"#;
        let lines = generate_enum_metas(&entity(src));
        assert_eq!(
            lines,
            vec![
                "template<>",
                "struct glz::meta<app::Status> {",
                "    using enum app::Status;",
                "    static constexpr auto value = glz::enumerate(",
                "        \"on\", On,",
                "        \"off\", Off",
                "    );",
                "};",
            ]
        );
    }
}
