use crate::{types::EntityDescriptor, utils::quote};

/// Key column constants, `key()` and, with partition keys, `makePartitionHintParams`.
pub fn generate_key_members(entity: &EntityDescriptor) -> Vec<String> {
    let keys = &entity.annotation.primary_keys;
    let mut lines = Vec::new();

    lines.push(format!(
        "    static constexpr const char* primary_key_column = {};",
        quote(entity.column_of(&keys[0]))
    ));
    if entity.annotation.is_composite_key() {
        let columns: Vec<String> = entity.key_columns().iter().map(|c| quote(c)).collect();
        lines.push(format!(
            "    static constexpr std::array<const char*, {}> primary_key_columns = {{{}}};",
            columns.len(),
            columns.join(", ")
        ));
    }
    lines
}

pub fn generate_key_fn(entity: &EntityDescriptor) -> Vec<String> {
    let keys = &entity.annotation.primary_keys;
    let value = if entity.annotation.is_composite_key() {
        let members: Vec<String> = keys.iter().map(|k| format!("e.{}", k)).collect();
        format!("std::make_tuple({})", members.join(", "))
    } else {
        format!("e.{}", keys[0])
    };
    vec![
        "    template<typename Entity>".to_string(),
        "    static auto key(const Entity& e) noexcept {".to_string(),
        format!("        return {};", value),
        "    }".to_string(),
    ]
}

/// Parameters for `SQL::delete_with_partition`, in its placeholder order.
pub fn generate_partition_hint(entity: &EntityDescriptor) -> Vec<String> {
    let a = &entity.annotation;
    if a.partition_keys.is_empty() {
        return Vec::new();
    }
    let args: Vec<String> = a
        .primary_keys
        .iter()
        .chain(a.partition_keys.iter())
        .map(|k| format!("e.{}", k))
        .collect();

    let mut lines = vec![
        "    template<typename Entity>".to_string(),
        "    static jcailloux::relais::io::PgParams makePartitionHintParams(const Entity& e) {"
            .to_string(),
        "        return jcailloux::relais::io::PgParams::make(".to_string(),
    ];
    lines.extend(crate::utils::comma_lines(&args, "            "));
    lines.push("        );".to_string());
    lines.push("    }".to_string());
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
    fn test_single_key() {
        let e = entity("// @relais table=t\nstruct T {\n    int64_t uid; // @relais primary_key column=user_id\n};\n");
        assert_eq!(
            generate_key_members(&e),
            vec!["    static constexpr const char* primary_key_column = \"user_id\";"]
        );
        assert_eq!(generate_key_fn(&e)[2], "        return e.uid;");
        assert!(generate_partition_hint(&e).is_empty());
    }

    #[test]
    fn test_composite_key() {
        let e = entity(
            r#"
// @relais table=memberships
struct Membership {
    int64_t user_id = 0;   // @relais primary_key
    int64_t group_id = 0;  // @relais primary_key
    std::string role;
};
"#,
        );
        let members = generate_key_members(&e);
        assert_eq!(
            members[1],
            "    static constexpr std::array<const char*, 2> primary_key_columns = {\"user_id\", \"group_id\"};"
        );
        assert_eq!(
            generate_key_fn(&e)[2],
            "        return std::make_tuple(e.user_id, e.group_id);"
        );
    }

    #[test]
    fn test_partition_hint_order() {
        let e = entity(
            r#"
// @relais table=events
struct Event {
    std::string region;  // @relais partition_key
    int64_t id = 0;      // @relais primary_key
};
"#,
        );
        let lines = generate_partition_hint(&e);
        assert_eq!(lines[3], "            e.id,");
        assert_eq!(lines[4], "            e.region");
    }
}
