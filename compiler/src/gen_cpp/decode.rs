use crate::{
    types::{EntityDescriptor, EnumMapping, FieldDescriptor},
    utils::{qualify, quote},
};

/// `enum Col : uint8_t { ... };` over the authoritative column order.
pub fn generate_col_enum(entity: &EntityDescriptor) -> String {
    let entries: Vec<String> = entity
        .columns
        .iter()
        .map(|c| format!("{} = {}", c.field, c.index))
        .collect();
    format!("    enum Col : uint8_t {{ {} }};", entries.join(", "))
}

fn enum_chain(
    entity: &EntityDescriptor,
    field: &FieldDescriptor,
    mapping: &EnumMapping,
    indent: &str,
) -> Vec<String> {
    let enum_type = qualify(&entity.namespace, &mapping.enum_type);
    mapping
        .pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let keyword = if i == 0 { "if" } else { "else if" };
            format!(
                "{}{} (s == {}) e.{} = {}::{};",
                indent,
                keyword,
                quote(&pair.external),
                field.name,
                enum_type,
                pair.local
            )
        })
        .collect()
}

fn decode_field(entity: &EntityDescriptor, field: &FieldDescriptor) -> Vec<String> {
    let name = &field.name;
    let col = format!("Col::{}", name);
    let mut lines = Vec::new();

    if entity.is_json_field(name) {
        if field.is_optional() {
            lines.push(format!("        if (!row.isNull({})) {{", col));
            lines.push(format!("            auto json_str = row.get<std::string>({});", col));
            lines.push("            if (!json_str.empty()) {".to_string());
            lines.push(format!(
                "                typename std::remove_reference_t<decltype(*e.{})> tmp;",
                name
            ));
            lines.push("                if (!glz::read_json(tmp, json_str))".to_string());
            lines.push(format!("                    e.{} = std::move(tmp);", name));
            lines.push("            }".to_string());
            lines.push("        }".to_string());
        } else {
            lines.push(format!(
                "        glz::read_json(e.{}, row.get<std::string>({}));",
                name, col
            ));
        }
    } else if entity.is_raw_json(field) {
        lines.push(format!("        e.{}.str = row.get<std::string>({});", name, col));
    } else if let Some(mapping) = entity.enum_for(name) {
        if field.is_optional() {
            lines.push(format!("        if (!row.isNull({})) {{", col));
        } else {
            lines.push("        {".to_string());
        }
        lines.push(format!("            auto s = row.get<std::string>({});", col));
        lines.extend(enum_chain(entity, field, mapping, "            "));
        lines.push("        }".to_string());
    } else if field.is_optional() {
        lines.push(format!(
            "        e.{} = row.getOpt<{}>({});",
            name,
            field.inner_type(),
            col
        ));
    } else {
        lines.push(format!(
            "        e.{} = row.get<{}>({});",
            name, field.declared_type, col
        ));
    }
    lines
}

/// `fromRow`: one decode block per column, in column order.
pub fn generate_from_row(entity: &EntityDescriptor) -> Vec<String> {
    let mut lines = vec![
        "    template<typename Entity>".to_string(),
        "    static std::optional<Entity> fromRow(const jcailloux::relais::io::PgResult::Row& row) {"
            .to_string(),
        "        Entity e;".to_string(),
    ];
    for field in entity.ordered_fields() {
        lines.extend(decode_field(entity, field));
    }
    lines.push("        return e;".to_string());
    lines.push("    }".to_string());
    lines
}
