use crate::{
    types::{EntityDescriptor, FieldDescriptor},
    utils::{qualify, quote},
};

const PG_PARAMS: &str = "jcailloux::relais::io::PgParams";

/// Needs more than a plain `PgParams::make(e.field, ...)` argument.
fn needs_conversion(entity: &EntityDescriptor, field: &FieldDescriptor) -> bool {
    entity.is_json_field(&field.name)
        || entity.is_raw_json(field)
        || entity.enum_for(&field.name).is_some()
}

fn push_field(entity: &EntityDescriptor, field: &FieldDescriptor) -> Vec<String> {
    let name = &field.name;
    let mut lines = Vec::new();

    if entity.is_json_field(name) {
        if field.is_optional() {
            lines.push(format!("        if (e.{}) {{", name));
            lines.push("            std::string json;".to_string());
            lines.push(format!("            glz::write_json(*e.{}, json);", name));
            lines.push("            p.push(json);".to_string());
            lines.push("        } else {".to_string());
            lines.push("            p.pushNull();".to_string());
            lines.push("        }".to_string());
        } else {
            lines.push(format!(
                "        {{ std::string json; glz::write_json(e.{}, json); p.push(json); }}",
                name
            ));
        }
    } else if entity.is_raw_json(field) {
        lines.push(format!("        p.push(e.{}.str);", name));
    } else if let Some(mapping) = entity.enum_for(name) {
        let enum_type = qualify(&entity.namespace, &mapping.enum_type);
        let (indent, subject) = if field.is_optional() {
            lines.push(format!("        if (e.{}.has_value()) {{", name));
            ("            ", format!("*e.{}", name))
        } else {
            ("        ", format!("e.{}", name))
        };
        lines.push(format!("{}switch ({}) {{", indent, subject));
        for pair in &mapping.pairs {
            lines.push(format!(
                "{}    case {}::{}: p.push({}); break;",
                indent,
                enum_type,
                pair.local,
                quote(&pair.external)
            ));
        }
        lines.push(format!("{}}}", indent));
        if field.is_optional() {
            lines.push("        } else {".to_string());
            lines.push("            p.pushNull();".to_string());
            lines.push("        }".to_string());
        }
    } else {
        lines.push(format!("        p.push(e.{});", name));
    }
    lines
}

/// Body of a params builder over `written`, with a trace comment wherever a
/// column of the entity is left out.
fn params_body(
    entity: &EntityDescriptor,
    written: &[&FieldDescriptor],
    skip_reason: impl Fn(&FieldDescriptor) -> Option<&'static str>,
) -> Vec<String> {
    let mut lines = Vec::new();

    if !written.iter().any(|f| needs_conversion(entity, f)) {
        lines.push(format!("        return {}::make(", PG_PARAMS));
        let last = written.last().map(|f| f.name.as_str());
        for field in entity.ordered_fields() {
            if let Some(reason) = skip_reason(field) {
                lines.push(format!("            // {}: skipped ({})", field.name, reason));
            } else {
                let comma = if Some(field.name.as_str()) == last { "" } else { "," };
                lines.push(format!("            e.{}{}", field.name, comma));
            }
        }
        lines.push("        );".to_string());
        return lines;
    }

    lines.push(format!("        {} p;", PG_PARAMS));
    for field in entity.ordered_fields() {
        if let Some(reason) = skip_reason(field) {
            lines.push(format!("        // {}: skipped ({})", field.name, reason));
        } else {
            lines.extend(push_field(entity, field));
        }
    }
    lines.push("        return p;".to_string());
    lines
}

/// `toInsertParams`: parameters in INSERT column order.
pub fn generate_insert_params(entity: &EntityDescriptor) -> Vec<String> {
    let mut lines = vec![
        "    template<typename Entity>".to_string(),
        format!("    static {} toInsertParams(const Entity& e) {{", PG_PARAMS),
    ];
    lines.extend(params_body(entity, &entity.insert_fields(), |f| {
        entity.is_db_managed(&f.name).then_some("db_managed")
    }));
    lines.push("    }".to_string());
    lines
}

/// `toUpdateParams`: the SET parameters, bound after the key parameters.
pub fn generate_update_params(entity: &EntityDescriptor) -> Vec<String> {
    let mut lines = vec![
        "    template<typename Entity>".to_string(),
        format!("    static {} toUpdateParams(const Entity& e) {{", PG_PARAMS),
    ];
    lines.extend(params_body(entity, &entity.update_fields(), |f| {
        if entity.is_primary_key(&f.name) {
            Some("primary_key")
        } else if entity.is_db_managed(&f.name) {
            Some("db_managed")
        } else {
            None
        }
    }));
    lines.push("    }".to_string());
    lines
}

/// The write path. Empty for read-only entities.
pub fn generate_write_params(entity: &EntityDescriptor) -> Vec<String> {
    if entity.annotation.read_only {
        return Vec::new();
    }
    let mut lines = generate_insert_params(entity);
    if !entity.update_fields().is_empty() {
        lines.push(String::new());
        lines.extend(generate_update_params(entity));
    }
    lines
}
