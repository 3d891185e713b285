//! Entity model builder.
//!
//! Folds a [`ScannedClass`] and its class-level tokens into an immutable
//! [`EntityDescriptor`]: defaults are resolved, per-field flags are collected
//! into the annotation lists, and bare `enum` tags are resolved against the
//! `glz::meta` specializations found in the source header.

use crate::{
    error::RelgenError,
    types::{
        ClassToken, Column, EntityAnnotation, EntityDescriptor, EnumMapping, EnumPair, FieldFlag,
        ScannedClass, SourceLocation,
    },
    utils::{bare_name, qualify, to_snake_case},
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

lazy_static! {
    static ref ENUMERATE_CALL: Regex = Regex::new(r"(?s)glz::enumerate\((.*?)\)").unwrap();
    static ref ENUMERATE_PAIR: Regex = Regex::new(r#""([^"]+)"\s*,\s*([\w:]+)"#).unwrap();
}

/// Builds the descriptor for one scanned class.
///
/// `source_text` is the full header the class was scanned from; it is only
/// read, to find existing `glz::meta` specializations.
pub fn build_entity(
    scanned: &ScannedClass,
    source_text: &str,
    source_file: &str,
) -> Result<EntityDescriptor, RelgenError> {
    let mut table = None;
    let mut model = None;
    let mut read_only = false;
    let mut limit_tiers = Vec::new();
    let mut entity_name = None;
    let mut class_enums: Vec<(String, Vec<EnumPair>)> = Vec::new();

    for token in &scanned.annotations {
        match token {
            ClassToken::Table(t) => table = Some(t.clone()),
            ClassToken::Model(m) => model = Some(m.clone()),
            ClassToken::ReadOnly => read_only = true,
            ClassToken::Enum { field, pairs } => class_enums.push((field.clone(), pairs.clone())),
            ClassToken::Limits(tiers) => limit_tiers = tiers.clone(),
            ClassToken::Entity(e) => entity_name = Some(e.clone()),
            ClassToken::Other(other) => debug!("{}: ignoring class token {:?}", scanned.name, other),
        }
    }

    let table_name = table.unwrap_or_else(|| {
        let derived = to_snake_case(&scanned.name);
        warn!(
            "No table= annotation for {}, using derived name '{}'",
            scanned.name, derived
        );
        derived
    });

    let mut annotation = EntityAnnotation {
        table_name,
        model,
        primary_keys: Vec::new(),
        partition_keys: Vec::new(),
        db_managed: Vec::new(),
        timestamps: Vec::new(),
        raw_json: Vec::new(),
        json_fields: Vec::new(),
        enums: Vec::new(),
        read_only,
        filters: Vec::new(),
        sorts: Vec::new(),
        limit_tiers,
        qualified_entity_name: entity_name
            .unwrap_or_else(|| qualify(&scanned.namespace, &scanned.name)),
        has_struct_meta: has_glz_meta(source_text, &scanned.name),
    };

    for field in &scanned.fields {
        let tags = &field.tags;
        let name = &field.name;
        let is_json = tags.has(&FieldFlag::JsonField);

        if tags.has(&FieldFlag::PrimaryKey) {
            annotation.primary_keys.push(name.clone());
        }
        if tags.has(&FieldFlag::PartitionKey) {
            annotation.partition_keys.push(name.clone());
        }
        if tags.has(&FieldFlag::DbManaged) {
            annotation.db_managed.push(name.clone());
        }
        if tags.has(&FieldFlag::RawJson) || field.is_raw_json() {
            annotation.raw_json.push(name.clone());
        }
        if is_json {
            annotation.json_fields.push(name.clone());
        } else if tags.has(&FieldFlag::Timestamp) {
            annotation.timestamps.push(name.clone());
        }

        let wants_enum = !tags.enum_pairs.is_empty() || tags.has(&FieldFlag::AutoEnum);
        if wants_enum && is_json {
            warn!(
                "{}::{} is tagged both json_field and enum; treating it as JSON",
                scanned.name, name
            );
        } else if wants_enum {
            annotation.enums.push(EnumMapping {
                field_name:        name.clone(),
                enum_type:         field.inner_type().to_string(),
                pairs:             tags.enum_pairs.clone(),
                has_external_meta: false,
            });
        }

        annotation.filters.extend(tags.filters.iter().cloned());
        annotation.sorts.extend(tags.sorts.iter().cloned());
    }

    for (field_name, pairs) in class_enums {
        apply_class_enum(scanned, &mut annotation, field_name, pairs);
    }

    if annotation.primary_keys.is_empty() {
        annotation.primary_keys.push("id".to_string());
    }

    for mapping in &mut annotation.enums {
        resolve_enum(mapping, &scanned.namespace, source_text, source_file)?;
    }

    let columns = scanned
        .fields
        .iter()
        .enumerate()
        .map(|(index, f)| Column {
            index,
            field: f.name.clone(),
            column: f.column_name().to_string(),
        })
        .collect();

    Ok(EntityDescriptor {
        class_name: scanned.name.clone(),
        namespace: scanned.namespace.clone(),
        annotation,
        fields: scanned.fields.clone(),
        columns,
        source: SourceLocation {
            file: source_file.to_string(),
            line: scanned.line,
        },
    })
}

/// Merges a class-level `enum=field:...` token. Inline pairs on the field win.
fn apply_class_enum(
    scanned: &ScannedClass,
    annotation: &mut EntityAnnotation,
    field_name: String,
    pairs: Vec<EnumPair>,
) {
    let Some(field) = scanned.fields.iter().find(|f| f.name == field_name) else {
        debug!("{}: enum= names unknown field {:?}", scanned.name, field_name);
        return;
    };
    if annotation.json_fields.contains(&field_name) {
        warn!(
            "{}::{} is tagged both json_field and enum; treating it as JSON",
            scanned.name, field_name
        );
        return;
    }
    match annotation.enums.iter_mut().find(|e| e.field_name == field_name) {
        Some(existing) if existing.pairs.is_empty() => existing.pairs = pairs,
        Some(_) => debug!("{}::{}: inline enum pairs take precedence", scanned.name, field_name),
        None => annotation.enums.push(EnumMapping {
            field_name,
            enum_type: field.inner_type().to_string(),
            pairs,
            has_external_meta: false,
        }),
    }
}

/// Fills in pairs for a bare `enum` tag and records whether the header
/// already provides `glz::meta` for the enum type.
fn resolve_enum(
    mapping: &mut EnumMapping,
    namespace: &str,
    source_text: &str,
    source_file: &str,
) -> Result<(), RelgenError> {
    let type_name = bare_name(&mapping.enum_type);
    mapping.has_external_meta = has_glz_meta(source_text, type_name);
    if !mapping.pairs.is_empty() {
        return Ok(());
    }

    let pairs = parse_glz_enumerate(source_text, type_name);
    if pairs.is_empty() {
        return Err(RelgenError::UnresolvedEnum {
            field:     mapping.field_name.clone(),
            enum_type: qualify(namespace, &mapping.enum_type),
            file:      source_file.to_string(),
        });
    }
    mapping.pairs = pairs;
    Ok(())
}

fn glz_meta_pattern(type_name: &str) -> String {
    format!(
        r"struct\s+glz::meta\s*<\s*(?:[\w:]+::)*{}\s*>",
        regex::escape(type_name)
    )
}

/// Whether `source_text` specializes `glz::meta` for `type_name` (qualified or not).
pub fn has_glz_meta(source_text: &str, type_name: &str) -> bool {
    Regex::new(&glz_meta_pattern(type_name))
        .map(|re| re.is_match(source_text))
        .unwrap_or(false)
}

/// Extracts `("external", Member)` pairs from the `glz::enumerate(...)` call in
/// the `glz::meta` specialization for `type_name`. Empty when there is none.
pub fn parse_glz_enumerate(source_text: &str, type_name: &str) -> Vec<EnumPair> {
    let pattern = format!(r"(?s){}\s*\{{(.*?)\}}\s*;", glz_meta_pattern(type_name));
    let Ok(meta) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let Some(body) = meta.captures(source_text).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let Some(args) = ENUMERATE_CALL.captures(body.as_str()).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    ENUMERATE_PAIR
        .captures_iter(args.as_str())
        .map(|c| EnumPair::new(&c[1], bare_name(&c[2])))
        .collect()
}
