//! The `@relais` annotation micro-language.
//!
//! Class blocks (`// @relais ...`, `// @relais_list ...`) become [`ClassToken`]s,
//! inline member tags become [`FieldTags`]. Nothing in here fails: a token this
//! grammar does not understand degrades to an opaque flag or is dropped.

use tracing::{debug, warn};

use crate::types::{
    ClassToken, EnumPair, FieldFlag, FieldTags, FilterConfig, FilterOp, SortConfig, SortDirection,
};

/// Splits annotation text into tokens. Values never contain spaces, so a
/// `key=value` token survives intact whatever punctuation the value holds.
pub fn tokenize_annotation(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Parses the text of one class-level annotation line.
pub fn parse_class_tokens(text: &str, is_list: bool) -> Vec<ClassToken> {
    tokenize_annotation(text)
        .into_iter()
        .map(|token| {
            if is_list {
                parse_list_token(token)
            } else {
                parse_class_token(token)
            }
        })
        .collect()
}

fn parse_class_token(token: &str) -> ClassToken {
    if let Some(table) = token.strip_prefix("table=") {
        ClassToken::Table(table.to_string())
    } else if let Some(model) = token.strip_prefix("model=") {
        ClassToken::Model(model.to_string())
    } else if token == "read_only" || token == "read_only=true" {
        ClassToken::ReadOnly
    } else if let Some(spec) = token.strip_prefix("enum=") {
        let (field, pairs) = parse_class_enum(spec);
        ClassToken::Enum { field, pairs }
    } else {
        ClassToken::Other(token.to_string())
    }
}

fn parse_list_token(token: &str) -> ClassToken {
    if let Some(limits) = token.strip_prefix("limits=") {
        ClassToken::Limits(parse_limits(limits))
    } else if let Some(entity) = token.strip_prefix("entity=") {
        ClassToken::Entity(entity.to_string())
    } else {
        ClassToken::Other(token.to_string())
    }
}

fn parse_limits(text: &str) -> Vec<u16> {
    text.split(',')
        .filter_map(|tier| match tier.trim().parse::<u16>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("ignoring malformed limit tier {:?} in limits={}", tier, text);
                None
            }
        })
        .collect()
}

/// Parses `ext1:Local1,ext2:Local2`. Fragments that are not exactly two
/// colon-separated parts are dropped; the remaining pairs keep their order.
pub fn parse_enum_pairs(text: &str) -> Vec<EnumPair> {
    let mut pairs = Vec::new();
    for fragment in text.split(',') {
        let parts: Vec<&str> = fragment.split(':').collect();
        if parts.len() == 2 {
            pairs.push(EnumPair::new(parts[0], parts[1]));
        } else {
            debug!("dropping malformed enum fragment {:?}", fragment);
        }
    }
    pairs
}

/// Parses the class-level form `field:ext1:Local1,ext2:Local2`.
pub fn parse_class_enum(text: &str) -> (String, Vec<EnumPair>) {
    match text.split_once(':') {
        Some((field, rest)) => (field.to_string(), parse_enum_pairs(rest)),
        None => (text.to_string(), Vec::new()),
    }
}

/// Resolves `filterable[:param][:op]` for the member `field_name`.
///
/// The meaning of a lone second part depends on whether it names an operator:
/// `filterable:ge` changes the operator, `filterable:since` the HTTP parameter.
pub fn parse_filterable(field_name: &str, tag: &str) -> FilterConfig {
    let parts: Vec<&str> = tag.split(':').collect();
    let (param, op) = match parts.as_slice() {
        [_] => (field_name, FilterOp::Eq),
        [_, second] => match FilterOp::parse(second) {
            Some(op) => (field_name, op),
            None => (*second, FilterOp::Eq),
        },
        [_, param, op, ..] => (
            *param,
            FilterOp::parse(op).unwrap_or_else(|| {
                debug!("unknown filter operator {:?} on {}, using eq", op, field_name);
                FilterOp::Eq
            }),
        ),
        [] => (field_name, FilterOp::Eq),
    };
    FilterConfig {
        param: param.to_string(),
        field: field_name.to_string(),
        op,
    }
}

/// Resolves `sortable[:direction]` / `sortable[:param[:direction]]`.
pub fn parse_sortable(field_name: &str, tag: &str) -> SortConfig {
    let parts: Vec<&str> = tag.split(':').collect();
    let (param, direction) = match parts.as_slice() {
        [_] => (field_name, SortDirection::Desc),
        [_, second] => match SortDirection::parse(second) {
            Some(direction) => (field_name, direction),
            None => (*second, SortDirection::Desc),
        },
        [_, param, direction, ..] => (
            *param,
            SortDirection::parse(direction).unwrap_or(SortDirection::Desc),
        ),
        [] => (field_name, SortDirection::Desc),
    };
    SortConfig {
        param: param.to_string(),
        field: field_name.to_string(),
        direction,
    }
}

/// Parses the text after `@relais` in a trailing member comment.
pub fn parse_field_tags(field_name: &str, text: &str) -> FieldTags {
    let mut tags = FieldTags::default();

    for token in tokenize_annotation(text) {
        let head = token.split(':').next().unwrap_or(token);
        if let Some(pairs) = token.strip_prefix("enum=") {
            tags.enum_pairs.extend(parse_enum_pairs(pairs));
        } else if let Some(column) = token.strip_prefix("column=") {
            tags.column = Some(column.to_string());
        } else if head == "filterable" {
            tags.filters.push(parse_filterable(field_name, token));
        } else if head == "sortable" {
            tags.sorts.push(parse_sortable(field_name, token));
        } else {
            let flag = FieldFlag::parse(token);
            if !tags.flags.contains(&flag) {
                tags.flags.push(flag);
            }
        }
    }

    tags
}
