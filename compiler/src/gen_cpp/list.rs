use crate::{
    types::{EntityDescriptor, FilterConfig, FilterOp, SortDirection, DEFAULT_LIMIT_TIERS},
    utils::{comma_lines, quote},
};

const DECL_NS: &str = "jcailloux::relais::cache::list::decl";

/// Filters ordered by HTTP parameter, then field. The descriptor is left untouched.
pub fn sorted_filters(entity: &EntityDescriptor) -> Vec<&FilterConfig> {
    let mut filters: Vec<&FilterConfig> = entity.annotation.filters.iter().collect();
    filters.sort_by(|a, b| (&a.param, &a.field).cmp(&(&b.param, &b.field)));
    filters
}

/// `(default, max)` page sizes: first and last tier.
pub fn page_limits(entity: &EntityDescriptor) -> (u16, u16) {
    let tiers: &[u16] = if entity.annotation.limit_tiers.is_empty() {
        &DEFAULT_LIMIT_TIERS
    } else {
        &entity.annotation.limit_tiers
    };
    match (tiers.first(), tiers.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => (DEFAULT_LIMIT_TIERS[0], DEFAULT_LIMIT_TIERS[2]),
    }
}

fn filter_entry(entity: &EntityDescriptor, struct_name: &str, filter: &FilterConfig) -> String {
    let mut args = vec![
        quote(&filter.param),
        format!("&{}::{}", struct_name, filter.field),
        quote(entity.column_of(&filter.field)),
    ];
    if filter.op != FilterOp::Eq {
        args.push(format!("{}::Op::{}", DECL_NS, filter.op.as_str().to_uppercase()));
    }
    format!("{}::Filter<{}>{{}}", DECL_NS, args.join(", "))
}

/// The `ListDescriptor` nested in a mapping. Empty when the entity has no list configuration.
pub fn generate_list_descriptor(entity: &EntityDescriptor) -> Vec<String> {
    let a = &entity.annotation;
    if !a.has_list() {
        return Vec::new();
    }
    let struct_name = entity.qualified_struct_name();
    let mut lines = vec!["    struct ListDescriptor {".to_string()];

    if !a.filters.is_empty() {
        let entries: Vec<String> = sorted_filters(entity)
            .into_iter()
            .map(|f| filter_entry(entity, &struct_name, f))
            .collect();
        lines.push(String::new());
        lines.push("        static constexpr auto filters = std::tuple{".to_string());
        lines.extend(comma_lines(&entries, "            "));
        lines.push("        };".to_string());
    }

    if !a.sorts.is_empty() {
        let entries: Vec<String> = a
            .sorts
            .iter()
            .map(|s| {
                let direction = match s.direction {
                    SortDirection::Asc => "Asc",
                    SortDirection::Desc => "Desc",
                };
                format!(
                    "{ns}::Sort<{}, &{}::{}, {}, {ns}::SortDirection::{}>{{}}",
                    quote(&s.param),
                    struct_name,
                    s.field,
                    quote(entity.column_of(&s.field)),
                    direction,
                    ns = DECL_NS
                )
            })
            .collect();
        lines.push(String::new());
        lines.push("        static constexpr auto sorts = std::tuple{".to_string());
        lines.extend(comma_lines(&entries, "            "));
        lines.push("        };".to_string());
    }

    let (default_limit, max_limit) = page_limits(entity);
    lines.push(String::new());
    lines.push(format!("        static constexpr uint16_t defaultLimit = {};", default_limit));
    lines.push(format!("        static constexpr uint16_t maxLimit = {};", max_limit));
    lines.push("    };".to_string());
    lines
}
