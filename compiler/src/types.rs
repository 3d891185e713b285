use serde::Serialize;

/// Template that marks a nullable member, e.g. `std::optional<int32_t>`.
pub const OPTIONAL_PREFIX: &str = "std::optional<";
/// Substring of a type name that marks an uninterpreted JSON blob (`glz::raw_json`).
pub const RAW_JSON_MARKER: &str = "raw_json";
/// Page sizes used when a list entity carries no `limits=` token.
pub const DEFAULT_LIMIT_TIERS: [u16; 3] = [10, 25, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    /// Recognizes an operator name, normalizing the `gte`/`lte` aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(FilterOp::Eq),
            "ne" => Some(FilterOp::Ne),
            "gt" => Some(FilterOp::Gt),
            "ge" | "gte" => Some(FilterOp::Ge),
            "lt" => Some(FilterOp::Lt),
            "le" | "lte" => Some(FilterOp::Le),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Ge => "ge",
            FilterOp::Lt => "lt",
            FilterOp::Le => "le",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub param: String,
    pub field: String,
    pub op:    FilterOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortConfig {
    pub param:     String,
    pub field:     String,
    pub direction: SortDirection,
}

/// One `external:Local` pair of an enum mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumPair {
    pub external: String,
    pub local:    String,
}

impl EnumPair {
    pub fn new(external: impl Into<String>, local: impl Into<String>) -> Self {
        EnumPair {
            external: external.into(),
            local:    local.into(),
        }
    }
}

/// Boolean tags a member can carry. Anything the builder does not act on lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FieldFlag {
    PrimaryKey,
    PartitionKey,
    DbManaged,
    Timestamp,
    RawJson,
    JsonField,
    /// Bare `enum`: pairs are resolved later from `glz::meta` in the source.
    AutoEnum,
    Other(String),
}

impl FieldFlag {
    pub fn parse(token: &str) -> Self {
        match token {
            "primary_key" => FieldFlag::PrimaryKey,
            "partition_key" => FieldFlag::PartitionKey,
            "db_managed" => FieldFlag::DbManaged,
            "timestamp" => FieldFlag::Timestamp,
            "raw_json" => FieldFlag::RawJson,
            "json_field" => FieldFlag::JsonField,
            "enum" => FieldFlag::AutoEnum,
            other => FieldFlag::Other(other.to_string()),
        }
    }
}

/// Everything an inline `// @relais ...` tag says about one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldTags {
    pub flags:      Vec<FieldFlag>,
    pub column:     Option<String>,
    pub enum_pairs: Vec<EnumPair>,
    pub filters:    Vec<FilterConfig>,
    pub sorts:      Vec<SortConfig>,
}

impl FieldTags {
    pub fn has(&self, flag: &FieldFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_empty(&self) -> bool {
        *self == FieldTags::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name:          String,
    pub declared_type: String,
    pub default_expr:  String,
    pub line:          usize,
    pub tags:          FieldTags,
}

impl FieldDescriptor {
    /// DB column name, falling back to the member name.
    pub fn column_name(&self) -> &str {
        self.tags.column.as_deref().unwrap_or(&self.name)
    }

    pub fn is_optional(&self) -> bool {
        self.declared_type.starts_with(OPTIONAL_PREFIX) && self.declared_type.ends_with('>')
    }

    /// `T` for `std::optional<T>`, the declared type otherwise.
    pub fn inner_type(&self) -> &str {
        if self.is_optional() {
            self.declared_type[OPTIONAL_PREFIX.len()..self.declared_type.len() - 1].trim()
        } else {
            &self.declared_type
        }
    }

    pub fn is_raw_json(&self) -> bool {
        self.declared_type.contains(RAW_JSON_MARKER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumMapping {
    pub field_name: String,
    pub enum_type:  String,
    pub pairs:      Vec<EnumPair>,
    /// The source header already specializes `glz::meta` for this enum.
    pub has_external_meta: bool,
}

/// A class-level token from a `// @relais` or `// @relais_list` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClassToken {
    Table(String),
    Model(String),
    ReadOnly,
    /// `enum=field:ext1:Local1,ext2:Local2`
    Enum { field: String, pairs: Vec<EnumPair> },
    Limits(Vec<u16>),
    Entity(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityAnnotation {
    pub table_name:            String,
    pub model:                 Option<String>,
    pub primary_keys:          Vec<String>,
    pub partition_keys:        Vec<String>,
    pub db_managed:            Vec<String>,
    pub timestamps:            Vec<String>,
    pub raw_json:              Vec<String>,
    pub json_fields:           Vec<String>,
    pub enums:                 Vec<EnumMapping>,
    pub read_only:             bool,
    pub filters:               Vec<FilterConfig>,
    pub sorts:                 Vec<SortConfig>,
    pub limit_tiers:           Vec<u16>,
    pub qualified_entity_name: String,
    /// The source header already specializes `glz::meta` for the struct itself.
    pub has_struct_meta:       bool,
}

impl EntityAnnotation {
    pub fn has_list(&self) -> bool {
        !self.filters.is_empty() || !self.sorts.is_empty() || !self.limit_tiers.is_empty()
    }

    pub fn is_composite_key(&self) -> bool {
        self.primary_keys.len() > 1
    }
}

/// One entry of the authoritative column order shared by every emitter pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub index:  usize,
    pub field:  String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

/// A recognized annotated class as the scanner saw it, before any defaults are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedClass {
    pub name:        String,
    pub namespace:   String,
    pub is_struct:   bool,
    pub line:        usize,
    pub annotations: Vec<ClassToken>,
    pub fields:      Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDescriptor {
    pub class_name: String,
    pub namespace:  String,
    pub annotation: EntityAnnotation,
    pub fields:     Vec<FieldDescriptor>,
    pub columns:    Vec<Column>,
    pub source:     SourceLocation,
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column for a member name; unknown names are used verbatim.
    pub fn column_of<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.columns
            .iter()
            .find(|c| c.field == field_name)
            .map(|c| c.column.as_str())
            .unwrap_or(field_name)
    }

    pub fn enum_for(&self, field_name: &str) -> Option<&EnumMapping> {
        self.annotation.enums.iter().find(|e| e.field_name == field_name)
    }

    pub fn is_primary_key(&self, field_name: &str) -> bool {
        self.annotation.primary_keys.iter().any(|k| k == field_name)
    }

    pub fn is_db_managed(&self, field_name: &str) -> bool {
        self.annotation.db_managed.iter().any(|k| k == field_name)
    }

    pub fn is_json_field(&self, field_name: &str) -> bool {
        self.annotation.json_fields.iter().any(|k| k == field_name)
    }

    pub fn is_timestamp(&self, field_name: &str) -> bool {
        self.annotation.timestamps.iter().any(|k| k == field_name)
    }

    pub fn is_raw_json(&self, field: &FieldDescriptor) -> bool {
        field.is_raw_json() || self.annotation.raw_json.iter().any(|k| *k == field.name)
    }

    /// Fields in column order.
    pub fn ordered_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.columns.iter().filter_map(move |c| self.field(&c.field))
    }

    pub fn key_columns(&self) -> Vec<&str> {
        self.annotation
            .primary_keys
            .iter()
            .map(|k| self.column_of(k))
            .collect()
    }

    pub fn partition_columns(&self) -> Vec<&str> {
        self.annotation
            .partition_keys
            .iter()
            .map(|k| self.column_of(k))
            .collect()
    }

    /// Columns written by INSERT: everything but db-managed fields.
    pub fn insert_fields(&self) -> Vec<&FieldDescriptor> {
        self.ordered_fields()
            .filter(|f| !self.is_db_managed(&f.name))
            .collect()
    }

    /// Columns written by UPDATE's SET list: no keys, no db-managed fields.
    pub fn update_fields(&self) -> Vec<&FieldDescriptor> {
        self.ordered_fields()
            .filter(|f| !self.is_primary_key(&f.name) && !self.is_db_managed(&f.name))
            .collect()
    }

    /// Fields addressable by partial updates: no keys, no db-managed, no JSON fields.
    pub fn updateable_fields(&self) -> Vec<&FieldDescriptor> {
        self.ordered_fields()
            .filter(|f| {
                !self.is_primary_key(&f.name)
                    && !self.is_db_managed(&f.name)
                    && !self.is_json_field(&f.name)
            })
            .collect()
    }

    /// `namespace::Class`, or the bare class name at global scope.
    pub fn qualified_struct_name(&self) -> String {
        crate::utils::qualify(&self.namespace, &self.class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(declared_type: &str) -> FieldDescriptor {
        FieldDescriptor {
            name:          "note".to_string(),
            declared_type: declared_type.to_string(),
            default_expr:  String::new(),
            line:          1,
            tags:          FieldTags::default(),
        }
    }

    #[test]
    fn test_optional_unwrapping() {
        let plain = field("std::string");
        assert!(!plain.is_optional());
        assert_eq!(plain.inner_type(), "std::string");

        let optional = field("std::optional<std::string>");
        assert!(optional.is_optional());
        assert_eq!(optional.inner_type(), "std::string");

        let nested = field("std::optional<std::vector<int>>");
        assert_eq!(nested.inner_type(), "std::vector<int>");

        // not an optional, just a lookalike prefix
        assert!(!field("std::optional_ref").is_optional());
    }

    #[test]
    fn test_column_name_and_raw_json() {
        let mut f = field("glz::raw_json");
        assert!(f.is_raw_json());
        assert_eq!(f.column_name(), "note");
        f.tags.column = Some("note_text".to_string());
        assert_eq!(f.column_name(), "note_text");
        assert!(!field("std::optional<glz::json_t>").is_raw_json());
    }
}
