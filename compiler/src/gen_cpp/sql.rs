use crate::{
    types::EntityDescriptor,
    utils::{quote, sql_array_type},
};
use tracing::debug;

/// Statement text for one entity. Placeholder numbering follows the order
/// in which the runtime binds parameters: key columns first, then the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatements {
    pub returning_columns:     String,
    pub select_by_pk:          String,
    pub select_by_pks:         String,
    pub insert:                String,
    /// `None` for read-only entities and when no column is left to SET.
    pub update:                Option<String>,
    pub delete_by_pk:          String,
    /// Only with partition keys: key columns AND partition columns.
    pub delete_with_partition: Option<String>,
}

fn placeholder(n: usize) -> String {
    format!("${}", n)
}

/// `a = $1 AND b = $2`, numbering from `first`.
fn where_clause(columns: &[&str], first: usize) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = {}", col, placeholder(first + i)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn batch_where(entity: &EntityDescriptor) -> String {
    let keys = entity.key_columns();
    if let [single] = keys.as_slice() {
        return format!("{} = ANY($1)", single);
    }

    let arrays: Vec<String> = entity
        .annotation
        .primary_keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let cast = entity
                .field(key)
                .and_then(|f| sql_array_type(f.inner_type()))
                .map(|t| format!("::{}[]", t))
                .unwrap_or_default();
            format!("{}{}", placeholder(i + 1), cast)
        })
        .collect();
    format!(
        "({}) IN (SELECT * FROM unnest({}))",
        keys.join(", "),
        arrays.join(", ")
    )
}

pub fn build_sql(entity: &EntityDescriptor) -> SqlStatements {
    let table = &entity.annotation.table_name;
    let all_columns = entity
        .columns
        .iter()
        .map(|c| c.column.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let keys = entity.key_columns();

    let insert_fields = entity.insert_fields();
    let insert_columns: Vec<&str> = insert_fields.iter().map(|f| f.column_name()).collect();
    let insert_params: Vec<String> = (1..=insert_columns.len()).map(placeholder).collect();

    let update = if entity.annotation.read_only {
        None
    } else {
        let set: Vec<String> = entity
            .update_fields()
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}={}", f.column_name(), placeholder(keys.len() + i + 1)))
            .collect();
        if set.is_empty() {
            debug!("{}: no updatable columns, skipping UPDATE", entity.class_name);
            None
        } else {
            Some(format!(
                "UPDATE {} SET {} WHERE {}",
                table,
                set.join(", "),
                where_clause(&keys, 1)
            ))
        }
    };

    let delete_with_partition = if entity.annotation.partition_keys.is_empty() {
        None
    } else {
        let mut columns = keys.clone();
        columns.extend(entity.partition_columns());
        Some(format!("DELETE FROM {} WHERE {}", table, where_clause(&columns, 1)))
    };

    SqlStatements {
        select_by_pk: format!(
            "SELECT {} FROM {} WHERE {}",
            all_columns,
            table,
            where_clause(&keys, 1)
        ),
        select_by_pks: format!(
            "SELECT {} FROM {} WHERE {}",
            all_columns,
            table,
            batch_where(entity)
        ),
        insert: format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            insert_columns.join(", "),
            insert_params.join(", "),
            all_columns
        ),
        update,
        delete_by_pk: format!("DELETE FROM {} WHERE {}", table, where_clause(&keys, 1)),
        delete_with_partition,
        returning_columns: all_columns,
    }
}

fn constant(name: &str, sql: &str) -> [String; 2] {
    [
        format!("        static constexpr const char* {} =", name),
        format!("            {};", quote(sql)),
    ]
}

/// The nested `struct SQL` of a mapping.
pub fn generate_sql_struct(entity: &EntityDescriptor) -> Vec<String> {
    let sql = build_sql(entity);
    let mut lines = vec!["    struct SQL {".to_string()];

    lines.extend(constant("returning_columns", &sql.returning_columns));
    lines.extend(constant("select_by_pk", &sql.select_by_pk));
    lines.extend(constant("select_by_pks", &sql.select_by_pks));
    lines.extend(constant("insert", &sql.insert));
    if let Some(update) = &sql.update {
        lines.extend(constant("update", update));
    }
    lines.extend(constant("delete_by_pk", &sql.delete_by_pk));
    if let Some(delete) = &sql.delete_with_partition {
        lines.extend(constant("delete_with_partition", delete));
    }

    lines.push("    };".to_string());
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
    fn test_single_key_statements() {
        let e = entity(
            r#"
// @relais table=articles
struct Article {
    int64_t id = 0;           // @relais primary_key db_managed
    std::string title;
    std::string body;         // @relais column=content
    std::string created_at;   // @relais db_managed timestamp
};
"#,
        );
        let sql = build_sql(&e);
        assert_eq!(sql.returning_columns, "id, title, content, created_at");
        assert_eq!(
            sql.select_by_pk,
            "SELECT id, title, content, created_at FROM articles WHERE id = $1"
        );
        assert_eq!(
            sql.select_by_pks,
            "SELECT id, title, content, created_at FROM articles WHERE id = ANY($1)"
        );
        assert_eq!(
            sql.insert,
            "INSERT INTO articles (title, content) VALUES ($1, $2) RETURNING id, title, content, created_at"
        );
        assert_eq!(
            sql.update.as_deref(),
            Some("UPDATE articles SET title=$2, content=$3 WHERE id = $1")
        );
        assert_eq!(sql.delete_by_pk, "DELETE FROM articles WHERE id = $1");
        assert!(sql.delete_with_partition.is_none());
    }

    #[test]
    fn test_composite_key_statements() {
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
        let sql = build_sql(&e);
        assert!(sql.select_by_pk.ends_with("WHERE user_id = $1 AND group_id = $2"));
        assert_eq!(
            sql.update.as_deref(),
            Some("UPDATE memberships SET role=$3 WHERE user_id = $1 AND group_id = $2")
        );
        assert_eq!(
            sql.insert,
            "INSERT INTO memberships (user_id, group_id, role) VALUES ($1, $2, $3) RETURNING user_id, group_id, role"
        );
        assert!(sql.select_by_pks.ends_with(
            "WHERE (user_id, group_id) IN (SELECT * FROM unnest($1::bigint[], $2::bigint[]))"
        ));
        assert!(!sql.select_by_pks.contains("ANY"));
        assert_eq!(
            sql.delete_by_pk,
            "DELETE FROM memberships WHERE user_id = $1 AND group_id = $2"
        );
    }

    #[test]
    fn test_partition_delete() {
        let e = entity(
            r#"
// @relais table=events
struct Event {
    int64_t id = 0;      // @relais primary_key db_managed
    std::string region;  // @relais partition_key
    int32_t kind = 0;
};
"#,
        );
        let sql = build_sql(&e);
        assert_eq!(
            sql.delete_with_partition.as_deref(),
            Some("DELETE FROM events WHERE id = $1 AND region = $2")
        );
        let lines = generate_sql_struct(&e);
        assert!(lines.iter().any(|l| l.contains("delete_with_partition =")));
    }

    #[test]
    fn test_read_only_has_no_update() {
        let e = entity(
            r#"
// @relais table=logs read_only
struct Log {
    int64_t id = 0;
    std::string line;
};
"#,
        );
        assert!(build_sql(&e).update.is_none());
        assert!(!generate_sql_struct(&e).iter().any(|l| l.contains(" update =")));
    }

    #[test]
    fn test_no_update_when_nothing_to_set() {
        let e = entity(
            r#"
// @relais table=tags
struct Tag {
    int64_t id = 0;  // @relais primary_key
};
"#,
        );
        assert!(build_sql(&e).update.is_none());
    }

    #[test]
    fn test_struct_lines_are_quoted() {
        let e = entity("// @relais table=t\nstruct T { int64_t id; };\n");
        let lines = generate_sql_struct(&e);
        assert_eq!(lines[0], "    struct SQL {");
        assert_eq!(lines[1], "        static constexpr const char* returning_columns =");
        assert_eq!(lines[2], "            \"id\";");
        assert_eq!(lines.last().map(String::as_str), Some("    };"));
    }
}
