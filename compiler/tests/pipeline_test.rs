#![cfg(test)]

use pretty_assertions::assert_eq;
use relgen_compiler::{
    compile_entities, compile_entity_to_cpp, compile_header,
    error::RelgenError,
    gen_cpp::{decode, encode, list, meta, sql},
    tags::{parse_filterable, parse_sortable},
    types::{EntityDescriptor, FilterOp, SortDirection},
    GenOptions,
};

const TASK_H: &str = r#"
#pragma once
#include <cstdint>
#include <optional>
#include <string>

namespace todo {

enum class Status { Open, Done };

// @relais table=tasks
// @relais_list limits=25,100
struct Task {
    int64_t id = 0;            // @relais primary_key
    Status status;             // @relais enum=open:Open,done:Done filterable
    std::string created_at;    // @relais timestamp sortable:desc
};

}  // namespace todo
"#;

fn options() -> GenOptions {
    GenOptions {
        source_include: "../todo/Task.h".to_string(),
        source_name:    "Task.h".to_string(),
    }
}

fn single(src: &str) -> EntityDescriptor {
    let mut entities = compile_entities(src, "Test.h").expect("compile_entities failed");
    assert_eq!(entities.len(), 1);
    entities.remove(0)
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn test_task_end_to_end() {
    let task = single(TASK_H);
    assert_eq!(task.namespace, "todo");
    assert_eq!(task.annotation.table_name, "tasks");

    let statements = sql::build_sql(&task);
    assert_eq!(
        statements.select_by_pk,
        "SELECT id, status, created_at FROM tasks WHERE id = $1"
    );

    let filters = list::sorted_filters(&task);
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].param, "status");
    assert_eq!(filters[0].op, FilterOp::Eq);
    assert_eq!(task.annotation.sorts[0].param, "created_at");
    assert_eq!(task.annotation.sorts[0].direction, SortDirection::Desc);

    let text = compile_entity_to_cpp(&task, &options());
    assert!(text.contains(
        "jcailloux::relais::cache::list::decl::Filter<\"status\", &todo::Task::status, \"status\">{}"
    ));
    assert!(text.contains(
        "jcailloux::relais::cache::list::decl::Sort<\"created_at\", &todo::Task::created_at, \"created_at\", jcailloux::relais::cache::list::decl::SortDirection::Desc>{}"
    ));
    assert!(text.contains("        static constexpr uint16_t defaultLimit = 25;"));
    assert!(text.contains("        static constexpr uint16_t maxLimit = 100;"));
    assert!(text.contains("case todo::Status::Done: p.push(\"done\"); break;"));
    assert!(text.contains("struct glz::meta<todo::Status> {"));
    assert!(text.contains("using TaskListWrapper = jcailloux::relais::wrapper::ListWrapper<TaskWrapper>;"));
}

#[test]
fn test_mapping_block() {
    let text = compile_entity_to_cpp(&single(TASK_H), &options());
    let start = text.find("struct TaskMapping {").unwrap();
    let end = text[start..].find("\n    struct SQL {").unwrap();
    assert_eq!(
        &text[start..start + end],
        "struct TaskMapping {
    static constexpr bool read_only = false;
    static constexpr const char* table_name = \"tasks\";
    static constexpr const char* primary_key_column = \"id\";

    enum Col : uint8_t { id = 0, status = 1, created_at = 2 };
"
    );
}

#[test]
fn test_output_is_deterministic() {
    let first = compile_header(TASK_H, "Task.h", &options()).unwrap();
    let second = compile_header(TASK_H, "Task.h", &options()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_column_order_is_shared() {
    let src = r#"
// @relais table=people
struct Person {
    std::string name;
    int64_t id = 0;                // @relais primary_key
    std::optional<int32_t> age;
    std::string email;             // @relais column=mail
};
"#;
    let person = single(src);
    let select = sql::build_sql(&person).returning_columns;
    assert_eq!(select, "name, id, age, mail");

    let from_row = decode::generate_from_row(&person).join("\n");
    let decoded: Vec<usize> = ["Col::name", "Col::id", "Col::age", "Col::email"]
        .iter()
        .map(|c| from_row.find(c).unwrap())
        .collect();
    assert!(decoded.windows(2).all(|w| w[0] < w[1]));

    let glaze = meta::generate_glaze_value(&person);
    assert_eq!(
        glaze[2..6].to_vec(),
        vec![
            "        \"name\", &T::name,",
            "        \"id\", &T::id,",
            "        \"age\", &T::age,",
            "        \"email\", &T::email",
        ]
    );
}

#[test]
fn test_insert_and_update_arity() {
    let src = r#"
// @relais table=orders
struct Order {
    int64_t id = 0;            // @relais primary_key db_managed
    int64_t customer_id = 0;
    std::string note;
    double total = 0;
    std::string created_at;    // @relais db_managed
};
"#;
    let order = single(src);
    let statements = sql::build_sql(&order);

    assert_eq!(count(&statements.insert, "$"), 3);
    assert!(statements.insert.contains("VALUES ($1, $2, $3)"));

    let update = statements.update.unwrap();
    let set = &update[update.find(" SET ").unwrap()..update.find(" WHERE ").unwrap()];
    assert_eq!(count(set, "="), 3);
    assert_eq!(set, " SET customer_id=$2, note=$3, total=$4");
    assert!(update.ends_with("WHERE id = $1"));

    let insert_params = encode::generate_insert_params(&order).join("\n");
    assert_eq!(count(&insert_params, "            e."), 3);
    assert_eq!(count(&insert_params, "skipped (db_managed)"), 2);
}

#[test]
fn test_read_only_suppresses_writes() {
    let src = r#"
namespace audit {
// @relais table=audit_log read_only=true
struct AuditEntry {
    int64_t id = 0;            // @relais primary_key
    Kind kind;                 // @relais enum=login:Login
    Payload payload;           // @relais json_field
    std::string created_at;    // @relais db_managed
};
}
"#;
    let text = compile_entity_to_cpp(&single(src), &options());
    assert!(text.contains("static constexpr bool read_only = true;"));
    assert!(!text.contains("toInsertParams"));
    assert!(!text.contains("toUpdateParams"));
    assert!(!text.contains("static constexpr const char* update ="));
    assert!(!text.contains("FieldInfo<"));
}

#[test]
fn test_composite_key_propagation() {
    let src = r#"
// @relais table=memberships
struct Membership {
    int64_t user_id = 0;   // @relais primary_key
    std::string group_id;  // @relais primary_key
    std::string role;
};
"#;
    let membership = single(src);
    let statements = sql::build_sql(&membership);
    let both = "WHERE user_id = $1 AND group_id = $2";
    assert!(statements.select_by_pk.ends_with(both));
    assert!(statements.update.as_deref().unwrap().ends_with(both));
    assert!(statements.delete_by_pk.ends_with(both));
    assert!(statements.select_by_pks.ends_with(
        "WHERE (user_id, group_id) IN (SELECT * FROM unnest($1::bigint[], $2::text[]))"
    ));

    let text = compile_entity_to_cpp(&membership, &options());
    assert!(text.contains("#include <tuple>"));
    assert!(text.contains("primary_key_columns = {\"user_id\", \"group_id\"};"));
    assert!(text.contains("return std::make_tuple(e.user_id, e.group_id);"));
    assert!(text.contains("toUpdateParams"));
}

#[test]
fn test_unresolved_enum_is_fatal() {
    let src = r#"
namespace shop {
// @relais table=tickets
struct Ticket {
    int64_t id = 0;
    Priority priority;   // @relais enum
};
}
"#;
    let err = compile_header(src, "Ticket.h", &options()).unwrap_err();
    match &err {
        RelgenError::UnresolvedEnum { field, enum_type, file } => {
            assert_eq!(field, "priority");
            assert_eq!(enum_type, "shop::Priority");
            assert_eq!(file, "Ticket.h");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("enum=val1:Variant1,val2:Variant2"));
}

#[test]
fn test_auto_enum_uses_source_metadata() {
    let src = r#"
namespace shop {
enum class Priority { Low, High };

// @relais table=tickets
struct Ticket {
    int64_t id = 0;
    Priority priority;   // @relais enum
};
}

template<>
struct glz::meta<shop::Priority> {
    using enum shop::Priority;
    static constexpr auto value = glz::enumerate(
        "low", Low,
        "high", High
    );
};
"#;
    let text = compile_entity_to_cpp(&single(src), &options());
    assert!(text.contains("else if (s == \"high\") e.priority = shop::Priority::High;"));
    // the header already specializes glz::meta for the enum
    assert!(!text.contains("struct glz::meta<shop::Priority>"));
}

#[test]
fn test_grammar_arity_table() {
    let filters = [
        ("filterable", "f", FilterOp::Eq),
        ("filterable:ge", "f", FilterOp::Ge),
        ("filterable:x", "x", FilterOp::Eq),
        ("filterable:x:le", "x", FilterOp::Le),
    ];
    for (tag, param, op) in filters {
        let cfg = parse_filterable("f", tag);
        assert_eq!((cfg.param.as_str(), cfg.op), (param, op), "{}", tag);
    }
    let sorts = [
        ("sortable", "f", SortDirection::Desc),
        ("sortable:asc", "f", SortDirection::Asc),
        ("sortable:x", "x", SortDirection::Desc),
        ("sortable:x:asc", "x", SortDirection::Asc),
    ];
    for (tag, param, direction) in sorts {
        let cfg = parse_sortable("f", tag);
        assert_eq!((cfg.param.as_str(), cfg.direction), (param, direction), "{}", tag);
    }
}

#[test]
fn test_lenient_input_is_skipped() {
    let src = r#"
namespace misc {
// @relais table=widgets
class Widget {
    int hidden;
public:
    Widget() = default;
    int64_t id = 0;              // @relais primary_key
    void resize(int w, int h);
    using Size = int;
    static constexpr int kMax = 3;
    std::string label;           // @relais enum=broken
private:
    int secret;
};
}

// @relais table=orphan
"#;
    let widget = single(src);
    let names: Vec<&str> = widget.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "label"]);
    assert_eq!(widget.annotation.table_name, "widgets");
    // all fragments malformed: nothing to map
    assert!(widget.annotation.enums.is_empty());
}
