//! Rendering and binding tests for the statement builder.

use super::{QueryBuilder, render, table};
use crate::client::{GenericClient, RowStream};
use crate::error::DbError;
use crate::row::{FromRow, IntoRow};
use crate::value::SqlValue;
use bytes::Bytes;
use tokio_postgres::types::ToSql;
use tokio_postgres::{CopyInSink, Row};

/// A client that must never be reached: precondition failures are expected
/// before any driver call.
struct UnreachableClient;

impl GenericClient for UnreachableClient {
    async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> crate::DbResult<Vec<Row>> {
        unreachable!("no driver call expected")
    }

    async fn query_one(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> crate::DbResult<Row> {
        unreachable!("no driver call expected")
    }

    async fn query_opt(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> crate::DbResult<Option<Row>> {
        unreachable!("no driver call expected")
    }

    async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> crate::DbResult<u64> {
        unreachable!("no driver call expected")
    }

    async fn batch_execute(&self, _: &str) -> crate::DbResult<()> {
        unreachable!("no driver call expected")
    }

    async fn query_stream(
        &self,
        _: &str,
        _: &[&(dyn ToSql + Sync)],
    ) -> crate::DbResult<RowStream> {
        unreachable!("no driver call expected")
    }

    async fn copy_in(&self, _: &str) -> crate::DbResult<CopyInSink<Bytes>> {
        unreachable!("no driver call expected")
    }
}

struct TestUser {
    name: String,
    points: i64,
}

impl IntoRow for TestUser {
    fn columns(&self) -> Vec<&'static str> {
        vec!["name", "points"]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.clone().into(), self.points.into()]
    }
}

struct AnyRow;

impl FromRow for AnyRow {
    fn from_row(_row: &Row) -> crate::DbResult<Self> {
        Ok(AnyRow)
    }
}

#[test]
fn select_defaults_to_all_columns() {
    assert_eq!(table("users").to_sql(), "SELECT * FROM \"users\"");
}

#[test]
fn select_replaces_and_add_select_appends() {
    let qb = table("users")
        .select(&["foo", "bar"])
        .add_select(&["baz"])
        .select_raw("COUNT(*) AS cnt");
    assert_eq!(
        qb.to_sql(),
        "SELECT foo, bar, baz, COUNT(*) AS cnt FROM \"users\""
    );
}

#[test]
fn where_chain_binds_in_order() {
    let (sql, values) = table("users")
        .where_("foo", "=", "foo foo foo")
        .and_where("bar", "!=", "foo")
        .or_where("baz", "=", 123i64)
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE foo = $1 AND bar != $2 OR baz = $3"
    );
    assert_eq!(
        values,
        vec![
            SqlValue::Text("foo foo foo".into()),
            SqlValue::Text("foo".into()),
            SqlValue::Int(123),
        ]
    );
}

#[test]
fn where_in_expands_one_placeholder_per_element() {
    let (sql, values) = table("users").where_in("id", vec![1i64, 2, 3]).build();
    assert_eq!(sql, "SELECT * FROM \"users\" WHERE id IN ($1, $2, $3)");
    assert_eq!(
        values,
        vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
    );
}

#[test]
fn where_not_in_and_or_variants() {
    let (sql, values) = table("users")
        .where_not_in("id", vec![1i64, 2])
        .or_where_in("points", vec![10i64])
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE id NOT IN ($1, $2) OR points IN ($3)"
    );
    assert_eq!(values.len(), 3);
}

#[test]
fn placeholder_numbering_continues_across_mixed_predicates() {
    let (sql, values) = table("users")
        .where_("a", "=", 1i64)
        .and_where_in("b", vec![2i64, 3])
        .and_where("c", "<", 4i64)
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE a = $1 AND b IN ($2, $3) AND c < $4"
    );
    assert_eq!(
        values,
        vec![
            SqlValue::Int(1),
            SqlValue::Int(2),
            SqlValue::Int(3),
            SqlValue::Int(4),
        ]
    );
}

#[test]
fn null_checks_render_inline_and_bind_nothing() {
    let (sql, values) = table("users")
        .where_null("deleted_at")
        .or_where_not_null("confirmed_at")
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE deleted_at IS NULL OR confirmed_at IS NOT NULL"
    );
    assert!(values.is_empty());
}

#[test]
fn between_renders_literal_operands() {
    let (sql, values) = table("users")
        .where_between("points", 10i64, 20i64)
        .and_where("name", "=", "alice")
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE points BETWEEN 10 AND 20 AND name = $1"
    );
    assert_eq!(values, vec![SqlValue::Text("alice".into())]);
}

#[test]
fn not_between_renders_literal_operands() {
    let sql = table("users")
        .where_not_between("points", 1i64, 5i64)
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE points NOT BETWEEN 1 AND 5"
    );
}

#[test]
fn string_between_operands_are_quoted() {
    let sql = table("events")
        .where_between("day", "2024-01-01", "2024-12-31")
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"events\" WHERE day BETWEEN '2024-01-01' AND '2024-12-31'"
    );
}

#[test]
fn raw_where_fragments_splice_verbatim() {
    let (sql, values) = table("users")
        .where_raw("points > 10")
        .and_where_raw("name LIKE 'a%'")
        .or_where_raw("banned")
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE points > 10 AND name LIKE 'a%' OR banned"
    );
    assert!(values.is_empty());
}

#[test]
fn joins_keep_call_order() {
    let sql = table("users")
        .left_join("posts", "users.id = posts.user_id")
        .inner_join("orders", "users.id = orders.user_id")
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" LEFT JOIN posts ON users.id = posts.user_id INNER JOIN orders ON users.id = orders.user_id"
    );
}

#[test]
fn full_and_cross_joins() {
    let sql = table("a")
        .full_outer_join("b", "a.id = b.id")
        .cross_join("c")
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"a\" FULL OUTER JOIN b ON a.id = b.id CROSS JOIN c"
    );
}

#[test]
fn group_and_having() {
    let sql = table("orders")
        .select(&["user_id", "COUNT(*)"])
        .group_by("user_id")
        .having("COUNT(*)", ">", 5i64)
        .to_sql();
    assert_eq!(
        sql,
        "SELECT user_id, COUNT(*) FROM \"orders\" GROUP BY user_id HAVING COUNT(*) > 5"
    );
}

#[test]
fn having_raw_appends_with_connectives() {
    let sql = table("orders")
        .group_by("user_id")
        .having_raw("SUM(total) > 100")
        .and_having_raw("COUNT(*) > 2")
        .or_having_raw("MAX(total) > 50")
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"orders\" GROUP BY user_id HAVING SUM(total) > 100 AND COUNT(*) > 2 OR MAX(total) > 50"
    );
}

#[test]
fn order_by_accumulates_pairs() {
    let sql = table("users")
        .order_by("points", "DESC")
        .order_by("name", "ASC")
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" ORDER BY points DESC, name ASC"
    );
}

#[test]
fn order_by_beats_raw_override() {
    let sql = table("users")
        .order_by_raw("random()")
        .order_by("id", "ASC")
        .to_sql();
    assert_eq!(sql, "SELECT * FROM \"users\" ORDER BY id ASC");
}

#[test]
fn order_by_raw_used_without_structured_entries() {
    let sql = table("users").order_by_raw("random()").to_sql();
    assert_eq!(sql, "SELECT * FROM \"users\" ORDER BY random()");
}

#[test]
fn zero_limit_and_offset_are_unset() {
    assert_eq!(
        table("users").limit(0).offset(0).to_sql(),
        "SELECT * FROM \"users\""
    );
    assert_eq!(
        table("users").limit(15).offset(5).to_sql(),
        "SELECT * FROM \"users\" LIMIT 15 OFFSET 5"
    );
}

#[test]
fn lock_for_update_is_last() {
    let sql = table("jobs")
        .where_("state", "=", "queued")
        .limit(1)
        .lock_for_update()
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"jobs\" WHERE state = $1 LIMIT 1 FOR UPDATE"
    );
}

#[test]
fn rendering_is_deterministic() {
    let qb = table("users")
        .where_("a", "=", 1i64)
        .or_where_in("b", vec![2i64, 3])
        .order_by("a", "ASC")
        .limit(7);
    assert_eq!(qb.to_sql(), qb.to_sql());
    assert_eq!(qb.build(), qb.build());
}

#[test]
fn table_resets_accumulated_state() {
    let qb = table("users")
        .select(&["foo"])
        .where_("a", "=", 1i64)
        .inner_join("posts", "users.id = posts.user_id")
        .group_by("a")
        .having_raw("COUNT(*) > 1")
        .order_by("a", "DESC")
        .limit(3)
        .offset(9)
        .lock_for_update()
        .from("other")
        .table("accounts");
    let (sql, values) = qb.build();
    assert_eq!(sql, "SELECT * FROM \"accounts\"");
    assert!(values.is_empty());
}

#[test]
fn union_stitches_arms_before_current_select() {
    let (sql, values) = table("users")
        .select(&["name"])
        .union()
        .table("posts")
        .select(&["title"])
        .build();
    assert_eq!(
        sql,
        "SELECT name FROM \"users\" UNION SELECT title FROM \"posts\""
    );
    assert!(values.is_empty());
}

#[test]
fn union_all_keeps_duplicates_flag() {
    let sql = table("users")
        .select(&["name"])
        .union_all()
        .table("posts")
        .select(&["title"])
        .to_sql();
    assert_eq!(
        sql,
        "SELECT name FROM \"users\" UNION ALL SELECT title FROM \"posts\""
    );
}

#[test]
fn union_renumbers_bindings_across_arms() {
    let (sql, values) = table("users")
        .where_("points", ">", 10i64)
        .union()
        .table("archive_users")
        .where_("points", ">", 20i64)
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE points > $1 UNION SELECT * FROM \"archive_users\" WHERE points > $2"
    );
    assert_eq!(values, vec![SqlValue::Int(10), SqlValue::Int(20)]);
}

#[test]
fn union_arms_survive_table_reset() {
    // table() clears everything else, but captured arms must stay for the
    // terminal render.
    let qb = table("users").select(&["name"]).union().table("posts");
    assert_eq!(
        qb.to_sql(),
        "SELECT name FROM \"users\" UNION SELECT * FROM \"posts\""
    );
}

#[test]
fn where_exists_captures_and_renumbers_nested_select() {
    let nested = table("orders")
        .select(&["1"])
        .where_raw("orders.user_id = users.id")
        .and_where("total", ">", 100i64);
    let (sql, values) = table("users")
        .where_("status", "=", "active")
        .where_exists(nested)
        .build();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE status = $1 AND EXISTS (SELECT 1 FROM \"orders\" WHERE orders.user_id = users.id AND total > $2)"
    );
    assert_eq!(
        values,
        vec![SqlValue::Text("active".into()), SqlValue::Int(100)]
    );
}

#[test]
fn where_not_exists_renders_negated_keyword() {
    let sql = table("users")
        .where_not_exists(table("bans").where_raw("bans.user_id = users.id"))
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE NOT EXISTS (SELECT 1 FROM \"bans\" WHERE bans.user_id = users.id)"
    );
}

#[test]
fn insert_sql_binds_each_column() {
    let user = TestUser {
        name: "alice".into(),
        points: 9,
    };
    let (sql, values) = table("users").insert_sql(&user).unwrap();
    assert_eq!(sql, "INSERT INTO \"users\" (name, points) VALUES($1, $2)");
    assert_eq!(
        values,
        vec![SqlValue::Text("alice".into()), SqlValue::Int(9)]
    );
}

#[test]
fn update_numbers_set_before_where() {
    let user = TestUser {
        name: "alice".into(),
        points: 9,
    };
    let (sql, values) = table("users")
        .where_("id", "=", 7i64)
        .update_sql(&user)
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE \"users\" SET name = $1, points = $2 WHERE id = $3"
    );
    assert_eq!(
        values,
        vec![
            SqlValue::Text("alice".into()),
            SqlValue::Int(9),
            SqlValue::Int(7),
        ]
    );
}

#[test]
fn update_where_in_continues_after_set_placeholders() {
    let user = TestUser {
        name: "bob".into(),
        points: 1,
    };
    let (sql, values) = table("users")
        .where_in("id", vec![5i64, 6])
        .update_sql(&user)
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE \"users\" SET name = $1, points = $2 WHERE id IN ($3, $4)"
    );
    assert_eq!(values.len(), 4);
}

#[test]
fn update_renders_auxiliary_from() {
    let user = TestUser {
        name: "bob".into(),
        points: 1,
    };
    let (sql, _) = table("employees")
        .from("accounts")
        .where_raw("employees.account_id = accounts.id")
        .update_sql(&user)
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE \"employees\" SET name = $1, points = $2 FROM accounts WHERE employees.account_id = accounts.id"
    );
}

#[tokio::test]
async fn terminal_ops_require_table() {
    let conn = UnreachableClient;
    let user = TestUser {
        name: "alice".into(),
        points: 0,
    };

    let qb = QueryBuilder::new();
    assert!(matches!(qb.get(&conn).await, Err(DbError::NoTable)));
    assert!(matches!(qb.insert(&user, &conn).await, Err(DbError::NoTable)));
    assert!(matches!(qb.update(&user, &conn).await, Err(DbError::NoTable)));
    assert!(matches!(qb.delete(&conn).await, Err(DbError::NoTable)));
    assert!(matches!(
        qb.increment("points", 3, &conn).await,
        Err(DbError::NoTable)
    ));
    assert!(matches!(qb.count(&conn).await, Err(DbError::NoTable)));
    assert!(matches!(
        qb.first::<AnyRow>(&conn).await,
        Err(DbError::NoTable)
    ));
    assert!(matches!(
        qb.insert_batch(&[user], &conn).await,
        Err(DbError::NoTable)
    ));
}

#[tokio::test]
async fn chunk_rejects_non_positive_size() {
    let conn = UnreachableClient;
    let qb = table("users");
    assert!(matches!(
        qb.chunk::<AnyRow, _>(0, &conn, |_| true).await,
        Err(DbError::InvalidChunkSize(0))
    ));
    assert!(matches!(
        qb.chunk::<AnyRow, _>(-3, &conn, |_| true).await,
        Err(DbError::InvalidChunkSize(-3))
    ));
}

#[test]
fn increment_and_decrement_sql_shape() {
    // Rendered through compose_where with numbering from $1; the amount is an
    // inline literal.
    let (where_sql, values) = render::compose_where(&table("users").where_("id", "=", 3i64), 1);
    assert_eq!(where_sql, " WHERE id = $1");
    assert_eq!(values, vec![SqlValue::Int(3)]);
}

#[test]
fn compose_where_honors_start_offset() {
    let qb = table("users")
        .where_("name", "=", "alice")
        .and_where("points", ">", 10i64);
    let (sql, values) = render::compose_where(&qb, 4);
    assert_eq!(sql, " WHERE name = $4 AND points > $5");
    assert_eq!(values.len(), 2);
}

#[test]
fn aggregate_sql_strips_ordering_and_paging() {
    let qb = table("users")
        .where_("points", ">", 1i64)
        .order_by("points", "DESC")
        .limit(5)
        .offset(10);
    let (sql, values) = qb.aggregate_sql("COUNT(*)");
    assert_eq!(sql, "SELECT COUNT(*) FROM \"users\" WHERE points > $1");
    assert_eq!(values.len(), 1);
}
