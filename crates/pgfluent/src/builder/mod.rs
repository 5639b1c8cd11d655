//! Fluent statement builder.
//!
//! [`QueryBuilder`] accumulates chained clause calls into an owned value and
//! renders them into parameterized SQL with `$n` placeholders in a fixed
//! clause order. Every fluent method consumes and returns the builder, so a
//! statement in progress can never be shared between two call sequences;
//! cloning is the explicit way to fork one.
//!
//! ```ignore
//! use pgfluent::table;
//!
//! let rows = table("users")
//!     .select(&["id", "name"])
//!     .where_("points", ">=", 100i64)
//!     .or_where("name", "=", "alice")
//!     .order_by("id", "ASC")
//!     .limit(10)
//!     .get(&client)
//!     .await?;
//! ```

mod exec;
mod render;

#[cfg(test)]
mod tests;

use crate::value::SqlValue;

/// Logical connective recorded with each WHERE entry at insertion time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Connective {
    None,
    And,
    Or,
}

/// One WHERE predicate. The variant decides whether the renderer emits
/// placeholders or splices pre-rendered text.
#[derive(Clone, Debug)]
pub(crate) enum WherePredicate {
    /// `lhs $n` for scalars, `lhs ($n, $n+1, ...)` for lists. `lhs` is the
    /// already-joined `operand operator` text.
    Bound { lhs: String, value: SqlValue },
    /// Pre-rendered SQL (NULL checks, BETWEEN with inline operands, raw
    /// fragments). Consumes no placeholder.
    Literal(String),
    /// An EXISTS/NOT EXISTS subquery captured at call time. `sql` is numbered
    /// from `$1` and renumbered into place at render time; `values` splice
    /// into the outer binding list in position.
    Exists {
        negated: bool,
        sql: String,
        values: Vec<SqlValue>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct WhereEntry {
    pub(crate) connective: Connective,
    pub(crate) predicate: WherePredicate,
}

/// A SELECT arm captured by `union()`/`union_all()`.
#[derive(Clone, Debug)]
pub(crate) struct UnionArm {
    pub(crate) sql: String,
    pub(crate) values: Vec<SqlValue>,
}

/// Accumulated statement state plus the fluent surface that mutates it.
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) wheres: Vec<WhereEntry>,
    pub(crate) group_by: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) order_by: Vec<(String, String)>,
    pub(crate) order_by_raw: Option<String>,
    pub(crate) limit: i64,
    pub(crate) offset: i64,
    pub(crate) lock_for_update: bool,
    pub(crate) from: Option<String>,
    pub(crate) unions: Vec<UnionArm>,
    pub(crate) union_all: bool,
}

/// Start a builder for the given table.
pub fn table(name: &str) -> QueryBuilder {
    QueryBuilder::new().table(name)
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create an empty builder. Terminal operations fail with
    /// [`DbError::NoTable`](crate::DbError::NoTable) until [`table`](Self::table)
    /// is called.
    pub fn new() -> Self {
        Self {
            table: String::new(),
            columns: vec!["*".to_string()],
            joins: Vec::new(),
            wheres: Vec::new(),
            group_by: None,
            having: None,
            order_by: Vec::new(),
            order_by_raw: None,
            limit: 0,
            offset: 0,
            lock_for_update: false,
            from: None,
            unions: Vec::new(),
            union_all: false,
        }
    }

    /// Set the table and reset all accumulated clause state.
    ///
    /// Captured union arms survive: they are consumed by the next terminal
    /// render, which is what lets `table(a)...union().table(b)...get()` build
    /// both arms on one chain.
    pub fn table(mut self, name: &str) -> Self {
        let unions = std::mem::take(&mut self.unions);
        let union_all = self.union_all;
        let mut next = QueryBuilder::new();
        next.table = name.to_string();
        next.unions = unions;
        next.union_all = union_all;
        next
    }

    // ==================== SELECT columns ====================

    /// Replace the column list.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append columns to the current list.
    pub fn add_select(mut self, columns: &[&str]) -> Self {
        self.columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Append a raw select expression, e.g. `COUNT(*) AS cnt`.
    pub fn select_raw(mut self, expr: &str) -> Self {
        self.columns.push(expr.to_string());
        self
    }

    // ==================== WHERE ====================

    fn push_where(&mut self, connective: Connective, column: &str, operator: &str, value: SqlValue) {
        self.wheres.push(WhereEntry {
            connective,
            predicate: WherePredicate::Bound {
                lhs: format!("{column} {operator}"),
                value,
            },
        });
    }

    fn push_literal(&mut self, connective: Connective, text: String) {
        self.wheres.push(WhereEntry {
            connective,
            predicate: WherePredicate::Literal(text),
        });
    }

    /// Add a `column operator value` predicate.
    pub fn where_(mut self, column: &str, operator: &str, value: impl Into<SqlValue>) -> Self {
        self.push_where(Connective::None, column, operator, value.into());
        self
    }

    /// Add a predicate joined with `AND`.
    pub fn and_where(mut self, column: &str, operator: &str, value: impl Into<SqlValue>) -> Self {
        self.push_where(Connective::And, column, operator, value.into());
        self
    }

    /// Add a predicate joined with `OR`.
    pub fn or_where(mut self, column: &str, operator: &str, value: impl Into<SqlValue>) -> Self {
        self.push_where(Connective::Or, column, operator, value.into());
        self
    }

    /// Add `column IN (...)`; one placeholder per element, in element order.
    pub fn where_in<T: Into<SqlValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            Connective::None,
            column,
            "IN",
            SqlValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add `column NOT IN (...)`.
    pub fn where_not_in<T: Into<SqlValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            Connective::None,
            column,
            "NOT IN",
            SqlValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add `AND column IN (...)`.
    pub fn and_where_in<T: Into<SqlValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            Connective::And,
            column,
            "IN",
            SqlValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add `AND column NOT IN (...)`.
    pub fn and_where_not_in<T: Into<SqlValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            Connective::And,
            column,
            "NOT IN",
            SqlValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add `OR column IN (...)`.
    pub fn or_where_in<T: Into<SqlValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            Connective::Or,
            column,
            "IN",
            SqlValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add `OR column NOT IN (...)`.
    pub fn or_where_not_in<T: Into<SqlValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            Connective::Or,
            column,
            "NOT IN",
            SqlValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add `column IS NULL`.
    pub fn where_null(mut self, column: &str) -> Self {
        self.push_literal(Connective::None, format!("{column} IS NULL"));
        self
    }

    /// Add `column IS NOT NULL`.
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.push_literal(Connective::None, format!("{column} IS NOT NULL"));
        self
    }

    /// Add `OR column IS NULL`.
    pub fn or_where_null(mut self, column: &str) -> Self {
        self.push_literal(Connective::Or, format!("{column} IS NULL"));
        self
    }

    /// Add `OR column IS NOT NULL`.
    pub fn or_where_not_null(mut self, column: &str) -> Self {
        self.push_literal(Connective::Or, format!("{column} IS NOT NULL"));
        self
    }

    /// Add `column BETWEEN from AND to`; the operands are rendered inline.
    pub fn where_between(
        mut self,
        column: &str,
        from: impl Into<SqlValue>,
        to: impl Into<SqlValue>,
    ) -> Self {
        let text = format!(
            "{column} BETWEEN {} AND {}",
            from.into().to_literal(),
            to.into().to_literal()
        );
        self.push_literal(Connective::None, text);
        self
    }

    /// Add `column NOT BETWEEN from AND to`.
    pub fn where_not_between(
        mut self,
        column: &str,
        from: impl Into<SqlValue>,
        to: impl Into<SqlValue>,
    ) -> Self {
        let text = format!(
            "{column} NOT BETWEEN {} AND {}",
            from.into().to_literal(),
            to.into().to_literal()
        );
        self.push_literal(Connective::None, text);
        self
    }

    /// Add `AND column BETWEEN from AND to`.
    pub fn and_where_between(
        mut self,
        column: &str,
        from: impl Into<SqlValue>,
        to: impl Into<SqlValue>,
    ) -> Self {
        let text = format!(
            "{column} BETWEEN {} AND {}",
            from.into().to_literal(),
            to.into().to_literal()
        );
        self.push_literal(Connective::And, text);
        self
    }

    /// Add `OR column BETWEEN from AND to`.
    pub fn or_where_between(
        mut self,
        column: &str,
        from: impl Into<SqlValue>,
        to: impl Into<SqlValue>,
    ) -> Self {
        let text = format!(
            "{column} BETWEEN {} AND {}",
            from.into().to_literal(),
            to.into().to_literal()
        );
        self.push_literal(Connective::Or, text);
        self
    }

    /// Splice a raw WHERE fragment. The caller is responsible for injection
    /// safety.
    pub fn where_raw(mut self, raw: &str) -> Self {
        self.push_literal(Connective::None, raw.to_string());
        self
    }

    /// Splice a raw fragment joined with `AND`.
    pub fn and_where_raw(mut self, raw: &str) -> Self {
        self.push_literal(Connective::And, raw.to_string());
        self
    }

    /// Splice a raw fragment joined with `OR`.
    pub fn or_where_raw(mut self, raw: &str) -> Self {
        self.push_literal(Connective::Or, raw.to_string());
        self
    }

    /// Add `EXISTS (SELECT ...)` built from a nested builder.
    ///
    /// The nested SELECT is rendered here, at call time; mutating `nested`
    /// afterwards cannot change the captured fragment.
    pub fn where_exists(mut self, nested: QueryBuilder) -> Self {
        let (sql, values) = render::build_single_select(&nested, 0);
        self.wheres.push(WhereEntry {
            connective: Connective::And,
            predicate: WherePredicate::Exists {
                negated: false,
                sql,
                values,
            },
        });
        self
    }

    /// Add `NOT EXISTS (SELECT ...)` built from a nested builder.
    pub fn where_not_exists(mut self, nested: QueryBuilder) -> Self {
        let (sql, values) = render::build_single_select(&nested, 0);
        self.wheres.push(WhereEntry {
            connective: Connective::And,
            predicate: WherePredicate::Exists {
                negated: true,
                sql,
                values,
            },
        });
        self
    }

    // ==================== JOIN ====================

    fn push_join(&mut self, keyword: &str, table: &str, on: &str) {
        self.joins.push(format!(" {keyword} JOIN {table} ON {on}"));
    }

    /// Add `INNER JOIN table ON on`.
    pub fn inner_join(mut self, table: &str, on: &str) -> Self {
        self.push_join("INNER", table, on);
        self
    }

    /// Add `LEFT JOIN table ON on`.
    pub fn left_join(mut self, table: &str, on: &str) -> Self {
        self.push_join("LEFT", table, on);
        self
    }

    /// Add `RIGHT JOIN table ON on`.
    pub fn right_join(mut self, table: &str, on: &str) -> Self {
        self.push_join("RIGHT", table, on);
        self
    }

    /// Add `FULL JOIN table ON on`.
    pub fn full_join(mut self, table: &str, on: &str) -> Self {
        self.push_join("FULL", table, on);
        self
    }

    /// Add `FULL OUTER JOIN table ON on`.
    pub fn full_outer_join(mut self, table: &str, on: &str) -> Self {
        self.push_join("FULL OUTER", table, on);
        self
    }

    /// Add `CROSS JOIN table`.
    pub fn cross_join(mut self, table: &str) -> Self {
        self.joins.push(format!(" CROSS JOIN {table}"));
        self
    }

    // ==================== Grouping & ordering ====================

    /// Set the GROUP BY expression.
    pub fn group_by(mut self, expr: &str) -> Self {
        self.group_by = Some(expr.to_string());
        self
    }

    /// Set the HAVING predicate; the value is rendered inline.
    pub fn having(mut self, column: &str, operator: &str, value: impl Into<SqlValue>) -> Self {
        self.having = Some(format!("{column} {operator} {}", value.into().to_literal()));
        self
    }

    /// Set a raw HAVING expression.
    pub fn having_raw(mut self, raw: &str) -> Self {
        self.having = Some(raw.to_string());
        self
    }

    /// Append a raw HAVING expression with `AND`.
    pub fn and_having_raw(mut self, raw: &str) -> Self {
        self.having = Some(match self.having.take() {
            Some(current) => format!("{current} AND {raw}"),
            None => raw.to_string(),
        });
        self
    }

    /// Append a raw HAVING expression with `OR`.
    pub fn or_having_raw(mut self, raw: &str) -> Self {
        self.having = Some(match self.having.take() {
            Some(current) => format!("{current} OR {raw}"),
            None => raw.to_string(),
        });
        self
    }

    /// Append an ORDER BY pair; multiple calls accumulate in order.
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.order_by
            .push((column.to_string(), direction.to_string()));
        self
    }

    /// Set a raw ORDER BY expression. Structured [`order_by`](Self::order_by)
    /// entries take precedence when both are present.
    pub fn order_by_raw(mut self, expr: &str) -> Self {
        self.order_by_raw = Some(expr.to_string());
        self
    }

    // ==================== Paging & locking ====================

    /// Set LIMIT; 0 means unbounded.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = n;
        self
    }

    /// Set OFFSET; 0 means none.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = n;
        self
    }

    /// Append `FOR UPDATE` to the rendered statement.
    pub fn lock_for_update(mut self) -> Self {
        self.lock_for_update = true;
        self
    }

    /// Auxiliary FROM table for multi-table UPDATE, e.g.
    /// `UPDATE employees SET ... FROM accounts WHERE ...`.
    pub fn from(mut self, table: &str) -> Self {
        self.from = Some(table.to_string());
        self
    }

    // ==================== Union ====================

    /// Capture the current SELECT as a union arm. Chain `table(...)` next to
    /// build the following arm; the captured arms are stitched in front of it
    /// at render time.
    pub fn union(self) -> Self {
        self.capture_union(false)
    }

    /// Like [`union`](Self::union) but stitches with `UNION ALL`.
    pub fn union_all(self) -> Self {
        self.capture_union(true)
    }

    fn capture_union(mut self, all: bool) -> Self {
        let (sql, values) = render::build_single_select(&self, 0);
        self.unions.push(UnionArm { sql, values });
        let unions = std::mem::take(&mut self.unions);
        let mut next = QueryBuilder::new();
        next.unions = unions;
        next.union_all = all || self.union_all;
        next
    }

    /// Render the statement this builder would execute. Rendering is pure:
    /// calling this twice on unmutated state yields identical text.
    pub fn to_sql(&self) -> String {
        render::build_select(self).0
    }

    /// Render the statement and its ordered binding values.
    pub(crate) fn build(&self) -> (String, Vec<SqlValue>) {
        render::build_select(self)
    }
}
