//! Table structure management: CREATE/ALTER TABLE generation plus the
//! information_schema probes that decide between them.
//!
//! ```ignore
//! use pgfluent::schema;
//!
//! schema(&client, "users", |t| {
//!     t.increments("id");
//!     t.string("name", 128).not_null();
//!     t.text("bio").comment("freeform profile text");
//!     t.big_int("points").default_value(0i64).index("idx_users_points");
//! })
//! .await?;
//! ```

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::value::SqlValue;

/// Schema the probes target when none is given.
pub const DEFAULT_SCHEMA: &str = "public";

const CURRENT_DATE: &str = "CURRENT_DATE";
const CURRENT_TIME: &str = "CURRENT_TIME";
const CURRENT_DATE_TIME: &str = "NOW()";

#[derive(Clone, Debug, Default)]
struct ColumnDef {
    name: String,
    rename_to: Option<String>,
    col_type: String,
    not_null: bool,
    primary_key: bool,
    default: Option<String>,
    is_index: bool,
    is_unique: bool,
    foreign_key: Option<String>,
    idx_name: String,
    comment: Option<String>,
    collation: Option<String>,
    is_drop: bool,
    is_modify: bool,
}

/// Collects column definitions and alterations for one table.
#[derive(Clone, Debug)]
pub struct Blueprint {
    table: String,
    columns: Vec<ColumnDef>,
    table_comment: Option<String>,
}

impl Blueprint {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            table_comment: None,
        }
    }

    fn push(&mut self, name: &str, col_type: impl Into<String>) -> &mut Self {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            col_type: col_type.into(),
            ..ColumnDef::default()
        });
        self
    }

    fn push_dated(&mut self, name: &str, col_type: &str, default: &str, is_default: bool) -> &mut Self {
        self.push(name, col_type);
        if is_default {
            if let Some(col) = self.columns.last_mut() {
                col.default = Some(default.to_string());
            }
        }
        self
    }

    /// Auto-incremented integer primary key.
    pub fn increments(&mut self, name: &str) -> &mut Self {
        self.push(name, "SERIAL");
        if let Some(col) = self.columns.last_mut() {
            col.primary_key = true;
        }
        self
    }

    /// Auto-incremented big integer primary key.
    pub fn big_increments(&mut self, name: &str) -> &mut Self {
        self.push(name, "BIGSERIAL");
        if let Some(col) = self.columns.last_mut() {
            col.primary_key = true;
        }
        self
    }

    pub fn small_int(&mut self, name: &str) -> &mut Self {
        self.push(name, "SMALLINT")
    }

    pub fn integer(&mut self, name: &str) -> &mut Self {
        self.push(name, "INTEGER")
    }

    pub fn big_int(&mut self, name: &str) -> &mut Self {
        self.push(name, "BIGINT")
    }

    /// `VARCHAR(len)` column.
    pub fn string(&mut self, name: &str, len: u64) -> &mut Self {
        self.push(name, format!("VARCHAR({len})"))
    }

    /// `CHAR(len)` column.
    pub fn char(&mut self, name: &str, len: u64) -> &mut Self {
        self.push(name, format!("CHAR({len})"))
    }

    pub fn text(&mut self, name: &str) -> &mut Self {
        self.push(name, "TEXT")
    }

    pub fn dbl_precision(&mut self, name: &str) -> &mut Self {
        self.push(name, "DOUBLE PRECISION")
    }

    /// Exact number with caller-specified precision and scale.
    pub fn numeric(&mut self, name: &str, precision: u64, scale: u64) -> &mut Self {
        self.push(name, format!("NUMERIC({precision}, {scale})"))
    }

    /// Alias for [`numeric`](Self::numeric); they are the same type in
    /// PostgreSQL.
    pub fn decimal(&mut self, name: &str, precision: u64, scale: u64) -> &mut Self {
        self.numeric(name, precision, scale)
    }

    /// DATE column, optionally defaulted to `CURRENT_DATE`.
    pub fn date(&mut self, name: &str, is_default: bool) -> &mut Self {
        self.push_dated(name, "DATE", CURRENT_DATE, is_default)
    }

    /// TIME column, optionally defaulted to `CURRENT_TIME`.
    pub fn time(&mut self, name: &str, is_default: bool) -> &mut Self {
        self.push_dated(name, "TIME", CURRENT_TIME, is_default)
    }

    /// TIMESTAMP column, optionally defaulted to `NOW()`.
    pub fn date_time(&mut self, name: &str, is_default: bool) -> &mut Self {
        self.push_dated(name, "TIMESTAMP", CURRENT_DATE_TIME, is_default)
    }

    /// TIMESTAMPTZ column, optionally defaulted to `NOW()`.
    pub fn date_time_tz(&mut self, name: &str, is_default: bool) -> &mut Self {
        self.push_dated(name, "TIMESTAMPTZ", CURRENT_DATE_TIME, is_default)
    }

    pub fn ts_vector(&mut self, name: &str) -> &mut Self {
        self.push(name, "TSVECTOR")
    }

    pub fn ts_query(&mut self, name: &str) -> &mut Self {
        self.push(name, "TSQUERY")
    }

    pub fn json(&mut self, name: &str) -> &mut Self {
        self.push(name, "JSON")
    }

    pub fn jsonb(&mut self, name: &str) -> &mut Self {
        self.push(name, "JSONB")
    }

    pub fn point(&mut self, name: &str) -> &mut Self {
        self.push(name, "POINT")
    }

    pub fn polygon(&mut self, name: &str) -> &mut Self {
        self.push(name, "POLYGON")
    }

    // ==================== Modifiers on the last column ====================

    /// Mark the last column NOT NULL.
    pub fn not_null(&mut self) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.not_null = true;
        }
        self
    }

    /// Set the last column's default; the value is rendered as a SQL literal.
    pub fn default_value(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.default = Some(value.into().to_literal());
        }
        self
    }

    /// Set the last column's collation.
    pub fn collation(&mut self, collation: &str) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.collation = Some(collation.to_string());
        }
        self
    }

    /// Attach a comment to the last column.
    pub fn comment(&mut self, comment: &str) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.comment = Some(comment.to_string());
        }
        self
    }

    /// Attach a comment to the table itself.
    pub fn table_comment(&mut self, comment: &str) {
        self.table_comment = Some(comment.to_string());
    }

    /// Create a btree index named `idx_name` on the last column.
    pub fn index(&mut self, idx_name: &str) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.idx_name = idx_name.to_string();
            col.is_index = true;
        }
        self
    }

    /// Create a unique index named `idx_name` on the last column.
    pub fn unique(&mut self, idx_name: &str) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.idx_name = idx_name.to_string();
            col.is_unique = true;
        }
        self
    }

    /// Reference `ref_table (on_column)` from the last column under the
    /// constraint name `idx_name`.
    pub fn foreign_key(&mut self, idx_name: &str, ref_table: &str, on_column: &str) -> &mut Self {
        if let Some(col) = self.columns.last_mut() {
            col.foreign_key = Some(format!(
                "ALTER TABLE {} ADD CONSTRAINT {idx_name} FOREIGN KEY ({}) REFERENCES {ref_table} ({on_column})",
                self.table, col.name
            ));
        }
        self
    }

    // ==================== Alterations ====================

    /// Alter the last column's type/options instead of adding it.
    pub fn change(&mut self) {
        if let Some(col) = self.columns.last_mut() {
            col.is_modify = true;
        }
    }

    /// Rename a column.
    pub fn rename_column(&mut self, from: &str, to: &str) -> &mut Self {
        self.columns.push(ColumnDef {
            name: from.to_string(),
            rename_to: Some(to.to_string()),
            is_modify: true,
            ..ColumnDef::default()
        });
        self
    }

    /// Drop a column.
    pub fn drop_column(&mut self, name: &str) {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            is_drop: true,
            ..ColumnDef::default()
        });
    }

    /// Drop an index.
    pub fn drop_index(&mut self, idx_name: &str) {
        self.columns.push(ColumnDef {
            idx_name: idx_name.to_string(),
            is_drop: true,
            is_index: true,
            ..ColumnDef::default()
        });
    }
}

fn column_options(col: &ColumnDef) -> String {
    let mut options = String::new();
    if col.primary_key {
        options.push_str(" PRIMARY KEY");
    }
    if col.not_null {
        options.push_str(" NOT NULL");
    }
    if let Some(default) = &col.default {
        options.push_str(&format!(" DEFAULT {default}"));
    }
    if let Some(collation) = &col.collation {
        options.push_str(&format!(" COLLATE \"{collation}\""));
    }
    options
}

fn compose_column(col: &ColumnDef) -> String {
    format!("{} {}{}", col.name, col.col_type, column_options(col))
}

fn compose_index(table: &str, col: &ColumnDef) -> Option<String> {
    if col.is_index {
        return Some(format!(
            "CREATE INDEX {} ON {table} ({})",
            col.idx_name, col.name
        ));
    }
    if col.is_unique {
        return Some(format!(
            "CREATE UNIQUE INDEX {} ON {table} ({})",
            col.idx_name, col.name
        ));
    }
    col.foreign_key.clone()
}

fn compose_comment(table: &str, col: &ColumnDef) -> Option<String> {
    col.comment.as_ref().map(|comment| {
        format!(
            "COMMENT ON COLUMN {table}.{} IS '{}'",
            col.name,
            comment.replace('\'', "''")
        )
    })
}

fn add_column_def(table: &str, col: &ColumnDef) -> String {
    format!(
        "ALTER TABLE {table} ADD COLUMN {} {}{}",
        col.name,
        col.col_type,
        column_options(col)
    )
}

fn modify_column_def(table: &str, col: &ColumnDef) -> String {
    match &col.rename_to {
        Some(to) => format!("ALTER TABLE {table} RENAME COLUMN {} TO {to}", col.name),
        None => format!(
            "ALTER TABLE {table} ALTER COLUMN {} TYPE {}",
            col.name, col.col_type
        ),
    }
}

fn drop_def(table: &str, col: &ColumnDef) -> String {
    if col.is_index {
        format!("DROP INDEX {}", col.idx_name)
    } else {
        format!("ALTER TABLE {table} DROP COLUMN {}", col.name)
    }
}

pub(crate) fn create_sql(bp: &Blueprint) -> (String, Vec<String>, Vec<String>) {
    let mut indices = Vec::new();
    let mut comments = Vec::new();

    let rendered: Vec<String> = bp
        .columns
        .iter()
        .map(|col| {
            if let Some(index) = compose_index(&bp.table, col) {
                indices.push(index);
            }
            if let Some(comment) = compose_comment(&bp.table, col) {
                comments.push(comment);
            }
            compose_column(col)
        })
        .collect();

    if let Some(comment) = &bp.table_comment {
        comments.push(format!(
            "COMMENT ON TABLE {} IS '{}'",
            bp.table,
            comment.replace('\'', "''")
        ));
    }

    let create = format!("CREATE TABLE {}({})", bp.table, rendered.join(", "));
    (create, indices, comments)
}

/// Create or alter `table` with the columns collected by `build`.
///
/// If the table already exists the blueprint is applied as a series of ALTER
/// statements (adding only columns not already present); otherwise a CREATE
/// TABLE runs, followed by any index and comment statements.
pub async fn schema(
    conn: &impl GenericClient,
    table: &str,
    build: impl FnOnce(&mut Blueprint),
) -> DbResult<()> {
    let mut bp = Blueprint::new(table);
    build(&mut bp);
    if bp.columns.is_empty() {
        return Ok(());
    }

    if has_table(conn, DEFAULT_SCHEMA, table).await? {
        modify_table(conn, &bp).await
    } else {
        create_table(conn, &bp).await
    }
}

async fn create_table(conn: &impl GenericClient, bp: &Blueprint) -> DbResult<()> {
    let (create, indices, comments) = create_sql(bp);
    conn.execute(&create, &[]).await?;
    for statement in indices.iter().chain(comments.iter()) {
        conn.execute(statement, &[]).await?;
    }
    Ok(())
}

async fn modify_table(conn: &impl GenericClient, bp: &Blueprint) -> DbResult<()> {
    let mut statements = Vec::new();
    let mut indices = Vec::new();
    let mut comments = Vec::new();

    for col in &bp.columns {
        if col.is_modify {
            statements.push(modify_column_def(&bp.table, col));
        } else if col.is_drop {
            statements.push(drop_def(&bp.table, col));
        } else {
            let present = has_columns(conn, DEFAULT_SCHEMA, &bp.table, &[&col.name]).await?;
            if !present {
                statements.push(add_column_def(&bp.table, col));
            }
            if let Some(index) = compose_index(&bp.table, col) {
                indices.push(index);
            }
            if let Some(comment) = compose_comment(&bp.table, col) {
                comments.push(comment);
            }
        }
    }

    if !statements.is_empty() {
        conn.batch_execute(&statements.join("; ")).await?;
    }
    for statement in indices.iter().chain(comments.iter()) {
        conn.execute(statement, &[]).await?;
    }
    Ok(())
}

/// Whether `schema.table` exists.
pub async fn has_table(
    conn: &impl GenericClient,
    schema: &str,
    table: &str,
) -> DbResult<bool> {
    let row = conn
        .query_one(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
            &[&schema, &table],
        )
        .await?;
    row.try_get(0).map_err(DbError::from)
}

/// Whether `schema.table` has every one of `columns`.
pub async fn has_columns(
    conn: &impl GenericClient,
    schema: &str,
    table: &str,
    columns: &[&str],
) -> DbResult<bool> {
    let names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let row = conn
        .query_one(
            "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 AND column_name = ANY($3)",
            &[&schema, &table, &names],
        )
        .await?;
    let found: i64 = row.try_get(0)?;
    Ok(found as usize == columns.len())
}

/// Drop one or more tables (comma-separated).
pub async fn drop_table(conn: &impl GenericClient, tables: &str) -> DbResult<()> {
    conn.execute(&format!("DROP TABLE {tables}"), &[]).await?;
    Ok(())
}

/// Drop one or more tables if they exist.
pub async fn drop_table_if_exists(conn: &impl GenericClient, tables: &str) -> DbResult<()> {
    conn.execute(&format!("DROP TABLE IF EXISTS {tables}"), &[])
        .await?;
    Ok(())
}

/// Remove all rows from one or more tables.
pub async fn truncate(conn: &impl GenericClient, tables: &str) -> DbResult<()> {
    conn.execute(&format!("TRUNCATE {tables}"), &[]).await?;
    Ok(())
}

/// Rename a table.
pub async fn rename(conn: &impl GenericClient, from: &str, to: &str) -> DbResult<()> {
    conn.execute(&format!("ALTER TABLE {from} RENAME TO {to}"), &[])
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_renders_columns_in_order() {
        let mut bp = Blueprint::new("users");
        bp.increments("id");
        bp.string("name", 128).not_null();
        bp.big_int("points").default_value(0i64);

        let (create, indices, comments) = create_sql(&bp);
        assert_eq!(
            create,
            "CREATE TABLE users(id SERIAL PRIMARY KEY, name VARCHAR(128) NOT NULL, points BIGINT DEFAULT 0)"
        );
        assert!(indices.is_empty());
        assert!(comments.is_empty());
    }

    #[test]
    fn indices_and_comments_are_split_out() {
        let mut bp = Blueprint::new("users");
        bp.increments("id");
        bp.string("email", 255).unique("idx_users_email");
        bp.big_int("points").index("idx_users_points");
        bp.text("bio").comment("freeform profile text");
        bp.table_comment("application users");

        let (_, indices, comments) = create_sql(&bp);
        assert_eq!(
            indices,
            vec![
                "CREATE UNIQUE INDEX idx_users_email ON users (email)",
                "CREATE INDEX idx_users_points ON users (points)",
            ]
        );
        assert_eq!(
            comments,
            vec![
                "COMMENT ON COLUMN users.bio IS 'freeform profile text'",
                "COMMENT ON TABLE users IS 'application users'",
            ]
        );
    }

    #[test]
    fn foreign_key_becomes_alter_constraint() {
        let mut bp = Blueprint::new("orders");
        bp.big_int("user_id")
            .foreign_key("fk_orders_user", "users", "id");

        let (_, indices, _) = create_sql(&bp);
        assert_eq!(
            indices,
            vec![
                "ALTER TABLE orders ADD CONSTRAINT fk_orders_user FOREIGN KEY (user_id) REFERENCES users (id)"
            ]
        );
    }

    #[test]
    fn date_defaults_are_keywords_not_literals() {
        let mut bp = Blueprint::new("events");
        bp.date("day", true);
        bp.date_time("created_at", true);
        bp.time("at", false);

        let (create, _, _) = create_sql(&bp);
        assert_eq!(
            create,
            "CREATE TABLE events(day DATE DEFAULT CURRENT_DATE, created_at TIMESTAMP DEFAULT NOW(), at TIME)"
        );
    }

    #[test]
    fn string_default_is_quoted() {
        let mut bp = Blueprint::new("users");
        bp.string("role", 32).default_value("member");
        let (create, _, _) = create_sql(&bp);
        assert_eq!(
            create,
            "CREATE TABLE users(role VARCHAR(32) DEFAULT 'member')"
        );
    }

    #[test]
    fn alteration_defs() {
        let col = ColumnDef {
            name: "points".to_string(),
            col_type: "BIGINT".to_string(),
            ..ColumnDef::default()
        };
        assert_eq!(
            add_column_def("users", &col),
            "ALTER TABLE users ADD COLUMN points BIGINT"
        );
        assert_eq!(
            modify_column_def("users", &col),
            "ALTER TABLE users ALTER COLUMN points TYPE BIGINT"
        );
        assert_eq!(
            drop_def("users", &col),
            "ALTER TABLE users DROP COLUMN points"
        );

        let renamed = ColumnDef {
            name: "points".to_string(),
            rename_to: Some("score".to_string()),
            ..ColumnDef::default()
        };
        assert_eq!(
            modify_column_def("users", &renamed),
            "ALTER TABLE users RENAME COLUMN points TO score"
        );

        let idx = ColumnDef {
            idx_name: "idx_users_points".to_string(),
            is_index: true,
            is_drop: true,
            ..ColumnDef::default()
        };
        assert_eq!(drop_def("users", &idx), "DROP INDEX idx_users_points");
    }
}
