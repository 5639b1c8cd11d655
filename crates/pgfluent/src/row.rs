//! Row mapping traits and utilities

use crate::error::DbResult;
use crate::value::SqlValue;
use std::collections::HashMap;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `pgfluent-derive` crate. The generated implementation maps each
/// field from the column named by `#[pg(column = "...")]` or, absent a tag,
/// the lower-cased field name, and fails with
/// [`DbError::FieldNotFound`](crate::DbError::FieldNotFound) when a result
/// column matches no field.
///
/// # Example
///
/// ```ignore
/// use pgfluent::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> DbResult<Self>;
}

/// Trait for converting a Rust struct into insertable columns and values.
///
/// Typically derived with `#[derive(IntoRow)]`. Column names follow the same
/// tag-or-lower-cased-field-name rule as [`FromRow`]; `Option::None` fields
/// contribute [`SqlValue::Null`].
pub trait IntoRow {
    /// Column names, in field declaration order.
    fn columns(&self) -> Vec<&'static str>;

    /// Field values coerced into [`SqlValue`], aligned with [`IntoRow::columns`].
    fn values(&self) -> Vec<SqlValue>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning DbError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> DbResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> DbResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| crate::error::DbError::decode(column, e.to_string()))
    }
}

/// Decode a full row into a column-name → [`SqlValue`] map.
pub fn row_to_map(row: &Row) -> DbResult<HashMap<String, SqlValue>> {
    let mut map = HashMap::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), SqlValue::from_column(row, idx)?);
    }
    Ok(map)
}
