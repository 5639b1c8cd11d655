//! The closed set of scalar kinds the builder can bind or render.
//!
//! Every value entering the builder is converted into [`SqlValue`] at the
//! fluent-call boundary. Binding dispatches on the variant, so a value that
//! cannot be represented is rejected by the compiler instead of being
//! silently dropped from the binding list.

use crate::error::{DbError, DbResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A value bound to a placeholder or rendered as a SQL literal.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Null,
    /// A placeholder group: expands to one placeholder per element, in order.
    List(Vec<SqlValue>),
}

impl SqlValue {
    /// Render the value as inline SQL text.
    ///
    /// Used for BETWEEN operands, DDL defaults, and other spots where the
    /// original statement carries the value in the SQL itself rather than a
    /// placeholder. Strings are single-quoted with `'` doubled.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Uint(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
            SqlValue::Timestamp(v) => format!("'{}'", v.to_rfc3339()),
            SqlValue::Uuid(v) => format!("'{v}'"),
            SqlValue::Json(v) => format!("'{}'", v.to_string().replace('\'', "''")),
            SqlValue::Null => "NULL".to_string(),
            SqlValue::List(items) => items
                .iter()
                .map(SqlValue::to_literal)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Encode the value as one field of a COPY `FROM STDIN` text-format row.
    pub(crate) fn encode_copy_field(&self, out: &mut String) -> DbResult<()> {
        match self {
            SqlValue::Null => out.push_str("\\N"),
            SqlValue::Text(s) => {
                for ch in s.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        _ => out.push(ch),
                    }
                }
            }
            SqlValue::Int(v) => out.push_str(&v.to_string()),
            SqlValue::Uint(v) => out.push_str(&v.to_string()),
            SqlValue::Float(v) => out.push_str(&v.to_string()),
            SqlValue::Bool(v) => out.push(if *v { 't' } else { 'f' }),
            SqlValue::Timestamp(v) => out.push_str(&v.to_rfc3339()),
            SqlValue::Uuid(v) => out.push_str(&v.to_string()),
            SqlValue::Json(v) => {
                let text = v.to_string();
                for ch in text.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        _ => out.push(ch),
                    }
                }
            }
            SqlValue::List(_) => {
                return Err(DbError::validation(
                    "list values cannot be encoded as a single COPY field",
                ));
            }
        }
        Ok(())
    }

    /// Decode one column of a result row into a [`SqlValue`], dispatching on
    /// the column's declared type. NULL decodes to [`SqlValue::Null`];
    /// unsupported column types fail with a decode error rather than being
    /// dropped.
    pub fn from_column(row: &tokio_postgres::Row, idx: usize) -> DbResult<SqlValue> {
        let column = &row.columns()[idx];
        let name = column.name();
        let ty = column.type_();

        macro_rules! take {
            ($rust:ty, $variant:expr) => {
                row.try_get::<_, Option<$rust>>(idx)
                    .map_err(|e| DbError::decode(name, e.to_string()))?
                    .map($variant)
                    .unwrap_or(SqlValue::Null)
            };
        }

        let value = if *ty == Type::BOOL {
            take!(bool, SqlValue::Bool)
        } else if *ty == Type::INT2 {
            take!(i16, |v| SqlValue::Int(v as i64))
        } else if *ty == Type::INT4 {
            take!(i32, |v| SqlValue::Int(v as i64))
        } else if *ty == Type::INT8 {
            take!(i64, SqlValue::Int)
        } else if *ty == Type::FLOAT4 {
            take!(f32, |v| SqlValue::Float(v as f64))
        } else if *ty == Type::FLOAT8 {
            take!(f64, SqlValue::Float)
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
        {
            take!(String, SqlValue::Text)
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            take!(serde_json::Value, SqlValue::Json)
        } else if *ty == Type::TIMESTAMP {
            take!(NaiveDateTime, |v: NaiveDateTime| SqlValue::Timestamp(
                v.and_utc()
            ))
        } else if *ty == Type::TIMESTAMPTZ {
            take!(DateTime<Utc>, SqlValue::Timestamp)
        } else if *ty == Type::UUID {
            take!(uuid::Uuid, SqlValue::Uuid)
        } else {
            return Err(DbError::decode(
                name,
                format!("unsupported column type {ty}"),
            ));
        };

        Ok(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Text(v) => v.to_sql(ty, out),
            // Narrow to the wire type the column actually declares.
            SqlValue::Int(v) => {
                if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Uint(v) => {
                if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else {
                    (*v as i64).to_sql(ty, out)
                }
            }
            SqlValue::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::Timestamp(v) => {
                if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Uuid(v) => v.to_sql(ty, out),
            SqlValue::Json(v) => v.to_sql(ty, out),
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::List(_) => {
                Err("list values must be expanded into individual placeholders before binding".into())
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Variant/type agreement is checked in to_sql above.
        true
    }

    to_sql_checked!();
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Uint(v as u64)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::Uint(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v.and_utc())
    }
}

impl From<uuid::Uuid> for SqlValue {
    fn from(v: uuid::Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(v: Vec<T>) -> Self {
        SqlValue::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_literal_escapes_quotes() {
        let v = SqlValue::from("O'Brien");
        assert_eq!(v.to_literal(), "'O''Brien'");
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(SqlValue::from(42i64).to_literal(), "42");
        assert_eq!(SqlValue::from(3.5f64).to_literal(), "3.5");
        assert_eq!(SqlValue::from(7u64).to_literal(), "7");
    }

    #[test]
    fn null_from_none() {
        let v: SqlValue = Option::<i64>::None.into();
        assert_eq!(v, SqlValue::Null);
        assert_eq!(v.to_literal(), "NULL");
    }

    #[test]
    fn vec_becomes_list() {
        let v: SqlValue = vec![1i64, 2, 3].into();
        assert_eq!(
            v,
            SqlValue::List(vec![
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3)
            ])
        );
    }

    #[test]
    fn copy_field_escapes_control_chars() {
        let mut out = String::new();
        SqlValue::from("a\tb\nc\\d")
            .encode_copy_field(&mut out)
            .unwrap();
        assert_eq!(out, "a\\tb\\nc\\\\d");
    }

    #[test]
    fn copy_field_null_marker() {
        let mut out = String::new();
        SqlValue::Null.encode_copy_field(&mut out).unwrap();
        assert_eq!(out, "\\N");
    }

    #[test]
    fn copy_field_rejects_list() {
        let mut out = String::new();
        let err = SqlValue::List(vec![]).encode_copy_field(&mut out);
        assert!(err.is_err());
    }
}
