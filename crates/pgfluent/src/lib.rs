//! # pgfluent
//!
//! A fluent, chainable query builder for PostgreSQL, layered directly over
//! `tokio-postgres`.
//!
//! ## Features
//!
//! - **Chainable statements**: compose SELECT/INSERT/UPDATE/DELETE through
//!   method chains instead of hand-written SQL strings
//! - **Positional binding**: clauses render to `$n` placeholders with the
//!   bound values kept in exact placeholder order
//! - **Typed values**: everything binds through the closed [`SqlValue`] sum
//!   type, so unsupported kinds are rejected at compile time
//! - **Struct mapping**: Row ↔ struct via [`FromRow`]/[`IntoRow`] derives
//! - **Transaction-friendly**: pass a transaction anywhere a
//!   [`GenericClient`] is expected
//! - **Bulk loading**: batch inserts ride the COPY protocol
//! - **Schema management**: CREATE/ALTER TABLE through a column blueprint DSL
//!
//! ## Example
//!
//! ```ignore
//! use pgfluent::{table, FromRow, IntoRow};
//!
//! #[derive(FromRow, IntoRow)]
//! struct User {
//!     name: String,
//!     points: i64,
//! }
//!
//! let client = pgfluent::connect("postgres://postgres@localhost/app").await?;
//!
//! table("users")
//!     .insert(&User { name: "alice".into(), points: 10 }, &client)
//!     .await?;
//!
//! let top: Vec<User> = table("users")
//!     .where_("points", ">=", 10i64)
//!     .order_by("points", "DESC")
//!     .limit(20)
//!     .fetch_all(&client)
//!     .await?;
//! ```

pub mod builder;
pub mod client;
pub mod error;
pub mod row;
pub mod schema;
pub mod stream;
pub mod transaction;
pub mod value;

pub use builder::{QueryBuilder, table};
pub use client::{GenericClient, RowStream, connect, slice_iter};
pub use error::{DbError, DbResult};
pub use row::{FromRow, IntoRow, RowExt, row_to_map};
pub use schema::{
    Blueprint, DEFAULT_SCHEMA, drop_table, drop_table_if_exists, has_columns, has_table, rename,
    schema, truncate,
};
pub use stream::FromRowStream;
pub use transaction::TxSession;
pub use value::SqlValue;

// Generated derive code names these through the crate root.
pub use tokio_postgres::Row;

#[cfg(feature = "derive")]
pub use pgfluent_derive::{FromRow, IntoRow};
