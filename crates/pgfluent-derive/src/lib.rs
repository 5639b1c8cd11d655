//! Derive macros for pgfluent
//!
//! Provides `#[derive(FromRow)]` and `#[derive(IntoRow)]` macros.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod column;
mod from_row;
mod into_row;

/// Derive the `FromRow` trait for a struct.
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
///     #[pg(column = "email_address")]
///     email: Option<String>,
/// }
/// ```
///
/// Each field is read from the column named by its `#[pg(column = "...")]`
/// attribute or, absent a tag, the lower-cased field name. A result column
/// that matches no field fails with `DbError::FieldNotFound`.
///
/// # Attributes
///
/// - `#[pg(column = "name")]` - Map field to a different column name
#[proc_macro_derive(FromRow, attributes(pg))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive the `IntoRow` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use pgfluent::IntoRow;
///
/// #[derive(IntoRow)]
/// struct NewUser {
///     username: String,
///     points: i64,
///     email: Option<String>,
/// }
/// ```
///
/// `columns()` lists the column names in field declaration order and
/// `values()` coerces each field through `SqlValue`; an `Option::None` field
/// contributes `SqlValue::Null`.
///
/// # Attributes
///
/// - `#[pg(column = "name")]` - Map field to a different column name
#[proc_macro_derive(IntoRow, attributes(pg))]
pub fn derive_into_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    into_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
