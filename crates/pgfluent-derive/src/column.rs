//! Shared field → column name resolution.

use syn::{Data, DeriveInput, Field, Fields, Result, punctuated::Punctuated, token::Comma};

/// The named fields of a derive target, or an error for unsupported shapes.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive_name: &str,
) -> Result<&'a Punctuated<Field, Comma>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive_name} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive_name} can only be derived for structs"),
        )),
    }
}

/// Column name for a field: the `#[pg(column = "...")]` override, or the
/// lower-cased field name.
pub fn column_name(field: &Field) -> String {
    for attr in &field.attrs {
        if attr.path().is_ident("pg") {
            if let Ok(nested) = attr.parse_args::<syn::MetaNameValue>() {
                if nested.path.is_ident("column") {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(lit),
                        ..
                    }) = &nested.value
                    {
                        return lit.value();
                    }
                }
            }
        }
    }
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string().to_lowercase())
        .unwrap_or_default()
}
