//! FromRow derive macro implementation

use crate::column::{column_name, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = named_fields(&input, "FromRow")?;

    let column_names: Vec<String> = fields.iter().map(column_name).collect();

    let field_extracts: Vec<_> = fields
        .iter()
        .zip(column_names.iter())
        .map(|(field, column)| {
            let field_name = field.ident.as_ref().unwrap();
            quote! {
                #field_name: row.try_get_column(#column)?
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics pgfluent::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &pgfluent::Row) -> pgfluent::DbResult<Self> {
                const COLUMNS: &[&str] = &[#(#column_names),*];
                for column in row.columns() {
                    if !COLUMNS.contains(&column.name()) {
                        return Err(pgfluent::DbError::FieldNotFound {
                            column: column.name().to_string(),
                        });
                    }
                }

                use pgfluent::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
