//! IntoRow derive macro implementation

use crate::column::{column_name, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = named_fields(&input, "IntoRow")?;

    let column_names: Vec<String> = fields.iter().map(column_name).collect();

    let value_exprs: Vec<_> = fields
        .iter()
        .map(|field| {
            let field_name = field.ident.as_ref().unwrap();
            quote! {
                pgfluent::SqlValue::from(self.#field_name.clone())
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics pgfluent::IntoRow for #name #ty_generics #where_clause {
            fn columns(&self) -> Vec<&'static str> {
                vec![#(#column_names),*]
            }

            fn values(&self) -> Vec<pgfluent::SqlValue> {
                vec![#(#value_exprs),*]
            }
        }
    })
}
