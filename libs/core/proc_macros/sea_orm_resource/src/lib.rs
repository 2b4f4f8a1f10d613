//! `SeaOrmResource` derive: REST metadata for SeaORM entity models.
//!
//! Reads `#[sea_orm(table_name = "...")]` and implements
//! `core_proc_macros::ApiResource` with:
//!
//! - `COLLECTION`: the table name (`blog_posts`)
//! - `URL`: kebab-cased mount path (`/blog-posts`)
//! - `URL_WITH_ID`: `URL` + `/{id}`
//! - `TAG`: title-cased words (`Blog Posts`)
//!
//! Any of them can be overridden:
//!
//! ```ignore
//! #[derive(Clone, Debug, DeriveEntityModel, SeaOrmResource)]
//! #[sea_orm(table_name = "message_deliveries")]
//! #[sea_orm_resource(url = "/messaging/deliveries", tag = "Messaging")]
//! pub struct Model {
//!     #[sea_orm(primary_key)]
//!     pub id: Uuid,
//! }
//! ```

extern crate proc_macro;

use darling::FromDeriveInput;
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Lit, Meta, parse_macro_input};

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(sea_orm_resource), forward_attrs(sea_orm))]
struct SeaOrmResourceInput {
    ident: syn::Ident,
    attrs: Vec<syn::Attribute>,
    #[darling(default)]
    collection: Option<String>,
    #[darling(default)]
    url: Option<String>,
    #[darling(default)]
    tag: Option<String>,
}

#[proc_macro_derive(SeaOrmResource, attributes(sea_orm_resource))]
pub fn sea_orm_resource_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = parse_macro_input!(input as DeriveInput);
    let receiver = match SeaOrmResourceInput::from_derive_input(&ast) {
        Ok(receiver) => receiver,
        Err(err) => return TokenStream::from(err.write_errors()),
    };

    match impl_sea_orm_resource(receiver) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// `blog_posts` -> `Blog Posts`
fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `blog_posts` -> `/blog-posts`
fn mount_path(snake: &str) -> String {
    format!("/{}", snake.replace('_', "-"))
}

fn extract_table_name(attrs: &[syn::Attribute]) -> Option<String> {
    for attr in attrs {
        if !attr.path().is_ident("sea_orm") {
            continue;
        }
        let Meta::List(meta_list) = &attr.meta else {
            continue;
        };
        let mut table_name = None;
        let _ = meta_list.parse_nested_meta(|meta| {
            if meta.path.is_ident("table_name") {
                let lit: Lit = meta.value()?.parse()?;
                if let Lit::Str(lit_str) = lit {
                    table_name = Some(lit_str.value());
                }
            } else if meta.input.peek(syn::Token![=]) {
                // schema_name = "...", comment = "..." etc.
                let _: Lit = meta.value()?.parse()?;
            }
            Ok(())
        });
        if table_name.is_some() {
            return table_name;
        }
    }
    None
}

fn impl_sea_orm_resource(receiver: SeaOrmResourceInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &receiver.ident;

    let table_name = extract_table_name(&receiver.attrs).ok_or_else(|| {
        syn::Error::new_spanned(
            ident,
            "SeaOrmResource requires #[sea_orm(table_name = \"...\")] attribute",
        )
    })?;

    let collection = receiver.collection.unwrap_or_else(|| table_name.clone());
    let url = receiver.url.unwrap_or_else(|| mount_path(&table_name));
    let tag = receiver.tag.unwrap_or_else(|| title_case(&table_name));
    let url_with_id = format!("{}/{{id}}", url.trim_end_matches('/'));

    Ok(quote! {
        impl ::core_proc_macros::ApiResource for #ident {
            const URL: &'static str = #url;
            const URL_WITH_ID: &'static str = #url_with_id;
            const COLLECTION: &'static str = #collection;
            const TAG: &'static str = #tag;
        }
    })
}
