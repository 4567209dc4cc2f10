// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Visibility};

/// Field metadata collected from the struct definition
struct FieldInfo {
    ident: syn::Ident,
    name: String,
    ty: syn::Type,
    tags: Vec<(String, String)>,
}

/// `#[derive(Record)]` macro: generates a static `RecordDescriptor`
///
/// Every `pub` named field becomes one `FieldDescriptor` carrying:
/// - the field name (raw identifiers lose their `r#` prefix)
/// - the raw `#[tag(...)]` strings, keyed by tag name
/// - the field shape, resolved through `rowbind::Field`
/// - a downcasting accessor pair over `&dyn Any`
///
/// Private fields are left out of the descriptor and keep their
/// `Default` value when the record is decoded.
///
/// The struct also implements `rowbind::Field` as a nested record, so
/// records can be embedded in other records, and `rowbind::Element`, so
/// `Vec<T>` is a decode destination.
///
/// Example:
/// ```ignore
/// use rowbind::Record;
///
/// #[derive(Debug, Default, Record)]
/// pub struct Account {
///     #[tag(db = "col=account_id")]
///     pub id: i64,
///     pub owner: String,
///     pub address: Address, // nested record, walked recursively
///     cache_hits: u32,      // private: not mapped
/// }
/// ```
#[proc_macro_derive(Record, attributes(tag))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let type_name = name.to_string();

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "Generic records are not supported")
            .to_compile_error()
            .into();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return syn::Error::new_spanned(&input, "Only named fields are supported")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Only structs are supported")
                .to_compile_error()
                .into()
        }
    };

    let mut field_infos = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return syn::Error::new_spanned(field, "Field must have a name")
                .to_compile_error()
                .into();
        };

        if !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }

        let tags = match parse_tags(&field.attrs) {
            Ok(tags) => tags,
            Err(err) => return err.to_compile_error().into(),
        };

        let raw = ident.to_string();
        let name = raw.strip_prefix("r#").unwrap_or(&raw).to_string();

        field_infos.push(FieldInfo {
            ident: ident.clone(),
            name,
            ty: field.ty.clone(),
            tags,
        });
    }

    // One accessor pair per field, declared as fn items so the static can
    // hold plain fn pointers.
    let accessors: Vec<_> = field_infos
        .iter()
        .enumerate()
        .map(|(idx, f)| {
            let ident = &f.ident;
            let get = format_ident!("__rowbind_get_{}", idx);
            let get_mut = format_ident!("__rowbind_get_mut_{}", idx);
            quote! {
                fn #get(
                    record: &dyn ::std::any::Any,
                ) -> ::std::option::Option<&dyn ::std::any::Any> {
                    record
                        .downcast_ref::<#name>()
                        .map(|r| &r.#ident as &dyn ::std::any::Any)
                }

                fn #get_mut(
                    record: &mut dyn ::std::any::Any,
                ) -> ::std::option::Option<&mut dyn ::std::any::Any> {
                    record
                        .downcast_mut::<#name>()
                        .map(|r| &mut r.#ident as &mut dyn ::std::any::Any)
                }
            }
        })
        .collect();

    let field_descriptors: Vec<_> = field_infos
        .iter()
        .enumerate()
        .map(|(idx, f)| {
            let name_str = &f.name;
            let ty = &f.ty;
            let get = format_ident!("__rowbind_get_{}", idx);
            let get_mut = format_ident!("__rowbind_get_mut_{}", idx);
            let tag_names = f.tags.iter().map(|(n, _)| n);
            let tag_values = f.tags.iter().map(|(_, v)| v);
            quote! {
                ::rowbind::FieldDescriptor {
                    name: #name_str,
                    tags: &[#((#tag_names, #tag_values)),*],
                    shape: <#ty as ::rowbind::Field>::shape,
                    get: #get,
                    get_mut: #get_mut,
                }
            }
        })
        .collect();

    let expanded = quote! {
        impl ::rowbind::Record for #name {
            fn descriptor() -> &'static ::rowbind::RecordDescriptor {
                #(#accessors)*

                static DESCRIPTOR: ::rowbind::RecordDescriptor = ::rowbind::RecordDescriptor {
                    type_name: #type_name,
                    type_id: ::std::any::TypeId::of::<#name>,
                    fields: &[#(#field_descriptors),*],
                };
                &DESCRIPTOR
            }
        }

        impl ::rowbind::Field for #name {
            fn shape() -> ::rowbind::FieldShape {
                ::rowbind::FieldShape::Nested(<Self as ::rowbind::Record>::descriptor())
            }
        }

        impl ::rowbind::Element for #name {
            type Record = Self;

            fn from_boxed(record: ::std::boxed::Box<Self>) -> Self {
                *record
            }
        }
    };

    TokenStream::from(expanded)
}

/// Collect `#[tag(name = "value", ...)]` pairs from a field's attributes
///
/// Several `tag` attributes may appear on one field; their pairs are
/// concatenated in declaration order.
fn parse_tags(attrs: &[syn::Attribute]) -> syn::Result<Vec<(String, String)>> {
    let mut tags = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("tag") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let Some(ident) = meta.path.get_ident() else {
                return Err(meta.error("tag name must be a plain identifier"));
            };
            let value: LitStr = meta.value()?.parse()?;
            tags.push((ident.to_string(), value.value()));
            Ok(())
        })?;
    }
    Ok(tags)
}
