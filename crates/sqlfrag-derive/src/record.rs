//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

#[derive(Debug, Default)]
struct FieldAttr {
    column: Option<String>,
    skip: bool,
    flatten: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                attr.skip = true;
            } else if ident == "flatten" {
                attr.flatten = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                // `column = "-"` opts the field out, like `skip`
                if value.value() == "-" {
                    attr.skip = true;
                } else {
                    attr.column = Some(value.value());
                }
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown sql attribute, expected `column`, `skip` or `flatten`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("sql") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        out.skip |= parsed.skip;
        out.flatten |= parsed.flatten;
        if parsed.column.is_some() {
            out.column = parsed.column;
        }
    }
    if out.flatten && (out.column.is_some() || out.skip) {
        return Err(syn::Error::new_spanned(
            field,
            "`flatten` cannot be combined with `column` or `skip`",
        ));
    }
    Ok(out)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut specs = Vec::new();
    let mut arms = Vec::new();
    let mut ref_arms = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let attr = field_attr(field)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);
        let ty = &field.ty;

        let column = match &attr.column {
            Some(column) => quote! { ::core::option::Option::Some(#column) },
            None => quote! { ::core::option::Option::None },
        };

        let kind = if attr.skip {
            quote! { ::sqlfrag::load::FieldKind::Skip }
        } else if attr.flatten {
            arms.push(quote! {
                #index => ::core::option::Option::Some(
                    ::sqlfrag::load::FieldMut::Nested(&mut self.#ident)
                ),
            });
            ref_arms.push(quote! {
                #index => ::core::option::Option::Some(
                    ::sqlfrag::load::FieldRef::Nested(&self.#ident)
                ),
            });
            quote! {
                ::sqlfrag::load::FieldKind::Flatten(<#ty as ::sqlfrag::load::Record>::shape)
            }
        } else {
            arms.push(quote! {
                #index => ::core::option::Option::Some(
                    ::sqlfrag::load::FieldMut::Leaf(&mut self.#ident)
                ),
            });
            ref_arms.push(quote! {
                #index => ::core::option::Option::Some(
                    ::sqlfrag::load::FieldRef::Leaf(&self.#ident)
                ),
            });
            quote! { ::sqlfrag::load::FieldKind::Leaf }
        };

        specs.push(quote! {
            ::sqlfrag::load::FieldSpec {
                name: #field_name,
                column: #column,
                kind: #kind,
            }
        });
    }

    let type_name = name.to_string();

    Ok(quote! {
        impl ::sqlfrag::load::Fields for #name {
            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<::sqlfrag::load::FieldMut<'_>> {
                match index {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_ref(
                &self,
                index: usize,
            ) -> ::core::option::Option<::sqlfrag::load::FieldRef<'_>> {
                match index {
                    #(#ref_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::sqlfrag::load::Record for #name {
            fn shape() -> &'static ::sqlfrag::load::Shape {
                static SHAPE: ::sqlfrag::load::Shape = ::sqlfrag::load::Shape {
                    type_name: #type_name,
                    type_id: ::core::any::TypeId::of::<#name>,
                    fields: &[#(#specs),*],
                };
                &SHAPE
            }
        }

        impl ::sqlfrag::load::Element for #name {
            fn bind(
                tags: &::sqlfrag::load::TagCache,
                columns: &[::std::string::String],
            ) -> ::std::vec::Vec<::core::option::Option<::std::vec::Vec<usize>>> {
                ::sqlfrag::load::bind_record::<Self>(tags, columns)
            }

            fn slot(
                &mut self,
                path: &[usize],
            ) -> ::core::option::Option<&mut dyn ::sqlfrag::load::Scan> {
                ::sqlfrag::load::record_slot(self, path)
            }
        }
    })
}
