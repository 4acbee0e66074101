use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Type, parse_macro_input};

/// Derive macro for the `Describe` trait.
///
/// Generates the shape string written at the top of a waveform log for the
/// deriving type:
///
/// - structs with named fields: `{name:shape name:shape}`
/// - tuple structs: `{0:shape 1:shape}`
/// - unit structs and enums: the type name
///
/// Every field type must itself implement `Describe`; the generated impl
/// carries a where clause per field type so generic payloads work.
///
/// # Example
///
/// ```
/// # use chp::Describe;
/// #[derive(Describe)]
/// struct Token {
///     end: bool,
///     digit: i64,
/// }
///
/// assert_eq!(Token::describe(), "{end:bool digit:i64}");
/// ```
///
/// # Compile Errors
///
/// ```compile_fail
/// # use chp::Describe;
/// #[derive(Describe)]
/// union Bits {
///     i: u32,
///     f: f32,
/// }
/// ```
#[proc_macro_derive(Describe)]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_describe_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn get_crate_path() -> proc_macro2::TokenStream {
    match crate_name("chp") {
        Ok(FoundCrate::Itself) => quote!(::chp),
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::chp),
    }
}

/// Labelled field types of a type's layout, or `None` if the type is
/// described by name only.
fn get_fields(input: &DeriveInput) -> syn::Result<Option<Vec<(String, Type)>>> {
    match &input.data {
        Data::Struct(data) => Ok(match &data.fields {
            Fields::Named(fields) => Some(
                fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref().map(|id| (id.to_string(), f.ty.clone())))
                    .collect(),
            ),
            Fields::Unnamed(fields) => Some(
                fields
                    .unnamed
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (i.to_string(), f.ty.clone()))
                    .collect(),
            ),
            Fields::Unit => None,
        }),
        Data::Enum(_) => Ok(None),
        Data::Union(u) => Err(Error::new(
            u.union_token.span,
            "Describe cannot be derived for unions\n\
             help: wrap the union in a struct and implement Describe by hand",
        )),
    }
}

fn derive_describe_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let fields = get_fields(&input)?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let crate_path = get_crate_path();

    let mut where_predicates = where_clause
        .map(|w| w.predicates.iter().cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let body = match &fields {
        Some(fields) => {
            for (_, ty) in fields {
                where_predicates.push(syn::parse_quote! {
                    #ty: #crate_path::Describe
                });
            }
            let parts = fields.iter().map(|(label, ty)| {
                quote! {
                    ::std::format!("{}:{}", #label, <#ty as #crate_path::Describe>::describe())
                }
            });
            quote! {
                let parts: ::std::vec::Vec<::std::string::String> = ::std::vec![#(#parts),*];
                ::std::format!("{{{}}}", parts.join(" "))
            }
        }
        None => {
            let label = name.to_string();
            quote!(::std::string::String::from(#label))
        }
    };

    let where_tokens = if where_predicates.is_empty() {
        quote!()
    } else {
        quote!(where #(#where_predicates),*)
    };

    Ok(quote! {
        impl #impl_generics #crate_path::Describe for #name #ty_generics #where_tokens {
            fn describe() -> ::std::string::String {
                #body
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_named_fields_are_labelled() {
        let input: DeriveInput = parse_quote! {
            struct Foo {
                x: u32,
                y: Vec<bool>,
            }
        };
        let fields = get_fields(&input).unwrap().unwrap();
        let labels: Vec<_> = fields.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["x", "y"]);
    }

    #[test]
    fn test_tuple_fields_are_numbered() {
        let input: DeriveInput = parse_quote! {
            struct Foo(u32, u64);
        };
        let fields = get_fields(&input).unwrap().unwrap();
        let labels: Vec<_> = fields.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["0", "1"]);
    }

    #[test]
    fn test_unit_struct_has_no_fields() {
        let input: DeriveInput = parse_quote! {
            struct Foo;
        };
        assert!(get_fields(&input).unwrap().is_none());
    }

    #[test]
    fn test_enum_is_described_by_name() {
        let input: DeriveInput = parse_quote! {
            enum Foo {
                A(u32),
                B { x: u64 },
            }
        };
        assert!(get_fields(&input).unwrap().is_none());
    }

    #[test]
    fn test_union_is_rejected() {
        let input: DeriveInput = parse_quote! {
            union Foo {
                x: u32,
                y: f32,
            }
        };
        assert!(get_fields(&input).is_err());
    }

    #[test]
    fn test_generic_struct_gets_field_bounds() {
        let input: DeriveInput = parse_quote! {
            struct Foo<T> {
                value: T,
            }
        };
        let tokens = derive_describe_impl(input).unwrap().to_string();
        assert!(tokens.contains("where"));
        assert!(tokens.contains("Describe"));
    }
}
