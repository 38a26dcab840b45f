use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Ident, LitStr};

const DEFAULT_TAG_NAME: &str = "neo4j";

/// Derive `graphbind::Encode` for a struct with named fields.
///
/// Only fields tagged with `#[neo4j("name")]` are encoded. Append
/// `,omitempty` to drop the field when it holds its zero value. Tags under
/// other keys go in `#[tags(key = "value")]`.
///
/// ```ignore
/// #[derive(Encode)]
/// struct Person {
///     #[neo4j("name")]
///     name: String,
///     #[neo4j("nickname,omitempty")]
///     #[tags(graph = "alias")]
///     nickname: Option<String>,
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Encode, attributes(neo4j, tags))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match encode_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive `graphbind::Decode` and `graphbind::DecodeTarget` for a struct with
/// named fields, using the same tags as [`Encode`](derive@Encode).
///
/// Every field type must implement `graphbind::FromValue`.
#[proc_macro_derive(Decode, attributes(neo4j, tags))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match decode_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<Vec<&'a Field>, syn::Error> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                format!("{derive} only supports structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} only supports structs"),
        )),
    }
}

/// `(tag key, tag value)` pairs declared on a field.
fn field_tags(field: &Field) -> Result<Vec<(String, String)>, syn::Error> {
    let mut tags = Vec::new();
    for attr in &field.attrs {
        if attr.path().is_ident(DEFAULT_TAG_NAME) {
            let value: LitStr = attr.parse_args()?;
            tags.push((DEFAULT_TAG_NAME.to_string(), value.value()));
        } else if attr.path().is_ident("tags") {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a tag key"))?
                    .to_string();
                let value: LitStr = meta.value()?.parse()?;
                tags.push((key, value.value()));
                Ok(())
            })?;
        }
    }
    Ok(tags)
}

struct FieldInfo<'a> {
    ident: &'a Ident,
    name: String,
    tags: proc_macro2::TokenStream,
}

fn field_infos<'a>(fields: &[&'a Field]) -> Result<Vec<FieldInfo<'a>>, syn::Error> {
    fields
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
            let pairs = field_tags(field)?.into_iter().map(|(k, v)| quote! { (#k, #v) });
            Ok(FieldInfo {
                ident,
                name: ident.to_string(),
                tags: quote! { &[#(#pairs),*] },
            })
        })
        .collect()
}

fn encode_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = field_infos(&named_fields(input, "Encode")?)?;

    let shape_fields = fields.iter().map(|f| {
        let ident = f.ident;
        let field_name = &f.name;
        let tags = &f.tags;
        quote! {
            graphbind::encode::Field {
                name: #field_name,
                tags: #tags,
                value: &self.#ident,
            }
        }
    });
    let zero_checks = fields.iter().map(|f| {
        let ident = f.ident;
        quote! { graphbind::reflect::is_zero(&self.#ident) }
    });

    Ok(quote! {
        impl #impl_generics graphbind::encode::Encode for #name #ty_generics #where_clause {
            fn shape(&self) -> graphbind::encode::Shape<'_> {
                graphbind::encode::Shape::Struct(vec![#(#shape_fields),*])
            }

            fn is_zero(&self) -> bool {
                true #(&& #zero_checks)*
            }
        }
    }
    .into())
}

fn decode_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = field_infos(&named_fields(input, "Decode")?)?;

    let decode_fields = fields.iter().map(|f| {
        let ident = f.ident;
        let field_name = &f.name;
        let tags = &f.tags;
        quote! {
            __mapper.decode_field(__properties, #field_name, #tags, &mut self.#ident, &mut __errors);
        }
    });

    Ok(quote! {
        impl #impl_generics graphbind::decode::Decode for #name #ty_generics #where_clause {
            fn decode_properties(
                &mut self,
                __properties: &::std::collections::HashMap<::std::string::String, graphbind::value::Value>,
                __mapper: &graphbind::decode::FieldMapper<'_>,
            ) -> graphbind::error::Result<()> {
                let mut __errors = graphbind::decode::FieldErrors::new(#name_str);
                #(#decode_fields)*
                __errors.finish()
            }
        }

        impl #impl_generics graphbind::decode::DecodeTarget for #name #ty_generics #where_clause {
            fn target(&mut self) -> graphbind::decode::TargetShape<'_> {
                graphbind::decode::TargetShape::Single(self)
            }
        }
    }
    .into())
}
