use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, LitStr};

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

#[derive(Default)]
struct FieldFlags {
    unique: Vec<Ident>,
    sort: Vec<Ident>,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Extract #[entity(collection = "...")] from struct-level attributes
    let collection = extract_collection(input)?;
    let flags = extract_field_flags(input)?;

    if flags.unique.len() > 1 {
        return Err(syn::Error::new_spanned(
            &flags.unique[1],
            "Entity derive: only one field may be marked #[entity(unique)]",
        ));
    }

    let unique_fn = flags.unique.first().map(|field| {
        quote! {
            fn unique_key(&self) -> ::std::option::Option<::std::string::String> {
                ::std::option::Option::Some(::std::string::ToString::to_string(&self.#field))
            }
        }
    });

    let accessors = flags.sort.iter().map(|field| {
        let fn_name = format_ident!("{}_key", field);
        let tag = field.to_string();
        quote! {
            pub fn #fn_name() -> persisted_rust::FieldAccessor<Self> {
                persisted_rust::FieldAccessor::new(#tag, |entity: &Self| {
                    persisted_rust::Value::from(::std::clone::Clone::clone(&entity.#field))
                })
            }
        }
    });

    let accessor_impl = if flags.sort.is_empty() {
        None
    } else {
        Some(quote! {
            impl #impl_generics #name #ty_generics #where_clause {
                #(#accessors)*
            }
        })
    };

    Ok(quote! {
        impl #impl_generics persisted_rust::Entity for #name #ty_generics #where_clause {
            const COLLECTION: &'static str = #collection;

            #unique_fn
        }

        #accessor_impl
    })
}

fn extract_collection(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        let mut collection = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `collection = \"...\"`"))
            }
        })?;

        if let Some(c) = collection {
            return Ok(c);
        }
    }

    // Default: snake_case struct name + "s"
    let name = input.ident.to_string();
    Ok(format!("{}s", to_snake_case(&name)))
}

fn extract_field_flags(input: &DeriveInput) -> syn::Result<FieldFlags> {
    let mut flags = FieldFlags::default();

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => fields,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Entity derive: only structs with named fields are supported",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Entity derive: only structs are supported",
            ))
        }
    };

    for field in &fields.named {
        let Some(ident) = &field.ident else { continue };
        for attr in &field.attrs {
            if !attr.path().is_ident("entity") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("unique") {
                    flags.unique.push(ident.clone());
                    Ok(())
                } else if meta.path.is_ident("sort") {
                    flags.sort.push(ident.clone());
                    Ok(())
                } else {
                    Err(meta.error("expected `unique` or `sort`"))
                }
            })?;
        }
    }

    Ok(flags)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
