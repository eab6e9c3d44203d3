//! `#[derive(Service)]` implementation.

use darling::FromDeriveInput;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Generics, Ident, Path, parse_quote};

#[derive(FromDeriveInput)]
#[darling(attributes(service))]
struct ServiceArgs {
    ident: Ident,
    generics: Generics,
    /// Clones share state.
    #[darling(default)]
    reference: bool,
    #[darling(rename = "crate")]
    krate: Option<Path>,
}

pub(crate) fn expand(input: &DeriveInput) -> darling::Result<TokenStream> {
    // A union cannot be read safely without knowing which field is live.
    if let Data::Union(data) = &input.data {
        return Err(darling::Error::unsupported_shape("union").with_span(&data.union_token));
    }
    let args = ServiceArgs::from_derive_input(input)?;

    let krate = args.krate.unwrap_or_else(|| parse_quote!(::sanduq));
    let ident = &args.ident;
    let generics = with_service_bounds(args.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let representation = if args.reference {
        quote!(#krate::Representation::Reference)
    } else {
        quote!(#krate::Representation::Value)
    };

    Ok(quote! {
        impl #impl_generics #krate::Service for #ident #ty_generics #where_clause {
            const REPRESENTATION: #krate::Representation = #representation;
        }
    })
}

/// Every type parameter must itself be storable in the container.
fn with_service_bounds(mut generics: Generics) -> Generics {
    let params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(parse_quote! {
            #param: ::core::clone::Clone + ::core::marker::Send + ::core::marker::Sync + 'static
        });
    }
    generics
}
