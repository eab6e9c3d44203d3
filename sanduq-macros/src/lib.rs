//! Procedural macros for Sanduq DI.
//!
//! * `#[derive(Service)]` - implements `sanduq::Service`

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod service;

/// Implements `Service` for a struct or enum.
///
/// Types are value-like unless marked as handles whose clones share state:
///
/// ```ignore
/// #[derive(Clone, Default, Service)]
/// struct RequestModel {
///     id: u32,
/// }
///
/// #[derive(Clone, Service)]
/// #[service(reference)]
/// struct PoolHandle {
///     inner: Arc<Pool>,
/// }
/// ```
///
/// Attributes:
/// * `#[service(reference)]` - the type is reference-like
/// * `#[service(crate = "path")]` - path to the `sanduq` crate (default `::sanduq`)
#[proc_macro_derive(Service, attributes(service))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match service::expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}
