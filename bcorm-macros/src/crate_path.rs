//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `bcorm` (facade) or on the sub-crates
//! directly, and returns the matching path prefix.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

fn resolve(facade_module: &str, direct: &str, fallback: TokenStream) -> TokenStream {
    let module = syn::Ident::new(facade_module, proc_macro2::Span::call_site());
    if let Ok(found) = crate_name("bcorm") {
        match found {
            FoundCrate::Itself => quote!(crate::#module),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident::#module)
            }
        }
    } else if let Ok(found) = crate_name(direct) {
        match found {
            FoundCrate::Itself => quote!(crate),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        }
    } else {
        fallback
    }
}

/// Path to `bcorm_data` types: `::bcorm::bcorm_data` or `::bcorm_data`.
pub fn bcorm_data_path() -> TokenStream {
    resolve("bcorm_data", "bcorm-data", quote!(::bcorm_data))
}

/// Path to `bcorm_core` types: `::bcorm::bcorm_core` or `::bcorm_core`.
pub fn bcorm_core_path() -> TokenStream {
    resolve("bcorm_core", "bcorm-core", quote!(::bcorm_core))
}
