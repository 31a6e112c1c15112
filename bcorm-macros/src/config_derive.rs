use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

use crate::crate_path::bcorm_core_path;
use crate::types::{is_option_type, option_inner_type};

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Extract the `#[config(prefix = "...")]` attribute from the struct.
fn extract_prefix(input: &DeriveInput) -> syn::Result<String> {
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("config")) {
        let mut prefix = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("prefix") {
                prefix = Some(meta.value()?.parse::<syn::LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `prefix` in #[config(prefix = \"...\")]"))
            }
        })?;
        if let Some(p) = prefix {
            return Ok(p);
        }
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "#[derive(ConfigProperties)] requires #[config(prefix = \"...\")]\n\
         \n  example:\n  #[derive(ConfigProperties)]\n  #[config(prefix = \"bigcommerce\")]\n  pub struct ClientConfig { ... }",
    ))
}

/// One field of a ConfigProperties struct.
struct ConfigField {
    ident: syn::Ident,
    ty: syn::Type,
    key: String,
    default: Option<syn::Expr>,
    section: bool,
    doc: Option<String>,
}

impl ConfigField {
    fn parse(field: &syn::Field) -> syn::Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let mut parsed = ConfigField {
            key: ident.to_string(),
            ident,
            ty: field.ty.clone(),
            default: None,
            section: false,
            doc: doc_comment(&field.attrs),
        };
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("config")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    parsed.default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("key") {
                    parsed.key = meta.value()?.parse::<syn::LitStr>()?.value();
                } else if meta.path.is_ident("section") {
                    parsed.section = true;
                } else {
                    return Err(meta.error("expected `default`, `key` or `section` in #[config(...)]"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }

    fn is_option(&self) -> bool {
        is_option_type(&self.ty)
    }

    fn required(&self) -> bool {
        !self.is_option() && self.default.is_none() && !self.section
    }

    /// `let`-free expression producing the field value from `__config`.
    fn init(&self, krate: &TokenStream2) -> TokenStream2 {
        let key = &self.key;
        let ty = &self.ty;
        let full_key = quote! { &format!("{}.{}", __prefix, #key) };

        if self.section {
            return quote! {
                <#ty as #krate::config::ConfigProperties>::from_config_prefixed(__config, #full_key)?
            };
        }

        let default = self.default.as_ref().map(|expr| match expr {
            // `"text"` needs `.into()` to land in a `String`.
            syn::Expr::Lit(syn::ExprLit { lit: Lit::Str(_), .. }) => quote!((#expr).into()),
            _ => quote!(#expr),
        });

        match (option_inner_type(&self.ty), default) {
            (Some(inner), Some(default)) => quote! {
                match __config.get::<#inner>(#full_key) {
                    Ok(v) => Some(v),
                    Err(#krate::config::ConfigError::NotFound(_)) => { let __d: #inner = #default; Some(__d) }
                    Err(e) => return Err(e),
                }
            },
            (Some(inner), None) => quote! {
                match __config.get::<#inner>(#full_key) {
                    Ok(v) => Some(v),
                    Err(#krate::config::ConfigError::NotFound(_)) => None,
                    Err(e) => return Err(e),
                }
            },
            (None, Some(default)) => quote! {
                match __config.get::<#ty>(#full_key) {
                    Ok(v) => v,
                    Err(#krate::config::ConfigError::NotFound(_)) => { let __d: #ty = #default; __d }
                    Err(e) => return Err(e),
                }
            },
            (None, None) => quote! { __config.get::<#ty>(#full_key)? },
        }
    }

    fn meta(&self, krate: &TokenStream2, prefix: &str) -> TokenStream2 {
        let key = &self.key;
        let full_key = format!("{prefix}.{key}");
        let type_name = type_name_str(&self.ty);
        let required = self.required();
        let section = self.section;
        let default_value = match &self.default {
            Some(expr) => {
                let text = quote!(#expr).to_string();
                quote!(Some(#text.to_string()))
            }
            None => quote!(None),
        };
        let description = match &self.doc {
            Some(d) => quote!(Some(#d.to_string())),
            None => quote!(None),
        };
        quote! {
            #krate::config::PropertyMeta {
                key: #key.to_string(),
                full_key: #full_key.to_string(),
                type_name: #type_name,
                required: #required,
                default_value: #default_value,
                description: #description,
                is_section: #section,
            }
        }
    }
}

/// Joined `///` lines of a field.
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit { lit: Lit::Str(s), .. }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join(" "))
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let prefix = extract_prefix(input)?;
    let krate = bcorm_core_path();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(ConfigProperties)] only works on structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(ConfigProperties)] only works on structs",
            ))
        }
    };

    let parsed = fields
        .iter()
        .map(ConfigField::parse)
        .collect::<syn::Result<Vec<_>>>()?;
    let validated = fields
        .iter()
        .any(|f| f.attrs.iter().any(|a| a.path().is_ident("garde")));

    let metas = parsed.iter().map(|f| f.meta(&krate, &prefix));
    let inits = parsed.iter().map(|f| {
        let ident = &f.ident;
        let init = f.init(&krate);
        quote!(#ident: #init)
    });

    let validation = if validated {
        quote! {
            {
                use garde::Validate as _;
                __instance.validate().map_err(|__report| {
                    let __details = __report
                        .iter()
                        .map(|(path, error)| #krate::config::ConfigValidationDetail {
                            key: format!("{}.{}", __prefix, path),
                            message: error.message().to_string(),
                        })
                        .collect();
                    #krate::config::ConfigError::Validation(__details)
                })?;
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #krate::config::ConfigProperties for #name {
            fn prefix() -> &'static str {
                #prefix
            }

            fn properties_metadata() -> Vec<#krate::config::PropertyMeta> {
                vec![#(#metas,)*]
            }

            fn from_config_prefixed(
                __config: &#krate::config::OrmConfig,
                __prefix: &str,
            ) -> Result<Self, #krate::config::ConfigError> {
                let __instance = Self {
                    #(#inits,)*
                };
                #validation
                Ok(__instance)
            }
        }
    })
}

/// Simple type name for metadata (`Option<u64>`, `String`).
fn type_name_str(ty: &syn::Type) -> String {
    if let syn::Type::Path(syn::TypePath { path, .. }) = ty {
        if let Some(seg) = path.segments.last() {
            let name = seg.ident.to_string();
            if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return format!("{name}<{}>", type_name_str(inner));
                }
            }
            return name;
        }
    }
    quote!(#ty).to_string().replace(' ', "")
}
