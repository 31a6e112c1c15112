use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

use crate::crate_path::bcorm_data_path;
use crate::types::{generic_inner, is_named_type, option_inner_type};

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed `#[resource(name = "...", path = "...", id_in_path, kind = "...")]`.
struct ResourceAttr {
    name: String,
    path: String,
    id_in_path: bool,
    payment: bool,
}

fn extract_resource(input: &DeriveInput) -> syn::Result<Option<ResourceAttr>> {
    for attr in &input.attrs {
        if !attr.path().is_ident("resource") {
            continue;
        }
        let mut name = None;
        let mut path = None;
        let mut id_in_path = false;
        let mut payment = false;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<syn::LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("path") {
                path = Some(meta.value()?.parse::<syn::LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("id_in_path") {
                id_in_path = true;
                Ok(())
            } else if meta.path.is_ident("kind") {
                let kind = meta.value()?.parse::<syn::LitStr>()?;
                match kind.value().as_str() {
                    "api" => payment = false,
                    "payment" => payment = true,
                    _ => return Err(syn::Error::new_spanned(kind, "expected `kind = \"api\"` or `kind = \"payment\"`")),
                }
                Ok(())
            } else {
                Err(meta.error("expected `name`, `path`, `id_in_path` or `kind` in #[resource(...)]"))
            }
        })?;
        let path = path.ok_or_else(|| {
            syn::Error::new_spanned(
                attr,
                "#[resource] requires `path`\n\n  example:\n  #[resource(name = \"Product\", path = \"/catalog/products\")]",
            )
        })?;
        return Ok(Some(ResourceAttr {
            name: name.unwrap_or_else(|| input.ident.to_string()),
            path,
            id_in_path,
            payment,
        }));
    }
    Ok(None)
}

enum Validation {
    Email,
    Date(String),
    File,
}

/// Parsed `#[field(...)]` of a plain field.
#[derive(Default)]
struct FieldAttr {
    name: Option<String>,
    required: bool,
    readonly: bool,
    param: bool,
    upload: bool,
    access_token: bool,
    validation: Option<Validation>,
    validate: bool,
}

fn parse_field_attr(attrs: &[syn::Attribute]) -> syn::Result<FieldAttr> {
    let mut result = FieldAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse::<syn::LitStr>()?.value());
            } else if meta.path.is_ident("required") {
                result.required = true;
            } else if meta.path.is_ident("readonly") {
                result.readonly = true;
            } else if meta.path.is_ident("param") {
                result.param = true;
            } else if meta.path.is_ident("upload") {
                result.upload = true;
            } else if meta.path.is_ident("access_token") {
                result.access_token = true;
            } else if meta.path.is_ident("validate") {
                result.validate = true;
            } else if meta.path.is_ident("email") {
                result.validation = Some(Validation::Email);
            } else if meta.path.is_ident("file") {
                result.validation = Some(Validation::File);
            } else if meta.path.is_ident("date") {
                let format = if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse::<syn::LitStr>()?.value()
                } else {
                    "%Y-%m-%d".to_string()
                };
                result.validation = Some(Validation::Date(format));
            } else {
                return Err(meta.error(
                    "expected `name`, `required`, `readonly`, `param`, `upload`, `access_token`, `email`, `date`, `file` or `validate` in #[field(...)]",
                ));
            }
            Ok(())
        })?;
        if result.validate && result.validation.is_none() {
            return Err(syn::Error::new_spanned(
                attr,
                "`validate` needs a rule: `date` or `file`",
            ));
        }
    }
    Ok(result)
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    One,
    Many,
}

/// How a has-one target is held: `Option<T>` or `Option<Box<T>>`.
#[derive(Clone, Copy, PartialEq)]
enum Holder {
    Plain,
    Boxed,
}

struct RelationAttr {
    kind: Kind,
    holder: Holder,
    target: syn::Type,
    name: String,
    field: String,
    target_field: String,
    from: String,
    auto: bool,
    readonly: bool,
}

fn parse_relation_attr(
    attr: &syn::Attribute,
    kind: Kind,
    property: &syn::Ident,
    ty: &syn::Type,
) -> syn::Result<RelationAttr> {
    let (target, holder) = match kind {
        Kind::One => {
            let inner = option_inner_type(ty).ok_or_else(|| {
                syn::Error::new_spanned(ty, "#[has_one] fields must be `Option<T>` or `Option<Box<T>>`")
            })?;
            match generic_inner(inner, "Box") {
                Some(boxed) => (boxed.clone(), Holder::Boxed),
                None => (inner.clone(), Holder::Plain),
            }
        }
        Kind::Many => {
            let inner = generic_inner(ty, "Vec")
                .ok_or_else(|| syn::Error::new_spanned(ty, "#[has_many] fields must be `Vec<T>`"))?;
            (inner.clone(), Holder::Plain)
        }
    };

    let mut relation = RelationAttr {
        kind,
        holder,
        target,
        name: property.to_string(),
        field: "id".to_string(),
        target_field: "id".to_string(),
        from: "api".to_string(),
        auto: false,
        readonly: false,
    };
    // Bare `#[has_many]` keeps every default.
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(relation);
    }
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            relation.name = meta.value()?.parse::<syn::LitStr>()?.value();
        } else if meta.path.is_ident("field") {
            relation.field = meta.value()?.parse::<syn::LitStr>()?.value();
        } else if meta.path.is_ident("target_field") {
            relation.target_field = meta.value()?.parse::<syn::LitStr>()?.value();
        } else if meta.path.is_ident("from") {
            let lit = meta.value()?.parse::<syn::LitStr>()?;
            if !matches!(lit.value().as_str(), "api" | "include" | "result") {
                return Err(syn::Error::new_spanned(lit, "`from` must be \"api\", \"include\" or \"result\""));
            }
            relation.from = lit.value();
        } else if meta.path.is_ident("auto") {
            relation.auto = true;
        } else if meta.path.is_ident("readonly") {
            relation.readonly = true;
        } else {
            return Err(meta.error(
                "expected `name`, `field`, `target_field`, `from`, `auto` or `readonly`",
            ));
        }
        Ok(())
    })?;
    Ok(relation)
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Entity)] does not support generic structs",
        ));
    }
    let krate = bcorm_data_path();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Entity)] only works on structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Entity)] only works on structs",
            ))
        }
    };

    let entity_name = name.to_string();
    let resource = match extract_resource(input)? {
        Some(ResourceAttr { name, path, id_in_path, payment }) => {
            let kind = if payment {
                quote!(#krate::descriptor::ResourceKind::Payment)
            } else {
                quote!(#krate::descriptor::ResourceKind::Api)
            };
            quote! {
                Some(#krate::descriptor::ResourceDescriptor {
                    name: #name,
                    path: #path,
                    id_in_path: #id_in_path,
                    kind: #kind,
                })
            }
        }
        None => quote! { None },
    };

    let mut state_field = None;
    let mut field_descriptors = Vec::new();
    let mut property_arms = Vec::new();
    let mut set_property_arms = Vec::new();
    let mut relation_descriptors = Vec::new();
    let mut related_arms = Vec::new();
    let mut set_related_arms = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let property = ident.to_string();
        let ty = &field.ty;

        let is_state = field.attrs.iter().any(|a| a.path().is_ident("state"))
            || is_named_type(ty, "EntityState");
        if is_state {
            if state_field.is_some() {
                return Err(syn::Error::new_spanned(field, "only one `EntityState` field is allowed"));
            }
            state_field = Some(ident);
            continue;
        }

        let relation_attr = field
            .attrs
            .iter()
            .find(|a| a.path().is_ident("has_one") || a.path().is_ident("has_many"));
        if let Some(attr) = relation_attr {
            let kind = if attr.path().is_ident("has_one") { Kind::One } else { Kind::Many };
            let relation = parse_relation_attr(attr, kind, &ident, ty)?;
            let RelationAttr { target, name: rel_name, field: link, target_field, from, auto, readonly, holder, .. } =
                &relation;

            let kind_tokens = match relation.kind {
                Kind::One => quote!(#krate::descriptor::RelationKind::HasOne),
                Kind::Many => quote!(#krate::descriptor::RelationKind::HasMany),
            };
            let from_tokens = match from.as_str() {
                "include" => quote!(#krate::descriptor::RelationSource::Include),
                "result" => quote!(#krate::descriptor::RelationSource::Result),
                _ => quote!(#krate::descriptor::RelationSource::Api),
            };
            relation_descriptors.push(quote! {
                #krate::descriptor::RelationDescriptor {
                    property: #property,
                    name: #rel_name,
                    kind: #kind_tokens,
                    target: <#target as #krate::entity::EntityType>::entity_descriptor,
                    field: #link,
                    target_field: #target_field,
                    from: #from_tokens,
                    auto: #auto,
                    readonly: #readonly,
                }
            });

            match (relation.kind, holder) {
                (Kind::One, Holder::Plain) => {
                    related_arms.push(quote! {
                        #property => Some(#krate::entity::Related::One(
                            self.#ident.as_ref().map(|e| e as &dyn #krate::entity::Entity),
                        ))
                    });
                    set_related_arms.push(quote! {
                        (#property, #krate::entity::RelatedOwned::One(value)) => {
                            self.#ident = match value {
                                Some(e) => Some(#krate::entity::relation_from_box::<#target>(e)?),
                                None => None,
                            };
                            Ok(())
                        }
                    });
                }
                (Kind::One, Holder::Boxed) => {
                    related_arms.push(quote! {
                        #property => Some(#krate::entity::Related::One(
                            self.#ident.as_deref().map(|e| e as &dyn #krate::entity::Entity),
                        ))
                    });
                    set_related_arms.push(quote! {
                        (#property, #krate::entity::RelatedOwned::One(value)) => {
                            self.#ident = match value {
                                Some(e) => Some(Box::new(#krate::entity::relation_from_box::<#target>(e)?)),
                                None => None,
                            };
                            Ok(())
                        }
                    });
                }
                (Kind::Many, _) => {
                    related_arms.push(quote! {
                        #property => Some(#krate::entity::Related::Many(
                            self.#ident.iter().map(|e| e as &dyn #krate::entity::Entity).collect(),
                        ))
                    });
                    set_related_arms.push(quote! {
                        (#property, #krate::entity::RelatedOwned::Many(list)) => {
                            self.#ident = list
                                .into_iter()
                                .map(#krate::entity::relation_from_box::<#target>)
                                .collect::<Result<Vec<_>, _>>()?;
                            Ok(())
                        }
                    });
                }
            }
            continue;
        }

        let attr = parse_field_attr(&field.attrs)?;
        let wire = attr.name.clone().unwrap_or_else(|| property.clone());
        let FieldAttr { required, readonly, param, upload, access_token, .. } = attr;
        // Email is always checked; date and file only when asked.
        let validate = match &attr.validation {
            Some(Validation::Email) => true,
            Some(_) => attr.validate,
            None => false,
        };
        let validation = match &attr.validation {
            Some(Validation::Email) => quote!(Some(#krate::validation::ValidationRule::Email)),
            Some(Validation::File) => quote!(Some(#krate::validation::ValidationRule::File)),
            Some(Validation::Date(format)) => {
                quote!(Some(#krate::validation::ValidationRule::Date { format: #format }))
            }
            None => quote!(None),
        };
        field_descriptors.push(quote! {
            #krate::descriptor::FieldDescriptor {
                property: #property,
                field: #wire,
                required: #required,
                readonly: #readonly,
                param: #param,
                upload: #upload,
                access_token: #access_token,
                validation: #validation,
                validate: #validate,
            }
        });
        property_arms.push(quote! {
            #property => Some(#krate::entity::property_to_value(&self.#ident))
        });
        set_property_arms.push(quote! {
            #property => {
                self.#ident = #krate::entity::property_from_value(property, value)?;
                Ok(())
            }
        });
    }

    let state = state_field.ok_or_else(|| {
        syn::Error::new_spanned(
            name,
            "#[derive(Entity)] requires a field of type `EntityState`\n\n  example:\n  #[state]\n  state: EntityState,",
        )
    })?;

    Ok(quote! {
        impl #krate::entity::EntityType for #name {
            fn entity_descriptor() -> &'static #krate::descriptor::EntityDescriptor {
                fn __factory() -> Box<dyn #krate::entity::Entity> {
                    Box::new(<#name as ::core::default::Default>::default())
                }
                static __FIELDS: &[#krate::descriptor::FieldDescriptor] = &[#(#field_descriptors,)*];
                static __RELATIONS: &[#krate::descriptor::RelationDescriptor] = &[#(#relation_descriptors,)*];
                static __DESCRIPTOR: #krate::descriptor::EntityDescriptor = #krate::descriptor::EntityDescriptor {
                    name: #entity_name,
                    resource: #resource,
                    fields: __FIELDS,
                    relations: __RELATIONS,
                    factory: __factory,
                };
                &__DESCRIPTOR
            }
        }

        impl #krate::entity::Entity for #name {
            fn descriptor(&self) -> &'static #krate::descriptor::EntityDescriptor {
                <Self as #krate::entity::EntityType>::entity_descriptor()
            }

            fn state(&self) -> &#krate::entity::EntityState {
                &self.#state
            }

            fn state_mut(&mut self) -> &mut #krate::entity::EntityState {
                &mut self.#state
            }

            fn property(&self, property: &str) -> Option<#krate::serde_json::Value> {
                match property {
                    #(#property_arms,)*
                    _ => None,
                }
            }

            fn set_property(
                &mut self,
                property: &str,
                value: #krate::serde_json::Value,
            ) -> Result<(), #krate::error::MapperError> {
                let _ = &value;
                match property {
                    #(#set_property_arms)*
                    _ => Err(#krate::error::MapperError::UnknownProperty {
                        entity: #entity_name,
                        property: property.to_string(),
                    }),
                }
            }

            fn related(&self, property: &str) -> Option<#krate::entity::Related<'_>> {
                match property {
                    #(#related_arms,)*
                    _ => None,
                }
            }

            fn set_related(
                &mut self,
                property: &str,
                value: #krate::entity::RelatedOwned,
            ) -> Result<(), #krate::error::MapperError> {
                match (property, value) {
                    #(#set_related_arms)*
                    (property, _) => Err(#krate::error::MapperError::UnknownProperty {
                        entity: #entity_name,
                        property: property.to_string(),
                    }),
                }
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn ::core::any::Any + Send + Sync> {
                self
            }

            fn clone_entity(&self) -> Box<dyn #krate::entity::Entity> {
                Box::new(::core::clone::Clone::clone(self))
            }
        }
    })
}
