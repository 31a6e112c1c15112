extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod config_derive;
pub(crate) mod crate_path;
pub(crate) mod entity_derive;
pub(crate) mod types;

/// Derive macro for declaring an API entity.
///
/// Generates the static `EntityDescriptor` of the type and implements
/// `Entity` and `EntityType` over it. The struct must also derive (or
/// implement) `Debug`, `Clone` and `Default`, and hold one `EntityState`.
///
/// # Struct-level attribute
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[resource(path = "...")]` | Resource path template, `{placeholders}` filled from `param` fields |
/// | `#[resource(name = "...")]` | Resource name, defaults to the type name |
/// | `#[resource(id_in_path)]` | Single lookups use `{path}/{id}` instead of `id:in=` |
/// | `#[resource(kind = "payment")]` | Served by the payment processing API (default `"api"`) |
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[state]` | The `EntityState` field (detected by type when omitted) |
/// | `#[field(name = "type")]` | Wire name, when it differs from the Rust name |
/// | `#[field(required)]` | Must be set before save |
/// | `#[field(readonly)]` | Only set from server responses, never sent |
/// | `#[field(param)]` | Fills a path placeholder, never sent |
/// | `#[field(upload)]` | Filesystem path sent as a multipart file on create |
/// | `#[field(access_token)]` | Payment access token, sent as `Authorization: PAT <token>` |
/// | `#[field(email)]`, `#[field(date = "%Y-%m-%d")]`, `#[field(file)]` | Validation rule |
/// | `#[field(date, validate)]`, `#[field(file, validate)]` | Check the date or file rule on save (email is always checked) |
/// | `#[has_one(...)]` on `Option<T>` / `Option<Box<T>>` | One related entity |
/// | `#[has_many(...)]` on `Vec<T>` | Many related entities |
///
/// Relation keys: `name` (wire / include name, defaults to the field name),
/// `field` (link on the parent, default `id`), `target_field` (default `id`),
/// `from = "api" | "include" | "result"` (default `api`), `auto`, `readonly`.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Entity)]
/// #[resource(name = "ProductReview", path = "/catalog/products/{product_id}/reviews")]
/// pub struct ProductReview {
///     #[state]
///     state: EntityState,
///     #[field(readonly)]
///     pub id: Option<i64>,
///     #[field(param)]
///     pub product_id: Option<i64>,
///     #[field(required)]
///     pub title: Option<String>,
///     #[field(email)]
///     pub email: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(resource, state, field, has_one, has_many))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}

/// Derive macro for strongly-typed configuration sections.
///
/// Requires `#[config(prefix = "...")]` on the struct. Fields accept
/// `#[config(default = <expr>)]`, `#[config(key = "...")]` and
/// `#[config(section)]`. When any field carries `#[garde(...)]` the section
/// is validated after construction.
///
/// ```ignore
/// #[derive(ConfigProperties, garde::Validate, Clone, Debug)]
/// #[config(prefix = "bigcommerce")]
/// pub struct ClientConfig {
///     /// Request timeout in seconds
///     #[config(default = 60)]
///     #[garde(range(min = 1))]
///     pub timeout: u64,
/// }
/// ```
#[proc_macro_derive(ConfigProperties, attributes(config))]
pub fn derive_config_properties(input: TokenStream) -> TokenStream {
    config_derive::expand(input)
}
