//! Catalog resources: products and the collections nested under them.
//!
//! Nested resources carry their parent `product_id` as a path parameter. It
//! fills `{product_id}` in the resource path and is never sent in payloads.

use bcorm_data::{Entity, EntityState};
use serde_json::Value;

/// A catalog product (`/catalog/products`).
///
/// Images are embedded with `include=images` on every find. Modifiers are
/// loaded from `/catalog/products/{id}/modifiers` when auto-loading.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Product", path = "/catalog/products")]
pub struct Product {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(required)]
    pub name: Option<String>,
    /// `physical` or `digital`.
    #[field(name = "type")]
    pub kind: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub inventory_level: Option<i64>,
    pub is_visible: Option<bool>,
    pub categories: Option<Vec<i64>>,
    pub brand_id: Option<i64>,
    #[field(readonly)]
    pub date_created: Option<String>,
    #[field(readonly)]
    pub date_modified: Option<String>,
    #[has_one(from = "include")]
    pub primary_image: Option<ProductImage>,
    #[has_many(from = "include", auto)]
    pub images: Vec<ProductImage>,
    #[has_many(from = "include")]
    pub videos: Vec<ProductVideo>,
    #[has_many(from = "include")]
    pub variants: Vec<ProductVariant>,
    #[has_many(from = "include")]
    pub custom_fields: Vec<ProductCustomField>,
    #[has_many(from = "include")]
    pub bulk_pricing_rules: Vec<ProductBulkPricingRule>,
    #[has_many(from = "include")]
    pub options: Vec<ProductOption>,
    #[has_many(field = "id", target_field = "product_id", auto)]
    pub modifiers: Vec<ProductModifier>,
    #[has_many(field = "id", target_field = "product_id")]
    pub reviews: Vec<ProductReview>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductImage", path = "/catalog/products/{product_id}/images")]
pub struct ProductImage {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    pub is_thumbnail: Option<bool>,
    pub sort_order: Option<i64>,
    pub description: Option<String>,
    /// Local path of the image, sent as a multipart file on create.
    #[field(upload)]
    pub image_file: Option<String>,
    pub image_url: Option<String>,
    #[field(readonly)]
    pub url_zoom: Option<String>,
    #[field(readonly)]
    pub url_standard: Option<String>,
    #[field(readonly)]
    pub url_thumbnail: Option<String>,
    #[field(readonly)]
    pub url_tiny: Option<String>,
    #[field(readonly)]
    pub date_modified: Option<String>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductVideo", path = "/catalog/products/{product_id}/videos")]
pub struct ProductVideo {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i64>,
    #[field(name = "type")]
    pub kind: Option<String>,
    #[field(required)]
    pub video_id: Option<String>,
    #[field(readonly)]
    pub length: Option<String>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductVariant", path = "/catalog/products/{product_id}/variants")]
pub struct ProductVariant {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub weight: Option<f64>,
    pub inventory_level: Option<i64>,
    pub purchasing_disabled: Option<bool>,
    pub image_url: Option<String>,
    pub option_values: Option<Value>,
    #[field(readonly)]
    pub calculated_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductCustomField", path = "/catalog/products/{product_id}/custom-fields")]
pub struct ProductCustomField {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    #[field(required)]
    pub name: Option<String>,
    #[field(required)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(
    name = "ProductBulkPricingRule",
    path = "/catalog/products/{product_id}/bulk-pricing-rules"
)]
pub struct ProductBulkPricingRule {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    #[field(required)]
    pub quantity_min: Option<i64>,
    pub quantity_max: Option<i64>,
    /// `price`, `percent` or `fixed`.
    #[field(name = "type", required)]
    pub kind: Option<String>,
    #[field(required)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductOption", path = "/catalog/products/{product_id}/options")]
pub struct ProductOption {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    #[field(required)]
    pub display_name: Option<String>,
    #[field(name = "type", required)]
    pub kind: Option<String>,
    pub sort_order: Option<i64>,
    pub config: Option<Value>,
    pub option_values: Option<Value>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductModifier", path = "/catalog/products/{product_id}/modifiers")]
pub struct ProductModifier {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    #[field(name = "type")]
    pub kind: Option<String>,
    pub required: bool,
    pub sort_order: Option<i64>,
    pub config: Option<Value>,
    #[has_many(from = "result", readonly)]
    pub option_values: Vec<ProductModifierValue>,
}

/// A value of a product modifier; needs both parent ids to build its path.
#[derive(Debug, Clone, Default, Entity)]
#[resource(
    name = "ProductModifierValue",
    path = "/catalog/products/{product_id}/modifiers/{modifier_id}/values"
)]
pub struct ProductModifierValue {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    #[field(param)]
    pub modifier_id: Option<i64>,
    #[field(required)]
    pub label: Option<String>,
    pub sort_order: Option<i64>,
    pub is_default: bool,
    pub value_data: Option<Value>,
    pub adjusters: Option<Value>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "ProductReview", path = "/catalog/products/{product_id}/reviews")]
pub struct ProductReview {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub product_id: Option<i64>,
    #[field(required)]
    pub title: Option<String>,
    pub text: Option<String>,
    /// `approved`, `disapproved` or `pending`.
    pub status: Option<String>,
    pub rating: Option<i64>,
    #[field(email)]
    pub email: Option<String>,
    pub name: Option<String>,
    /// RFC 3339 timestamp.
    #[field(date = "%+", validate)]
    pub date_reviewed: Option<String>,
    #[field(readonly)]
    pub date_created: Option<String>,
    #[field(readonly)]
    pub date_modified: Option<String>,
}
