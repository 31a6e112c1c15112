use bcorm_data::{Entity, EntityState};
use serde_json::Value;

/// A storefront cart (`/carts/{id}`).
///
/// New carts are created with `line_items`. The API answers with the items
/// grouped by kind under `line_items`, which fill the readonly lists.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Cart", path = "/carts", id_in_path)]
pub struct Cart {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    pub customer_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub locale: Option<String>,
    #[field(readonly)]
    pub email: Option<String>,
    #[field(readonly)]
    pub currency: Option<Value>,
    #[field(readonly)]
    pub base_amount: Option<f64>,
    #[field(readonly)]
    pub discount_amount: Option<f64>,
    #[field(readonly)]
    pub cart_amount: Option<f64>,
    #[field(readonly)]
    pub created_time: Option<String>,
    #[field(readonly)]
    pub updated_time: Option<String>,
    #[has_many]
    pub line_items: Vec<LineItem>,
    #[has_many(name = "line_items.physical_items", from = "result", readonly)]
    pub physical_items: Vec<LineItem>,
    #[has_many(name = "line_items.digital_items", from = "result", readonly)]
    pub digital_items: Vec<LineItem>,
    #[has_many(name = "line_items.gift_certificates", from = "result", readonly)]
    pub gift_certificates: Vec<GiftCertificate>,
    #[has_many(name = "line_items.custom_items", from = "result", readonly)]
    pub custom_items: Vec<CustomItem>,
}

impl Cart {
    pub fn add_line_item(&mut self, item: LineItem) -> &mut Self {
        self.line_items.push(item);
        self
    }
}

/// Items added to an existing cart (`/carts/{cart_id}/items`).
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "CartItem", path = "/carts/{cart_id}/items")]
pub struct CartItem {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    #[field(param)]
    pub cart_id: Option<String>,
    #[has_many]
    pub line_items: Vec<LineItem>,
    #[has_many]
    pub gift_certificates: Vec<GiftCertificate>,
    #[has_many]
    pub custom_items: Vec<CustomItem>,
}

impl CartItem {
    pub fn add_line_item(&mut self, item: LineItem) -> &mut Self {
        self.line_items.push(item);
        self
    }

    pub fn add_gift_certificate(&mut self, certificate: GiftCertificate) -> &mut Self {
        self.gift_certificates.push(certificate);
        self
    }

    pub fn add_custom_item(&mut self, item: CustomItem) -> &mut Self {
        self.custom_items.push(item);
        self
    }
}

/// A catalog product in a cart. Only lives inside carts and consignments.
#[derive(Debug, Clone, Default, Entity)]
pub struct LineItem {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub quantity: Option<i64>,
    pub list_price: Option<f64>,
    pub option_selections: Option<Value>,
    #[field(readonly)]
    pub sku: Option<String>,
    #[field(readonly)]
    pub name: Option<String>,
    #[field(readonly)]
    pub sale_price: Option<f64>,
    #[field(readonly)]
    pub extended_sale_price: Option<f64>,
    #[field(readonly)]
    pub image_url: Option<String>,
    #[field(readonly)]
    pub is_taxable: Option<bool>,
}

#[derive(Debug, Clone, Default, Entity)]
pub struct GiftCertificate {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    pub name: Option<String>,
    pub theme: Option<String>,
    pub amount: Option<f64>,
    pub quantity: Option<i64>,
    /// `{"name": ..., "email": ...}`
    pub sender: Option<Value>,
    pub recipient: Option<Value>,
    pub message: Option<String>,
}

/// A line item that is not in the catalog.
#[derive(Debug, Clone, Default, Entity)]
pub struct CustomItem {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub list_price: Option<f64>,
}
