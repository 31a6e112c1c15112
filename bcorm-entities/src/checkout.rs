//! Checkout resources.
//!
//! API constraints the manager does not enforce:
//! - a checkout holds at most one coupon, a new coupon replaces the old one;
//! - a consignment's shipping option cannot be updated together with its
//!   address or line items, use `EntityManager::update` with only
//!   `shipping_option_id`;
//! - consignments are created in batches, through `batch_create`.

use bcorm_data::{Entity, EntityState};
use serde_json::Value;

use crate::cart::{Cart, LineItem};

/// The checkout of a cart (`/checkouts/{id}`). Shares the cart's id.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Checkout", path = "/checkouts", id_in_path)]
pub struct Checkout {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    pub customer_message: Option<String>,
    #[field(readonly)]
    pub grand_total: Option<f64>,
    #[field(readonly)]
    pub subtotal_ex_tax: Option<f64>,
    #[field(readonly)]
    pub tax_total: Option<f64>,
    #[field(readonly)]
    pub order_id: Option<i64>,
    #[field(readonly)]
    pub created_time: Option<String>,
    #[field(readonly)]
    pub updated_time: Option<String>,
    #[has_one(from = "result", readonly)]
    pub cart: Option<Box<Cart>>,
    #[has_one(from = "result", readonly)]
    pub billing_address: Option<BillingAddress>,
    #[has_many(from = "result", readonly)]
    pub consignments: Vec<Consignment>,
    #[has_many(from = "result", readonly)]
    pub coupons: Vec<Coupon>,
}

/// Billing address of a checkout (`/checkouts/{checkout_id}/billing-address`).
///
/// Also the shape of a consignment's shipping address.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "BillingAddress", path = "/checkouts/{checkout_id}/billing-address")]
pub struct BillingAddress {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    #[field(param)]
    pub checkout_id: Option<String>,
    #[field(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub state_or_province_code: Option<String>,
    pub country: Option<String>,
    #[field(required)]
    pub country_code: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub address_type: Option<String>,
}

#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Consignment", path = "/checkouts/{checkout_id}/consignments")]
pub struct Consignment {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    #[field(param)]
    pub checkout_id: Option<String>,
    pub shipping_option_id: Option<String>,
    #[field(readonly)]
    pub shipping_cost_inc_tax: Option<f64>,
    #[has_one]
    pub shipping_address: Option<BillingAddress>,
    #[has_many]
    pub line_items: Vec<LineItem>,
    #[has_one(name = "address", from = "result", readonly)]
    pub address: Option<BillingAddress>,
    #[has_many(from = "result", readonly)]
    pub available_shipping_options: Vec<ShippingOption>,
    #[has_one(from = "result", readonly)]
    pub selected_shipping_option: Option<ShippingOption>,
}

impl Consignment {
    pub fn add_line_item(&mut self, item: LineItem) -> &mut Self {
        self.line_items.push(item);
        self
    }
}

/// A shipping quote offered for a consignment.
#[derive(Debug, Clone, Default, Entity)]
pub struct ShippingOption {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    pub description: Option<String>,
    #[field(name = "type")]
    pub kind: Option<String>,
    pub image_url: Option<String>,
    pub cost: Option<f64>,
    pub transit_time: Option<String>,
    pub additional_description: Option<String>,
}

/// A coupon applied to a checkout. Deleted by `code`, not by id.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Coupon", path = "/checkouts/{checkout_id}/coupons")]
pub struct Coupon {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(param)]
    pub checkout_id: Option<String>,
    #[field(required)]
    pub code: Option<String>,
    #[field(readonly)]
    pub coupon_type: Option<Value>,
    #[field(readonly)]
    pub display_name: Option<String>,
    #[field(readonly)]
    pub discounted_amount: Option<f64>,
}
