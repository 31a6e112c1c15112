use bcorm_data::{Entity, EntityState};

/// An order placed from a checkout (`/checkouts/{checkout_id}/orders`).
///
/// Created with only the checkout id, which also fills the path. The
/// checkout id is sent in the payload as well, so the create is never empty.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Order", path = "/checkouts/{checkout_id}/orders")]
pub struct Order {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(required)]
    pub checkout_id: Option<String>,
}

impl Order {
    pub fn for_checkout(checkout_id: impl Into<String>) -> Self {
        Self {
            checkout_id: Some(checkout_id.into()),
            ..Self::default()
        }
    }
}
