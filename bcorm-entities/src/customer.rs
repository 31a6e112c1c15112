use bcorm_data::{Entity, EntityState};

/// A store customer (`/customers`).
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Customer", path = "/customers")]
pub struct Customer {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    #[field(required, email)]
    pub email: Option<String>,
    #[field(required)]
    pub first_name: Option<String>,
    #[field(required)]
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub tax_exempt_category: Option<String>,
    pub customer_group_id: Option<i64>,
    #[field(readonly)]
    pub registration_ip_address: Option<String>,
    #[field(readonly)]
    pub date_created: Option<String>,
    #[field(readonly)]
    pub date_modified: Option<String>,
    /// Loaded from `/customers/addresses?customer_id:in={id}`.
    #[has_many(field = "id", target_field = "customer_id")]
    pub addresses: Vec<CustomerAddress>,
}

/// A customer address (`/customers/addresses`).
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "CustomerAddress", path = "/customers/addresses")]
pub struct CustomerAddress {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<i64>,
    pub customer_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub phone: Option<String>,
    pub address_type: Option<String>,
}
