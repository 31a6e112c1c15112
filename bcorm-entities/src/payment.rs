//! Payment processing.
//!
//! Paying an order takes three steps:
//! 1. create a [`PaymentAccessToken`] for the order on the store API;
//! 2. list the order's [`PaymentMethod`]s, filtered with `order_id`;
//! 3. create a [`Payment`] carrying the token, which is sent to the payment
//!    processing API as `Authorization: PAT <token>`.

use bcorm_data::{Entity, EntityState};
use serde_json::{json, Value};

/// Token authorizing payments of one order (`/payments/access_tokens`).
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "PaymentAccessToken", path = "/payments/access_tokens")]
pub struct PaymentAccessToken {
    state: EntityState,
    /// The token itself.
    #[field(readonly)]
    pub id: Option<String>,
    /// `{"id": <order id>}`.
    #[field(required)]
    pub order: Option<Value>,
}

impl PaymentAccessToken {
    pub fn for_order(order_id: i64) -> Self {
        Self {
            order: Some(json!({ "id": order_id })),
            ..Self::default()
        }
    }
}

/// A way to pay an order (`/payments/methods?order_id=...`).
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "PaymentMethod", path = "/payments/methods")]
pub struct PaymentMethod {
    state: EntityState,
    /// Gateway and method, e.g. `stripe.card`.
    #[field(readonly)]
    pub id: Option<String>,
    #[field(readonly)]
    pub name: Option<String>,
    #[field(readonly)]
    pub test_mode: Option<bool>,
    #[field(name = "type", readonly)]
    pub kind: Option<String>,
    #[field(readonly)]
    pub supported_instruments: Option<Value>,
    #[field(readonly)]
    pub stored_instruments: Option<Value>,
}

/// A payment of an order through the payment processing API.
///
/// Only created, never read back. The request goes out as
/// `{"payment": {...}}`; the answer fills `id`, `status` and
/// `transaction_type`.
#[derive(Debug, Clone, Default, Entity)]
#[resource(name = "Payment", path = "/payments", kind = "payment")]
pub struct Payment {
    state: EntityState,
    #[field(readonly)]
    pub id: Option<String>,
    #[field(access_token, required)]
    pub access_token: Option<String>,
    #[has_one(name = "payment", from = "result")]
    pub request: Option<PaymentRequest>,
    /// `success` or `pending`.
    #[field(readonly)]
    pub status: Option<String>,
    #[field(readonly)]
    pub transaction_type: Option<String>,
}

impl Payment {
    /// Pay with `card` through `payment_method_id`, authorized by `token`.
    pub fn with_card(token: &PaymentAccessToken, payment_method_id: impl Into<String>, card: Card) -> Self {
        Self {
            access_token: token.id.clone(),
            request: Some(PaymentRequest {
                instrument: Some(card),
                payment_method_id: Some(payment_method_id.into()),
                save_instrument: Some(false),
                ..PaymentRequest::default()
            }),
            ..Self::default()
        }
    }
}

/// Body of a payment: the instrument and the method charging it.
#[derive(Debug, Clone, Default, Entity)]
pub struct PaymentRequest {
    state: EntityState,
    #[has_one(from = "result")]
    pub instrument: Option<Card>,
    pub payment_method_id: Option<String>,
    pub save_instrument: Option<bool>,
}

/// Raw card details.
#[derive(Debug, Clone, Default, Entity)]
pub struct Card {
    state: EntityState,
    /// Always `card`.
    #[field(name = "type")]
    pub kind: Option<String>,
    pub cardholder_name: Option<String>,
    pub number: Option<String>,
    pub expiry_month: Option<i64>,
    pub expiry_year: Option<i64>,
    pub verification_value: Option<String>,
}

impl Card {
    pub fn new(
        cardholder_name: impl Into<String>,
        number: impl Into<String>,
        expiry_month: i64,
        expiry_year: i64,
        verification_value: impl Into<String>,
    ) -> Self {
        Self {
            kind: Some("card".into()),
            cardholder_name: Some(cardholder_name.into()),
            number: Some(number.into()),
            expiry_month: Some(expiry_month),
            expiry_year: Some(expiry_year),
            verification_value: Some(verification_value.into()),
            ..Self::default()
        }
    }
}
