//! BigCommerce v3 resources as bcorm entities.
//!
//! Every type derives [`bcorm_data::Entity`]. [`register_all`] makes them
//! constructible by name through a [`Mapper`].

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod order;
pub mod payment;

use bcorm_data::Mapper;
use tracing::debug;

pub use cart::{Cart, CartItem, CustomItem, GiftCertificate, LineItem};
pub use catalog::{
    Product, ProductBulkPricingRule, ProductCustomField, ProductImage, ProductModifier,
    ProductModifierValue, ProductOption, ProductReview, ProductVariant, ProductVideo,
};
pub use checkout::{BillingAddress, Checkout, Consignment, Coupon, ShippingOption};
pub use customer::{Customer, CustomerAddress};
pub use order::Order;
pub use payment::{Card, Payment, PaymentAccessToken, PaymentMethod, PaymentRequest};

/// Register every entity of this crate with `mapper`.
pub fn register_all(mapper: &Mapper) {
    mapper.register::<Product>();
    mapper.register::<ProductImage>();
    mapper.register::<ProductVideo>();
    mapper.register::<ProductVariant>();
    mapper.register::<ProductCustomField>();
    mapper.register::<ProductBulkPricingRule>();
    mapper.register::<ProductOption>();
    mapper.register::<ProductModifier>();
    mapper.register::<ProductModifierValue>();
    mapper.register::<ProductReview>();

    mapper.register::<Customer>();
    mapper.register::<CustomerAddress>();

    mapper.register::<Cart>();
    mapper.register::<CartItem>();
    mapper.register::<LineItem>();
    mapper.register::<GiftCertificate>();
    mapper.register::<CustomItem>();

    mapper.register::<Checkout>();
    mapper.register::<BillingAddress>();
    mapper.register::<Consignment>();
    mapper.register::<ShippingOption>();
    mapper.register::<Coupon>();

    mapper.register::<Order>();

    mapper.register::<PaymentAccessToken>();
    mapper.register::<PaymentMethod>();
    mapper.register::<Payment>();
    mapper.register::<PaymentRequest>();
    mapper.register::<Card>();

    debug!(entities = mapper.registry().len(), "Registered BigCommerce entities");
}

pub mod prelude {
    //! Re-exports of every entity type.
    pub use crate::cart::*;
    pub use crate::catalog::*;
    pub use crate::checkout::*;
    pub use crate::customer::*;
    pub use crate::order::*;
    pub use crate::payment::*;
    pub use crate::register_all;
}
