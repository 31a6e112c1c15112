//! BigCommerce REST client for bcorm.
//!
//! [`HttpClient`] implements [`bcorm_data::ApiClient`] on top of reqwest and
//! is configured from the `bigcommerce.*` keys of an `OrmConfig`.

pub mod cache;
pub mod client;
pub mod config;

pub use cache::ResponseCache;
pub use client::HttpClient;
pub use config::{ClientConfig, Credentials};

pub mod prelude {
    //! Re-exports of the client types.
    pub use crate::{ClientConfig, Credentials, HttpClient, ResponseCache};
}
