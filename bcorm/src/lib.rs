//! bcorm: entity mapping over the BigCommerce v3 REST API.
//!
//! This facade crate re-exports the bcorm sub-crates through a single
//! dependency with feature flags:
//!
//! ```ignore
//! use bcorm::prelude::*;
//!
//! let config = OrmConfig::load("dev")?;
//! let em = Configuration::from_config(&config)?.entity_manager()?;
//! let product = em.find::<Product>(111, Parent::None, true).await?;
//! ```
//!
//! # Feature flags
//!
//! | Feature      | Default | Crate            |
//! |--------------|---------|------------------|
//! | `http`       | **yes** | `bcorm-http`     |
//! | `entities`   | **yes** | `bcorm-entities` |
//! | `test-utils` | no      | `bcorm-test`     |
//! | `full`       | no      | All of the above |

// Sub-crates are public modules (`bcorm::bcorm_data`, ...). The derive
// macros resolve their generated paths through them when the user depends
// on the facade.
pub extern crate bcorm_core;
pub extern crate bcorm_macros;

pub use bcorm_data;
pub use bcorm_events;

#[cfg(feature = "http")]
pub use bcorm_http;

#[cfg(feature = "entities")]
pub use bcorm_entities;

#[cfg(feature = "test-utils")]
pub use bcorm_test;

pub use bcorm_core::{init_tracing, ConfigError, ConfigProperties, OrmConfig};
pub use bcorm_data::{Entity, EntityManager, Mapper, OrmError};

#[cfg(all(feature = "http", feature = "entities"))]
mod configuration;

#[cfg(all(feature = "http", feature = "entities"))]
pub use configuration::{BootstrapError, Configuration};

/// Unified prelude: `use bcorm::prelude::*`.
pub mod prelude {
    pub use bcorm_core::prelude::*;
    pub use bcorm_data::prelude::*;
    pub use bcorm_events::prelude::*;

    #[cfg(feature = "http")]
    pub use bcorm_http::prelude::*;

    #[cfg(feature = "entities")]
    pub use bcorm_entities::prelude::*;

    #[cfg(all(feature = "http", feature = "entities"))]
    pub use crate::{BootstrapError, Configuration};
}
