//! Shared runtime pieces of bcorm: layered configuration and tracing setup.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigProperties, ConfigValue, OrmConfig};
pub use logging::{init_tracing, init_tracing_with};

pub use bcorm_macros::ConfigProperties;

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::config::{ConfigError, ConfigProperties, OrmConfig};
    pub use crate::init_tracing;
}
