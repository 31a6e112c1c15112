use super::{ConfigError, OrmConfig};

/// Metadata about a single configuration property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Relative key (`timeout`).
    pub key: String,
    /// Absolute key (`bigcommerce.timeout`).
    pub full_key: String,
    pub type_name: &'static str,
    /// No default and not `Option`.
    pub required: bool,
    pub default_value: Option<String>,
    /// From the field's doc comment.
    pub description: Option<String>,
    /// Nested `ConfigProperties` section.
    pub is_section: bool,
}

impl PropertyMeta {
    /// Environment variable overriding this property.
    pub fn env_var(&self) -> String {
        self.full_key.to_uppercase().replace('.', "_")
    }
}

/// Strongly-typed configuration section.
///
/// Implement via `#[derive(ConfigProperties)]`.
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (`bigcommerce`).
    fn prefix() -> &'static str;

    fn properties_metadata() -> Vec<PropertyMeta>;

    /// Construct from the section at an explicit prefix.
    fn from_config_prefixed(config: &OrmConfig, prefix: &str) -> Result<Self, ConfigError>;

    fn from_config(config: &OrmConfig) -> Result<Self, ConfigError> {
        Self::from_config_prefixed(config, Self::prefix())
    }
}
