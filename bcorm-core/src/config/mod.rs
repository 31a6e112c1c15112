mod loader;
pub mod secrets;
pub mod typed;
pub mod validation;
pub mod value;

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub use secrets::{DefaultSecretResolver, SecretResolver};
pub use typed::{ConfigProperties, PropertyMeta};
pub use validation::{validate_section, MissingKeyError};
pub use value::{ConfigValue, FromConfigValue};

/// Environment variable selecting the active profile.
pub const PROFILE_ENV: &str = "BCORM_PROFILE";

/// A single validation failure of a typed section (garde).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    /// I/O, YAML or placeholder failure while loading.
    Load(String),
    Validation(Vec<ConfigValidationDetail>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Validation(details) => {
                write!(f, "Config validation errors:")?;
                for detail in details {
                    write!(f, "\n  - {}: {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// ORM configuration loaded from YAML files, `.env` files and the environment.
///
/// `OrmConfig` (= `OrmConfig<()>`) gives raw key access. `OrmConfig<T>`
/// adds a typed section reachable through `Deref<Target = T>`.
///
/// Resolution order (lowest to highest priority):
/// 1. `bcorm.yaml`
/// 2. `bcorm-{profile}.yaml`
/// 3. `.env`, then `.env.{profile}` (never overwriting set variables)
/// 4. Environment variables: `BIGCOMMERCE_AUTH_TOKEN` overrides `bigcommerce.auth.token`
///
/// `${...}` placeholders in string values are resolved after the files are
/// read. The profile is `BCORM_PROFILE` if set, else the argument.
#[derive(Debug, Clone)]
pub struct OrmConfig<T = ()> {
    values: HashMap<String, ConfigValue>,
    profile: String,
    typed: T,
}

impl OrmConfig {
    /// Load from [`config_dir`] with a custom secret resolver.
    pub fn load_with_resolver(profile: &str, resolver: &dyn SecretResolver) -> Result<Self, ConfigError> {
        Self::load_from_dir(&config_dir(), profile, resolver)
    }

    /// Load for a profile with the default resolver (env + file).
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_with_resolver(profile, &DefaultSecretResolver)
    }

    /// Load the config files found in `dir`.
    pub fn load_from_dir(dir: &Path, profile: &str, resolver: &dyn SecretResolver) -> Result<Self, ConfigError> {
        let active_profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());
        let mut values = HashMap::new();

        loader::load_yaml_file(&dir.join("bcorm.yaml"), &mut values)?;
        loader::load_yaml_file(&dir.join(format!("bcorm-{active_profile}.yaml")), &mut values)?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        resolve_string_values(&mut values, resolver)?;

        // `bigcommerce.auth.token` <-> `BIGCOMMERCE_AUTH_TOKEN`
        for (env_key, env_val) in std::env::vars() {
            let config_key = env_key.to_lowercase().replace('_', ".");
            values.insert(config_key, ConfigValue::String(env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "Configuration loaded");
        Ok(OrmConfig {
            values,
            profile: active_profile,
            typed: (),
        })
    }

    /// Build a config from a YAML string, without env overlay.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(OrmConfig {
            values,
            profile: profile.to_string(),
            typed: (),
        })
    }

    pub fn empty() -> Self {
        OrmConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
            typed: (),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Upgrade to a typed config by constructing `C` from the raw values.
    pub fn with_typed<C: ConfigProperties>(self) -> Result<OrmConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(OrmConfig {
            values: self.values,
            profile: self.profile,
            typed,
        })
    }
}

impl<T> OrmConfig<T> {
    /// Typed value of a dot-separated key.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// Typed section built from this config's raw values.
    pub fn section<C: ConfigProperties>(&self) -> Result<C, ConfigError> {
        C::from_config(&self.raw())
    }

    /// Downgrade to a raw config, discarding the typed layer.
    pub fn raw(&self) -> OrmConfig {
        OrmConfig {
            values: self.values.clone(),
            profile: self.profile.clone(),
            typed: (),
        }
    }
}

impl<T> Deref for OrmConfig<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.typed
    }
}

/// Default location of config files: `BCORM_CONFIG_DIR`, else the working directory.
pub fn config_dir() -> PathBuf {
    std::env::var("BCORM_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn resolve_string_values(values: &mut HashMap<String, ConfigValue>, resolver: &dyn SecretResolver) -> Result<(), ConfigError> {
    for value in values.values_mut() {
        if let ConfigValue::String(s) = value {
            if s.contains("${") {
                *s = secrets::resolve_placeholders(s, resolver)?;
            }
        }
    }
    Ok(())
}
