use std::fmt;

use super::typed::ConfigProperties;
use super::{ConfigError, OrmConfig};

/// One unusable configuration key.
#[derive(Debug, Clone)]
pub struct MissingKeyError {
    /// Section prefix requiring the key.
    pub source: String,
    pub key: String,
    pub expected_type: String,
    /// Environment variable that would provide the key.
    pub env_hint: String,
    pub description: Option<String>,
}

impl fmt::Display for MissingKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - `{}`: key '{}' ({}), set env var `{}`",
            self.source, self.key, self.expected_type, self.env_hint
        )?;
        if let Some(desc) = &self.description {
            write!(f, " -- {desc}")?;
        }
        Ok(())
    }
}

fn env_hint(key: &str) -> String {
    key.to_uppercase().replace('.', "_")
}

/// Check a `ConfigProperties` section against a config.
///
/// Reports required keys that are absent, then, when none are, the type
/// mismatches and garde failures raised by constructing the section.
pub fn validate_section<C: ConfigProperties>(config: &OrmConfig) -> Vec<MissingKeyError> {
    let prefix = C::prefix();
    let missing: Vec<MissingKeyError> = C::properties_metadata()
        .into_iter()
        .filter(|prop| prop.required && !config.contains_key(&prop.full_key))
        .map(|prop| MissingKeyError {
            source: prefix.to_string(),
            env_hint: prop.env_var(),
            key: prop.full_key,
            expected_type: prop.type_name.to_string(),
            description: prop.description,
        })
        .collect();
    if !missing.is_empty() {
        return missing;
    }

    let error = |key: String, expected_type: &str, description: Option<String>| MissingKeyError {
        source: prefix.to_string(),
        env_hint: env_hint(&key),
        key,
        expected_type: expected_type.to_string(),
        description,
    };
    match C::from_config(config) {
        Ok(_) => Vec::new(),
        Err(ConfigError::TypeMismatch { key, expected }) => {
            vec![error(key, expected, Some(format!("type mismatch: expected {expected}")))]
        }
        Err(ConfigError::Validation(details)) => details
            .into_iter()
            .map(|d| error(d.key, "valid", Some(d.message)))
            .collect(),
        Err(ConfigError::NotFound(key)) => vec![error(key, "unknown", None)],
        Err(ConfigError::Load(message)) => vec![error(prefix.to_string(), "loadable", Some(message))],
    }
}
