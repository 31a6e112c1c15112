use std::collections::HashMap;
use std::path::Path;

use super::value::{yaml_key, ConfigValue};
use super::ConfigError;

/// Flatten a YAML file into the values map. A missing file is not an error.
pub(crate) fn load_yaml_file(path: &Path, values: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    if !path.exists() {
        tracing::trace!(path = %path.display(), "Config file not present, skipping");
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(())
}

pub(crate) fn load_yaml_str(content: &str, values: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
///
/// Sequences are stored whole under their key and element-wise under
/// `key.0`, `key.1`, ...
pub(crate) fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                flatten_yaml(&join(&yaml_key(k)), v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) if !prefix.is_empty() => {
            out.insert(
                prefix.to_string(),
                ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
            );
            for (i, item) in seq.iter().enumerate() {
                flatten_yaml(&join(&i.to_string()), item, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}
