use bcorm_core::config::{
    validate_section, ConfigError, ConfigProperties, ConfigValue, DefaultSecretResolver, OrmConfig,
};
use serial_test::serial;

#[test]
fn test_empty_config() {
    let config = OrmConfig::empty();
    assert!(matches!(config.get::<String>("nonexistent"), Err(ConfigError::NotFound(_))));
}

#[test]
fn test_set_and_get() {
    let mut config = OrmConfig::empty();
    config.set("bigcommerce.store.hash", ConfigValue::String("e8cmoa".into()));
    assert_eq!(config.get::<String>("bigcommerce.store.hash").unwrap(), "e8cmoa");
    assert_eq!(config.get_or("bigcommerce.timeout", 60u64), 60);
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
bigcommerce:
  api:
    version: v3
  timeout: 30
  verify: false
  headers:
    - "X-Test: 1"
"#;
    let config = OrmConfig::from_yaml_str(yaml, "test").unwrap();
    assert_eq!(config.get::<String>("bigcommerce.api.version").unwrap(), "v3");
    assert_eq!(config.get::<u64>("bigcommerce.timeout").unwrap(), 30);
    assert!(!config.get::<bool>("bigcommerce.verify").unwrap());
    assert_eq!(config.get::<String>("bigcommerce.headers.0").unwrap(), "X-Test: 1");
    let headers: Vec<String> = config.get("bigcommerce.headers").unwrap();
    assert_eq!(headers, vec!["X-Test: 1"]);
}

#[test]
fn test_type_mismatch() {
    let config = OrmConfig::from_yaml_str("bigcommerce:\n  timeout: soon\n", "test").unwrap();
    assert_eq!(
        config.get::<u64>("bigcommerce.timeout"),
        Err(ConfigError::TypeMismatch {
            key: "bigcommerce.timeout".into(),
            expected: "i64",
        })
    );
}

// --- ConfigProperties derive ---

#[derive(bcorm_macros::ConfigProperties, Clone, Debug)]
#[config(prefix = "store")]
struct StoreConfig {
    /// Store hash
    hash: String,
    #[config(default = 60)]
    timeout: u64,
    #[config(default = "v3")]
    version: String,
    proxy: Option<String>,
}

#[test]
fn test_config_properties_defaults() {
    let config = OrmConfig::from_yaml_str("store:\n  hash: abc\n", "test").unwrap();
    let store = StoreConfig::from_config(&config).unwrap();
    assert_eq!(store.hash, "abc");
    assert_eq!(store.timeout, 60);
    assert_eq!(store.version, "v3");
    assert!(store.proxy.is_none());
}

#[test]
fn test_config_properties_missing_required() {
    let config = OrmConfig::empty();
    assert!(matches!(StoreConfig::from_config(&config), Err(ConfigError::NotFound(key)) if key == "store.hash"));

    let missing = validate_section::<StoreConfig>(&config);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].key, "store.hash");
    assert_eq!(missing[0].env_hint, "STORE_HASH");
    assert_eq!(missing[0].description.as_deref(), Some("Store hash"));
}

#[test]
fn test_config_properties_metadata() {
    let meta = StoreConfig::properties_metadata();
    assert_eq!(StoreConfig::prefix(), "store");
    let timeout = meta.iter().find(|m| m.key == "timeout").unwrap();
    assert!(!timeout.required);
    assert_eq!(timeout.default_value.as_deref(), Some("60"));
    assert_eq!(timeout.full_key, "store.timeout");
    let proxy = meta.iter().find(|m| m.key == "proxy").unwrap();
    assert!(!proxy.required);
    assert_eq!(proxy.type_name, "Option<String>");
}

#[derive(bcorm_macros::ConfigProperties, garde::Validate, Clone, Debug)]
#[config(prefix = "limits")]
struct LimitsConfig {
    #[config(default = 50)]
    #[garde(range(min = 1, max = 250))]
    page_size: u64,
}

#[test]
fn test_config_properties_garde_validation() {
    let config = OrmConfig::from_yaml_str("limits:\n  page_size: 500\n", "test").unwrap();
    match LimitsConfig::from_config(&config) {
        Err(ConfigError::Validation(details)) => {
            assert_eq!(details.len(), 1);
            assert_eq!(details[0].key, "limits.page_size");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    let ok = OrmConfig::from_yaml_str("limits:\n  page_size: 10\n", "test").unwrap();
    assert_eq!(LimitsConfig::from_config(&ok).unwrap().page_size, 10);
}

#[test]
fn test_with_typed_deref() {
    let config = OrmConfig::from_yaml_str("store:\n  hash: xyz\n  timeout: 5\n", "dev")
        .unwrap()
        .with_typed::<StoreConfig>()
        .unwrap();
    assert_eq!(config.hash, "xyz");
    assert_eq!(config.timeout, 5);
    assert_eq!(config.get::<String>("store.hash").unwrap(), "xyz");
    assert_eq!(config.profile(), "dev");
}

// --- File loading ---

#[test]
#[serial]
fn test_load_from_dir_with_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("bcorm.yaml"),
        "store:\n  hash: base\n  timeout: 10\n  token: \"${env:TEST_BCORM_LOADER_TOKEN}\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("bcorm-prod.yaml"), "store:\n  hash: prod\n").unwrap();

    unsafe {
        std::env::remove_var("BCORM_PROFILE");
        std::env::set_var("TEST_BCORM_LOADER_TOKEN", "secret");
        std::env::set_var("STORE_TIMEOUT", "20");
    }

    let config = OrmConfig::load_from_dir(dir.path(), "prod", &DefaultSecretResolver).unwrap();
    assert_eq!(config.profile(), "prod");
    assert_eq!(config.get::<String>("store.hash").unwrap(), "prod");
    assert_eq!(config.get::<String>("store.token").unwrap(), "secret");
    assert_eq!(config.get::<u64>("store.timeout").unwrap(), 20);

    unsafe {
        std::env::remove_var("TEST_BCORM_LOADER_TOKEN");
        std::env::remove_var("STORE_TIMEOUT");
    }
}

#[test]
#[serial]
fn test_profile_env_var_wins() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bcorm-staging.yaml"), "store:\n  hash: staging\n").unwrap();

    unsafe { std::env::set_var("BCORM_PROFILE", "staging") };
    let config = OrmConfig::load_from_dir(dir.path(), "dev", &DefaultSecretResolver).unwrap();
    unsafe { std::env::remove_var("BCORM_PROFILE") };

    assert_eq!(config.profile(), "staging");
    assert_eq!(config.get::<String>("store.hash").unwrap(), "staging");
}

#[test]
fn test_invalid_yaml_is_load_error() {
    assert!(matches!(
        OrmConfig::from_yaml_str("store: [unclosed", "test"),
        Err(ConfigError::Load(_))
    ));
}
