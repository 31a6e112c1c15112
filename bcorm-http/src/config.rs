use std::time::Duration;

use bcorm_core::{ConfigError, ConfigProperties, OrmConfig};
use bcorm_data::ClientError;

pub const API_BASE_URL: &str = "https://api.bigcommerce.com";
pub const PAYMENT_BASE_URL: &str = "https://payments.bigcommerce.com";
pub const API_VERSION_V3: &str = "v3";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_WWW: &str = "application/x-www-form-urlencoded";
/// Accept header of the payment processing API.
pub const CONTENT_TYPE_BCV1: &str = "application/vnd.bc.v1+json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings of the BigCommerce client (`bigcommerce.*` keys).
///
/// Either the OAuth keys (`auth.client`, `auth.token`, `store.hash`) or the
/// Basic keys (`store.url`, `auth.username`, `auth.key`) must be set. OAuth
/// wins when both are.
///
/// ```yaml
/// bigcommerce:
///   auth:
///     client: my-client-id
///     token: ${env:BC_TOKEN}
///   store:
///     hash: e8cmoa
///   timeout: 30
/// ```
#[derive(ConfigProperties, garde::Validate, Debug, Clone, PartialEq)]
#[config(prefix = "bigcommerce")]
pub struct ClientConfig {
    /// OAuth client id
    #[config(key = "auth.client")]
    #[garde(skip)]
    pub client_id: Option<String>,
    /// OAuth access token
    #[config(key = "auth.token")]
    #[garde(skip)]
    pub auth_token: Option<String>,
    /// Store hash used in OAuth API urls
    #[config(key = "store.hash")]
    #[garde(skip)]
    pub store_hash: Option<String>,
    /// Base url of the OAuth API
    #[config(key = "api.url", default = "https://api.bigcommerce.com")]
    #[garde(custom(absolute_url))]
    pub base_url: String,
    /// Base url of the payment processing API
    #[config(key = "payment.url", default = "https://payments.bigcommerce.com")]
    #[garde(custom(absolute_url))]
    pub payment_base_url: String,
    /// Store url used by Basic auth
    #[config(key = "store.url")]
    #[garde(skip)]
    pub store_url: Option<String>,
    #[config(key = "auth.username")]
    #[garde(skip)]
    pub username: Option<String>,
    #[config(key = "auth.key")]
    #[garde(skip)]
    pub api_key: Option<String>,
    #[config(key = "api.version", default = "v3")]
    #[garde(custom(supported_api_version))]
    pub api_version: String,
    /// Request timeout in seconds
    #[config(default = 60)]
    #[garde(range(min = 1))]
    pub timeout: u64,
    /// Verify TLS certificates
    #[config(default = false)]
    #[garde(skip)]
    pub verify: bool,
    #[garde(skip)]
    pub proxy: Option<String>,
    #[config(default = "application/json")]
    #[garde(custom(supported_accept))]
    pub accept: String,
    #[config(key = "content.type", default = "application/json")]
    #[garde(custom(supported_content_type))]
    pub content_type: String,
    /// Log response bodies
    #[config(default = false)]
    #[garde(skip)]
    pub debug: bool,
    /// Seconds GET responses stay cached, 0 disables the cache
    #[config(key = "cache.ttl", default = 0)]
    #[garde(skip)]
    pub cache_ttl: u64,
}

fn absolute_url(value: &str, _: &()) -> garde::Result {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| garde::Error::new(format!("not an absolute url: {e}")))
}

fn supported_api_version(value: &str, _: &()) -> garde::Result {
    if value == API_VERSION_V3 {
        Ok(())
    } else {
        Err(garde::Error::new(format!("unsupported api version '{value}', only v3 is available")))
    }
}

fn supported_accept(value: &str, _: &()) -> garde::Result {
    if value == CONTENT_TYPE_JSON {
        Ok(())
    } else {
        Err(garde::Error::new("only application/json responses are accepted"))
    }
}

fn supported_content_type(value: &str, _: &()) -> garde::Result {
    match value {
        CONTENT_TYPE_JSON | CONTENT_TYPE_WWW => Ok(()),
        other => Err(garde::Error::new(format!("unsupported content type '{other}'"))),
    }
}

/// Resolved authentication scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    OAuth {
        client_id: String,
        auth_token: String,
        store_hash: String,
    },
    Basic {
        store_url: String,
        username: String,
        api_key: String,
    },
}

impl ClientConfig {
    fn with_defaults() -> Self {
        Self {
            client_id: None,
            auth_token: None,
            store_hash: None,
            base_url: API_BASE_URL.to_string(),
            payment_base_url: PAYMENT_BASE_URL.to_string(),
            store_url: None,
            username: None,
            api_key: None,
            api_version: API_VERSION_V3.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            verify: false,
            proxy: None,
            accept: CONTENT_TYPE_JSON.to_string(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            debug: false,
            cache_ttl: 0,
        }
    }

    /// OAuth settings with every other key at its default.
    pub fn oauth(client_id: impl Into<String>, auth_token: impl Into<String>, store_hash: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            auth_token: Some(auth_token.into()),
            store_hash: Some(store_hash.into()),
            ..Self::with_defaults()
        }
    }

    /// Basic-auth settings with every other key at its default.
    pub fn basic(store_url: impl Into<String>, username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            store_url: Some(store_url.into()),
            username: Some(username.into()),
            api_key: Some(api_key.into()),
            ..Self::with_defaults()
        }
    }

    /// Read the `bigcommerce` section of a loaded config.
    pub fn load(config: &OrmConfig) -> Result<Self, ConfigError> {
        Self::from_config(config)
    }

    pub fn credentials(&self) -> Result<Credentials, ClientError> {
        match (&self.client_id, &self.auth_token, &self.store_hash) {
            (Some(client_id), Some(auth_token), Some(store_hash)) => {
                return Ok(Credentials::OAuth {
                    client_id: client_id.clone(),
                    auth_token: auth_token.clone(),
                    store_hash: store_hash.clone(),
                })
            }
            (None, None, None) => {}
            _ => {
                return Err(ClientError::Config(
                    "OAuth credentials need auth.client, auth.token and store.hash".into(),
                ))
            }
        }
        match (&self.store_url, &self.username, &self.api_key) {
            (Some(store_url), Some(username), Some(api_key)) => Ok(Credentials::Basic {
                store_url: store_url.clone(),
                username: username.clone(),
                api_key: api_key.clone(),
            }),
            _ => Err(ClientError::Config(
                "no credentials: set OAuth (auth.client, auth.token, store.hash) or Basic (store.url, auth.username, auth.key)".into(),
            )),
        }
    }

    /// Root of every resource path, without a trailing slash.
    pub fn api_url(&self) -> Result<String, ClientError> {
        Ok(match self.credentials()? {
            Credentials::OAuth { store_hash, .. } => format!(
                "{}/stores/{store_hash}/{}",
                self.base_url.trim_end_matches('/'),
                self.api_version
            ),
            Credentials::Basic { store_url, .. } => {
                format!("{}/api/{}", store_url.trim_end_matches('/'), self.api_version)
            }
        })
    }

    /// Root of the payment processing API, only known for OAuth stores.
    pub fn payment_url(&self) -> Option<String> {
        self.store_hash
            .as_ref()
            .map(|hash| format!("{}/stores/{hash}", self.payment_base_url.trim_end_matches('/')))
    }

    /// Headers identifying the caller; empty for Basic auth.
    pub fn auth_headers(&self) -> Vec<(&'static str, String)> {
        match self.credentials() {
            Ok(Credentials::OAuth {
                client_id,
                auth_token,
                ..
            }) => vec![("X-Auth-Client", client_id), ("X-Auth-Token", auth_token)],
            _ => Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn is_form_encoded(&self) -> bool {
        self.content_type == CONTENT_TYPE_WWW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_urls_and_headers() {
        let config = ClientConfig::oauth("client", "token", "e8cmoa");
        assert_eq!(
            config.api_url().unwrap(),
            "https://api.bigcommerce.com/stores/e8cmoa/v3"
        );
        assert_eq!(
            config.payment_url().as_deref(),
            Some("https://payments.bigcommerce.com/stores/e8cmoa")
        );
        assert_eq!(
            config.auth_headers(),
            vec![
                ("X-Auth-Client", "client".to_string()),
                ("X-Auth-Token", "token".to_string())
            ]
        );
    }

    #[test]
    fn test_basic_defaults() {
        let config = ClientConfig::basic("https://store.example.com/", "username", "apiKey");
        assert_eq!(config.api_url().unwrap(), "https://store.example.com/api/v3");
        assert!(config.auth_headers().is_empty());
        assert!(config.payment_url().is_none());
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(!config.verify);
        assert!(!config.debug);
        assert_eq!(config.accept, CONTENT_TYPE_JSON);
        assert!(!config.is_form_encoded());
    }

    #[test]
    fn test_partial_oauth_is_rejected() {
        let mut config = ClientConfig::oauth("client", "token", "hash");
        config.store_hash = None;
        assert!(matches!(config.credentials(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
bigcommerce:
  auth:
    client: abc
    token: secret
  store:
    hash: e8cmoa
  payment:
    url: https://payments.example.com/
  timeout: 15
  content:
    type: application/x-www-form-urlencoded
  cache:
    ttl: 30
"#;
        let raw = OrmConfig::from_yaml_str(yaml, "test").unwrap();
        let config = ClientConfig::load(&raw).unwrap();
        assert_eq!(config.timeout, 15);
        assert_eq!(config.cache_ttl, 30);
        assert!(config.is_form_encoded());
        assert_eq!(config.api_version, "v3");
        assert_eq!(
            config.payment_url().as_deref(),
            Some("https://payments.example.com/stores/e8cmoa")
        );
        assert!(matches!(config.credentials(), Ok(Credentials::OAuth { .. })));
    }

    #[test]
    fn test_only_v3_is_accepted() {
        let raw = OrmConfig::from_yaml_str("bigcommerce:\n  api:\n    version: v2\n", "test").unwrap();
        match ClientConfig::load(&raw) {
            Err(ConfigError::Validation(details)) => {
                assert!(details.iter().any(|d| d.key == "bigcommerce.api_version"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_accept_is_rejected() {
        let raw = OrmConfig::from_yaml_str("bigcommerce:\n  accept: text/html\n", "test").unwrap();
        assert!(matches!(ClientConfig::load(&raw), Err(ConfigError::Validation(_))));
    }
}
