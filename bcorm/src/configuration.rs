use std::fmt;
use std::sync::Arc;

use bcorm_core::{ConfigError, OrmConfig};
use bcorm_data::{ClientError, EntityManager, Mapper};
use bcorm_entities::register_all;
use bcorm_events::EventBus;
use bcorm_http::{ClientConfig, HttpClient};
use tracing::info;

/// Failure to assemble an [`EntityManager`] from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapError {
    /// The `bigcommerce` section is missing keys or failed validation.
    Config(ConfigError),
    /// The HTTP client could not be built from the section.
    Client(ClientError),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => fmt::Display::fmt(err, f),
            BootstrapError::Client(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Client(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<ClientError> for BootstrapError {
    fn from(err: ClientError) -> Self {
        BootstrapError::Client(err)
    }
}

/// Builds a ready [`EntityManager`]: a reqwest client for the configured
/// store, a mapper knowing every BigCommerce entity, and optionally an
/// [`EventBus`] receiving `entity.created` / `entity.updated`.
#[derive(Debug, Clone)]
pub struct Configuration {
    client: ClientConfig,
    events: Option<EventBus>,
}

impl Configuration {
    pub fn new(client: ClientConfig) -> Self {
        Self { client, events: None }
    }

    /// Read the `bigcommerce` section of a loaded config.
    pub fn from_config(config: &OrmConfig) -> Result<Self, BootstrapError> {
        Ok(Self::new(ClientConfig::load(config)?))
    }

    /// Load `bcorm.yaml` for `profile` and read its `bigcommerce` section.
    pub fn load(profile: &str) -> Result<Self, BootstrapError> {
        let config = OrmConfig::load(profile)?;
        Self::from_config(&config)
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    pub fn entity_manager(&self) -> Result<EntityManager, BootstrapError> {
        let client = HttpClient::new(self.client.clone())?;
        let mapper = Mapper::new();
        register_all(&mapper);

        info!(
            api_url = client.api_url(),
            entities = mapper.registry().len(),
            events = self.events.is_some(),
            "Entity manager configured"
        );
        let mut em = EntityManager::new(Arc::new(client)).with_mapper(mapper);
        if let Some(bus) = &self.events {
            em = em.with_event_dispatcher(Arc::new(bus.clone()));
        }
        Ok(em)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_manager_from_oauth_settings() {
        let configuration = Configuration::new(ClientConfig::oauth("client", "token", "e8cmoa"));
        let em = configuration.entity_manager().unwrap();
        assert!(!em.has_event_dispatcher());
        assert_eq!(em.mapper().registry().len(), 28);
        assert!(em.mapper().object("Checkout").is_ok());
    }

    #[test]
    fn test_event_bus_is_wired() {
        let configuration = Configuration::new(ClientConfig::basic("https://store.example.com", "admin", "key"))
            .with_event_bus(EventBus::new());
        assert!(configuration.event_bus().is_some());
        assert!(configuration.entity_manager().unwrap().has_event_dispatcher());
    }

    #[test]
    fn test_missing_credentials_is_client_error() {
        let mut config = ClientConfig::oauth("client", "token", "e8cmoa");
        config.store_hash = None;
        let err = Configuration::new(config).entity_manager().unwrap_err();
        assert!(matches!(err, BootstrapError::Client(ClientError::Config(_))));
    }
}
