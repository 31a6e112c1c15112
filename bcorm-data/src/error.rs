use std::fmt;
use std::sync::Arc;

/// Errors raised while translating between entity types and wire maps.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperError {
    /// No entity type is registered under the given name.
    UnknownEntity(String),
    /// The entity type declares no `#[resource(...)]`.
    MissingResource(&'static str),
    /// A `{placeholder}` in the resource path could not be filled.
    UnresolvedPath { path: String, param: String },
    /// The entity has no property with the given name.
    UnknownProperty { entity: &'static str, property: String },
    /// A wire value could not be coerced into the property type.
    Coercion { property: String, message: String },
    /// A boxed entity was not of the expected concrete type.
    TypeMismatch { expected: &'static str, found: &'static str },
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperError::UnknownEntity(name) => write!(f, "Unknown entity type: {name}"),
            MapperError::MissingResource(entity) => {
                write!(f, "Entity {entity} does not declare a resource")
            }
            MapperError::UnresolvedPath { path, param } => {
                write!(f, "Unable to resolve parameter '{param}' in resource path {path}")
            }
            MapperError::UnknownProperty { entity, property } => {
                write!(f, "Entity {entity} has no property '{property}'")
            }
            MapperError::Coercion { property, message } => {
                write!(f, "Invalid value for '{property}': {message}")
            }
            MapperError::TypeMismatch { expected, found } => {
                write!(f, "Expected entity {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for MapperError {}

/// Guard-clause and persistence errors raised by the entity manager.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityError {
    MissingEntity,
    EmptyClassName,
    InvalidId,
    /// Required fields left unset, by wire name.
    RequiredFields(Vec<String>),
    /// Fields whose validation rule failed, as `field: Rule`.
    RequiredValidations(Vec<String>),
    /// Nothing writable to send on create.
    EmptyWritableData,
    /// A declared upload path does not exist on disk.
    InvalidUploadFile(String),
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::MissingEntity => write!(f, "Entity must be provided"),
            EntityError::EmptyClassName => write!(f, "Entity type name must not be empty"),
            EntityError::InvalidId => write!(f, "Entity id must be a non-empty value"),
            EntityError::RequiredFields(fields) => {
                write!(f, "Missing required fields: {}", fields.join(", "))
            }
            EntityError::RequiredValidations(fields) => {
                write!(f, "Failed validations: {}", fields.join(", "))
            }
            EntityError::EmptyWritableData => {
                write!(f, "Entity has no writable data to send")
            }
            EntityError::InvalidUploadFile(location) => {
                write!(f, "Upload file does not exist: {location}")
            }
        }
    }
}

impl std::error::Error for EntityError {}

/// Malformed relation values met while auto-loading.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerError {
    InvalidOneRelationValue(String),
    InvalidManyRelationValue(String),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::InvalidOneRelationValue(value) => write!(
                f,
                "Value of OneRelation field must be int|string. Provided value: {value}"
            ),
            HandlerError::InvalidManyRelationValue(value) => write!(
                f,
                "Value of ManyRelation field must be int|string, or array of int|string. Provided value: {value}"
            ),
        }
    }
}

impl std::error::Error for HandlerError {}

/// Network or I/O failure behind a request, kept with its source error.
///
/// Two transport errors compare equal when their messages do.
#[derive(Debug, Clone)]
pub struct TransportError(Arc<dyn std::error::Error + Send + Sync>);

impl TransportError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    /// A failure described by a message only.
    pub fn msg(message: impl Into<String>) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync> = message.into().into();
        Self(Arc::from(boxed))
    }

    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for TransportError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

/// Errors surfaced by an [`ApiClient`](crate::client::ApiClient) implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request could not be built or sent.
    Transport(TransportError),
    /// The API answered with a non-success status.
    Status { status: u16, body: String },
    /// The response body was not the expected JSON shape.
    Decode(String),
    /// Client configuration is invalid.
    Config(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(err) => write!(f, "Transport error: {err}"),
            ClientError::Status { status, body } => {
                write!(f, "API responded with status {status}: {body}")
            }
            ClientError::Decode(msg) => write!(f, "Invalid API response: {msg}"),
            ClientError::Config(msg) => write!(f, "Client configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(err) => Some(err.get_ref()),
            _ => None,
        }
    }
}

/// Unified error for every entity manager operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OrmError {
    Mapper(MapperError),
    Entity(EntityError),
    Handler(HandlerError),
    Client(ClientError),
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::Mapper(err) => fmt::Display::fmt(err, f),
            OrmError::Entity(err) => fmt::Display::fmt(err, f),
            OrmError::Handler(err) => fmt::Display::fmt(err, f),
            OrmError::Client(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for OrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrmError::Mapper(err) => Some(err),
            OrmError::Entity(err) => Some(err),
            OrmError::Handler(err) => Some(err),
            OrmError::Client(err) => Some(err),
        }
    }
}

impl From<MapperError> for OrmError {
    fn from(err: MapperError) -> Self {
        OrmError::Mapper(err)
    }
}

impl From<EntityError> for OrmError {
    fn from(err: EntityError) -> Self {
        OrmError::Entity(err)
    }
}

impl From<HandlerError> for OrmError {
    fn from(err: HandlerError) -> Self {
        OrmError::Handler(err)
    }
}

impl From<ClientError> for OrmError {
    fn from(err: ClientError) -> Self {
        OrmError::Client(err)
    }
}
