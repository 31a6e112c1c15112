use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde_json::Value;

use crate::descriptor::ResourceKind;
use crate::error::ClientError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A file sent as a multipart part on create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Wire field name of the part.
    pub field: String,
    pub path: PathBuf,
}

/// Target of one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub kind: ResourceKind,
    /// Path relative to the root of `kind`, possibly with a query string.
    pub path: String,
    /// Payment access token of payment resources.
    pub access_token: Option<String>,
}

impl Endpoint {
    /// A path under the store's REST API.
    pub fn api(path: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Api,
            path: path.into(),
            access_token: None,
        }
    }

    /// A path under the payment processing API.
    pub fn payment(path: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            kind: ResourceKind::Payment,
            path: path.into(),
            access_token,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// HTTP capability consumed by the entity manager.
///
/// Implementations resolve an [`Endpoint`] against the root of its kind and
/// unwrap the API's `data` envelope: `find` resolves to a single object (or
/// `Null` when nothing matched), the collection calls to the list of objects.
pub trait ApiClient: Send + Sync + 'static {
    fn find<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Value, ClientError>>;

    fn find_all<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Vec<Value>, ClientError>>;

    fn find_by<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Vec<Value>, ClientError>>;

    /// Total number of resources behind a collection endpoint.
    fn count<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<u64, ClientError>>;

    fn create<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        data: Value,
        files: Vec<UploadFile>,
    ) -> BoxFuture<'a, Result<Value, ClientError>>;

    fn update<'a>(&'a self, endpoint: &'a Endpoint, data: Value) -> BoxFuture<'a, Result<Value, ClientError>>;

    fn delete<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<bool, ClientError>>;
}
