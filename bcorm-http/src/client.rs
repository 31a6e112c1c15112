use std::time::Duration;

use bcorm_data::{ApiClient, BoxFuture, ClientError, Endpoint, ResourceKind, TransportError, UploadFile};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, trace};

use crate::cache::ResponseCache;
use crate::config::{ClientConfig, Credentials, CONTENT_TYPE_BCV1, CONTENT_TYPE_WWW};

/// [`ApiClient`] speaking to the BigCommerce v3 REST API over reqwest.
///
/// Responses are unwrapped from the API's `{"data": ..., "meta": ...}`
/// envelope. GET responses go through a [`ResponseCache`] when
/// `bigcommerce.cache.ttl` is positive.
///
/// Payment endpoints go to the payment processing API instead, with the
/// endpoint's access token as `Authorization: PAT <token>` and no store
/// credentials.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Credentials,
    auth_headers: HeaderMap,
    api_url: String,
    payment_url: Option<String>,
    cache: ResponseCache,
}

fn transport(err: reqwest::Error) -> ClientError {
    ClientError::Transport(TransportError::new(err))
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let credentials = config.credentials()?;
        let api_url = config.api_url()?;
        let payment_url = config.payment_url();

        let mut headers = HeaderMap::new();
        let accept = HeaderValue::from_str(&config.accept)
            .map_err(|e| ClientError::Config(format!("invalid accept header: {e}")))?;
        headers.insert(ACCEPT, accept);
        let mut auth_headers = HeaderMap::new();
        for (name, value) in config.auth_headers() {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ClientError::Config(format!("invalid {name} header: {e}")))?;
            auth_headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify);
        // Only `bigcommerce.proxy` routes traffic through a proxy.
        builder = match &config.proxy {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| ClientError::Config(format!("invalid proxy '{proxy}': {e}")))?,
            ),
            None => builder.no_proxy(),
        };
        let http = builder
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        debug!(%api_url, "BigCommerce client ready");
        Ok(Self {
            http,
            cache: ResponseCache::new(Duration::from_secs(config.cache_ttl)),
            config,
            credentials,
            auth_headers,
            api_url,
            payment_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn payment_url(&self) -> Option<&str> {
        self.payment_url.as_deref()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn url(&self, endpoint: &Endpoint) -> Result<String, ClientError> {
        let root = match endpoint.kind {
            ResourceKind::Api => self.api_url.as_str(),
            ResourceKind::Payment => self.payment_url.as_deref().ok_or_else(|| {
                ClientError::Config("payment resources need an OAuth store.hash".into())
            })?,
        };
        let path = &endpoint.path;
        Ok(if path.starts_with('/') {
            format!("{root}{path}")
        } else {
            format!("{root}/{path}")
        })
    }

    fn request(&self, method: Method, endpoint: &Endpoint) -> Result<RequestBuilder, ClientError> {
        let request = self.http.request(method, self.url(endpoint)?);
        match endpoint.kind {
            ResourceKind::Payment => {
                let token = endpoint.access_token.as_deref().ok_or_else(|| {
                    ClientError::Config(format!("payment request to {endpoint} without an access token"))
                })?;
                Ok(request
                    .header(ACCEPT, CONTENT_TYPE_BCV1)
                    .header(AUTHORIZATION, format!("PAT {token}")))
            }
            ResourceKind::Api => Ok(match &self.credentials {
                Credentials::Basic {
                    username, api_key, ..
                } => request.basic_auth(username, Some(api_key)),
                Credentials::OAuth { .. } => request.headers(self.auth_headers.clone()),
            }),
        }
    }

    fn with_body(&self, endpoint: &Endpoint, request: RequestBuilder, data: &Value) -> RequestBuilder {
        if endpoint.kind == ResourceKind::Api && self.config.is_form_encoded() {
            request
                .header(CONTENT_TYPE, CONTENT_TYPE_WWW)
                .body(form_encode(data))
        } else {
            request.json(data)
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let request = request.build().map_err(transport)?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "Sending request");

        let response = self.http.execute(request).await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        debug!(%method, %url, status = status.as_u16(), "Received response");
        if self.config.debug {
            debug!(body = %text, "Response body");
        }

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        decode_body(&text)
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Value, ClientError> {
        let url = self.url(endpoint)?;
        if let Some(hit) = self.cache.get(&url) {
            trace!(%url, "Response cache hit");
            return Ok(hit);
        }
        let body = self.send(self.request(Method::GET, endpoint)?).await?;
        self.cache.insert(url, body.clone());
        Ok(body)
    }

    async fn write(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let body = self.send(request).await;
        self.cache.clear();
        body
    }
}

impl ApiClient for HttpClient {
    fn find<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Value, ClientError>> {
        Box::pin(async move { Ok(first_item(unwrap_data(self.get(endpoint).await?))) })
    }

    fn find_all<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Vec<Value>, ClientError>> {
        Box::pin(async move { Ok(into_items(unwrap_data(self.get(endpoint).await?))) })
    }

    fn find_by<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Vec<Value>, ClientError>> {
        Box::pin(async move { Ok(into_items(unwrap_data(self.get(endpoint).await?))) })
    }

    fn count<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<u64, ClientError>> {
        Box::pin(async move {
            let body = self.get(endpoint).await?;
            total_count(&body).ok_or_else(|| {
                ClientError::Decode(format!("no pagination total in response of {endpoint}"))
            })
        })
    }

    fn create<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        data: Value,
        files: Vec<UploadFile>,
    ) -> BoxFuture<'a, Result<Value, ClientError>> {
        Box::pin(async move {
            let request = self.request(Method::POST, endpoint)?;
            let request = if files.is_empty() {
                self.with_body(endpoint, request, &data)
            } else {
                request.multipart(multipart_form(&data, &files).await?)
            };
            Ok(unwrap_data(self.write(request).await?))
        })
    }

    fn update<'a>(&'a self, endpoint: &'a Endpoint, data: Value) -> BoxFuture<'a, Result<Value, ClientError>> {
        Box::pin(async move {
            let request = self.with_body(endpoint, self.request(Method::PUT, endpoint)?, &data);
            Ok(unwrap_data(self.write(request).await?))
        })
    }

    fn delete<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<bool, ClientError>> {
        Box::pin(async move {
            self.write(self.request(Method::DELETE, endpoint)?).await?;
            Ok(true)
        })
    }
}

/// Empty bodies (204 No Content) decode to `Null`.
fn decode_body(text: &str) -> Result<Value, ClientError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

fn first_item(value: Value) -> Value {
    match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn total_count(body: &Value) -> Option<u64> {
    body.pointer("/meta/pagination/total")
        .and_then(Value::as_u64)
        .or_else(|| body.get("data").and_then(Value::as_array).map(|items| items.len() as u64))
}

/// Scalars as their plain text, nested values as JSON.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn form_encode(data: &Value) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Value::Object(map) = data {
        for (key, value) in map {
            serializer.append_pair(key, &text_of(value));
        }
    }
    serializer.finish()
}

async fn multipart_form(data: &Value, files: &[UploadFile]) -> Result<Form, ClientError> {
    let mut form = Form::new();
    if let Value::Object(map) = data {
        for (key, value) in map {
            form = form.text(key.clone(), text_of(value));
        }
    }
    for file in files {
        let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
            let err = std::io::Error::new(e.kind(), format!("unable to read {}: {e}", file.path.display()));
            ClientError::Transport(TransportError::new(err))
        })?;
        let file_name = file
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.field.clone());
        form = form.part(file.field.clone(), Part::bytes(bytes).file_name(file_name));
    }
    Ok(form)
}
