//! Test utilities for bcorm.
//!
//! [`MockClient`] stands in for the HTTP client: it serves canned responses
//! and records every call, so entity manager flows run without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bcorm_data::{ApiClient, BoxFuture, ClientError, Endpoint, ResourceKind, UploadFile};
use serde_json::Value;

/// The [`ApiClient`] operation a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Find,
    FindAll,
    FindBy,
    Count,
    Create,
    Update,
    Delete,
}

/// One call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    /// API the call was addressed to.
    pub resource: ResourceKind,
    pub path: String,
    pub access_token: Option<String>,
    /// Payload of create / update calls.
    pub data: Option<Value>,
    pub files: Vec<UploadFile>,
}

type Response = Result<Value, ClientError>;

#[derive(Default)]
struct State {
    queued: HashMap<CallKind, VecDeque<Response>>,
    routes: Vec<(CallKind, String, Value)>,
    calls: Vec<RecordedCall>,
}

/// In-memory [`ApiClient`].
///
/// Response lookup order for a call:
/// 1. the next queued response for its [`CallKind`],
/// 2. the route with the longest path prefix matching the call,
/// 3. a default: `Null` for find, `[]` for lists, `0` for count, the sent
///    payload for create / update, `true` for delete.
///
/// Count responses are read as `u64`, list responses as arrays (a single
/// object counts as one item).
#[derive(Default)]
pub struct MockClient {
    state: Mutex<State>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new mock behind an `Arc`, ready for `EntityManager::new`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a response for the next call of `kind`.
    pub fn push(&self, kind: CallKind, response: Value) -> &Self {
        self.state()
            .queued
            .entry(kind)
            .or_default()
            .push_back(Ok(response));
        self
    }

    /// Queue an error for the next call of `kind`.
    pub fn push_error(&self, kind: CallKind, error: ClientError) -> &Self {
        self.state()
            .queued
            .entry(kind)
            .or_default()
            .push_back(Err(error));
        self
    }

    /// Answer every `kind` call whose path starts with `prefix`.
    pub fn route(&self, kind: CallKind, prefix: impl Into<String>, response: Value) -> &Self {
        self.state().routes.push((kind, prefix.into(), response));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.kind == kind)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.state().calls.last().cloned()
    }

    /// Paths of every call, in order.
    pub fn paths(&self) -> Vec<String> {
        self.state().calls.iter().map(|call| call.path.clone()).collect()
    }

    /// Forget recorded calls and pending responses.
    pub fn reset(&self) {
        *self.state() = State::default();
    }

    fn respond(&self, call: RecordedCall) -> Option<Response> {
        let mut state = self.state();
        let kind = call.kind;
        let path = call.path.clone();
        state.calls.push(call);

        if let Some(response) = state.queued.get_mut(&kind).and_then(VecDeque::pop_front) {
            return Some(response);
        }
        state
            .routes
            .iter()
            .filter(|(route_kind, prefix, _)| *route_kind == kind && path.starts_with(prefix.as_str()))
            .max_by_key(|(_, prefix, _)| prefix.len())
            .map(|(_, _, response)| Ok(response.clone()))
    }

    fn record(kind: CallKind, endpoint: &Endpoint, data: Option<Value>, files: Vec<UploadFile>) -> RecordedCall {
        RecordedCall {
            kind,
            resource: endpoint.kind,
            path: endpoint.path.clone(),
            access_token: endpoint.access_token.clone(),
            data,
            files,
        }
    }
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClient")
            .field("calls", &self.call_count())
            .finish()
    }
}

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

impl ApiClient for MockClient {
    fn find<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Value, ClientError>> {
        let response = self.respond(Self::record(CallKind::Find, endpoint, None, Vec::new()));
        Box::pin(async move { response.unwrap_or(Ok(Value::Null)) })
    }

    fn find_all<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Vec<Value>, ClientError>> {
        let response = self.respond(Self::record(CallKind::FindAll, endpoint, None, Vec::new()));
        Box::pin(async move { response.map_or(Ok(Vec::new()), |r| r.map(into_items)) })
    }

    fn find_by<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Vec<Value>, ClientError>> {
        let response = self.respond(Self::record(CallKind::FindBy, endpoint, None, Vec::new()));
        Box::pin(async move { response.map_or(Ok(Vec::new()), |r| r.map(into_items)) })
    }

    fn count<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<u64, ClientError>> {
        let response = self.respond(Self::record(CallKind::Count, endpoint, None, Vec::new()));
        Box::pin(async move {
            match response {
                None => Ok(0),
                Some(Ok(value)) => value
                    .as_u64()
                    .ok_or_else(|| ClientError::Decode(format!("count response is not a number: {value}"))),
                Some(Err(err)) => Err(err),
            }
        })
    }

    fn create<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        data: Value,
        files: Vec<UploadFile>,
    ) -> BoxFuture<'a, Result<Value, ClientError>> {
        let response = self.respond(Self::record(CallKind::Create, endpoint, Some(data.clone()), files));
        Box::pin(async move { response.unwrap_or(Ok(data)) })
    }

    fn update<'a>(&'a self, endpoint: &'a Endpoint, data: Value) -> BoxFuture<'a, Result<Value, ClientError>> {
        let response = self.respond(Self::record(CallKind::Update, endpoint, Some(data.clone()), Vec::new()));
        Box::pin(async move { response.unwrap_or(Ok(data)) })
    }

    fn delete<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<bool, ClientError>> {
        let response = self.respond(Self::record(CallKind::Delete, endpoint, None, Vec::new()));
        Box::pin(async move {
            match response {
                None => Ok(true),
                Some(Ok(value)) => Ok(value.as_bool().unwrap_or(true)),
                Some(Err(err)) => Err(err),
            }
        })
    }
}
