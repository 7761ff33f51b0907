use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Method, Uri};
use serde_json::Value;
use std::collections::HashMap;

use crate::gates::types::Dispatch;

/// Values gates attach to a request. Handed to handlers as a request
/// extension once every gate has passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateState(HashMap<String, Value>);

impl GateState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a gate can see of the request it is deciding on.
#[derive(Debug, Clone)]
pub struct GateContext {
    dispatch: Dispatch,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: HashMap<String, String>,
    state: GateState,
}

impl GateContext {
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            state: GateState::default(),
        }
    }

    pub fn from_parts(dispatch: Dispatch, parts: &Parts, params: HashMap<String, String>) -> Self {
        Self {
            dispatch,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            params,
            state: GateState::default(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A path parameter captured by the matched route, e.g. `id` for `/users/{id}`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The token of an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GateState {
        &mut self.state
    }

    pub fn into_state(self) -> GateState {
        self.state
    }
}
