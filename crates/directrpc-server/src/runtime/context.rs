//! Ambient request context
//!
//! Everything the transport adapter extracted from the inbound request that
//! parameters can bind to without reading the call payload: headers,
//! cookies, the session, the locale and the authenticated principal.

use directrpc_common::CallEnvelope;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// The inbound transport request, reduced to what binding needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInfo {
    pub method: String,
    pub uri: String,
    /// Header names are stored lowercased
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Outbound response headers an operation may set.
#[derive(Debug, Default)]
pub struct ResponseHandle {
    headers: Mutex<Vec<(String, String)>>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut headers = self.headers.lock().unwrap_or_else(PoisonError::into_inner);
        let name = name.into();
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        headers.push((name, value.into()));
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// A client session shared by all calls carrying the same session id.
///
/// Cloning yields another handle to the same attributes and the same
/// synchronization lock.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: String,
    attributes: Arc<RwLock<Map<String, Value>>>,
    lock: Arc<Mutex<()>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: Value) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value);
    }

    /// Serializes operations that synchronize on this session.
    pub fn synchronize(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The authenticated caller.
///
/// `type_name` is the runtime type of the principal; parameters declaring
/// a record type only receive principals of that exact type.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    name: String,
    type_name: String,
    details: Value,
}

impl Principal {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn details(&self) -> &Value {
        &self.details
    }
}

/// Per-request ambient context handed to the resolver.
#[derive(Debug, Clone)]
pub struct AmbientContext {
    request: Arc<RequestInfo>,
    response: Arc<ResponseHandle>,
    session: Option<Session>,
    principal: Option<Principal>,
    locale: String,
}

pub const DEFAULT_LOCALE: &str = "en";

impl AmbientContext {
    pub fn new(request: RequestInfo) -> Self {
        Self {
            request: Arc::new(request),
            response: Arc::new(ResponseHandle::new()),
            session: None,
            principal: None,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_response(mut self, response: Arc<ResponseHandle>) -> Self {
        self.response = response;
        self
    }

    pub fn request(&self) -> &Arc<RequestInfo> {
        &self.request
    }

    pub fn response(&self) -> &Arc<ResponseHandle> {
        &self.response
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

/// A resolved ambient argument.
#[derive(Debug, Clone)]
pub enum AmbientValue {
    Request(Arc<RequestInfo>),
    Response(Arc<ResponseHandle>),
    Session(Option<Session>),
    Locale(String),
    Principal(Option<Principal>),
    CallEnvelope(Arc<CallEnvelope>),
}
