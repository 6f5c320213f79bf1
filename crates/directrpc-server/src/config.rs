//! Router and cache configuration.
//!
//! Builder-style configuration with `validate()`, checked once when the
//! router or cache is constructed.

use directrpc_common::{DirectError, ErrorKind};
use std::collections::HashMap;

/// Message sent for failed calls when nothing more specific is configured.
pub const DEFAULT_EXCEPTION_MESSAGE: &str = "Server Error";

/// Default number of rendered API descriptors kept in memory.
pub const DEFAULT_API_CACHE_CAPACITY: usize = 64;

const MAX_API_CACHE_CAPACITY: usize = 65_536;

/// How the router reports failed calls and serializes operations.
///
/// # Exception Messages
///
/// The message of an exception response is chosen as follows:
///
/// 1. an entry in `exception_messages` for the error's kind; an entry of
///    `None` sends the error text itself
/// 2. the error text, when `send_exception_message` is set
/// 3. `default_exception_message`
///
/// # Example
///
/// ```
/// use directrpc_common::ErrorKind;
/// use directrpc_server::RouterConfig;
///
/// let config = RouterConfig::new()
///     .with_exception_message(ErrorKind::MissingParameter, Some("Incomplete request".into()))
///     .with_send_stacktrace(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub default_exception_message: String,
    pub send_exception_message: bool,
    /// Fill the `where` field of exception responses with error details
    pub send_stacktrace: bool,
    pub exception_messages: HashMap<ErrorKind, Option<String>>,
    /// Serialize every operation on the caller's session
    pub synchronize_on_session: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_exception_message: DEFAULT_EXCEPTION_MESSAGE.to_string(),
            send_exception_message: false,
            send_stacktrace: false,
            exception_messages: HashMap::new(),
            synchronize_on_session: false,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_exception_message(mut self, message: impl Into<String>) -> Self {
        self.default_exception_message = message.into();
        self
    }

    pub fn with_send_exception_message(mut self, send: bool) -> Self {
        self.send_exception_message = send;
        self
    }

    pub fn with_send_stacktrace(mut self, send: bool) -> Self {
        self.send_stacktrace = send;
        self
    }

    /// Maps an error kind to a fixed message, or to the error text with `None`.
    pub fn with_exception_message(mut self, kind: ErrorKind, message: Option<String>) -> Self {
        self.exception_messages.insert(kind, message);
        self
    }

    pub fn with_synchronize_on_session(mut self, synchronize: bool) -> Self {
        self.synchronize_on_session = synchronize;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the default exception message is blank.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_exception_message.trim().is_empty() {
            return Err("default exception message must not be blank".to_string());
        }
        Ok(())
    }

    /// Message reported for `error`.
    pub fn message_for(&self, error: &DirectError) -> String {
        match self.exception_messages.get(&error.kind()) {
            Some(Some(message)) => message.clone(),
            Some(None) => error.to_string(),
            None if self.send_exception_message => error.to_string(),
            None => self.default_exception_message.clone(),
        }
    }

    /// Diagnostic detail reported for `error`, if enabled.
    pub fn location_for(&self, error: &DirectError) -> Option<String> {
        self.send_stacktrace.then(|| format!("{:?}", error))
    }
}

/// Capacity of the API descriptor cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCacheConfig {
    /// Maximum number of rendered descriptors kept; least recently used
    /// entries are evicted beyond it
    pub capacity: usize,
}

impl Default for ApiCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_API_CACHE_CAPACITY,
        }
    }
}

impl ApiCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - capacity is zero
    /// - capacity exceeds 65536
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("api cache capacity must be greater than zero".to_string());
        }
        if self.capacity > MAX_API_CACHE_CAPACITY {
            return Err(format!(
                "api cache capacity must be <= {} (got {})",
                MAX_API_CACHE_CAPACITY, self.capacity
            ));
        }
        Ok(())
    }
}
