use thiserror::Error;

/// Broad classification of a [`DirectError`].
///
/// Configuration errors are fatal for the operation and never retried. The
/// other kinds are per-call rejections: the router turns them into an
/// exception response for that call only, leaving sibling calls of a batch
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing handler, method or operation marker, or an invalid declaration
    Configuration,
    /// A required parameter had no value and no default
    MissingParameter,
    /// A value could not be converted to the declared type
    Conversion,
    /// The envelope itself is malformed
    InvalidRequest,
    /// The invoked operation reported a failure
    Operation,
}

#[derive(Error, Debug)]
pub enum DirectError {
    #[error("No handler registered under '{0}'")]
    HandlerNotFound(String),

    #[error("Handler '{handler}' has no method '{method}'")]
    MethodNotFound { handler: String, method: String },

    #[error("Method '{handler}.{method}' has no operation marker in its type hierarchy")]
    MissingMarker { handler: String, method: String },

    #[error("Invalid operation '{handler}.{method}': {reason}")]
    InvalidOperation {
        handler: String,
        method: String,
        reason: String,
    },

    #[error("Missing {origin} '{name}' of type [{type_name}]")]
    MissingParameter {
        origin: &'static str,
        name: String,
        type_name: String,
    },

    #[error("Parameter mismatch at index {index}: no ambient match, marker or payload value")]
    UnresolvableParameter { index: usize },

    #[error("Cannot convert parameter '{name}' to [{target}]: {message}")]
    Conversion {
        name: String,
        target: String,
        message: String,
    },

    #[error("Principal of type [{actual}] is not assignable to parameter '{name}' of type [{expected}]")]
    PrincipalTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("{0} operations cannot be resolved from a JSON call")]
    UnsupportedCall(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl DirectError {
    /// Returns the classification used for exception mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectError::HandlerNotFound(_)
            | DirectError::MethodNotFound { .. }
            | DirectError::MissingMarker { .. }
            | DirectError::InvalidOperation { .. }
            | DirectError::UnresolvableParameter { .. }
            | DirectError::UnsupportedCall(_) => ErrorKind::Configuration,
            DirectError::MissingParameter { .. } => ErrorKind::MissingParameter,
            DirectError::Conversion { .. }
            | DirectError::PrincipalTypeMismatch { .. }
            | DirectError::JsonSerialization(_) => ErrorKind::Conversion,
            DirectError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            DirectError::Operation(_) => ErrorKind::Operation,
        }
    }

    /// `true` for errors that indicate a broken registration rather than a bad call.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

pub type Result<T> = std::result::Result<T, DirectError>;
