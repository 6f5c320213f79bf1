//! Declared types, operation kinds and binding sources.
//!
//! Operations are registered up front instead of being discovered through
//! reflection, so every parameter carries a [`ParamType`] describing the
//! shape the invocation layer expects. The resolver converts the loosely
//! typed JSON payload towards that shape.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::ambient::AmbientKind;

/// Declared type of an operation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Any JSON value, passed through untouched
    Any,
    Bool,
    Integer,
    Float,
    Text,
    /// A named record type; see `RecordSchema` for field coercion
    Record(String),
    List(Box<ParamType>),
    Array(Box<ParamType>),
    /// String-keyed map with values of the given type
    Map(Box<ParamType>),
    /// Optional wrapper: absent values resolve to "empty" instead of failing
    Optional(Box<ParamType>),
    /// Type variable bound by the handler type or one of its ancestors
    Generic(String),
    /// The canonical store read request
    StoreRead,
    /// A context type resolved without looking at the payload
    Ambient(AmbientKind),
}

impl ParamType {
    pub fn record(name: impl Into<String>) -> Self {
        ParamType::Record(name.into())
    }

    pub fn list(element: ParamType) -> Self {
        ParamType::List(Box::new(element))
    }

    pub fn array(element: ParamType) -> Self {
        ParamType::Array(Box::new(element))
    }

    pub fn map(value: ParamType) -> Self {
        ParamType::Map(Box::new(value))
    }

    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    pub fn generic(var: impl Into<String>) -> Self {
        ParamType::Generic(var.into())
    }

    /// `true` for list and array types.
    pub fn is_collection(&self) -> bool {
        matches!(self, ParamType::List(_) | ParamType::Array(_))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ParamType::Optional(_))
    }

    /// The type with one optional wrapper removed.
    pub fn inner(&self) -> &ParamType {
        match self {
            ParamType::Optional(inner) => inner,
            other => other,
        }
    }

    /// Element type of a collection, array or optional-wrapped collection.
    ///
    /// For an optional wrapper around a scalar the wrapped type is returned.
    pub fn element_type(&self) -> Option<&ParamType> {
        match self {
            ParamType::List(element) | ParamType::Array(element) => Some(element),
            ParamType::Optional(inner) => inner.element_type().or(Some(inner)),
            _ => None,
        }
    }

    /// `true` when the type still mentions an unbound type variable.
    pub fn has_generics(&self) -> bool {
        match self {
            ParamType::Generic(_) => true,
            ParamType::List(t) | ParamType::Array(t) | ParamType::Map(t) | ParamType::Optional(t) => {
                t.has_generics()
            }
            _ => false,
        }
    }

    /// Replaces type variables using `lookup`; unbound variables are kept.
    pub fn substitute<F>(&self, lookup: &F) -> ParamType
    where
        F: Fn(&str) -> Option<ParamType>,
    {
        match self {
            ParamType::Generic(var) => lookup(var.as_str()).unwrap_or_else(|| self.clone()),
            ParamType::List(t) => ParamType::List(Box::new(t.substitute(lookup))),
            ParamType::Array(t) => ParamType::Array(Box::new(t.substitute(lookup))),
            ParamType::Map(t) => ParamType::Map(Box::new(t.substitute(lookup))),
            ParamType::Optional(t) => ParamType::Optional(Box::new(t.substitute(lookup))),
            other => other.clone(),
        }
    }

    /// `true` when `value` already has this shape and needs no conversion.
    ///
    /// Record types never match: their values always go through the codec so
    /// registered schemas are applied.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::Any | ParamType::Generic(_) => true,
            ParamType::Bool => value.is_boolean(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Float => value.is_number(),
            ParamType::Text => value.is_string(),
            ParamType::List(element) | ParamType::Array(element) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| element.matches(item))),
            ParamType::Map(element) => value
                .as_object()
                .is_some_and(|map| map.values().all(|item| element.matches(item))),
            ParamType::Optional(inner) => value.is_null() || inner.matches(value),
            ParamType::Record(_) | ParamType::StoreRead | ParamType::Ambient(_) => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "Object"),
            ParamType::Bool => write!(f, "Boolean"),
            ParamType::Integer => write!(f, "Integer"),
            ParamType::Float => write!(f, "Float"),
            ParamType::Text => write!(f, "String"),
            ParamType::Record(name) => write!(f, "{}", name),
            ParamType::List(t) => write!(f, "List<{}>", t),
            ParamType::Array(t) => write!(f, "{}[]", t),
            ParamType::Map(t) => write!(f, "Map<String, {}>", t),
            ParamType::Optional(t) => write!(f, "Optional<{}>", t),
            ParamType::Generic(var) => write!(f, "{}", var),
            ParamType::StoreRead => write!(f, "StoreReadRequest"),
            ParamType::Ambient(kind) => write!(f, "{}", kind.type_name()),
        }
    }
}

/// Call shape of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Plain call, payload consumed positionally
    Positional,
    /// Named-parameter call, payload is a map
    Named,
    FormLoad,
    StoreRead,
    StoreModify,
    TreeLoad,
    /// Form submission forwarded to a path, not resolved from JSON
    FormPost,
    Poll,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Positional => "POSITIONAL",
            OperationKind::Named => "NAMED",
            OperationKind::FormLoad => "FORM_LOAD",
            OperationKind::StoreRead => "STORE_READ",
            OperationKind::StoreModify => "STORE_MODIFY",
            OperationKind::TreeLoad => "TREE_LOAD",
            OperationKind::FormPost => "FORM_POST",
            OperationKind::Poll => "POLL",
        };
        f.write_str(name)
    }
}

/// Where a parameter's value comes from. Exactly one per parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingSource {
    Ambient,
    Header,
    Cookie,
    Principal,
    Metadata,
    Body,
}

impl BindingSource {
    /// Word used in missing-parameter messages.
    pub fn origin(&self) -> &'static str {
        match self {
            BindingSource::Ambient => "ambient value",
            BindingSource::Header => "header",
            BindingSource::Cookie => "cookie",
            BindingSource::Principal => "principal",
            BindingSource::Metadata => "metadata",
            BindingSource::Body => "parameter",
        }
    }
}
