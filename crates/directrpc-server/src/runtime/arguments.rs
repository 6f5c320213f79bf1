//! Resolved arguments handed to an operation.

use directrpc_common::{DirectError, Result, StoreReadRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::context::{AmbientValue, Principal};

/// One resolved argument.
#[derive(Debug, Clone)]
pub enum Argument {
    /// A converted payload, header, cookie, metadata or default value
    Value(Value),
    /// Nothing was found and the parameter is not required
    Null,
    /// An optional-wrapper parameter with nothing to wrap
    Empty,
    Ambient(AmbientValue),
    Principal(Principal),
    StoreRead(StoreReadRequest),
    /// Converted records of a STORE_MODIFY call
    Records(Vec<Value>),
}

impl Argument {
    /// `true` for `Null` and `Empty`.
    pub fn is_absent(&self) -> bool {
        matches!(self, Argument::Null | Argument::Empty)
    }

    /// The argument as JSON, when it has a JSON form.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Argument::Value(value) => Some(value.clone()),
            Argument::Null | Argument::Empty => Some(Value::Null),
            Argument::Records(records) => Some(Value::Array(records.clone())),
            Argument::StoreRead(request) => serde_json::to_value(request).ok(),
            Argument::Principal(principal) => Some(Value::String(principal.name().to_string())),
            Argument::Ambient(_) => None,
        }
    }
}

/// The ordered argument list of one call.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Vec<Argument>);

impl Arguments {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self(arguments)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.0.iter()
    }

    /// Deserializes argument `index` into `T`.
    ///
    /// Absent arguments yield `None`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when `index` is out of range or the argument is an
    /// ambient value; `JsonSerialization` when the value does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>> {
        let argument = self.argument(index).ok_or_else(|| {
            DirectError::InvalidRequest(format!("no argument at index {}", index))
        })?;
        if argument.is_absent() {
            return Ok(None);
        }
        let value = argument.to_json().ok_or_else(|| {
            DirectError::InvalidRequest(format!("argument {} is an ambient value", index))
        })?;
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Like [`Arguments::get`] but an absent argument is an error.
    pub fn required<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        self.get(index)?.ok_or_else(|| {
            DirectError::InvalidRequest(format!("argument {} is absent", index))
        })
    }

    pub fn store_read(&self, index: usize) -> Option<&StoreReadRequest> {
        match self.argument(index) {
            Some(Argument::StoreRead(request)) => Some(request),
            _ => None,
        }
    }

    pub fn ambient(&self, index: usize) -> Option<&AmbientValue> {
        match self.argument(index) {
            Some(Argument::Ambient(value)) => Some(value),
            _ => None,
        }
    }

    pub fn principal(&self, index: usize) -> Option<&Principal> {
        match self.argument(index) {
            Some(Argument::Principal(principal)) => Some(principal),
            _ => None,
        }
    }

    pub fn into_vec(self) -> Vec<Argument> {
        self.0
    }
}

impl IntoIterator for Arguments {
    type Item = Argument;
    type IntoIter = std::vec::IntoIter<Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Book {
        id: i64,
        title: String,
    }

    #[test]
    fn test_typed_access() {
        let args = Arguments::new(vec![
            Argument::Value(json!(3)),
            Argument::Empty,
            Argument::Records(vec![json!({"id": 1, "title": "Dune"})]),
        ]);
        assert_eq!(args.get::<i64>(0).unwrap(), Some(3));
        assert_eq!(args.get::<String>(1).unwrap(), None);
        assert_eq!(
            args.required::<Vec<Book>>(2).unwrap(),
            vec![Book { id: 1, title: "Dune".into() }]
        );
        assert!(args.get::<i64>(5).is_err());
        assert!(args.required::<String>(1).is_err());
    }

    #[test]
    fn test_type_mismatch_is_serialization_error() {
        let args = Arguments::new(vec![Argument::Value(json!("text"))]);
        let err = args.get::<i64>(0).unwrap_err();
        assert!(matches!(err, DirectError::JsonSerialization(_)));
    }

    #[test]
    fn test_store_read_access() {
        let mut request = StoreReadRequest::new();
        request.limit = Some(10);
        let args = Arguments::new(vec![Argument::StoreRead(request)]);
        assert_eq!(args.store_read(0).and_then(|r| r.limit), Some(10));
        assert!(args.store_read(1).is_none());
    }
}
