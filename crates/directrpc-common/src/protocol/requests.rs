//! directrpc Request Types
//!
//! This module defines the inbound call envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{DirectError, Result};

/// Transaction id chosen by the client; echoed back in the response.
pub type Tid = u64;

/// The only call type this core dispatches.
pub const RPC_CALL_TYPE: &str = "rpc";

fn default_call_type() -> String {
    RPC_CALL_TYPE.to_string()
}

/// One remote invocation as sent by the client.
///
/// # Wire Format
///
/// ```json
/// {"action": "bookService", "method": "read", "tid": 3, "type": "rpc",
///  "data": [{"page": 1, "limit": 25}], "metadata": {"tenant": "acme"}}
/// ```
///
/// `data` is an array for positional, store, tree and form-load calls, a map
/// for named calls, and may be absent (`null`) for operations without payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallEnvelope {
    /// Name of the handler the operation belongs to
    pub action: String,
    /// Name of the operation to invoke
    pub method: String,
    /// Client transaction id
    pub tid: Tid,
    /// Call type, `"rpc"` for every call handled here
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    /// Loosely typed payload
    #[serde(default)]
    pub data: Value,
    /// Out-of-band call metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CallEnvelope {
    pub fn new(action: impl Into<String>, method: impl Into<String>, tid: Tid, data: Value) -> Self {
        CallEnvelope {
            action: action.into(),
            method: method.into(),
            tid,
            call_type: default_call_type(),
            data,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The payload as an ordered list, if it is one.
    pub fn data_list(&self) -> Option<&Vec<Value>> {
        self.data.as_array()
    }

    /// The payload as a named map, if it is one.
    pub fn data_map(&self) -> Option<&Map<String, Value>> {
        self.data.as_object()
    }

    /// Looks up one metadata entry.
    pub fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(name))
    }

    pub fn is_rpc(&self) -> bool {
        self.call_type == RPC_CALL_TYPE
    }

    /// Parses a request body holding either one envelope or a batch.
    ///
    /// # Errors
    ///
    /// Returns `DirectError::JsonSerialization` when the body is not valid JSON
    /// or an element does not have the envelope shape, and
    /// `DirectError::InvalidRequest` for a body that is neither an object nor
    /// an array.
    pub fn parse_batch(body: &str) -> Result<Vec<CallEnvelope>> {
        let value: Value = serde_json::from_str(body)?;
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(DirectError::from))
                .collect(),
            Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
            other => Err(DirectError::InvalidRequest(format!(
                "expected a call envelope or a batch, got {}",
                other
            ))),
        }
    }
}
