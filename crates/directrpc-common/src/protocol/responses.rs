//! directrpc Response Types
//!
//! This module defines the response envelope returned for every call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::requests::{CallEnvelope, Tid, RPC_CALL_TYPE};

/// Response type of a failed call.
pub const EXCEPTION_TYPE: &str = "exception";

/// A response for one call envelope.
///
/// # Response Flow
///
/// 1. The router receives a `CallEnvelope`
/// 2. Parameters are resolved and the operation is invoked
/// 3. The outcome becomes a `DirectResponse` of type `rpc` or `exception`
/// 4. The transport serializes the response (or the batch of them)
///
/// # Example
///
/// ```
/// use directrpc_common::{CallEnvelope, DirectResponse};
/// use serde_json::json;
///
/// let call = CallEnvelope::new("calc", "add", 7, json!([1, 2]));
/// let ok = DirectResponse::success(&call, json!(3));
/// assert!(ok.is_success());
///
/// let failed = DirectResponse::exception(&call, "Server Error", None);
/// assert!(!failed.is_success());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectResponse {
    /// `rpc` on success, `exception` on failure
    #[serde(rename = "type")]
    pub response_type: String,
    /// Transaction id of the call this response answers
    pub tid: Tid,
    /// Handler name, echoed from the call
    pub action: String,
    /// Operation name, echoed from the call
    pub method: String,
    /// Operation result (present on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message (present on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Diagnostic detail (present on failure when enabled)
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl DirectResponse {
    pub fn success(call: &CallEnvelope, result: Value) -> Self {
        DirectResponse {
            response_type: RPC_CALL_TYPE.to_string(),
            tid: call.tid,
            action: call.action.clone(),
            method: call.method.clone(),
            result: Some(result),
            message: None,
            location: None,
        }
    }

    pub fn exception(call: &CallEnvelope, message: impl Into<String>, location: Option<String>) -> Self {
        DirectResponse {
            response_type: EXCEPTION_TYPE.to_string(),
            tid: call.tid,
            action: call.action.clone(),
            method: call.method.clone(),
            result: None,
            message: Some(message.into()),
            location,
        }
    }

    pub fn is_success(&self) -> bool {
        self.response_type == RPC_CALL_TYPE
    }
}
