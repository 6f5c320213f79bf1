//! directrpc Common Types
//!
//! This crate provides the protocol definitions shared by every part of the
//! directrpc dispatch core.
//!
//! # Overview
//!
//! directrpc lets browser clients invoke named server-side operations through
//! a JSON call protocol. A client sends one call envelope (or a batch of them)
//! naming an action (the handler) and a method (the operation), together with
//! a loosely typed `data` payload. This crate contains the wire-level model:
//!
//! - **Requests**: the inbound [`CallEnvelope`]
//! - **Responses**: the outbound [`DirectResponse`]
//! - **Store requests**: the canonical [`StoreReadRequest`] with paging,
//!   sorting, grouping and typed [`Filter`] predicates
//! - **Errors**: [`DirectError`] and its [`ErrorKind`] classification
//!
//! # Example
//!
//! ```
//! use directrpc_common::{CallEnvelope, DirectResponse};
//! use serde_json::json;
//!
//! let call = CallEnvelope::new("personAction", "showDetails", 1, json!(["Ralph", "Schaer", 40]));
//! assert_eq!(call.data_list().map(|d| d.len()), Some(3));
//!
//! let response = DirectResponse::success(&call, json!("ok"));
//! assert_eq!(response.tid, 1);
//! ```

pub mod protocol;

pub use protocol::*;
