//! Supported ambient types
//!
//! A closed set of context types that parameters can declare to receive
//! values taken from the current request instead of the call payload.

use directrpc_common::CallEnvelope;
use std::sync::Arc;

use super::context::{AmbientContext, AmbientValue};
use super::types::ParamType;

/// One of the context types an operation parameter can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmbientKind {
    Request,
    Response,
    Session,
    Locale,
    Principal,
    CallEnvelope,
}

impl AmbientKind {
    pub const ALL: [AmbientKind; 6] = [
        AmbientKind::Request,
        AmbientKind::Response,
        AmbientKind::Session,
        AmbientKind::Locale,
        AmbientKind::Principal,
        AmbientKind::CallEnvelope,
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            AmbientKind::Request => "Request",
            AmbientKind::Response => "Response",
            AmbientKind::Session => "Session",
            AmbientKind::Locale => "Locale",
            AmbientKind::Principal => "Principal",
            AmbientKind::CallEnvelope => "CallEnvelope",
        }
    }

    /// Looks a kind up by its type name.
    pub fn from_type_name(name: &str) -> Option<AmbientKind> {
        AmbientKind::ALL.into_iter().find(|kind| kind.type_name() == name)
    }
}

/// Registry of the types resolvable without looking at the payload.
pub struct SupportedAmbientTypes;

impl SupportedAmbientTypes {
    /// Returns the ambient kind a declared type maps to, if any.
    ///
    /// Optional wrappers are not looked through: an `Optional<Session>`
    /// parameter is not ambient.
    pub fn kind_of(ty: &ParamType) -> Option<AmbientKind> {
        match ty {
            ParamType::Ambient(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_supported(ty: &ParamType) -> bool {
        Self::kind_of(ty).is_some()
    }

    /// Resolves `kind` from the request context.
    pub fn resolve(kind: AmbientKind, ctx: &AmbientContext, call: &CallEnvelope) -> AmbientValue {
        match kind {
            AmbientKind::Request => AmbientValue::Request(Arc::clone(ctx.request())),
            AmbientKind::Response => AmbientValue::Response(Arc::clone(ctx.response())),
            AmbientKind::Session => AmbientValue::Session(ctx.session().cloned()),
            AmbientKind::Locale => AmbientValue::Locale(ctx.locale().to_string()),
            AmbientKind::Principal => AmbientValue::Principal(ctx.principal().cloned()),
            AmbientKind::CallEnvelope => AmbientValue::CallEnvelope(Arc::new(call.clone())),
        }
    }
}
