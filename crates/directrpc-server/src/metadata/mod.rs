//! Handler metadata registry
//!
//! The registration table describing every handler type: its methods, the
//! operation marker that makes a method remotable, and the per-parameter
//! binding markers. A type may extend a parent type, in which case method
//! lookups and type-variable bindings walk the ancestor chain the same way
//! an interface or base class would be searched.
//!
//! # Example
//!
//! ```
//! use directrpc_server::metadata::{HandlerRegistry, HandlerType, MethodDecl, OperationMarker, ParamDecl};
//! use directrpc_server::runtime::{OperationKind, ParamType};
//!
//! let calculator = HandlerType::new("Calculator").method(
//!     MethodDecl::new("add")
//!         .param(ParamDecl::new("a", ParamType::Integer))
//!         .param(ParamDecl::new("b", ParamType::Integer))
//!         .marked(OperationMarker::new(OperationKind::Positional)),
//! );
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("calculator", calculator);
//! assert!(registry.get("calculator").is_ok());
//! ```

use directrpc_common::{DirectError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::runtime::{OperationKind, ParamType};

/// Name, required flag and default shared by every value-carrying marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSpec {
    /// Logical name; the parameter name when `None`
    pub name: Option<String>,
    pub required: bool,
    /// Raw default, converted like a payload value
    pub default_value: Option<String>,
}

impl MarkerSpec {
    /// A required marker without explicit name or default.
    pub fn required() -> Self {
        Self {
            name: None,
            required: true,
            default_value: None,
        }
    }

    pub fn optional() -> Self {
        Self {
            required: false,
            ..Self::required()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets a default; a parameter with a default is never required.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self.required = false;
        self
    }
}

/// Declarative binding marker on a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamMarker {
    /// Explicit request field in the payload
    RequestField(MarkerSpec),
    Header(MarkerSpec),
    Cookie(MarkerSpec),
    /// Entry of the call's metadata map
    Metadata(MarkerSpec),
    /// The authenticated principal
    Principal { error_on_invalid_type: bool },
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ParamType,
    pub marker: Option<ParamMarker>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            marker: None,
        }
    }

    pub fn header(mut self, spec: MarkerSpec) -> Self {
        self.marker = Some(ParamMarker::Header(spec));
        self
    }

    pub fn cookie(mut self, spec: MarkerSpec) -> Self {
        self.marker = Some(ParamMarker::Cookie(spec));
        self
    }

    pub fn metadata(mut self, spec: MarkerSpec) -> Self {
        self.marker = Some(ParamMarker::Metadata(spec));
        self
    }

    pub fn request_field(mut self, spec: MarkerSpec) -> Self {
        self.marker = Some(ParamMarker::RequestField(spec));
        self
    }

    pub fn principal(mut self, error_on_invalid_type: bool) -> Self {
        self.marker = Some(ParamMarker::Principal { error_on_invalid_type });
        self
    }
}

/// Marker that makes a method a remotable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMarker {
    pub kind: OperationKind,
    /// Comma-separated group tags
    pub group: Option<String>,
    pub synchronize_on_session: bool,
    pub stream_response: bool,
    /// Record type of STORE_MODIFY entries
    pub entry_type: Option<ParamType>,
    /// Event name of a POLL operation
    pub event: Option<String>,
}

impl OperationMarker {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            group: None,
            synchronize_on_session: false,
            stream_response: false,
            entry_type: None,
            event: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn synchronized(mut self) -> Self {
        self.synchronize_on_session = true;
        self
    }

    pub fn streamed(mut self) -> Self {
        self.stream_response = true;
        self
    }

    pub fn with_entry_type(mut self, entry_type: ParamType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }
}

/// A method declared on a handler type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub marker: Option<OperationMarker>,
    /// Method-level path fragment, used by form posts
    pub path: Option<String>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            marker: None,
            path: None,
        }
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn marked(mut self, marker: OperationMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A handler type, optionally extending a parent type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerType {
    pub name: String,
    pub parent: Option<Arc<HandlerType>>,
    /// Bindings for type variables used by this type's or its ancestors' methods
    pub type_args: HashMap<String, ParamType>,
    pub methods: Vec<MethodDecl>,
    /// Type-level path fragment, used by form posts
    pub path: Option<String>,
}

impl HandlerType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            type_args: HashMap::new(),
            methods: Vec::new(),
            path: None,
        }
    }

    pub fn extending(mut self, parent: Arc<HandlerType>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn bind(mut self, var: impl Into<String>, ty: ParamType) -> Self {
        self.type_args.insert(var.into(), ty);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// This type followed by its ancestors, nearest first.
    pub fn ancestry(&self) -> impl Iterator<Item = &HandlerType> {
        std::iter::successors(Some(self), |ty| ty.parent.as_deref())
    }

    /// The method invoked for `name`: the nearest declaration in the chain.
    pub fn find_method(&self, name: &str) -> Option<&MethodDecl> {
        self.ancestry()
            .find_map(|ty| ty.methods.iter().find(|m| m.name == name))
    }

    /// The nearest declaration of `name` that carries an operation marker.
    pub fn find_marked_method(&self, name: &str) -> Option<&MethodDecl> {
        self.ancestry().find_map(|ty| {
            ty.methods
                .iter()
                .find(|m| m.name == name && m.marker.is_some())
        })
    }

    /// Binding of a type variable, searched from this type upwards.
    ///
    /// Variables that are part of a binding cycle stay unbound.
    pub fn resolve_type_var(&self, var: &str) -> Option<ParamType> {
        self.resolve_type_var_in(var, &[])
    }

    /// `path` holds the variables currently being resolved.
    fn resolve_type_var_in(&self, var: &str, path: &[String]) -> Option<ParamType> {
        if path.iter().any(|v| v == var) {
            tracing::warn!("Cyclic binding of type variable {} in {}", var, self.name);
            return None;
        }
        let bound = self.ancestry().find_map(|ty| ty.type_args.get(var))?;
        if !bound.has_generics() {
            return Some(bound.clone());
        }

        // a binding may itself refer to a variable of a nearer type
        let mut path = path.to_vec();
        path.push(var.to_string());
        Some(bound.substitute(&|inner| self.resolve_type_var_in(inner, &path)))
    }

    /// The nearest type-level path fragment in the chain.
    pub fn type_path(&self) -> Option<&str> {
        self.ancestry().find_map(|ty| ty.path.as_deref())
    }

    /// Names of all methods carrying an operation marker somewhere in the chain.
    pub fn marked_method_names(&self) -> BTreeSet<&str> {
        self.ancestry()
            .flat_map(|ty| ty.methods.iter())
            .filter(|m| m.marker.is_some())
            .map(|m| m.name.as_str())
            .collect()
    }
}

/// Handler types by handler name.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<HandlerType>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ty` under `handler`, replacing an earlier registration.
    pub fn register(&mut self, handler: impl Into<String>, ty: impl Into<Arc<HandlerType>>) {
        let handler = handler.into();
        let ty = ty.into();
        tracing::debug!("Registering handler '{}' of type {}", handler, ty.name);
        self.handlers.insert(handler, ty);
    }

    pub fn get(&self, handler: &str) -> Result<&Arc<HandlerType>> {
        self.handlers
            .get(handler)
            .ok_or_else(|| DirectError::HandlerNotFound(handler.to_string()))
    }

    /// Registered handler names, sorted.
    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
