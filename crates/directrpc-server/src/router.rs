//! Call router
//!
//! The dispatch loop for call envelopes. For each call the router looks up
//! (or builds) the operation's descriptor, resolves the arguments, and
//! invokes the registered [`Operation`]. Every failure becomes an exception
//! response for that call only; the other calls of a batch are unaffected.
//!
//! # Example
//!
//! ```
//! use directrpc_common::CallEnvelope;
//! use directrpc_server::metadata::{HandlerRegistry, HandlerType, MethodDecl, OperationMarker, ParamDecl};
//! use directrpc_server::runtime::{AmbientContext, OperationKind, ParamType, RequestInfo};
//! use directrpc_server::{Router, RouterConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(
//!     "calculator",
//!     HandlerType::new("Calculator").method(
//!         MethodDecl::new("add")
//!             .param(ParamDecl::new("a", ParamType::Integer))
//!             .param(ParamDecl::new("b", ParamType::Integer))
//!             .marked(OperationMarker::new(OperationKind::Positional)),
//!     ),
//! );
//!
//! let mut router = Router::new(Arc::new(registry), RouterConfig::default()).unwrap();
//! router.register_fn("calculator", "add", |args, _ctx| {
//!     Ok(json!(args.required::<i64>(0)? + args.required::<i64>(1)?))
//! });
//!
//! let ctx = AmbientContext::new(RequestInfo::new("POST", "/router"));
//! let response = router.dispatch(&CallEnvelope::new("calculator", "add", 1, json!([2, "3"])), &ctx);
//! assert_eq!(response.result, Some(json!(5)));
//! ```

use directrpc_common::{CallEnvelope, DirectError, DirectResponse, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::RemotingApi;
use crate::config::RouterConfig;
use crate::metadata::HandlerRegistry;
use crate::runtime::{AmbientContext, Arguments, CallDescriptor, DescriptorCache, ParameterResolver};

/// A business operation invoked with resolved arguments.
pub trait Operation: Send + Sync {
    fn invoke(&self, args: Arguments, ctx: &AmbientContext) -> Result<Value>;
}

impl<F> Operation for F
where
    F: Fn(Arguments, &AmbientContext) -> Result<Value> + Send + Sync,
{
    fn invoke(&self, args: Arguments, ctx: &AmbientContext) -> Result<Value> {
        self(args, ctx)
    }
}

pub struct Router {
    registry: Arc<HandlerRegistry>,
    descriptors: Arc<DescriptorCache>,
    resolver: ParameterResolver,
    /// handler name -> method name -> operation
    operations: HashMap<String, HashMap<String, Arc<dyn Operation>>>,
    config: RouterConfig,
}

impl Router {
    /// Creates a router over `registry` with a fresh descriptor cache.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `config`.
    pub fn new(registry: Arc<HandlerRegistry>, config: RouterConfig) -> std::result::Result<Self, String> {
        config.validate()?;
        Ok(Self {
            registry,
            descriptors: Arc::new(DescriptorCache::new()),
            resolver: ParameterResolver::default(),
            operations: HashMap::new(),
            config,
        })
    }

    /// Shares an existing descriptor cache, e.g. one already populated.
    pub fn with_descriptors(mut self, descriptors: Arc<DescriptorCache>) -> Self {
        self.descriptors = descriptors;
        self
    }

    pub fn with_resolver(mut self, resolver: ParameterResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn register_operation(&mut self, handler: &str, method: &str, operation: Arc<dyn Operation>) {
        tracing::debug!("Registering operation {}.{}", handler, method);
        self.operations
            .entry(handler.to_string())
            .or_default()
            .insert(method.to_string(), operation);
    }

    pub fn register_fn<F>(&mut self, handler: &str, method: &str, operation: F)
    where
        F: Fn(Arguments, &AmbientContext) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_operation(handler, method, Arc::new(operation));
    }

    pub fn descriptors(&self) -> &Arc<DescriptorCache> {
        &self.descriptors
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Descriptor of one operation, built on first use.
    ///
    /// # Errors
    ///
    /// Configuration errors from the registry or descriptor construction.
    pub fn descriptor(&self, handler: &str, method: &str) -> Result<Arc<CallDescriptor>> {
        self.descriptors.get_or_build(&self.registry, handler, method)
    }

    /// Populates the descriptor cache and builds the published API.
    pub fn remoting_api(&self, group: Option<&str>) -> RemotingApi {
        self.descriptors.populate(&self.registry);
        RemotingApi::from_descriptors(&self.descriptors, group)
    }

    /// Executes one call and returns the operation's result.
    ///
    /// The operation runs while holding the session lock when either the
    /// operation or the router configuration asks for it and the caller
    /// has a session.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for envelopes that are not `rpc` calls
    /// - configuration errors for unknown handlers, methods or operations
    /// - resolution errors from the [`ParameterResolver`]
    /// - whatever the operation itself returns
    pub fn call(&self, call: &CallEnvelope, ctx: &AmbientContext) -> Result<Value> {
        if !call.is_rpc() {
            return Err(DirectError::InvalidRequest(format!(
                "unsupported call type '{}'",
                call.call_type
            )));
        }

        let descriptor = self.descriptor(&call.action, &call.method)?;
        let operation = self
            .operations
            .get(&call.action)
            .and_then(|methods| methods.get(&call.method))
            .ok_or_else(|| DirectError::MethodNotFound {
                handler: call.action.clone(),
                method: call.method.clone(),
            })?;

        let arguments = self.resolver.resolve(&descriptor, call, ctx)?;

        let synchronize = descriptor.synchronize_on_session() || self.config.synchronize_on_session;
        let _guard = match ctx.session() {
            Some(session) if synchronize => Some(session.synchronize()),
            _ => None,
        };

        tracing::debug!("Invoking {}.{} (tid {})", call.action, call.method, call.tid);
        operation.invoke(arguments, ctx)
    }

    /// Executes one call and wraps the outcome in a response envelope.
    pub fn dispatch(&self, call: &CallEnvelope, ctx: &AmbientContext) -> DirectResponse {
        match self.call(call, ctx) {
            Ok(result) => DirectResponse::success(call, result),
            Err(e) => {
                if e.is_configuration() {
                    tracing::error!("Call {}.{} (tid {}) failed: {}", call.action, call.method, call.tid, e);
                } else {
                    tracing::warn!("Call {}.{} (tid {}) failed: {}", call.action, call.method, call.tid, e);
                }
                DirectResponse::exception(call, self.config.message_for(&e), self.config.location_for(&e))
            }
        }
    }

    /// Dispatches every call of a batch in order, one response per call.
    pub fn dispatch_batch(&self, calls: &[CallEnvelope], ctx: &AmbientContext) -> Vec<DirectResponse> {
        calls.iter().map(|call| self.dispatch(call, ctx)).collect()
    }

    /// Parses a request body holding one call or a batch and dispatches it.
    ///
    /// # Errors
    ///
    /// Only when the body itself cannot be parsed; failing calls become
    /// exception responses.
    pub fn dispatch_body(&self, body: &str, ctx: &AmbientContext) -> Result<Vec<DirectResponse>> {
        let calls = CallEnvelope::parse_batch(body)?;
        tracing::debug!("Dispatching batch of {} calls", calls.len());
        Ok(self.dispatch_batch(&calls, ctx))
    }
}
