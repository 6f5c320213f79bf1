//! Call descriptors
//!
//! A [`CallDescriptor`] is the immutable description of one remotable
//! operation, built once from the handler metadata and reused for every
//! call. It fixes the operation kind, the ordered parameter descriptors with
//! their binding sources, and the summary used when publishing the API.

use directrpc_common::{DirectError, Result};

use super::ambient::SupportedAmbientTypes;
use super::types::{BindingSource, OperationKind, ParamType};
use crate::metadata::{HandlerType, MarkerSpec, MethodDecl, ParamDecl, ParamMarker};

/// How one parameter is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    name: String,
    declared_type: ParamType,
    element_type: Option<ParamType>,
    source: BindingSource,
    required: bool,
    default_value: Option<String>,
    optional_wrapper: bool,
    explicit_field: bool,
    strict_type: bool,
}

impl ParameterDescriptor {
    fn from_decl(decl: &ParamDecl, declared_type: ParamType) -> Self {
        let mut descriptor = ParameterDescriptor {
            name: decl.name.clone(),
            element_type: declared_type.element_type().cloned(),
            optional_wrapper: declared_type.is_optional(),
            declared_type,
            source: BindingSource::Body,
            required: true,
            default_value: None,
            explicit_field: false,
            strict_type: false,
        };

        if SupportedAmbientTypes::is_supported(&descriptor.declared_type) {
            descriptor.source = BindingSource::Ambient;
            descriptor.required = false;
            return descriptor;
        }

        match &decl.marker {
            Some(ParamMarker::Header(spec)) => descriptor.apply(BindingSource::Header, spec),
            Some(ParamMarker::Cookie(spec)) => descriptor.apply(BindingSource::Cookie, spec),
            Some(ParamMarker::Metadata(spec)) => descriptor.apply(BindingSource::Metadata, spec),
            Some(ParamMarker::Principal { error_on_invalid_type }) => {
                descriptor.source = BindingSource::Principal;
                descriptor.required = false;
                descriptor.strict_type = *error_on_invalid_type;
            }
            Some(ParamMarker::RequestField(spec)) => {
                descriptor.apply(BindingSource::Body, spec);
                descriptor.explicit_field = true;
            }
            None => {}
        }
        descriptor
    }

    fn apply(&mut self, source: BindingSource, spec: &MarkerSpec) {
        self.source = source;
        if let Some(name) = spec.name.as_deref().filter(|n| !n.is_empty()) {
            self.name = name.to_string();
        }
        self.default_value = spec.default_value.clone();
        self.required = spec.required && self.default_value.is_none();
    }

    /// Logical name used for lookups.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &ParamType {
        &self.declared_type
    }

    /// Element type of a collection, array or optional-wrapper parameter.
    pub fn element_type(&self) -> Option<&ParamType> {
        self.element_type.as_ref()
    }

    pub fn source(&self) -> BindingSource {
        self.source
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_optional_wrapper(&self) -> bool {
        self.optional_wrapper
    }

    /// `true` for a body parameter carrying an explicit request-field marker.
    pub fn is_explicit_field(&self) -> bool {
        self.explicit_field
    }

    /// `true` when an incompatible principal must fail instead of binding null.
    pub fn is_strict_type(&self) -> bool {
        self.strict_type
    }
}

/// Publishing summary of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSummary {
    /// Number of positional payload parameters
    Count(usize),
    /// Names of the payload parameters, in declaration order
    Names(Vec<String>),
    /// Form post handled by forwarding; reports zero parameters
    FormHandler,
    /// Polling provider for `event`
    Poll { event: String },
}

/// Immutable description of one remotable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    handler: String,
    method: String,
    kind: OperationKind,
    parameters: Vec<ParameterDescriptor>,
    group: Option<String>,
    synchronize_on_session: bool,
    stream_response: bool,
    entry_type: Option<ParamType>,
    forward_path: Option<String>,
    summary: ParameterSummary,
}

impl CallDescriptor {
    /// Builds the descriptor of `method` on the handler type `ty`.
    ///
    /// The operation marker may live on the method itself or on a
    /// declaration of the same method in an ancestor type. Parameter types
    /// are taken from the marked declaration; type variables are bound from
    /// the directly invoked declaration or, failing that, from the type
    /// arguments along the ancestor chain.
    ///
    /// # Errors
    ///
    /// - `MethodNotFound` when no type in the chain declares `method`
    /// - `MissingMarker` when no declaration carries an operation marker
    /// - `InvalidOperation` for a positional operation with an explicit
    ///   request-field parameter, or a form post without a path
    pub fn build(handler: &str, ty: &HandlerType, method: &str) -> Result<CallDescriptor> {
        let direct = ty.find_method(method).ok_or_else(|| DirectError::MethodNotFound {
            handler: handler.to_string(),
            method: method.to_string(),
        })?;
        let marked = ty.find_marked_method(method).ok_or_else(|| DirectError::MissingMarker {
            handler: handler.to_string(),
            method: method.to_string(),
        })?;
        let marker = match marked.marker.as_ref() {
            Some(marker) => marker,
            None => {
                return Err(DirectError::MissingMarker {
                    handler: handler.to_string(),
                    method: method.to_string(),
                })
            }
        };

        let kind = marker.kind;
        let group = marker
            .group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        let invalid = |reason: String| {
            tracing::error!("Invalid operation {}.{}: {}", handler, method, reason);
            DirectError::InvalidOperation {
                handler: handler.to_string(),
                method: method.to_string(),
                reason,
            }
        };

        if marker.event.is_some() && kind != OperationKind::Poll {
            tracing::warn!(
                "Ignoring event on {}.{}: only POLL operations publish events",
                handler,
                method
            );
        }
        if marker.entry_type.is_some() && kind != OperationKind::StoreModify {
            tracing::warn!(
                "Ignoring entry type on {}.{}: only STORE_MODIFY operations convert records",
                handler,
                method
            );
        }

        if kind == OperationKind::FormPost {
            let forward_path = forward_path(ty, direct, marked).ok_or_else(|| {
                invalid("form post operations need a type or method path".to_string())
            })?;
            tracing::debug!("Registered {} {}.{} -> {}", kind, handler, method, forward_path);
            return Ok(CallDescriptor {
                handler: handler.to_string(),
                method: method.to_string(),
                kind,
                parameters: Vec::new(),
                group,
                synchronize_on_session: marker.synchronize_on_session,
                stream_response: marker.stream_response,
                entry_type: None,
                forward_path: Some(forward_path),
                summary: ParameterSummary::FormHandler,
            });
        }

        let parameters: Vec<ParameterDescriptor> = marked
            .params
            .iter()
            .enumerate()
            .map(|(index, decl)| {
                let declared = declared_type(ty, direct, index, decl);
                ParameterDescriptor::from_decl(decl, declared)
            })
            .collect();

        if kind == OperationKind::Positional {
            if let Some(param) = parameters.iter().find(|p| p.is_explicit_field()) {
                return Err(invalid(format!(
                    "positional operations cannot bind request field '{}'",
                    param.name()
                )));
            }
        }

        let declared_entry = marker
            .entry_type
            .clone()
            .filter(|_| kind == OperationKind::StoreModify);
        let entry_type = declared_entry.or_else(|| {
            parameters
                .iter()
                .find(|p| p.declared_type().inner().is_collection())
                .and_then(|p| p.element_type().cloned())
        });

        let body = parameters.iter().filter(|p| p.source() == BindingSource::Body);
        let summary = match kind {
            OperationKind::Positional => ParameterSummary::Count(body.count()),
            OperationKind::Named => {
                ParameterSummary::Names(body.map(|p| p.name().to_string()).collect())
            }
            OperationKind::StoreRead
            | OperationKind::StoreModify
            | OperationKind::FormLoad
            | OperationKind::TreeLoad => ParameterSummary::Count(1),
            OperationKind::Poll => ParameterSummary::Poll {
                event: marker
                    .event
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .unwrap_or(method)
                    .to_string(),
            },
            OperationKind::FormPost => ParameterSummary::FormHandler,
        };

        tracing::debug!(
            "Registered {} {}.{} with {} parameter(s)",
            kind,
            handler,
            method,
            parameters.len()
        );

        Ok(CallDescriptor {
            handler: handler.to_string(),
            method: method.to_string(),
            kind,
            parameters,
            group,
            synchronize_on_session: marker.synchronize_on_session,
            stream_response: marker.stream_response,
            entry_type,
            forward_path: None,
            summary,
        })
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Trimmed group tag; `None` when the operation has no group.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// `true` when no filter is given or one of the comma-separated
    /// requested groups equals one of this operation's groups.
    pub fn matches_group(&self, filter: Option<&str>) -> bool {
        let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
            return true;
        };
        let Some(group) = self.group.as_deref() else {
            return false;
        };
        filter
            .split(',')
            .map(str::trim)
            .any(|requested| group.split(',').map(str::trim).any(|own| own == requested))
    }

    pub fn synchronize_on_session(&self) -> bool {
        self.synchronize_on_session
    }

    pub fn stream_response(&self) -> bool {
        self.stream_response
    }

    /// Record type STORE_MODIFY entries are converted to.
    pub fn entry_type(&self) -> Option<&ParamType> {
        self.entry_type.as_ref()
    }

    /// `forward:<path>` target of a form post.
    pub fn forward_path(&self) -> Option<&str> {
        self.forward_path.as_deref()
    }

    pub fn summary(&self) -> &ParameterSummary {
        &self.summary
    }
}

/// Declared type of parameter `index`, with type variables bound.
fn declared_type(ty: &HandlerType, direct: &MethodDecl, index: usize, decl: &ParamDecl) -> ParamType {
    if !decl.ty.has_generics() {
        return decl.ty.clone();
    }
    if let Some(concrete) = direct
        .params
        .get(index)
        .map(|p| &p.ty)
        .filter(|t| !t.has_generics())
    {
        return concrete.clone();
    }

    let bound = decl.ty.substitute(&|var| ty.resolve_type_var(var));
    if bound.has_generics() {
        tracing::debug!(
            "Unbound type variable in parameter '{}' of {}; treating as Object",
            decl.name,
            ty.name
        );
        return bound.substitute(&|_| Some(ParamType::Any));
    }
    bound
}

fn forward_path(ty: &HandlerType, direct: &MethodDecl, marked: &MethodDecl) -> Option<String> {
    let type_path = ty.type_path().unwrap_or_default();
    let method_path = direct
        .path
        .as_deref()
        .or(marked.path.as_deref())
        .unwrap_or_default();
    let path = format!("{}{}", type_path, method_path);
    if path.is_empty() {
        return None;
    }
    let path = path.strip_prefix('/').unwrap_or(&path);
    Some(format!("forward:{}", path))
}
