//! Parameter resolution
//!
//! Turns the loosely typed payload of a [`CallEnvelope`] plus the ambient
//! request context into the ordered [`Arguments`] of an operation.
//!
//! # Resolution Flow
//!
//! 1. The payload is shaped once according to the operation kind: store
//!    reads become a [`StoreReadRequest`], store modifications yield their
//!    records, named calls and form/tree loads expose a residual map.
//! 2. Every parameter is resolved in declaration order from its binding
//!    source. Payload values are consumed by name from the residual map,
//!    else positionally from a cursor into the payload list.
//! 3. Values found are converted to the declared type: unchanged when they
//!    already match, else by the [`ConversionService`], else by the
//!    [`JsonCodec`].
//!
//! The resolver holds no mutable state and can be shared freely between
//! threads; each call gets its own freshly allocated argument list.

use directrpc_common::{CallEnvelope, DirectError, Filter, GroupInfo, Result, SortInfo, StoreReadRequest};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::Arc;

use super::ambient::SupportedAmbientTypes;
use super::arguments::{Argument, Arguments};
use super::codec::{JsonCodec, SerdeJsonCodec};
use super::context::AmbientContext;
use super::conversions::{ConversionService, DefaultConversionService};
use super::descriptor::{CallDescriptor, ParameterDescriptor};
use super::types::{BindingSource, OperationKind, ParamType};

/// Payload after kind-specific shaping.
struct ShapedPayload<'a> {
    positional: &'a [Value],
    cursor: usize,
    residual: Option<Map<String, Value>>,
    store_read: Option<StoreReadRequest>,
    records: Option<Vec<Value>>,
}

impl<'a> ShapedPayload<'a> {
    fn new(positional: &'a [Value]) -> Self {
        Self {
            positional,
            cursor: 0,
            residual: None,
            store_read: None,
            records: None,
        }
    }

    fn next_positional(&mut self) -> Option<&'a Value> {
        let value = self.positional.get(self.cursor)?;
        self.cursor += 1;
        Some(value)
    }
}

#[derive(Clone)]
pub struct ParameterResolver {
    conversion: Arc<dyn ConversionService>,
    codec: Arc<dyn JsonCodec>,
}

impl Default for ParameterResolver {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultConversionService::new()),
            Arc::new(SerdeJsonCodec::new()),
        )
    }
}

impl ParameterResolver {
    pub fn new(conversion: Arc<dyn ConversionService>, codec: Arc<dyn JsonCodec>) -> Self {
        Self { conversion, codec }
    }

    /// Resolves the arguments of one call.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCall` for form posts, which are forwarded instead
    /// - `InvalidRequest` when the payload does not have the shape the
    ///   operation kind requires
    /// - `MissingParameter` for a required parameter without value or default
    /// - `UnresolvableParameter` for an unmarked payload parameter with no value
    /// - `Conversion` / `PrincipalTypeMismatch` when a value does not fit
    pub fn resolve(
        &self,
        descriptor: &CallDescriptor,
        call: &CallEnvelope,
        ctx: &AmbientContext,
    ) -> Result<Arguments> {
        if descriptor.kind() == OperationKind::FormPost {
            return Err(DirectError::UnsupportedCall(descriptor.kind().to_string()));
        }

        let mut payload = self.shape(descriptor, call)?;
        let mut arguments = Vec::with_capacity(descriptor.parameters().len());

        for (index, param) in descriptor.parameters().iter().enumerate() {
            let argument = match param.source() {
                BindingSource::Ambient => match SupportedAmbientTypes::kind_of(param.declared_type()) {
                    Some(kind) => Argument::Ambient(SupportedAmbientTypes::resolve(kind, ctx, call)),
                    None => return Err(DirectError::UnresolvableParameter { index }),
                },
                BindingSource::Header => {
                    let raw = ctx.request().header(param.name()).map(|v| Value::String(v.to_string()));
                    self.resolve_marked(param, raw)?
                }
                BindingSource::Cookie => {
                    let raw = ctx.request().cookie(param.name()).map(|v| Value::String(v.to_string()));
                    self.resolve_marked(param, raw)?
                }
                BindingSource::Metadata => {
                    let raw = call.metadata_value(param.name()).cloned();
                    self.resolve_marked(param, raw)?
                }
                BindingSource::Principal => self.resolve_principal(param, ctx)?,
                BindingSource::Body => self.resolve_body(index, param, &mut payload)?,
            };
            tracing::trace!("{}.{} arg {} '{}' -> {:?}", call.action, call.method, index, param.name(), argument);
            arguments.push(argument);
        }

        Ok(Arguments::new(arguments))
    }

    fn shape<'a>(&self, descriptor: &CallDescriptor, call: &'a CallEnvelope) -> Result<ShapedPayload<'a>> {
        let positional = call.data_list().map(Vec::as_slice).unwrap_or(&[]);
        let mut payload = ShapedPayload::new(positional);

        match descriptor.kind() {
            OperationKind::StoreRead => {
                if let Some(first) = positional.first() {
                    match first {
                        Value::Object(raw) => {
                            let request = self.read_request(raw)?;
                            payload.residual = Some(request.params.clone());
                            payload.store_read = Some(request);
                        }
                        Value::Null => {}
                        other => {
                            return Err(DirectError::InvalidRequest(format!(
                                "store read payload must be an object, got {}",
                                other
                            )))
                        }
                    }
                    payload.cursor = 1;
                }
            }
            OperationKind::FormLoad | OperationKind::TreeLoad => {
                if let Some(Value::Object(raw)) = positional.first() {
                    payload.residual = Some(raw.clone());
                    payload.cursor = 1;
                }
            }
            OperationKind::StoreModify => self.shape_modify(descriptor, &mut payload)?,
            OperationKind::Named | OperationKind::Poll => match &call.data {
                Value::Object(raw) => payload.residual = Some(raw.clone()),
                Value::Null => payload.residual = Some(Map::new()),
                other => {
                    return Err(DirectError::InvalidRequest(format!(
                        "{} payload must be an object, got {}",
                        descriptor.kind(),
                        other
                    )))
                }
            },
            OperationKind::Positional | OperationKind::FormPost => {}
        }

        tracing::debug!(
            "Shaped {} payload for {}.{} (cursor {}, residual keys {})",
            descriptor.kind(),
            call.action,
            call.method,
            payload.cursor,
            payload.residual.as_ref().map_or(0, Map::len)
        );
        Ok(payload)
    }

    /// Destructures a raw store read map into the canonical request.
    fn read_request(&self, raw: &Map<String, Value>) -> Result<StoreReadRequest> {
        let mut request = StoreReadRequest::new();

        for (key, value) in raw {
            let consumed = match (key.as_str(), value) {
                ("filter", _) => {
                    request.filters = self.filters(value)?;
                    true
                }
                ("sort", Value::Array(items)) => {
                    request.sorters = items
                        .iter()
                        .filter_map(Value::as_object)
                        .filter_map(SortInfo::from_map)
                        .collect();
                    true
                }
                ("group", Value::Array(items)) => {
                    request.groups = items
                        .iter()
                        .filter_map(Value::as_object)
                        .filter_map(GroupInfo::from_map)
                        .collect();
                    true
                }
                _ => request.set_property(key, value),
            };
            if !consumed {
                request.params.insert(key.clone(), value.clone());
            }
        }

        request.normalize();
        Ok(request)
    }

    fn filters(&self, value: &Value) -> Result<Vec<Filter>> {
        let parsed;
        let items = match value {
            Value::String(encoded) => {
                parsed = self.codec.parse(encoded).map_err(|e| DirectError::Conversion {
                    name: "filter".to_string(),
                    target: "List<Filter>".to_string(),
                    message: e.to_string(),
                })?;
                match parsed.as_array() {
                    Some(items) => items,
                    None => return Ok(Vec::new()),
                }
            }
            Value::Array(items) => items,
            _ => return Ok(Vec::new()),
        };

        Ok(items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|raw| {
                let filter = Filter::from_raw(raw);
                if filter.is_none() {
                    tracing::debug!("Skipping unrecognized filter {:?}", raw);
                }
                filter
            })
            .collect())
    }

    fn shape_modify(&self, descriptor: &CallDescriptor, payload: &mut ShapedPayload<'_>) -> Result<()> {
        let Some(first) = payload.positional.first() else {
            return Ok(());
        };

        let Some(entry_type) = descriptor.entry_type() else {
            if let Value::Object(raw) = first {
                let mut residual = raw.clone();
                residual.remove("records");
                payload.residual = Some(residual);
            }
            return Ok(());
        };

        let records = match first {
            Value::Array(items) => self.convert_records(items, entry_type)?,
            Value::Object(raw) => match raw.get("records") {
                Some(Value::Array(items)) => {
                    let mut residual = raw.clone();
                    residual.remove("records");
                    payload.residual = Some(residual);
                    self.convert_records(items, entry_type)?
                }
                Some(single) if !single.is_null() => {
                    let mut residual = raw.clone();
                    residual.remove("records");
                    payload.residual = Some(residual);
                    self.convert_records(std::slice::from_ref(single), entry_type)?
                }
                _ => self.convert_records(std::slice::from_ref(first), entry_type)?,
            },
            other => {
                return Err(DirectError::InvalidRequest(format!(
                    "store modify payload must be a list or an object, got {}",
                    other
                )))
            }
        };

        payload.records = Some(records);
        payload.cursor = 1;
        Ok(())
    }

    fn convert_records(&self, items: &[Value], entry_type: &ParamType) -> Result<Vec<Value>> {
        items
            .iter()
            .map(|record| {
                self.codec
                    .convert_value(record, entry_type)
                    .map_err(|e| conversion_error("records", entry_type, e))
            })
            .collect()
    }

    /// Header, cookie and metadata values.
    fn resolve_marked(&self, param: &ParameterDescriptor, raw: Option<Value>) -> Result<Argument> {
        let raw = raw.filter(|v| !v.is_null());
        self.value_or_fallback(param, raw)
            .unwrap_or_else(|| self.absent(param, None))
    }

    fn resolve_principal(&self, param: &ParameterDescriptor, ctx: &AmbientContext) -> Result<Argument> {
        let Some(principal) = ctx.principal() else {
            return Ok(self.empty_or_null(param));
        };

        let declared = param.declared_type().inner();
        let argument = match declared {
            ParamType::Any | ParamType::Generic(_) => Argument::Principal(principal.clone()),
            ParamType::Record(name) if name == principal.type_name() => {
                Argument::Principal(principal.clone())
            }
            ParamType::Text => Argument::Value(Value::String(principal.name().to_string())),
            _ if param.is_strict_type() => {
                return Err(DirectError::PrincipalTypeMismatch {
                    name: param.name().to_string(),
                    expected: declared.to_string(),
                    actual: principal.type_name().to_string(),
                })
            }
            _ => {
                tracing::debug!(
                    "Principal of type {} not assignable to '{}' of type {}",
                    principal.type_name(),
                    param.name(),
                    declared
                );
                Argument::Null
            }
        };
        Ok(argument)
    }

    fn resolve_body(
        &self,
        index: usize,
        param: &ParameterDescriptor,
        payload: &mut ShapedPayload<'_>,
    ) -> Result<Argument> {
        let declared = param.declared_type().inner();

        if *declared == ParamType::StoreRead {
            return Ok(match &payload.store_read {
                Some(request) => Argument::StoreRead(request.clone()),
                None => self.empty_or_null(param),
            });
        }

        if declared.is_collection() {
            if let Some(records) = &payload.records {
                return Ok(Argument::Records(records.clone()));
            }
        }

        let by_name = payload
            .residual
            .as_ref()
            .and_then(|residual| residual.get(param.name()))
            .cloned();
        if let Some(value) = by_name {
            if !(param.is_explicit_field() && value.is_null()) {
                return self.convert(param, &value);
            }
        }

        // explicit request fields are only read from the residual map
        if param.is_explicit_field() {
            return self
                .value_or_fallback(param, None)
                .unwrap_or_else(|| self.absent(param, None));
        }

        if let Some(value) = payload.next_positional() {
            return self.convert(param, value);
        }

        self.value_or_fallback(param, None)
            .unwrap_or_else(|| self.absent(param, Some(index)))
    }

    /// Converts `raw` or the default value; `None` when neither exists.
    fn value_or_fallback(&self, param: &ParameterDescriptor, raw: Option<Value>) -> Option<Result<Argument>> {
        let raw = raw.or_else(|| param.default_value().map(|d| Value::String(d.to_string())))?;
        Some(self.convert(param, &raw))
    }

    /// Outcome for a parameter without any value.
    ///
    /// `unmarked` carries the index of a payload parameter without marker;
    /// those have no required flag of their own and fail as unresolvable
    /// unless they are optional wrappers.
    fn absent(&self, param: &ParameterDescriptor, unmarked: Option<usize>) -> Result<Argument> {
        if param.is_optional_wrapper() {
            Ok(Argument::Empty)
        } else if let Some(index) = unmarked {
            Err(DirectError::UnresolvableParameter { index })
        } else if param.is_required() {
            Err(DirectError::MissingParameter {
                origin: param.source().origin(),
                name: param.name().to_string(),
                type_name: param.declared_type().to_string(),
            })
        } else {
            Ok(Argument::Null)
        }
    }

    fn empty_or_null(&self, param: &ParameterDescriptor) -> Argument {
        if param.is_optional_wrapper() {
            Argument::Empty
        } else {
            Argument::Null
        }
    }

    fn convert(&self, param: &ParameterDescriptor, value: &Value) -> Result<Argument> {
        if value.is_null() {
            return Ok(self.empty_or_null(param));
        }

        let target = param.declared_type().inner();
        if target.matches(value) {
            return Ok(Argument::Value(value.clone()));
        }

        let converted = if self.conversion.can_convert(value, target) {
            match self.conversion.convert(value, target) {
                Ok(converted) => converted,
                Err(e) if target.is_collection() => {
                    tracing::debug!(
                        "Scalar conversion of '{}' failed ({}), converting structurally",
                        param.name(),
                        e
                    );
                    self.codec
                        .convert_value(value, target)
                        .map_err(|e| conversion_error(param.name(), target, e))?
                }
                Err(e) => return Err(conversion_error(param.name(), target, e)),
            }
        } else {
            self.codec
                .convert_value(value, target)
                .map_err(|e| conversion_error(param.name(), target, e))?
        };

        Ok(Argument::Value(converted))
    }
}

fn conversion_error(name: &str, target: &ParamType, error: impl Display) -> DirectError {
    DirectError::Conversion {
        name: name.to_string(),
        target: target.to_string(),
        message: error.to_string(),
    }
}
