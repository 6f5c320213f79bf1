//! Structural JSON codec
//!
//! The resolver falls back to the codec when a value cannot be handled by
//! scalar conversion: records, collections of records, and JSON encoded as
//! a string (store filters, for instance, may arrive that way).
//!
//! Conversion is recursive, so nested shapes such as a map of lists of
//! records are converted level by level.

use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use super::conversions::{ConversionError, ConversionService, DefaultConversionService};
use super::types::ParamType;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("field '{field}' of [{record}]: {source}")]
    Field {
        record: String,
        field: String,
        #[source]
        source: Box<CodecError>,
    },
}

/// Parses strings and structurally converts values to declared types.
pub trait JsonCodec: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Value, CodecError>;

    fn convert_value(&self, value: &Value, target: &ParamType) -> Result<Value, CodecError>;
}

/// Field layout of a record type.
///
/// Known fields are converted to their declared type, unknown fields are
/// dropped and missing fields are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<(String, ParamType)>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Codec backed by `serde_json` with optional record schemas.
///
/// Records without a registered schema are accepted as-is.
#[derive(Debug, Clone, Default)]
pub struct SerdeJsonCodec {
    schemas: HashMap<String, RecordSchema>,
    scalars: DefaultConversionService,
}

impl SerdeJsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    fn convert_record(&self, name: &str, value: &Value) -> Result<Value, CodecError> {
        let object = match value {
            Value::Object(object) => object,
            Value::String(raw) => {
                let parsed = self.parse(raw)?;
                return self.convert_record(name, &parsed);
            }
            other => {
                return Err(ConversionError::new(other, &ParamType::record(name)).into());
            }
        };

        let Some(schema) = self.schemas.get(name) else {
            return Ok(value.clone());
        };

        let mut converted = Map::new();
        for (field, ty) in &schema.fields {
            let Some(raw) = object.get(field) else {
                continue;
            };
            let value = if raw.is_null() {
                Value::Null
            } else {
                self.convert_value(raw, ty).map_err(|e| CodecError::Field {
                    record: name.to_string(),
                    field: field.clone(),
                    source: Box::new(e),
                })?
            };
            converted.insert(field.clone(), value);
        }
        Ok(Value::Object(converted))
    }
}

impl JsonCodec for SerdeJsonCodec {
    fn parse(&self, raw: &str) -> Result<Value, CodecError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn convert_value(&self, value: &Value, target: &ParamType) -> Result<Value, CodecError> {
        match target {
            ParamType::Any | ParamType::Generic(_) => Ok(value.clone()),
            ParamType::Optional(_) if value.is_null() => Ok(Value::Null),
            ParamType::Optional(inner) => self.convert_value(value, inner),
            ParamType::Record(name) => self.convert_record(name, value),
            ParamType::List(element) | ParamType::Array(element) => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.convert_value(item, element))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Value::String(raw) => {
                    let parsed = self.parse(raw)?;
                    if parsed.is_array() {
                        self.convert_value(&parsed, target)
                    } else {
                        Err(ConversionError::new(value, target).into())
                    }
                }
                other => Err(ConversionError::new(other, target).into()),
            },
            ParamType::Map(element) => match value {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| self.convert_value(v, element).map(|c| (k.clone(), c)))
                    .collect::<Result<Map<String, Value>, _>>()
                    .map(Value::Object),
                other => Err(ConversionError::new(other, target).into()),
            },
            ParamType::StoreRead => match value {
                Value::Object(_) => Ok(value.clone()),
                other => Err(ConversionError::new(other, target).into()),
            },
            ParamType::Bool | ParamType::Integer | ParamType::Float | ParamType::Text => {
                Ok(self.scalars.convert(value, target)?)
            }
            ParamType::Ambient(_) => Err(ConversionError::new(value, target).into()),
        }
    }
}
