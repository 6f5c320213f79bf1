//! Scalar conversions
//!
//! Converts loosely typed JSON values towards a declared [`ParamType`].
//! This is the generic conversion step of parameter resolution: strings to
//! numbers and booleans, numbers to strings, comma-separated strings to
//! lists, and element-wise conversion of arrays and maps of scalars.
//!
//! # Conversion Table
//!
//! | Target | Accepted input |
//! |--------|----------------|
//! | Bool | boolean, `"true"`/`"false"`/`"on"`/`"off"`/`"yes"`/`"no"`/`"1"`/`"0"`, `0`/`1` |
//! | Integer | integral number, float without fraction, numeric string |
//! | Float | number, numeric string |
//! | Text | string, number, boolean |
//! | List/Array | array (element-wise), comma-separated string |
//! | Map | object (value-wise) |
//!
//! Records and the store read request are structural and left to the
//! [`JsonCodec`](super::codec::JsonCodec).

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::types::ParamType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {found} to [{target}]")]
pub struct ConversionError {
    pub found: String,
    pub target: String,
}

impl ConversionError {
    pub fn new(found: &Value, target: &ParamType) -> Self {
        Self {
            found: describe(found),
            target: target.to_string(),
        }
    }
}

fn describe(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.len() > 64 {
        let cut = (0..=64).rev().find(|i| rendered.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &rendered[..cut])
    } else {
        rendered
    }
}

/// Generic scalar conversion service.
pub trait ConversionService: Send + Sync {
    /// `true` when this service knows a conversion from the shape of
    /// `value` to `target`. A `true` answer does not guarantee success.
    fn can_convert(&self, value: &Value, target: &ParamType) -> bool;

    fn convert(&self, value: &Value, target: &ParamType) -> Result<Value, ConversionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConversionService;

impl DefaultConversionService {
    pub fn new() -> Self {
        Self
    }
}

impl ConversionService for DefaultConversionService {
    fn can_convert(&self, value: &Value, target: &ParamType) -> bool {
        match target {
            ParamType::Any | ParamType::Generic(_) => true,
            ParamType::Bool | ParamType::Integer | ParamType::Float | ParamType::Text => {
                !value.is_array() && !value.is_object()
            }
            ParamType::List(_) | ParamType::Array(_) => value.is_array() || value.is_string(),
            ParamType::Map(_) => value.is_object(),
            ParamType::Optional(inner) => value.is_null() || self.can_convert(value, inner),
            ParamType::Record(_) | ParamType::StoreRead | ParamType::Ambient(_) => false,
        }
    }

    fn convert(&self, value: &Value, target: &ParamType) -> Result<Value, ConversionError> {
        let fail = || ConversionError::new(value, target);
        match target {
            ParamType::Any | ParamType::Generic(_) => Ok(value.clone()),
            ParamType::Optional(_) if value.is_null() => Ok(Value::Null),
            ParamType::Optional(inner) => self.convert(value, inner),
            ParamType::Bool => to_bool(value).map(Value::Bool).ok_or_else(fail),
            ParamType::Integer => to_integer(value).map(Value::Number).ok_or_else(fail),
            ParamType::Float => to_float(value).map(Value::Number).ok_or_else(fail),
            ParamType::Text => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            ParamType::List(element) | ParamType::Array(element) => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.convert(item, element))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Value::String(s) if s.trim().is_empty() => Ok(Value::Array(Vec::new())),
                Value::String(s) => s
                    .split(',')
                    .map(|part| self.convert(&Value::String(part.trim().to_string()), element))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err(fail()),
            },
            ParamType::Map(element) => match value {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| self.convert(v, element).map(|c| (k.clone(), c)))
                    .collect::<Result<Map<String, Value>, ConversionError>>()
                    .map(Value::Object),
                _ => Err(fail()),
            },
            ParamType::Record(_) | ParamType::StoreRead | ParamType::Ambient(_) => Err(fail()),
        }
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_integer(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Number::from(f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Number::from),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(Number::from_f64),
        _ => None,
    }
}
