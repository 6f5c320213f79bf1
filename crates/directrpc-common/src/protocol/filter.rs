//! Typed store filters
//!
//! Store read calls carry their filters as raw JSON maps. Two shapes exist:
//!
//! - **Typed**: `{"type": "numeric", "field": "age", "value": 30, "comparison": "gt"}`
//! - **Property**: `{"property": "name", "value": "Ralph"}` where the variant
//!   is chosen from the JSON type of `value`
//!
//! [`Filter::from_raw`] turns either shape into a [`Filter`]. Maps matching
//! neither shape produce `None` and are skipped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Comparison operator of numeric and date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    /// Parses the client spelling; unknown operators yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lt" => Some(Comparison::Lt),
            "le" | "lte" => Some(Comparison::Le),
            "gt" => Some(Comparison::Gt),
            "ge" | "gte" => Some(Comparison::Ge),
            "eq" | "==" | "=" => Some(Comparison::Eq),
            "ne" | "!=" => Some(Comparison::Ne),
            _ => None,
        }
    }
}

/// A typed filter predicate of a store read request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Numeric {
        field: String,
        value: Number,
        comparison: Option<Comparison>,
    },
    #[serde(rename = "string")]
    Text { field: String, value: String },
    Date {
        field: String,
        value: String,
        comparison: Option<Comparison>,
    },
    List { field: String, values: Vec<String> },
    Boolean { field: String, value: bool },
}

impl Filter {
    /// Builds a filter from one raw filter map.
    ///
    /// Returns `None` when the map has neither a known `type` nor the
    /// `property`/`value` pair, or when the value cannot be read as the
    /// requested type.
    pub fn from_raw(raw: &Map<String, Value>) -> Option<Filter> {
        let source = raw.get("value");

        let filter_type = match raw.get("type").and_then(Value::as_str) {
            Some(t) => t,
            None => {
                let property = raw.get("property").and_then(Value::as_str)?;
                let value = source?;
                return Some(match value {
                    Value::Number(n) => Filter::Numeric {
                        field: property.to_string(),
                        value: n.clone(),
                        comparison: None,
                    },
                    Value::Bool(b) => Filter::Boolean {
                        field: property.to_string(),
                        value: *b,
                    },
                    Value::String(s) => Filter::Text {
                        field: property.to_string(),
                        value: s.clone(),
                    },
                    other => Filter::Text {
                        field: property.to_string(),
                        value: other.to_string(),
                    },
                });
            }
        };

        let field = raw
            .get("field")
            .or_else(|| raw.get("property"))
            .and_then(Value::as_str)?
            .to_string();
        let comparison = raw
            .get("comparison")
            .and_then(Value::as_str)
            .and_then(Comparison::parse);

        match filter_type {
            "numeric" => Some(Filter::Numeric {
                field,
                value: to_number(source?)?,
                comparison,
            }),
            "string" => Some(Filter::Text {
                field,
                value: source?.as_str()?.to_string(),
            }),
            "date" => Some(Filter::Date {
                field,
                value: source?.as_str()?.to_string(),
                comparison,
            }),
            "list" => {
                let values = match source? {
                    Value::String(s) => s.split(',').map(str::to_string).collect(),
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    _ => return None,
                };
                Some(Filter::List { field, values })
            }
            "boolean" => {
                let value = match source? {
                    Value::Bool(b) => *b,
                    Value::String(s) => s.parse().ok()?,
                    _ => return None,
                };
                Some(Filter::Boolean { field, value })
            }
            _ => None,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Numeric { field, .. }
            | Filter::Text { field, .. }
            | Filter::Date { field, .. }
            | Filter::List { field, .. }
            | Filter::Boolean { field, .. } => field,
        }
    }
}

fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    }
}
