//! Store read request
//!
//! The canonical form of a store read call: paging, sorting, grouping,
//! filters and the residual parameters the client sent alongside them.
//!
//! Clients speak several dialects. Newer ones send `sort`/`group` as lists of
//! `{property, direction}` maps and always send `page`, `start` and `limit`.
//! Older ones send flat `sort`+`dir` / `groupBy`+`groupDir` keys and only one
//! of `page` or `start`. [`StoreReadRequest::normalize`] folds both into the
//! same canonical request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::filter::Filter;

/// Direction of a sorter or grouper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    /// Parses `ASC`/`DESC` case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Ascending)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Descending)
        } else {
            None
        }
    }
}

/// One `{property, direction}` sorter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortInfo {
    pub property: String,
    pub direction: Option<SortDirection>,
}

impl SortInfo {
    pub fn new(property: impl Into<String>, direction: Option<SortDirection>) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    /// Reads a raw sorter map; a map without `property` yields `None`.
    pub fn from_map(raw: &Map<String, Value>) -> Option<Self> {
        let (property, direction) = property_and_direction(raw)?;
        Some(Self::new(property, direction))
    }
}

/// One `{property, direction}` grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub property: String,
    pub direction: Option<SortDirection>,
}

impl GroupInfo {
    pub fn new(property: impl Into<String>, direction: Option<SortDirection>) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    pub fn from_map(raw: &Map<String, Value>) -> Option<Self> {
        let (property, direction) = property_and_direction(raw)?;
        Some(Self::new(property, direction))
    }
}

fn property_and_direction(raw: &Map<String, Value>) -> Option<(String, Option<SortDirection>)> {
    let property = raw.get("property").and_then(Value::as_str)?.to_string();
    let direction = raw
        .get("direction")
        .and_then(Value::as_str)
        .and_then(SortDirection::parse);
    Some((property, direction))
}

/// Canonical store read request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReadRequest {
    pub query: Option<String>,
    pub limit: Option<i64>,
    pub start: Option<i64>,
    pub page: Option<i64>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub group_by: Option<String>,
    pub group_dir: Option<String>,
    pub sorters: Vec<SortInfo>,
    pub groups: Vec<GroupInfo>,
    pub filters: Vec<Filter>,
    /// Keys the client sent that are not part of the canonical request
    pub params: Map<String, Value>,
}

impl StoreReadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns one of the flat scalar properties from a raw value.
    ///
    /// Returns `true` when `key` names a known property and the value could
    /// be read as that property's type. Numbers are accepted as JSON numbers
    /// or numeric strings.
    pub fn set_property(&mut self, key: &str, value: &Value) -> bool {
        match key {
            "query" => assign(&mut self.query, as_text(value)),
            "limit" => assign(&mut self.limit, as_integer(value)),
            "start" => assign(&mut self.start, as_integer(value)),
            "page" => assign(&mut self.page, as_integer(value)),
            "sort" => assign(&mut self.sort, as_text(value)),
            "dir" => assign(&mut self.dir, as_text(value)),
            "groupBy" => assign(&mut self.group_by, as_text(value)),
            "groupDir" => assign(&mut self.group_dir, as_text(value)),
            _ => false,
        }
    }

    /// Reconciles paging and folds the legacy flat sort/group keys.
    ///
    /// - `page` + `limit` without `start`: `start = limit * (page - 1)`
    /// - `start` + `limit` without `page`: `page = start / limit + 1`
    /// - when both are present neither is recomputed
    /// - a non-positive `limit`, or a result that overflows, leaves the
    ///   derived value unset
    /// - `sort` + `dir` become the single sorter when no sorter list was sent
    /// - `groupBy` + `groupDir` become the single grouper when no group list was sent
    pub fn normalize(&mut self) {
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            match (self.page, self.start) {
                (Some(page), None) => {
                    self.start = page.checked_sub(1).and_then(|p| p.checked_mul(limit));
                }
                (None, Some(start)) => {
                    self.page = start.checked_div(limit).and_then(|p| p.checked_add(1));
                }
                _ => {}
            }
        }

        if self.sorters.is_empty() {
            if let (Some(sort), Some(dir)) = (&self.sort, &self.dir) {
                self.sorters = vec![SortInfo::new(sort.clone(), SortDirection::parse(dir))];
            }
        }

        if self.groups.is_empty() {
            if let (Some(group_by), Some(group_dir)) = (&self.group_by, &self.group_dir) {
                self.groups = vec![GroupInfo::new(group_by.clone(), SortDirection::parse(group_dir))];
            }
        }
    }

    pub fn is_ascending_sort(&self) -> bool {
        self.dir.as_deref().and_then(SortDirection::parse) == Some(SortDirection::Ascending)
    }

    pub fn is_descending_sort(&self) -> bool {
        self.dir.as_deref().and_then(SortDirection::parse) == Some(SortDirection::Descending)
    }

    pub fn is_ascending_group_sort(&self) -> bool {
        self.group_dir.as_deref().and_then(SortDirection::parse) == Some(SortDirection::Ascending)
    }

    pub fn is_descending_group_sort(&self) -> bool {
        self.group_dir.as_deref().and_then(SortDirection::parse) == Some(SortDirection::Descending)
    }

    pub fn first_filter_for_field(&self, field: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.field() == field)
    }

    pub fn all_filters_for_field(&self, field: &str) -> Vec<&Filter> {
        self.filters.iter().filter(|f| f.field() == field).collect()
    }
}

fn assign<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
