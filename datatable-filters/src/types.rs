//! Core data types shared by the builder, derived views, and filter state.
//!
//! Everything here is plain data. `FilterModel` and `FiltersState` serialize
//! to the JSON shape external collaborators (URL binding, server queries)
//! exchange: `[{ "columnId", "type", "operator", "values" }]`.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::operators::FilterOperator;
use crate::state::normalize_values;

/// The type of a filterable column. Determines value shape and operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ColumnDataType {
    Text,
    Number,
    Date,
    Option,
    MultiOption,
}

impl ColumnDataType {
    /// All column types, in declaration order.
    pub const ALL: [ColumnDataType; 5] = [
        ColumnDataType::Text,
        ColumnDataType::Number,
        ColumnDataType::Date,
        ColumnDataType::Option,
        ColumnDataType::MultiOption,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnDataType::Text => "text",
            ColumnDataType::Number => "number",
            ColumnDataType::Date => "date",
            ColumnDataType::Option => "option",
            ColumnDataType::MultiOption => "multiOption",
        }
    }

    /// Option and multi-option columns carry a finite set of selectable values.
    pub fn is_option_like(&self) -> bool {
        matches!(self, ColumnDataType::Option | ColumnDataType::MultiOption)
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where derived views are computed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterStrategy {
    /// Options and facets are derived from the in-memory dataset.
    #[default]
    Client,
    /// Options and facets are supplied externally.
    Server,
}

/// A single selectable value of an option or multi-option column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ColumnOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ColumnOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Interpret a raw accessor value as an option.
    ///
    /// Option-shaped means an object with string `value` and `label` keys and,
    /// if present, a string `icon`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let option_value = obj.get("value")?.as_str()?;
        let label = obj.get("label")?.as_str()?;
        let icon = match obj.get("icon") {
            None | Some(Value::Null) => None,
            Some(Value::String(icon)) => Some(icon.clone()),
            Some(_) => return None,
        };
        Some(Self {
            value: option_value.to_string(),
            label: label.to_string(),
            icon,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("value".into(), Value::String(self.value.clone()));
        obj.insert("label".into(), Value::String(self.label.clone()));
        if let Some(icon) = &self.icon {
            obj.insert("icon".into(), Value::String(icon.clone()));
        }
        Value::Object(obj)
    }
}

/// Occurrence count per option value, in first-seen order.
pub type FacetMap = IndexMap<String, usize>;

/// The operator and values currently applied to one column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterModel {
    pub column_id: String,
    #[serde(rename = "type")]
    pub data_type: ColumnDataType,
    pub operator: FilterOperator,
    /// Option values for option columns, a singleton or ascending pair for
    /// number/date columns, a single needle for text columns.
    pub values: Vec<Value>,
}

/// The full ordered set of active filters, at most one per column.
///
/// Deserializing goes through [`FiltersState::from_filters`], so decoded
/// state obeys the same rules as state built by the actions.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FiltersState(pub(crate) Vec<FilterModel>);

impl<'de> Deserialize<'de> for FiltersState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<FilterModel>::deserialize(deserializer).map(Self::from_filters)
    }
}

impl FiltersState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from externally supplied filters (e.g. decoded from a URL).
    ///
    /// Values are normalized the way `set_filter_value` does it: number and
    /// date ranges become a singleton or ascending pair, other types lose
    /// nulls and duplicates. Entries left with no values are dropped, as are
    /// later entries for an already-seen column. An operator the column type
    /// does not support is replaced by the type's default.
    pub fn from_filters(filters: impl IntoIterator<Item = FilterModel>) -> Self {
        let mut state: Vec<FilterModel> = Vec::new();
        for mut filter in filters {
            if state.iter().any(|f| f.column_id == filter.column_id) {
                debug!(column = %filter.column_id, "dropping duplicate filter");
                continue;
            }
            filter.values = normalize_values(filter.data_type, &filter.values);
            if filter.values.is_empty() {
                debug!(column = %filter.column_id, "dropping filter with no values");
                continue;
            }
            if !filter.data_type.supports(filter.operator) {
                filter.operator = filter.data_type.default_operator_for(filter.values.len());
            }
            state.push(filter);
        }
        Self(state)
    }

    pub fn get(&self, column_id: &str) -> Option<&FilterModel> {
        self.0.iter().find(|f| f.column_id == column_id)
    }

    pub fn is_filtered(&self, column_id: &str) -> bool {
        self.get(column_id).is_some_and(|f| !f.values.is_empty())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterModel> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[FilterModel] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a FiltersState {
    type Item = &'a FilterModel;
    type IntoIter = std::slice::Iter<'a, FilterModel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
