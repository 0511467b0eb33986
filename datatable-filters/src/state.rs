//! Filter state transitions.
//!
//! [`FiltersState`] is only ever changed through the methods here. Each
//! returns whether the state changed so owners can skip notifications for
//! no-ops.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::debug;

use crate::column::FilterColumn;
use crate::error::{FilterError, Result};
use crate::operators::{determine_new_operator, FilterOperator};
use crate::types::{ColumnDataType, FilterModel, FiltersState};
use crate::utils::uniq::{add_uniq, remove_uniq, uniq};
use crate::utils::value::{as_number, parse_date};

/// Keep the valid entries of a range input: a singleton, or the first two
/// valid entries in ascending order.
fn normalize_range<K: PartialOrd>(
    values: &[Value],
    key: impl Fn(&Value) -> Option<K>,
) -> Vec<Value> {
    let mut keyed: Vec<(K, &Value)> = values
        .iter()
        .filter_map(|value| key(value).map(|k| (k, value)))
        .take(2)
        .collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    keyed.into_iter().map(|(_, value)| value.clone()).collect()
}

pub(crate) fn normalize_values(data_type: ColumnDataType, values: &[Value]) -> Vec<Value> {
    match data_type {
        ColumnDataType::Number => normalize_range(values, as_number),
        ColumnDataType::Date => normalize_range(values, parse_date),
        ColumnDataType::Text | ColumnDataType::Option | ColumnDataType::MultiOption => {
            let present: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            uniq(&present)
        }
    }
}

fn require_option_like(column: &impl FilterColumn, operation: &'static str) -> Result<()> {
    if column.data_type().is_option_like() {
        Ok(())
    } else {
        Err(FilterError::UnsupportedColumnType {
            operation,
            column: column.id().to_string(),
            data_type: column.data_type(),
        })
    }
}

impl FiltersState {
    fn position(&self, column_id: &str) -> Option<usize> {
        self.0.iter().position(|f| f.column_id == column_id)
    }

    /// Insert a new filter or replace the values of an existing one, moving
    /// the operator across the single/multiple boundary as needed.
    fn upsert(&mut self, column: &impl FilterColumn, values: Vec<Value>) {
        match self.position(column.id()) {
            Some(idx) => {
                let filter = &mut self.0[idx];
                filter.operator = determine_new_operator(
                    filter.data_type,
                    filter.values.len(),
                    values.len(),
                    filter.operator,
                );
                filter.values = values;
                debug!(
                    column = %filter.column_id,
                    operator = %filter.operator,
                    values = filter.values.len(),
                    "updated filter"
                );
            }
            None => {
                let data_type = column.data_type();
                let operator = data_type.default_operator_for(values.len());
                debug!(column = %column.id(), %operator, values = values.len(), "created filter");
                self.0.push(FilterModel {
                    column_id: column.id().to_string(),
                    data_type,
                    operator,
                    values,
                });
            }
        }
    }

    /// Union `values` into an option column's filter, creating it if absent.
    /// Nulls in `values` are ignored.
    pub fn add_filter_value(
        &mut self,
        column: &impl FilterColumn,
        values: &[Value],
    ) -> Result<bool> {
        require_option_like(column, "add_filter_value")?;

        let present: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
        let next = match self.get(column.id()) {
            Some(existing) => add_uniq(&existing.values, &present),
            None => uniq(&present),
        };
        if next.is_empty() {
            return Ok(false);
        }
        if self.get(column.id()).is_some_and(|f| f.values == next) {
            return Ok(false);
        }

        self.upsert(column, next);
        Ok(true)
    }

    /// Remove `values` from an option column's filter. The filter itself is
    /// dropped once no values remain.
    pub fn remove_filter_value(
        &mut self,
        column: &impl FilterColumn,
        values: &[Value],
    ) -> Result<bool> {
        require_option_like(column, "remove_filter_value")?;

        let Some(idx) = self.position(column.id()) else {
            return Ok(false);
        };
        let existing = &self.0[idx];
        let next = remove_uniq(&existing.values, values);
        if next.len() == existing.values.len() {
            return Ok(false);
        }

        if next.is_empty() {
            debug!(column = %column.id(), "removed last value, dropping filter");
            self.0.remove(idx);
        } else {
            self.upsert(column, next);
        }
        Ok(true)
    }

    /// Replace a filter's values after type-aware normalization.
    ///
    /// Number and date values become a singleton or an ascending pair with
    /// unparseable entries dropped. Other types are de-duplicated. An input
    /// that normalizes to nothing leaves the state untouched.
    pub fn set_filter_value(&mut self, column: &impl FilterColumn, values: &[Value]) -> bool {
        let next = normalize_values(column.data_type(), values);
        if next.is_empty() {
            debug!(column = %column.id(), "ignoring empty filter value");
            return false;
        }
        if self.get(column.id()).is_some_and(|f| f.values == next) {
            return false;
        }

        self.upsert(column, next);
        true
    }

    /// Override the operator of an existing filter.
    pub fn set_filter_operator(
        &mut self,
        column_id: &str,
        operator: FilterOperator,
    ) -> Result<bool> {
        let Some(idx) = self.position(column_id) else {
            return Ok(false);
        };
        let filter = &mut self.0[idx];
        if !filter.data_type.supports(operator) {
            return Err(FilterError::InvalidOperator {
                operator,
                data_type: filter.data_type,
            });
        }
        if filter.operator == operator {
            return Ok(false);
        }

        debug!(column = %column_id, %operator, "set filter operator");
        filter.operator = operator;
        Ok(true)
    }

    pub fn remove_filter(&mut self, column_id: &str) -> bool {
        match self.position(column_id) {
            Some(idx) => {
                debug!(column = %column_id, "removed filter");
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn remove_all_filters(&mut self) -> bool {
        if self.0.is_empty() {
            return false;
        }
        debug!(filters = self.0.len(), "removed all filters");
        self.0.clear();
        true
    }
}
