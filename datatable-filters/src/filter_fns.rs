//! Row predicates for client-side filtering.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::column::ColumnConfig;
use crate::operators::FilterOperator;
use crate::types::{ColumnDataType, FilterModel};
use crate::utils::value::{as_number, parse_date};

fn is_negated(filter: &FilterModel) -> bool {
    filter
        .data_type
        .operator_details(filter.operator)
        .is_some_and(|details| details.is_negated)
}

/// Comparison shared by number and date filters. A one-element range is an
/// equality test.
fn compare<T: PartialOrd + Copy>(operator: FilterOperator, value: T, bounds: &[T]) -> bool {
    let Some(&first) = bounds.first() else {
        return true;
    };
    let between = match bounds {
        [lo, hi, ..] => *lo <= value && value <= *hi,
        _ => value == first,
    };

    match operator {
        FilterOperator::Is => value == first,
        FilterOperator::IsNot => value != first,
        FilterOperator::IsLessThan | FilterOperator::IsBefore => value < first,
        FilterOperator::IsGreaterThanOrEqualTo | FilterOperator::IsOnOrAfter => value >= first,
        FilterOperator::IsGreaterThan | FilterOperator::IsAfter => value > first,
        FilterOperator::IsLessThanOrEqualTo | FilterOperator::IsOnOrBefore => value <= first,
        FilterOperator::IsBetween => between,
        FilterOperator::IsNotBetween => !between,
        _ => true,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Case-insensitive key used to compare option values.
fn option_key(value: &Value) -> Option<String> {
    let key = match value {
        Value::Object(obj) => obj.get("value").and_then(text_of),
        other => text_of(other),
    };
    key.map(|key| key.to_lowercase())
}

pub fn text_filter_fn(value: &Value, filter: &FilterModel) -> bool {
    let needle = filter
        .values
        .first()
        .and_then(text_of)
        .map(|n| n.trim().to_lowercase())
        .unwrap_or_default();
    if needle.is_empty() {
        return true;
    }
    let Some(haystack) = text_of(value) else {
        return is_negated(filter);
    };

    let found = haystack.to_lowercase().contains(&needle);
    match filter.operator {
        FilterOperator::DoesNotContain => !found,
        _ => found,
    }
}

pub fn number_filter_fn(value: &Value, filter: &FilterModel) -> bool {
    let bounds: Vec<f64> = filter.values.iter().filter_map(as_number).collect();
    if bounds.is_empty() {
        return true;
    }
    match as_number(value) {
        Some(n) => compare(filter.operator, n, &bounds),
        None => is_negated(filter),
    }
}

/// Dates compare by calendar day in UTC.
pub fn date_filter_fn(value: &Value, filter: &FilterModel) -> bool {
    let day = |v: &Value| parse_date(v).map(|dt| dt.date_naive());
    let bounds: Vec<NaiveDate> = filter.values.iter().filter_map(day).collect();
    if bounds.is_empty() {
        return true;
    }
    match day(value) {
        Some(d) => compare(filter.operator, d, &bounds),
        None => is_negated(filter),
    }
}

pub fn option_filter_fn(value: &Value, filter: &FilterModel) -> bool {
    let Some(key) = option_key(value) else {
        return is_negated(filter);
    };
    let selected = filter
        .values
        .iter()
        .filter_map(option_key)
        .any(|candidate| candidate == key);

    match filter.operator {
        FilterOperator::IsNot | FilterOperator::IsNoneOf => !selected,
        _ => selected,
    }
}

pub fn multi_option_filter_fn(value: &Value, filter: &FilterModel) -> bool {
    let row: HashSet<String> = match value {
        Value::Null => return is_negated(filter),
        Value::Array(items) => items.iter().filter_map(option_key).collect(),
        single => option_key(single).into_iter().collect(),
    };
    let wanted: Vec<String> = filter.values.iter().filter_map(option_key).collect();
    if wanted.is_empty() {
        return true;
    }

    let any = wanted.iter().any(|w| row.contains(w));
    let all = wanted.iter().all(|w| row.contains(w));
    match filter.operator {
        FilterOperator::Include | FilterOperator::IncludeAnyOf => any,
        FilterOperator::IncludeAllOf => all,
        FilterOperator::Exclude | FilterOperator::ExcludeIfAnyOf => !any,
        FilterOperator::ExcludeIfAll => !all,
        _ => true,
    }
}

/// Evaluate one filter against a row's accessor value.
///
/// Operators that do not belong to the filter's type match every row.
pub fn matches(value: &Value, filter: &FilterModel) -> bool {
    if !filter.data_type.supports(filter.operator) {
        debug!(
            column = %filter.column_id,
            operator = %filter.operator,
            "operator not valid for column type, ignoring filter"
        );
        return true;
    }
    if value.is_null() && filter.data_type != ColumnDataType::Text {
        return is_negated(filter);
    }

    match filter.data_type {
        ColumnDataType::Text => text_filter_fn(value, filter),
        ColumnDataType::Number => number_filter_fn(value, filter),
        ColumnDataType::Date => date_filter_fn(value, filter),
        ColumnDataType::Option => option_filter_fn(value, filter),
        ColumnDataType::MultiOption => multi_option_filter_fn(value, filter),
    }
}

/// Indices of the rows in `data` that pass every filter.
///
/// Filters on columns missing from `columns` are skipped.
pub fn filter_rows<'a, TData>(
    columns: &[ColumnConfig<TData>],
    filters: impl IntoIterator<Item = &'a FilterModel>,
    data: &[TData],
) -> Vec<usize> {
    let mut active: Vec<(&ColumnConfig<TData>, &FilterModel)> = Vec::new();
    for filter in filters {
        match columns.iter().find(|c| c.id() == filter.column_id) {
            Some(column) => active.push((column, filter)),
            None => debug!(column = %filter.column_id, "no column for filter, skipping"),
        }
    }

    data.iter()
        .enumerate()
        .filter(|(_, row)| {
            active
                .iter()
                .all(|(column, filter)| matches(&column.access(row), filter))
        })
        .map(|(idx, _)| idx)
        .collect()
}
