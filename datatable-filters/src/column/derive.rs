//! Pure views derived from a column config and the dataset.
//!
//! None of these functions cache anything; [`crate::column::Column`] wraps
//! them in memo slots.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::column::config::{ColumnConfig, ColumnKind, OptionSource};
use crate::error::{FilterError, Result};
use crate::types::{ColumnDataType, ColumnOption, FacetMap, FilterStrategy};
use crate::utils::uniq::{deep_hash, uniq, DeepEq};
use crate::utils::value::{as_number, flatten_one};

/// Realized values of a column, one entry per row with a non-null value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// Raw values of text, number and date columns.
    Scalars(Vec<Value>),
    /// Resolved option per row of an option column.
    Options(Vec<ColumnOption>),
    /// Resolved options per row of a multi-option column.
    MultiOptions(Vec<Vec<ColumnOption>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Scalars(values) => values.len(),
            ColumnValues::Options(values) => values.len(),
            ColumnValues::MultiOptions(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn raw_values<TData>(config: &ColumnConfig<TData>, data: &[TData]) -> Vec<Value> {
    data.iter()
        .map(|row| config.access(row))
        .filter(|value| !value.is_null())
        .collect()
}

/// Selectable options of an option or multi-option column.
///
/// Static options win. Otherwise the distinct raw values are ordered with
/// `order_fn` and turned into options with `transform_option_fn`, or taken
/// as-is when every raw value is already option-shaped.
pub fn get_column_options<TData>(
    config: &ColumnConfig<TData>,
    data: &[TData],
    strategy: FilterStrategy,
) -> Result<Vec<ColumnOption>> {
    let Some(source) = config.kind().option_source() else {
        warn!(
            column = %config.id(),
            data_type = %config.data_type(),
            "options requested for a column that is not option-like"
        );
        return Ok(Vec::new());
    };

    if let Some(options) = &source.options {
        return Ok(options.as_ref().clone());
    }

    if strategy == FilterStrategy::Server {
        return Err(FilterError::ServerOptionsRequired {
            column: config.id().to_string(),
        });
    }

    let raw: Vec<Value> = flatten_one(raw_values(config, data))
        .into_iter()
        .filter(|value| !value.is_null())
        .collect();
    let mut distinct = uniq(&raw);
    if let Some(order) = &source.order_fn {
        distinct.sort_by(|a, b| order(a, b));
    }

    if let Some(transform) = &source.transform_option_fn {
        return Ok(distinct.iter().map(|value| transform(value)).collect());
    }

    distinct
        .iter()
        .map(ColumnOption::from_value)
        .collect::<Option<Vec<_>>>()
        .map(|options| uniq(&options))
        .ok_or_else(|| FilterError::MissingOptionsSource {
            column: config.id().to_string(),
        })
}

/// Maps raw values to options, calling `transform_option_fn` once per
/// distinct raw value.
struct OptionResolver<'a> {
    column: &'a str,
    source: &'a OptionSource,
    transformed: HashMap<u64, Vec<(Value, ColumnOption)>>,
}

impl<'a> OptionResolver<'a> {
    fn new(column: &'a str, source: &'a OptionSource) -> Self {
        Self {
            column,
            source,
            transformed: HashMap::new(),
        }
    }

    /// `Ok(None)` drops the value: it did not match any static option.
    fn resolve(&mut self, raw: &Value) -> Result<Option<ColumnOption>> {
        if let Some(options) = &self.source.options {
            let key = match raw {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => obj.get("value").and_then(Value::as_str),
                _ => None,
            };
            return Ok(key.and_then(|key| options.iter().find(|o| o.value == key).cloned()));
        }

        if let Some(transform) = &self.source.transform_option_fn {
            let bucket = self.transformed.entry(deep_hash(raw)).or_default();
            if let Some((_, option)) = bucket.iter().find(|(seen, _)| seen.deep_eq(raw)) {
                return Ok(Some(option.clone()));
            }
            let option = transform(raw);
            bucket.push((raw.clone(), option.clone()));
            return Ok(Some(option));
        }

        ColumnOption::from_value(raw)
            .map(Some)
            .ok_or_else(|| FilterError::MissingOptionsSource {
                column: self.column.to_string(),
            })
    }
}

/// Non-null accessor values of every row, resolved to options for option
/// and multi-option columns.
pub fn get_column_values<TData>(
    config: &ColumnConfig<TData>,
    data: &[TData],
) -> Result<ColumnValues> {
    let raw = raw_values(config, data);

    match config.kind() {
        ColumnKind::Text | ColumnKind::Number { .. } | ColumnKind::Date => {
            Ok(ColumnValues::Scalars(raw))
        }
        ColumnKind::Option(source) => {
            let mut resolver = OptionResolver::new(config.id(), source);
            let mut out = Vec::with_capacity(raw.len());
            for value in &raw {
                if let Some(option) = resolver.resolve(value)? {
                    out.push(option);
                }
            }
            Ok(ColumnValues::Options(out))
        }
        ColumnKind::MultiOption(source) => {
            let mut resolver = OptionResolver::new(config.id(), source);
            let mut out = Vec::with_capacity(raw.len());
            for value in raw {
                let items = match value {
                    Value::Array(items) => items,
                    single => vec![single],
                };
                let mut row = Vec::with_capacity(items.len());
                for item in items.iter().filter(|item| !item.is_null()) {
                    if let Some(option) = resolver.resolve(item)? {
                        row.push(option);
                    }
                }
                out.push(row);
            }
            Ok(ColumnValues::MultiOptions(out))
        }
    }
}

/// Counts per option value.
///
/// With the server strategy this is the externally supplied map, if any;
/// `values` is not consulted.
pub fn get_faceted_unique_values<TData>(
    config: &ColumnConfig<TData>,
    values: &ColumnValues,
    strategy: FilterStrategy,
) -> Option<Arc<FacetMap>> {
    if !config.data_type().is_option_like() {
        warn!(
            column = %config.id(),
            data_type = %config.data_type(),
            "faceted unique values requested for a column that is not option-like"
        );
        return Some(Arc::new(FacetMap::new()));
    }

    if strategy == FilterStrategy::Server {
        return config.faceted_options().cloned();
    }

    let mut counts = FacetMap::new();
    let mut count = |option: &ColumnOption| {
        *counts.entry(option.value.clone()).or_insert(0) += 1;
    };
    match values {
        ColumnValues::Options(options) => options.iter().for_each(&mut count),
        ColumnValues::MultiOptions(rows) => rows.iter().flatten().for_each(&mut count),
        ColumnValues::Scalars(_) => {}
    }
    Some(Arc::new(counts))
}

/// `(min, max)` of a number column.
///
/// Static bounds win when both are set. The server strategy has nothing to
/// scan and yields `None`. An empty scan yields `(0, 0)`.
pub fn get_faceted_min_max_values<TData>(
    config: &ColumnConfig<TData>,
    data: &[TData],
    strategy: FilterStrategy,
) -> Option<(f64, f64)> {
    if config.data_type() != ColumnDataType::Number {
        warn!(
            column = %config.id(),
            data_type = %config.data_type(),
            "min/max requested for a non-number column"
        );
        return None;
    }

    if let (Some(min), Some(max)) = (config.min(), config.max()) {
        return Some((min, max));
    }

    if strategy == FilterStrategy::Server {
        return None;
    }

    let bounds = data
        .iter()
        .filter_map(|row| as_number(&config.access(row)))
        .fold(None, |acc: Option<(f64, f64)>, n| match acc {
            None => Some((n, n)),
            Some((lo, hi)) => Some((lo.min(n), hi.max(n))),
        });
    Some(bounds.unwrap_or((0.0, 0.0)))
}
