//! Error types for the filter engine

use thiserror::Error;

use crate::operators::FilterOperator;
use crate::types::ColumnDataType;

/// Result type for filter engine operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Configuration and usage errors raised by the filter engine.
///
/// Data anomalies (unparseable dates, unmatched option values) never produce
/// an error; they are dropped. Everything here is a programmer error and is
/// reported immediately.
///
/// `Clone` and `PartialEq` let memoized derived views cache a failure and hand
/// it back on every call until the inputs change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A required builder field was never set
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// Operation is only defined for some column types
    #[error("{operation}() is not supported for {data_type} column '{column}'")]
    UnsupportedColumnType {
        operation: &'static str,
        column: String,
        data_type: ColumnDataType,
    },

    /// Server strategy cannot derive options from local data
    #[error("column '{column}': static options are required for server-side filtering")]
    ServerOptionsRequired { column: String },

    /// Option column with no static options, no transform, and raw values that
    /// are not option-shaped
    #[error(
        "column '{column}': needs static options, a transform_option_fn, or option-shaped values"
    )]
    MissingOptionsSource { column: String },

    /// Operator does not belong to the column type
    #[error("operator '{operator}' is not valid for {data_type} columns")]
    InvalidOperator {
        operator: FilterOperator,
        data_type: ColumnDataType,
    },
}

/// Errors raised while loading [`crate::settings::FilterSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FilterError::MissingField { field: "accessor" };
        assert_eq!(err.to_string(), "missing required field: accessor");
    }

    #[test]
    fn test_unsupported_column_type_display() {
        let err = FilterError::UnsupportedColumnType {
            operation: "add_filter_value",
            column: "amount".into(),
            data_type: ColumnDataType::Number,
        };
        assert_eq!(
            err.to_string(),
            "add_filter_value() is not supported for number column 'amount'"
        );
    }

    #[test]
    fn test_invalid_operator_display() {
        let err = FilterError::InvalidOperator {
            operator: FilterOperator::IsAnyOf,
            data_type: ColumnDataType::Text,
        };
        assert!(err.to_string().contains("is any of"));
        assert!(err.to_string().contains("text"));
    }

    #[test]
    fn test_settings_error_from_yaml() {
        let err: SettingsError = serde_yaml_ng::from_str::<u32>("not: [a number")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("YAML error"));
    }
}
