//! Engine settings loadable from YAML or JSON.
//!
//! ```yaml
//! strategy: client
//! text_debounce:
//!   wait_ms: 300
//! number_debounce:
//!   wait_ms: 300
//!   max_wait_ms: 1000
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::types::{ColumnDataType, FilterStrategy};
use crate::utils::debounce::DebounceOptions;

/// Default quiet period for text and number edits, in milliseconds
pub const DEFAULT_EDIT_DEBOUNCE_MS: u64 = 300;
/// Default max wait for number edits (slider drags), in milliseconds
pub const DEFAULT_NUMBER_MAX_WAIT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Strategy used when none is given explicitly
    pub strategy: FilterStrategy,
    /// Debounce applied to text filter edits
    pub text_debounce: DebounceOptions,
    /// Debounce applied to number filter edits
    pub number_debounce: DebounceOptions,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            strategy: FilterStrategy::Client,
            text_debounce: DebounceOptions::trailing(DEFAULT_EDIT_DEBOUNCE_MS),
            number_debounce: DebounceOptions::trailing(DEFAULT_EDIT_DEBOUNCE_MS)
                .with_max_wait(DEFAULT_NUMBER_MAX_WAIT_MS),
        }
    }
}

impl FilterSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Debounce options for edits to a column of the given type.
    ///
    /// Only number edits get the max-wait variant; every other type uses the
    /// text options.
    pub fn debounce_for(&self, data_type: ColumnDataType) -> DebounceOptions {
        match data_type {
            ColumnDataType::Number => self.number_debounce,
            ColumnDataType::Text
            | ColumnDataType::Date
            | ColumnDataType::Option
            | ColumnDataType::MultiOption => self.text_debounce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = FilterSettings::default();
        assert_eq!(settings.strategy, FilterStrategy::Client);
        assert_eq!(settings.text_debounce.wait_ms, 300);
        assert_eq!(settings.number_debounce.max_wait_ms, Some(1000));
    }

    #[test]
    fn yaml_overrides_only_given_fields() {
        let yaml = r#"
strategy: server
text_debounce:
  wait_ms: 500
  leading: true
"#;
        let settings = FilterSettings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.strategy, FilterStrategy::Server);
        assert_eq!(settings.text_debounce.wait_ms, 500);
        assert!(settings.text_debounce.leading);
        assert!(settings.text_debounce.trailing);
        assert_eq!(settings.number_debounce, FilterSettings::default().number_debounce);
    }

    #[test]
    fn json_settings() {
        let settings =
            FilterSettings::from_json_str(r#"{"number_debounce": {"wait_ms": 50}}"#).unwrap();
        assert_eq!(settings.debounce_for(ColumnDataType::Number).wait_ms, 50);
        assert_eq!(settings.debounce_for(ColumnDataType::Text).wait_ms, 300);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = FilterSettings::from_yaml_str("strategy: [").unwrap_err();
        assert!(matches!(err, SettingsError::Yaml(_)));
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let err = FilterSettings::from_json_str(r#"{"strategy": "hybrid"}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }
}
