//! Fluent builder for [`ColumnConfig`].
//!
//! The builder's second type parameter is the column kind. Type-specific
//! setters exist only for the kinds they apply to, so setting `min` on a text
//! column is a compile error rather than a runtime failure:
//!
//! ```compile_fail
//! use datatable_filters::ColumnConfigHelper;
//!
//! struct Row;
//! let _ = ColumnConfigHelper::<Row>::new().text().min(1.0);
//! ```
//!
//! Every setter consumes the builder and returns a new one; clone a builder to
//! branch from a shared base.
//!
//! ```
//! use datatable_filters::{ColumnConfigHelper, ColumnOption};
//! use serde_json::json;
//!
//! struct Issue {
//!     status: &'static str,
//! }
//!
//! let dtf = ColumnConfigHelper::<Issue>::new();
//! let status = dtf
//!     .option()
//!     .id("status")
//!     .accessor(|row: &Issue| json!(row.status))
//!     .display_name("Status")
//!     .icon("circle-dot")
//!     .options(vec![
//!         ColumnOption::new("todo", "Todo"),
//!         ColumnOption::new("done", "Done"),
//!     ])
//!     .build()
//!     .unwrap();
//! assert_eq!(status.id(), "status");
//! ```

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::column::config::{Accessor, ColumnConfig, ColumnKind, OptionSource};
use crate::error::{FilterError, Result};
use crate::types::{ColumnOption, FacetMap};

/// Kind markers for [`ColumnConfigBuilder`].
pub mod kind {
    pub struct Text;
    pub struct Number;
    pub struct Date;
    pub struct Options;
    pub struct MultiOptions;
}

/// A builder kind: knows the empty [`ColumnKind`] it starts from.
pub trait KindMarker {
    fn initial_kind() -> ColumnKind;
}

/// Kinds with a selectable option set.
pub trait OptionKindMarker: KindMarker {}

impl KindMarker for kind::Text {
    fn initial_kind() -> ColumnKind {
        ColumnKind::Text
    }
}

impl KindMarker for kind::Number {
    fn initial_kind() -> ColumnKind {
        ColumnKind::Number {
            min: None,
            max: None,
        }
    }
}

impl KindMarker for kind::Date {
    fn initial_kind() -> ColumnKind {
        ColumnKind::Date
    }
}

impl KindMarker for kind::Options {
    fn initial_kind() -> ColumnKind {
        ColumnKind::Option(OptionSource::default())
    }
}

impl KindMarker for kind::MultiOptions {
    fn initial_kind() -> ColumnKind {
        ColumnKind::MultiOption(OptionSource::default())
    }
}

impl OptionKindMarker for kind::Options {}
impl OptionKindMarker for kind::MultiOptions {}

/// Entry point that fixes the row type once and hands out typed builders.
pub struct ColumnConfigHelper<TData> {
    _row: PhantomData<fn(&TData)>,
}

impl<TData> ColumnConfigHelper<TData> {
    pub fn new() -> Self {
        Self { _row: PhantomData }
    }

    pub fn text(&self) -> ColumnConfigBuilder<TData, kind::Text> {
        ColumnConfigBuilder::new()
    }

    pub fn number(&self) -> ColumnConfigBuilder<TData, kind::Number> {
        ColumnConfigBuilder::new()
    }

    pub fn date(&self) -> ColumnConfigBuilder<TData, kind::Date> {
        ColumnConfigBuilder::new()
    }

    pub fn option(&self) -> ColumnConfigBuilder<TData, kind::Options> {
        ColumnConfigBuilder::new()
    }

    pub fn multi_option(&self) -> ColumnConfigBuilder<TData, kind::MultiOptions> {
        ColumnConfigBuilder::new()
    }
}

impl<TData> Default for ColumnConfigHelper<TData> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a [`ColumnConfig`] of kind `K`.
pub struct ColumnConfigBuilder<TData, K> {
    id: Option<String>,
    accessor: Option<Accessor<TData>>,
    display_name: Option<String>,
    icon: Option<String>,
    kind: ColumnKind,
    _kind: PhantomData<fn() -> K>,
}

impl<TData, K> Clone for ColumnConfigBuilder<TData, K> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            accessor: self.accessor.clone(),
            display_name: self.display_name.clone(),
            icon: self.icon.clone(),
            kind: self.kind.clone(),
            _kind: PhantomData,
        }
    }
}

impl<TData, K: KindMarker> ColumnConfigBuilder<TData, K> {
    pub fn new() -> Self {
        Self {
            id: None,
            accessor: None,
            display_name: None,
            icon: None,
            kind: K::initial_kind(),
            _kind: PhantomData,
        }
    }
}

impl<TData, K: KindMarker> Default for ColumnConfigBuilder<TData, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<TData, K> ColumnConfigBuilder<TData, K> {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn accessor(mut self, accessor: impl Fn(&TData) -> Value + Send + Sync + 'static) -> Self {
        self.accessor = Some(Arc::new(accessor));
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Finish the config. `id`, `accessor`, `display_name` and `icon` are
    /// required.
    pub fn build(self) -> Result<ColumnConfig<TData>> {
        let id = self.id.ok_or(FilterError::MissingField { field: "id" })?;
        let accessor = self
            .accessor
            .ok_or(FilterError::MissingField { field: "accessor" })?;
        let display_name = self
            .display_name
            .ok_or(FilterError::MissingField { field: "display_name" })?;
        let icon = self.icon.ok_or(FilterError::MissingField { field: "icon" })?;

        Ok(ColumnConfig {
            id,
            accessor,
            display_name,
            icon,
            kind: self.kind,
        })
    }
}

impl<TData> ColumnConfigBuilder<TData, kind::Number> {
    pub fn min(mut self, value: f64) -> Self {
        if let ColumnKind::Number { min, .. } = &mut self.kind {
            *min = Some(value);
        }
        self
    }

    pub fn max(mut self, value: f64) -> Self {
        if let ColumnKind::Number { max, .. } = &mut self.kind {
            *max = Some(value);
        }
        self
    }
}

impl<TData, K: OptionKindMarker> ColumnConfigBuilder<TData, K> {
    fn update_source(mut self, update: impl FnOnce(&mut OptionSource)) -> Self {
        if let Some(source) = self.kind.option_source_mut() {
            update(source);
        }
        self
    }

    /// Declare the selectable options up front.
    pub fn options(self, options: Vec<ColumnOption>) -> Self {
        self.update_source(|source| source.options = Some(Arc::new(options)))
    }

    /// Map each distinct raw value to an option.
    pub fn transform_option_fn(
        self,
        transform: impl Fn(&Value) -> ColumnOption + Send + Sync + 'static,
    ) -> Self {
        self.update_source(|source| source.transform_option_fn = Some(Arc::new(transform)))
    }

    /// Order distinct raw values before they are turned into options.
    pub fn order_fn(
        self,
        order: impl Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.update_source(|source| source.order_fn = Some(Arc::new(order)))
    }

    /// Server-computed occurrence counts per option value.
    pub fn faceted_options(self, faceted: FacetMap) -> Self {
        self.update_source(|source| source.faceted_options = Some(Arc::new(faceted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnDataType;
    use serde_json::json;

    struct Issue {
        title: String,
        estimate: f64,
    }

    fn helper() -> ColumnConfigHelper<Issue> {
        ColumnConfigHelper::new()
    }

    #[test]
    fn builds_text_column() {
        let config = helper()
            .text()
            .id("title")
            .accessor(|row: &Issue| json!(row.title))
            .display_name("Title")
            .icon("heading")
            .build()
            .unwrap();

        assert_eq!(config.id(), "title");
        assert_eq!(config.display_name(), "Title");
        assert_eq!(config.icon(), "heading");
        assert_eq!(config.data_type(), ColumnDataType::Text);

        let row = Issue {
            title: "Fix login".into(),
            estimate: 3.0,
        };
        assert_eq!(config.access(&row), json!("Fix login"));
    }

    #[test]
    fn number_bounds_are_kept() {
        let config = helper()
            .number()
            .id("estimate")
            .accessor(|row: &Issue| json!(row.estimate))
            .display_name("Estimate")
            .icon("hash")
            .min(1.0)
            .max(9.0)
            .build()
            .unwrap();

        assert_eq!(config.min(), Some(1.0));
        assert_eq!(config.max(), Some(9.0));
        assert!(config.options().is_none());
    }

    #[test]
    fn option_settings_are_kept() {
        let mut faceted = FacetMap::new();
        faceted.insert("a".into(), 2);
        let config = helper()
            .multi_option()
            .id("labels")
            .accessor(|_: &Issue| json!(["a"]))
            .display_name("Labels")
            .icon("tag")
            .options(vec![ColumnOption::new("a", "A")])
            .transform_option_fn(|v| ColumnOption::new(v.to_string(), v.to_string()))
            .order_fn(|a, b| a.to_string().cmp(&b.to_string()))
            .faceted_options(faceted)
            .build()
            .unwrap();

        assert_eq!(config.data_type(), ColumnDataType::MultiOption);
        assert_eq!(config.options().unwrap().len(), 1);
        assert!(config.transform_option_fn().is_some());
        assert!(config.order_fn().is_some());
        assert_eq!(config.faceted_options().unwrap().get("a"), Some(&2));
        assert_eq!(config.min(), None);
    }

    #[test]
    fn build_reports_first_missing_field() {
        let err = helper().date().build().unwrap_err();
        assert_eq!(err, FilterError::MissingField { field: "id" });

        let err = helper().date().id("due").build().unwrap_err();
        assert_eq!(err, FilterError::MissingField { field: "accessor" });

        let err = helper()
            .date()
            .id("due")
            .accessor(|_: &Issue| Value::Null)
            .build()
            .unwrap_err();
        assert_eq!(err, FilterError::MissingField { field: "display_name" });

        let err = helper()
            .date()
            .id("due")
            .accessor(|_: &Issue| Value::Null)
            .display_name("Due")
            .build()
            .unwrap_err();
        assert_eq!(err, FilterError::MissingField { field: "icon" });
    }

    #[test]
    fn cloned_base_is_not_affected_by_branches() {
        let base = helper()
            .option()
            .accessor(|_: &Issue| json!("x"))
            .display_name("Base")
            .icon("circle");

        let a = base.clone().id("a").build().unwrap();
        let b = base
            .clone()
            .id("b")
            .options(vec![ColumnOption::new("x", "X")])
            .build()
            .unwrap();

        assert_eq!(a.id(), "a");
        assert!(a.options().is_none());
        assert_eq!(b.id(), "b");
        assert!(b.options().is_some());
        assert_eq!(
            base.build().unwrap_err(),
            FilterError::MissingField { field: "id" }
        );
    }

    #[test]
    fn server_overrides_return_new_configs() {
        let config = helper()
            .option()
            .id("status")
            .accessor(|_: &Issue| json!("x"))
            .display_name("Status")
            .icon("circle")
            .build()
            .unwrap();

        let with_options = config.with_static_options(Arc::new(vec![ColumnOption::new("x", "X")]));
        assert!(config.options().is_none());
        assert_eq!(with_options.options().unwrap().len(), 1);

        // Bounds on an option column are ignored
        let unchanged = config.with_bounds((0.0, 1.0));
        assert_eq!(unchanged.min(), None);
    }
}
