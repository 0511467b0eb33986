//! Immutable column declarations.
//!
//! A [`ColumnConfig`] is produced once by the builder and never mutated; the
//! server-override helpers return a new config.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::types::{ColumnDataType, ColumnOption, FacetMap};

/// Extracts a column's raw value from a row.
pub type Accessor<TData> = Arc<dyn Fn(&TData) -> Value + Send + Sync>;
/// Turns one raw value into a selectable option.
pub type TransformOptionFn = Arc<dyn Fn(&Value) -> ColumnOption + Send + Sync>;
/// Orders raw values before they become options.
pub type OrderFn = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Where an option or multi-option column gets its selectable values.
#[derive(Clone, Default)]
pub struct OptionSource {
    pub(crate) options: Option<Arc<Vec<ColumnOption>>>,
    pub(crate) transform_option_fn: Option<TransformOptionFn>,
    pub(crate) order_fn: Option<OrderFn>,
    pub(crate) faceted_options: Option<Arc<FacetMap>>,
}

impl fmt::Debug for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSource")
            .field("options", &self.options)
            .field("transform_option_fn", &self.transform_option_fn.is_some())
            .field("order_fn", &self.order_fn.is_some())
            .field("faceted_options", &self.faceted_options)
            .finish()
    }
}

/// Type-specific column settings. Only the fields meaningful for a type exist
/// on its variant.
#[derive(Debug, Clone)]
pub enum ColumnKind {
    Text,
    Number { min: Option<f64>, max: Option<f64> },
    Date,
    Option(OptionSource),
    MultiOption(OptionSource),
}

impl ColumnKind {
    pub fn data_type(&self) -> ColumnDataType {
        match self {
            ColumnKind::Text => ColumnDataType::Text,
            ColumnKind::Number { .. } => ColumnDataType::Number,
            ColumnKind::Date => ColumnDataType::Date,
            ColumnKind::Option(_) => ColumnDataType::Option,
            ColumnKind::MultiOption(_) => ColumnDataType::MultiOption,
        }
    }

    pub fn option_source(&self) -> Option<&OptionSource> {
        match self {
            ColumnKind::Option(source) | ColumnKind::MultiOption(source) => Some(source),
            ColumnKind::Text | ColumnKind::Number { .. } | ColumnKind::Date => None,
        }
    }

    pub(crate) fn option_source_mut(&mut self) -> Option<&mut OptionSource> {
        match self {
            ColumnKind::Option(source) | ColumnKind::MultiOption(source) => Some(source),
            ColumnKind::Text | ColumnKind::Number { .. } | ColumnKind::Date => None,
        }
    }
}

/// Anything that identifies a filterable column: its id and type are all the
/// filter state needs.
pub trait FilterColumn {
    fn id(&self) -> &str;
    fn data_type(&self) -> ColumnDataType;
}

impl FilterColumn for (&str, ColumnDataType) {
    fn id(&self) -> &str {
        self.0
    }

    fn data_type(&self) -> ColumnDataType {
        self.1
    }
}

/// Static declaration of a filterable field over rows of `TData`.
pub struct ColumnConfig<TData> {
    pub(crate) id: String,
    pub(crate) accessor: Accessor<TData>,
    pub(crate) display_name: String,
    pub(crate) icon: String,
    pub(crate) kind: ColumnKind,
}

impl<TData> Clone for ColumnConfig<TData> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            accessor: self.accessor.clone(),
            display_name: self.display_name.clone(),
            icon: self.icon.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl<TData> fmt::Debug for ColumnConfig<TData> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnConfig")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("icon", &self.icon)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<TData> ColumnConfig<TData> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn data_type(&self) -> ColumnDataType {
        self.kind.data_type()
    }

    pub fn accessor(&self) -> &Accessor<TData> {
        &self.accessor
    }

    /// Read this column's raw value from `row`.
    pub fn access(&self, row: &TData) -> Value {
        (self.accessor)(row)
    }

    pub fn min(&self) -> Option<f64> {
        match self.kind {
            ColumnKind::Number { min, .. } => min,
            _ => None,
        }
    }

    pub fn max(&self) -> Option<f64> {
        match self.kind {
            ColumnKind::Number { max, .. } => max,
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&Arc<Vec<ColumnOption>>> {
        self.kind.option_source()?.options.as_ref()
    }

    pub fn transform_option_fn(&self) -> Option<&TransformOptionFn> {
        self.kind.option_source()?.transform_option_fn.as_ref()
    }

    pub fn order_fn(&self) -> Option<&OrderFn> {
        self.kind.option_source()?.order_fn.as_ref()
    }

    pub fn faceted_options(&self) -> Option<&Arc<FacetMap>> {
        self.kind.option_source()?.faceted_options.as_ref()
    }

    /// Copy of this config with externally supplied options.
    pub(crate) fn with_static_options(&self, options: Arc<Vec<ColumnOption>>) -> Self {
        let mut next = self.clone();
        match next.kind.option_source_mut() {
            Some(source) => source.options = Some(options),
            None => warn!(
                column = %self.id,
                data_type = %self.data_type(),
                "ignoring options for non-option column"
            ),
        }
        next
    }

    /// Copy of this config with externally supplied facet counts.
    pub(crate) fn with_faceted_options(&self, faceted: Arc<FacetMap>) -> Self {
        let mut next = self.clone();
        match next.kind.option_source_mut() {
            Some(source) => source.faceted_options = Some(faceted),
            None => warn!(
                column = %self.id,
                data_type = %self.data_type(),
                "ignoring faceted counts for non-option column"
            ),
        }
        next
    }

    /// Copy of this config with externally supplied numeric bounds.
    pub(crate) fn with_bounds(&self, bounds: (f64, f64)) -> Self {
        let mut next = self.clone();
        match &mut next.kind {
            ColumnKind::Number { min, max } => {
                *min = Some(bounds.0);
                *max = Some(bounds.1);
            }
            _ => warn!(
                column = %self.id,
                data_type = %self.data_type(),
                "ignoring bounds for non-number column"
            ),
        }
        next
    }
}

impl<TData> FilterColumn for ColumnConfig<TData> {
    fn id(&self) -> &str {
        &self.id
    }

    fn data_type(&self) -> ColumnDataType {
        self.kind.data_type()
    }
}
