//! Column filter engine for data tables
//!
//! `datatable-filters` turns a dataset and a list of column declarations into
//! filterable columns, and keeps the current filter selection as a plain,
//! serializable value.
//!
//! # Architecture
//!
//! - **Declarative columns**: [`ColumnConfigHelper`] builds immutable
//!   [`ColumnConfig`]s; type-specific settings only exist on matching kinds
//! - **Derived views**: each [`Column`] exposes options, values, facet counts
//!   and numeric bounds, memoized on the dataset and strategy
//! - **Two strategies**: `client` derives everything from the loaded rows,
//!   `server` takes options and facets from outside
//! - **Reducer state**: [`FiltersState`] changes only through its action
//!   methods, which keep operators consistent with the number of values
//!
//! ```
//! use std::sync::Arc;
//! use datatable_filters::{ColumnConfigHelper, ColumnOption, DataTableFilters, FilterStrategy};
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
//!     .accessor(|i: &Issue| json!(i.status))
//!     .display_name("Status")
//!     .icon("circle")
//!     .options(vec![ColumnOption::new("open", "Open"), ColumnOption::new("closed", "Closed")])
//!     .build()
//!     .unwrap();
//!
//! let data = Arc::new(vec![Issue { status: "open" }, Issue { status: "closed" }]);
//! let mut filters = DataTableFilters::new(data, vec![status], FilterStrategy::Client);
//!
//! let column = filters.column("status").unwrap();
//! filters.add_filter_value(&*column, &[json!("open")]).unwrap();
//! assert_eq!(filters.filtered_rows(), vec![0]);
//! ```

pub mod column;
pub mod editor;
pub mod error;
pub mod filter_fns;
pub mod filters;
pub mod operators;
pub mod settings;
pub mod state;
pub mod types;
pub mod utils;

pub use column::{
    create_columns, Column, ColumnConfig, ColumnConfigBuilder, ColumnConfigHelper, ColumnKind,
    ColumnValues, ColumnView, Dataset, FilterColumn,
};
pub use editor::DebouncedValueEditor;
pub use error::{FilterError, Result, SettingsError};
pub use filters::DataTableFilters;
pub use operators::{determine_new_operator, FilterOperator, OperatorDetails, OperatorTarget};
pub use settings::FilterSettings;
pub use types::{
    ColumnDataType, ColumnOption, FacetMap, FilterModel, FilterStrategy, FiltersState,
};
pub use utils::debounce::{DebounceOptions, Debouncer};
