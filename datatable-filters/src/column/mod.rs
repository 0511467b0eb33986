//! Columns: immutable configs bound to a dataset and a strategy, with
//! memoized derived views.

pub mod builder;
pub mod config;
pub mod derive;

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, trace};

pub use builder::{ColumnConfigBuilder, ColumnConfigHelper};
pub use config::{ColumnConfig, ColumnKind, FilterColumn};
pub use derive::ColumnValues;

use crate::error::Result;
use crate::types::{ColumnDataType, ColumnOption, FacetMap, FilterStrategy};
use crate::utils::memo::MemoSlot;

/// Shared, immutable rows. Memoized views compare datasets by pointer.
pub type Dataset<T> = Arc<Vec<T>>;

type OptionsResult = Result<Arc<Vec<ColumnOption>>>;
type ValuesResult = Result<Arc<ColumnValues>>;
type FacetsResult = Result<Option<Arc<FacetMap>>>;

/// The four derived views of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnView {
    Options,
    Values,
    FacetedUniqueValues,
    FacetedMinMaxValues,
}

/// A [`ColumnConfig`] bound to a dataset and strategy.
///
/// Every getter is memoized on `(data, strategy)` and returns the same `Arc`
/// until either changes. With the client strategy the `prefetch_*` methods
/// compute a view after yielding to the runtime and keep it in a write-once
/// slot that later getters read first.
pub struct Column<TData> {
    config: ColumnConfig<TData>,
    data: Dataset<TData>,
    strategy: FilterStrategy,

    options: MemoSlot<(Dataset<TData>, FilterStrategy), OptionsResult>,
    values: MemoSlot<(Dataset<TData>,), ValuesResult>,
    faceted_unique: MemoSlot<(ValuesResult, FilterStrategy), FacetsResult>,
    faceted_min_max: MemoSlot<(Dataset<TData>, FilterStrategy), Option<(f64, f64)>>,

    prefetched_options: OnceCell<OptionsResult>,
    prefetched_values: OnceCell<ValuesResult>,
    prefetched_faceted_unique: OnceCell<FacetsResult>,
    prefetched_faceted_min_max: OnceCell<Option<(f64, f64)>>,
}

impl<TData> Column<TData> {
    pub fn new(
        config: ColumnConfig<TData>,
        data: Dataset<TData>,
        strategy: FilterStrategy,
    ) -> Self {
        let id = config.id().to_string();
        Self {
            options: MemoSlot::new(format!("{id}.options")),
            values: MemoSlot::new(format!("{id}.values")),
            faceted_unique: MemoSlot::new(format!("{id}.faceted_unique_values")),
            faceted_min_max: MemoSlot::new(format!("{id}.faceted_min_max_values")),
            prefetched_options: OnceCell::new(),
            prefetched_values: OnceCell::new(),
            prefetched_faceted_unique: OnceCell::new(),
            prefetched_faceted_min_max: OnceCell::new(),
            config,
            data,
            strategy,
        }
    }

    pub fn config(&self) -> &ColumnConfig<TData> {
        &self.config
    }

    pub fn id(&self) -> &str {
        self.config.id()
    }

    pub fn data_type(&self) -> ColumnDataType {
        self.config.data_type()
    }

    pub fn display_name(&self) -> &str {
        self.config.display_name()
    }

    pub fn icon(&self) -> &str {
        self.config.icon()
    }

    pub fn strategy(&self) -> FilterStrategy {
        self.strategy
    }

    pub fn data(&self) -> &Dataset<TData> {
        &self.data
    }

    pub fn get_options(&self) -> OptionsResult {
        if let Some(ready) = self.prefetched_options.get() {
            return ready.clone();
        }
        self.compute_options()
    }

    pub fn get_values(&self) -> ValuesResult {
        if let Some(ready) = self.prefetched_values.get() {
            return ready.clone();
        }
        self.compute_values()
    }

    /// `Ok(None)` only with the server strategy when no counts were supplied.
    pub fn get_faceted_unique_values(&self) -> FacetsResult {
        if let Some(ready) = self.prefetched_faceted_unique.get() {
            return ready.clone();
        }
        self.compute_faceted_unique()
    }

    pub fn get_faceted_min_max_values(&self) -> Option<(f64, f64)> {
        if let Some(ready) = self.prefetched_faceted_min_max.get() {
            return *ready;
        }
        self.compute_faceted_min_max()
    }

    fn compute_options(&self) -> OptionsResult {
        self.options
            .get_or_compute((self.data.clone(), self.strategy), |(data, strategy)| {
                derive::get_column_options(&self.config, data, *strategy).map(Arc::new)
            })
    }

    fn compute_values(&self) -> ValuesResult {
        self.values.get_or_compute((self.data.clone(),), |(data,)| {
            derive::get_column_values(&self.config, data).map(Arc::new)
        })
    }

    fn compute_faceted_unique(&self) -> FacetsResult {
        if self.strategy == FilterStrategy::Server {
            // Server counts come from the config; local values are never read
            let unused = ColumnValues::Scalars(Vec::new());
            return Ok(derive::get_faceted_unique_values(
                &self.config,
                &unused,
                self.strategy,
            ));
        }

        let values = self.compute_values();
        self.faceted_unique
            .get_or_compute((values, self.strategy), |(values, strategy)| {
                let values = values.clone()?;
                Ok(derive::get_faceted_unique_values(
                    &self.config,
                    &values,
                    *strategy,
                ))
            })
    }

    fn compute_faceted_min_max(&self) -> Option<(f64, f64)> {
        self.faceted_min_max
            .get_or_compute((self.data.clone(), self.strategy), |(data, strategy)| {
                derive::get_faceted_min_max_values(&self.config, data, *strategy)
            })
    }

    /// Whether `view` has been prefetched into its write-once slot.
    pub fn is_prefetched(&self, view: ColumnView) -> bool {
        match view {
            ColumnView::Options => self.prefetched_options.initialized(),
            ColumnView::Values => self.prefetched_values.initialized(),
            ColumnView::FacetedUniqueValues => self.prefetched_faceted_unique.initialized(),
            ColumnView::FacetedMinMaxValues => self.prefetched_faceted_min_max.initialized(),
        }
    }

    fn prefetch_enabled(&self) -> bool {
        self.strategy == FilterStrategy::Client
    }

    pub async fn prefetch_options(&self) {
        if !self.prefetch_enabled() {
            return;
        }
        self.prefetched_options
            .get_or_init(|| async {
                tokio::task::yield_now().await;
                let options = self.compute_options();
                trace!(column = %self.id(), "prefetched options");
                options
            })
            .await;
    }

    pub async fn prefetch_values(&self) {
        if !self.prefetch_enabled() {
            return;
        }
        self.prefetched_values
            .get_or_init(|| async {
                tokio::task::yield_now().await;
                let values = self.compute_values();
                trace!(column = %self.id(), "prefetched values");
                values
            })
            .await;
    }

    pub async fn prefetch_faceted_unique_values(&self) {
        if !self.prefetch_enabled() {
            return;
        }
        self.prefetched_faceted_unique
            .get_or_init(|| async {
                tokio::task::yield_now().await;
                let facets = self.compute_faceted_unique();
                trace!(column = %self.id(), "prefetched faceted unique values");
                facets
            })
            .await;
    }

    pub async fn prefetch_faceted_min_max_values(&self) {
        if !self.prefetch_enabled() {
            return;
        }
        self.prefetched_faceted_min_max
            .get_or_init(|| async {
                tokio::task::yield_now().await;
                let bounds = self.compute_faceted_min_max();
                trace!(column = %self.id(), "prefetched faceted min/max values");
                bounds
            })
            .await;
    }
}

impl<TData> FilterColumn for Column<TData> {
    fn id(&self) -> &str {
        self.config.id()
    }

    fn data_type(&self) -> ColumnDataType {
        self.config.data_type()
    }
}

impl<TData> fmt::Debug for Column<TData> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("config", &self.config)
            .field("rows", &self.data.len())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Bind every config to `data` under `strategy`.
pub fn create_columns<TData>(
    data: &Dataset<TData>,
    configs: &[ColumnConfig<TData>],
    strategy: FilterStrategy,
) -> Vec<Column<TData>> {
    debug!(
        columns = configs.len(),
        rows = data.len(),
        ?strategy,
        "creating columns"
    );
    configs
        .iter()
        .map(|config| Column::new(config.clone(), data.clone(), strategy))
        .collect()
}
