//! The filter engine entry point.
//!
//! [`DataTableFilters`] owns the dataset, the column configs, the strategy,
//! any server-supplied facets and the current [`FiltersState`]. Columns are
//! rebuilt lazily, only when one of their inputs is replaced.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::column::{create_columns, Column, ColumnConfig, Dataset, FilterColumn};
use crate::error::Result;
use crate::filter_fns::filter_rows;
use crate::operators::FilterOperator;
use crate::settings::FilterSettings;
use crate::types::{ColumnOption, FacetMap, FilterStrategy, FiltersState};
use crate::utils::memo::MemoSlot;

/// Called with the new state after every action that changed it.
pub type OnChange = Arc<dyn Fn(&FiltersState) + Send + Sync>;

/// Columns built for the current inputs.
pub type Columns<TData> = Arc<Vec<Arc<Column<TData>>>>;

/// Externally computed facets for the server strategy, keyed by column id.
#[derive(Debug, Clone, Default)]
struct ServerFacets {
    options: HashMap<String, Arc<Vec<ColumnOption>>>,
    faceted: HashMap<String, Arc<FacetMap>>,
    bounds: HashMap<String, (f64, f64)>,
}

impl ServerFacets {
    fn apply<TData>(&self, config: &ColumnConfig<TData>) -> ColumnConfig<TData> {
        let mut config = config.clone();
        if let Some(options) = self.options.get(config.id()) {
            config = config.with_static_options(options.clone());
        }
        if let Some(faceted) = self.faceted.get(config.id()) {
            config = config.with_faceted_options(faceted.clone());
        }
        if let Some(bounds) = self.bounds.get(config.id()) {
            config = config.with_bounds(*bounds);
        }
        config
    }
}

type ColumnsDeps<TData> = (
    Dataset<TData>,
    Arc<Vec<ColumnConfig<TData>>>,
    FilterStrategy,
    Arc<ServerFacets>,
);

pub struct DataTableFilters<TData> {
    data: Dataset<TData>,
    configs: Arc<Vec<ColumnConfig<TData>>>,
    strategy: FilterStrategy,
    server: Arc<ServerFacets>,
    filters: FiltersState,
    columns: MemoSlot<ColumnsDeps<TData>, Columns<TData>>,
    on_change: Option<OnChange>,
}

impl<TData> DataTableFilters<TData> {
    pub fn new(
        data: Dataset<TData>,
        configs: Vec<ColumnConfig<TData>>,
        strategy: FilterStrategy,
    ) -> Self {
        Self {
            data,
            configs: Arc::new(configs),
            strategy,
            server: Arc::default(),
            filters: FiltersState::new(),
            columns: MemoSlot::new("columns"),
            on_change: None,
        }
    }

    /// Construct with the strategy from `settings`.
    pub fn from_settings(
        data: Dataset<TData>,
        configs: Vec<ColumnConfig<TData>>,
        settings: &FilterSettings,
    ) -> Self {
        Self::new(data, configs, settings.strategy)
    }

    /// Start from previously saved filters, typically decoded from JSON.
    pub fn with_default_filters(mut self, filters: FiltersState) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: impl Fn(&FiltersState) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Arc::new(on_change));
        self
    }

    pub fn data(&self) -> &Dataset<TData> {
        &self.data
    }

    pub fn configs(&self) -> &[ColumnConfig<TData>] {
        &self.configs
    }

    pub fn strategy(&self) -> FilterStrategy {
        self.strategy
    }

    pub fn filters(&self) -> &FiltersState {
        &self.filters
    }

    pub fn set_data(&mut self, data: Dataset<TData>) {
        self.data = data;
    }

    pub fn set_strategy(&mut self, strategy: FilterStrategy) {
        self.strategy = strategy;
    }

    fn update_server(&mut self, update: impl FnOnce(&mut ServerFacets)) {
        let mut next = ServerFacets::clone(&self.server);
        update(&mut next);
        self.server = Arc::new(next);
    }

    /// Options for a column, as computed by the server.
    pub fn set_server_options(&mut self, column_id: impl Into<String>, options: Vec<ColumnOption>) {
        let column_id = column_id.into();
        self.update_server(|server| {
            server.options.insert(column_id, Arc::new(options));
        });
    }

    /// Occurrence counts for a column, as computed by the server.
    pub fn set_server_faceted_options(&mut self, column_id: impl Into<String>, faceted: FacetMap) {
        let column_id = column_id.into();
        self.update_server(|server| {
            server.faceted.insert(column_id, Arc::new(faceted));
        });
    }

    /// Numeric bounds for a column, as computed by the server.
    pub fn set_server_bounds(&mut self, column_id: impl Into<String>, bounds: (f64, f64)) {
        let column_id = column_id.into();
        self.update_server(|server| {
            server.bounds.insert(column_id, bounds);
        });
    }

    /// Columns for the current inputs. Returns the same `Arc` until the data,
    /// configs, strategy or server facets are replaced.
    pub fn columns(&self) -> Columns<TData> {
        let deps = (
            self.data.clone(),
            self.configs.clone(),
            self.strategy,
            self.server.clone(),
        );
        self.columns
            .get_or_compute(deps, |(data, configs, strategy, server)| {
                let configs: Vec<ColumnConfig<TData>> =
                    configs.iter().map(|config| server.apply(config)).collect();
                Arc::new(
                    create_columns(data, &configs, *strategy)
                        .into_iter()
                        .map(Arc::new)
                        .collect(),
                )
            })
    }

    pub fn column(&self, column_id: &str) -> Option<Arc<Column<TData>>> {
        self.columns().iter().find(|c| c.id() == column_id).cloned()
    }

    fn notify(&self, changed: bool) {
        if !changed {
            return;
        }
        if let Some(on_change) = &self.on_change {
            on_change(&self.filters);
        }
    }

    /// Replace the whole filter state.
    pub fn set_filters(&mut self, filters: FiltersState) {
        let changed = self.filters != filters;
        self.filters = filters;
        self.notify(changed);
    }

    pub fn add_filter_value(&mut self, column: &impl FilterColumn, values: &[Value]) -> Result<()> {
        let changed = self.filters.add_filter_value(column, values)?;
        self.notify(changed);
        Ok(())
    }

    pub fn remove_filter_value(
        &mut self,
        column: &impl FilterColumn,
        values: &[Value],
    ) -> Result<()> {
        let changed = self.filters.remove_filter_value(column, values)?;
        self.notify(changed);
        Ok(())
    }

    pub fn set_filter_value(&mut self, column: &impl FilterColumn, values: &[Value]) {
        let changed = self.filters.set_filter_value(column, values);
        self.notify(changed);
    }

    pub fn set_filter_operator(&mut self, column_id: &str, operator: FilterOperator) -> Result<()> {
        let changed = self.filters.set_filter_operator(column_id, operator)?;
        self.notify(changed);
        Ok(())
    }

    pub fn remove_filter(&mut self, column_id: &str) {
        let changed = self.filters.remove_filter(column_id);
        self.notify(changed);
    }

    pub fn remove_all_filters(&mut self) {
        let changed = self.filters.remove_all_filters();
        self.notify(changed);
    }

    /// Indices of the rows that pass every active filter.
    ///
    /// With the server strategy the rows are assumed to be filtered already
    /// and every index is returned.
    pub fn filtered_rows(&self) -> Vec<usize> {
        match self.strategy {
            FilterStrategy::Server => (0..self.data.len()).collect(),
            FilterStrategy::Client => {
                let rows = filter_rows(&self.configs, &self.filters, &self.data);
                debug!(
                    filters = self.filters.len(),
                    matched = rows.len(),
                    total = self.data.len(),
                    "filtered rows"
                );
                rows
            }
        }
    }
}

impl<TData> fmt::Debug for DataTableFilters<TData> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTableFilters")
            .field("rows", &self.data.len())
            .field("configs", &self.configs)
            .field("strategy", &self.strategy)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnConfigHelper;
    use crate::types::ColumnDataType;
    use serde_json::json;
    use std::sync::Mutex;

    struct Task {
        title: &'static str,
        status: &'static str,
        points: u32,
    }

    fn tasks() -> Dataset<Task> {
        Arc::new(vec![
            Task {
                title: "Write docs",
                status: "todo",
                points: 1,
            },
            Task {
                title: "Fix login",
                status: "done",
                points: 5,
            },
            Task {
                title: "Login audit",
                status: "todo",
                points: 8,
            },
        ])
    }

    fn configs() -> Vec<ColumnConfig<Task>> {
        let dtf = ColumnConfigHelper::<Task>::new();
        vec![
            dtf.text()
                .id("title")
                .accessor(|t: &Task| json!(t.title))
                .display_name("Title")
                .icon("text")
                .build()
                .unwrap(),
            dtf.option()
                .id("status")
                .accessor(|t: &Task| json!(t.status))
                .display_name("Status")
                .icon("circle")
                .transform_option_fn(|v| {
                    let s = v.as_str().unwrap_or_default();
                    ColumnOption::new(s, s)
                })
                .build()
                .unwrap(),
            dtf.number()
                .id("points")
                .accessor(|t: &Task| json!(t.points))
                .display_name("Points")
                .icon("hash")
                .build()
                .unwrap(),
        ]
    }

    #[test]
    fn columns_are_rebuilt_only_when_inputs_change() {
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Client);
        let first = filters.columns();
        assert!(Arc::ptr_eq(&first, &filters.columns()));

        filters
            .add_filter_value(&("status", ColumnDataType::Option), &[json!("todo")])
            .unwrap();
        assert!(Arc::ptr_eq(&first, &filters.columns()));

        filters.set_data(tasks());
        assert!(!Arc::ptr_eq(&first, &filters.columns()));

        let second = filters.columns();
        filters.set_strategy(FilterStrategy::Server);
        assert!(!Arc::ptr_eq(&second, &filters.columns()));
    }

    #[test]
    fn server_facets_flow_into_columns() {
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Server);
        assert!(filters.column("status").unwrap().get_options().is_err());

        filters.set_server_options("status", vec![ColumnOption::new("todo", "Todo")]);
        let mut counts = FacetMap::new();
        counts.insert("todo".into(), 40);
        filters.set_server_faceted_options("status", counts);
        filters.set_server_bounds("points", (0.0, 13.0));

        let status = filters.column("status").unwrap();
        assert_eq!(status.get_options().unwrap().len(), 1);
        assert_eq!(
            status.get_faceted_unique_values().unwrap().unwrap().get("todo"),
            Some(&40)
        );
        let points = filters.column("points").unwrap();
        assert_eq!(points.get_faceted_min_max_values(), Some((0.0, 13.0)));
    }

    #[test]
    fn filtered_rows_applies_filters_on_the_client() {
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Client);
        assert_eq!(filters.filtered_rows(), vec![0, 1, 2]);

        let title = filters.column("title").unwrap();
        filters.set_filter_value(&*title, &[json!("login")]);
        assert_eq!(filters.filtered_rows(), vec![1, 2]);

        let status = filters.column("status").unwrap();
        filters.add_filter_value(&*status, &[json!("todo")]).unwrap();
        assert_eq!(filters.filtered_rows(), vec![2]);

        filters.set_strategy(FilterStrategy::Server);
        assert_eq!(filters.filtered_rows(), vec![0, 1, 2]);
    }

    #[test]
    fn on_change_fires_only_for_real_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Client)
            .with_on_change(move |state| sink.lock().unwrap().push(state.len()));

        let points = ("points", ColumnDataType::Number);
        filters.set_filter_value(&points, &[json!(3)]);
        filters.set_filter_value(&points, &[json!(3)]);
        filters.set_filter_value(&points, &[json!("nope")]);
        filters.remove_filter("missing");
        filters.remove_all_filters();

        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
    }

    #[test]
    fn default_filters_and_set_filters() {
        let saved: FiltersState = serde_json::from_value(json!([
            {"columnId": "status", "type": "option", "operator": "is", "values": ["done"]}
        ]))
        .unwrap();
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Client)
            .with_default_filters(saved);
        assert_eq!(filters.filtered_rows(), vec![1]);

        filters.set_filters(FiltersState::new());
        assert!(filters.filters().is_empty());
    }

    #[test]
    fn saved_filters_with_duplicates_load_as_one_filter_per_column() {
        let saved: FiltersState = serde_json::from_value(json!([
            {"columnId": "points", "type": "number", "operator": "is between", "values": [10, 2]},
            {"columnId": "points", "type": "number", "operator": "is", "values": [5]},
            {"columnId": "status", "type": "option", "operator": "is", "values": []},
        ]))
        .unwrap();
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Client)
            .with_default_filters(saved.clone());
        assert_eq!(filters.filtered_rows(), vec![1, 2]);

        filters.remove_filter("points");
        assert!(filters.filters().is_empty());
        assert_eq!(filters.filtered_rows(), vec![0, 1, 2]);

        filters.set_filters(saved);
        assert_eq!(filters.filters().len(), 1);
        assert_eq!(
            filters.filters().get("points").unwrap().values,
            vec![json!(2), json!(10)]
        );
    }

    #[test]
    fn invalid_operator_is_reported() {
        let mut filters = DataTableFilters::new(tasks(), configs(), FilterStrategy::Client);
        filters.set_filter_value(&("points", ColumnDataType::Number), &[json!(1)]);
        assert!(filters
            .set_filter_operator("points", FilterOperator::IncludeAllOf)
            .is_err());
        filters
            .set_filter_operator("points", FilterOperator::IsGreaterThanOrEqualTo)
            .unwrap();
        assert_eq!(filters.filtered_rows(), vec![0, 1, 2]);
    }
}
