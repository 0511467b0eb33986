//! Debounced value edits for a single column.
//!
//! Text inputs and number sliders fire on every keystroke or drag step. The
//! editor funnels those edits through a [`Debouncer`] so only the settled
//! value reaches the filter state, while [`DebouncedValueEditor::commit`]
//! writes immediately and drops whatever edit was still pending.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::column::FilterColumn;
use crate::filters::DataTableFilters;
use crate::settings::FilterSettings;
use crate::types::ColumnDataType;
use crate::utils::debounce::Debouncer;

/// Filters shared between the editor's timer task and its owner.
pub type SharedFilters<TData> = Arc<Mutex<DataTableFilters<TData>>>;

pub struct DebouncedValueEditor<TData> {
    filters: SharedFilters<TData>,
    column_id: String,
    data_type: ColumnDataType,
    debouncer: Debouncer<Vec<Value>>,
}

fn write_values<TData>(
    filters: &SharedFilters<TData>,
    column_id: &str,
    data_type: ColumnDataType,
    values: &[Value],
) {
    let mut filters = filters.lock().unwrap_or_else(PoisonError::into_inner);
    filters.set_filter_value(&(column_id, data_type), values);
}

impl<TData: Send + Sync + 'static> DebouncedValueEditor<TData> {
    /// Editor for `column`, with the wait for its type taken from `settings`.
    pub fn new(
        filters: SharedFilters<TData>,
        column: &impl FilterColumn,
        settings: &FilterSettings,
    ) -> Self {
        let column_id = column.id().to_string();
        let data_type = column.data_type();
        let options = settings.debounce_for(data_type);

        let target = filters.clone();
        let id = column_id.clone();
        let debouncer = Debouncer::new(options, move |values: Vec<Value>| {
            debug!(column = %id, values = values.len(), "applying debounced filter value");
            write_values(&target, &id, data_type, &values);
        });

        Self {
            filters,
            column_id,
            data_type,
            debouncer,
        }
    }

    pub fn column_id(&self) -> &str {
        &self.column_id
    }

    /// Queue `values`; only the last edit of a burst is written.
    pub fn edit(&self, values: Vec<Value>) {
        self.debouncer.call(values);
    }

    /// Write `values` now, discarding any pending edit.
    pub fn commit(&self, values: &[Value]) {
        self.debouncer.cancel();
        debug!(column = %self.column_id, values = values.len(), "committing filter value");
        write_values(&self.filters, &self.column_id, self.data_type, values);
    }

    pub fn flush(&self) {
        self.debouncer.flush();
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnConfig, ColumnConfigHelper};
    use crate::types::FilterStrategy;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::{advance, sleep};

    struct Product {
        price: f64,
    }

    fn shared() -> (SharedFilters<Product>, ColumnConfig<Product>) {
        let price = ColumnConfigHelper::<Product>::new()
            .number()
            .id("price")
            .accessor(|p: &Product| json!(p.price))
            .display_name("Price")
            .icon("dollar")
            .build()
            .unwrap();
        let data = Arc::new(vec![Product { price: 3.0 }, Product { price: 12.0 }]);
        let filters = DataTableFilters::new(data, vec![price.clone()], FilterStrategy::Client);
        (Arc::new(Mutex::new(filters)), price)
    }

    fn current(filters: &SharedFilters<Product>) -> Option<Vec<Value>> {
        filters
            .lock()
            .unwrap()
            .filters()
            .get("price")
            .map(|f| f.values.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn slider_drag_writes_only_the_settled_value() {
        let (filters, price) = shared();
        let editor = DebouncedValueEditor::new(filters.clone(), &price, &FilterSettings::default());

        for step in [4, 5, 6] {
            editor.edit(vec![json!(step), json!(10)]);
            advance(Duration::from_millis(20)).await;
        }
        assert!(editor.is_pending());
        assert_eq!(current(&filters), None);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(current(&filters), Some(vec![json!(6), json!(10)]));
        assert!(!editor.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn commit_preempts_a_pending_edit() {
        let (filters, price) = shared();
        let editor = DebouncedValueEditor::new(filters.clone(), &price, &FilterSettings::default());

        editor.edit(vec![json!(1), json!(2)]);
        editor.commit(&[json!(7)]);
        assert!(!editor.is_pending());
        assert_eq!(current(&filters), Some(vec![json!(7)]));

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(current(&filters), Some(vec![json!(7)]));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_and_cancel() {
        let (filters, price) = shared();
        let editor = DebouncedValueEditor::new(filters.clone(), &price, &FilterSettings::default());
        assert_eq!(editor.column_id(), "price");

        editor.edit(vec![json!(5)]);
        editor.flush();
        assert_eq!(current(&filters), Some(vec![json!(5)]));

        editor.edit(vec![json!(9)]);
        editor.cancel();
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(current(&filters), Some(vec![json!(5)]));
    }
}
