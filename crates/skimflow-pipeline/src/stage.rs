use std::fmt;

use serde::Serialize;
use skimflow_columnar::{
    AllOf, ColumnarResult, FilteredView, Predicate, RowView, Table, TableId, TableStore,
};

use crate::sink::HistogramSink;
use crate::transform::{materialize, RowTransform};

/// Reads rows of a terminal stage, typically to fill histograms.
pub trait RowConsumer: Send + Sync {
    fn consume(
        &self,
        row: &RowView<'_>,
        store: &TableStore,
        sink: &mut dyn HistogramSink,
    ) -> ColumnarResult<()>;
}

/// A [`RowConsumer`] backed by a closure.
pub struct FnConsumer<F> {
    consume: F,
}

impl<F> FnConsumer<F>
where
    F: Fn(&RowView<'_>, &TableStore, &mut dyn HistogramSink) -> ColumnarResult<()> + Send + Sync,
{
    pub fn new(consume: F) -> Self {
        Self { consume }
    }
}

impl<F> RowConsumer for FnConsumer<F>
where
    F: Fn(&RowView<'_>, &TableStore, &mut dyn HistogramSink) -> ColumnarResult<()> + Send + Sync,
{
    fn consume(
        &self,
        row: &RowView<'_>,
        store: &TableStore,
        sink: &mut dyn HistogramSink,
    ) -> ColumnarResult<()> {
        (self.consume)(row, store, sink)
    }
}

pub enum StageAction {
    /// Materialize one derived table from the selected rows.
    Produce(Box<dyn RowTransform>),
    /// Terminal: read the selected rows without producing a table.
    Consume(Box<dyn RowConsumer>),
}

impl fmt::Debug for StageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageAction::Produce(t) => write!(f, "Produce({})", t.output_schema().id()),
            StageAction::Consume(_) => f.write_str("Consume"),
        }
    }
}

/// One unit of work: select rows of `input` with the stage filters, then run the action.
#[derive(Debug)]
pub struct Stage {
    name: String,
    input: TableId,
    filters: AllOf,
    references: Vec<TableId>,
    action: StageAction,
}

impl Stage {
    pub fn new(name: impl Into<String>, input: impl Into<TableId>, action: StageAction) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            filters: AllOf::new(Vec::new()),
            references: Vec::new(),
            action,
        }
    }

    pub fn produce(
        name: impl Into<String>,
        input: impl Into<TableId>,
        transform: impl RowTransform + 'static,
    ) -> Self {
        Self::new(name, input, StageAction::Produce(Box::new(transform)))
    }

    pub fn consume(
        name: impl Into<String>,
        input: impl Into<TableId>,
        consumer: impl RowConsumer + 'static,
    ) -> Self {
        Self::new(name, input, StageAction::Consume(Box::new(consumer)))
    }

    /// Add a filter. Filters run in the order they were added, before the action.
    pub fn filter(mut self, predicate: impl Predicate + 'static) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Declare a table this stage resolves index columns into.
    ///
    /// While the stage runs, its transform or consumer sees a store holding only the input
    /// table and the declared references; following an index anywhere else fails with
    /// `UnknownTable`.
    pub fn reads(mut self, table: impl Into<TableId>) -> Self {
        self.references.push(table.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &TableId {
        &self.input
    }

    pub fn references(&self) -> &[TableId] {
        &self.references
    }

    pub fn action(&self) -> &StageAction {
        &self.action
    }

    /// The table this stage produces; `None` for terminal stages.
    pub fn output(&self) -> Option<&TableId> {
        match &self.action {
            StageAction::Produce(t) => Some(t.output_schema().id()),
            StageAction::Consume(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.action, StageAction::Consume(_))
    }

    /// Rows of `table` that pass every filter of this stage.
    pub fn select<'a>(&self, table: &'a Table) -> ColumnarResult<FilteredView<'a>> {
        if self.filters.is_empty() {
            return Ok(FilteredView::all(table));
        }
        FilteredView::new(table, &self.filters)
    }

    pub(crate) fn execute(
        &self,
        store: &mut TableStore,
        sink: &mut dyn HistogramSink,
    ) -> ColumnarResult<StageReport> {
        let input = store.get(self.input.as_str())?.clone();
        let view = self.select(&input)?;
        if view.is_empty() && input.row_count() > 0 {
            log::warn!(
                "stage `{}`: no rows of {} passed the filters",
                self.name,
                self.input
            );
        }

        let mut report = StageReport {
            stage: self.name.clone(),
            input: self.input.clone(),
            input_rows: input.row_count(),
            selected_rows: view.len(),
            output: None,
            output_rows: 0,
        };

        // Rows may only resolve into the input and the declared references.
        let scope = store.scoped(std::iter::once(&self.input).chain(&self.references))?;
        match &self.action {
            StageAction::Produce(transform) => {
                let table = materialize(&view, transform.as_ref(), &scope)?;
                report.output = Some(table.id().clone());
                report.output_rows = table.row_count();
                store.insert(table)?;
            }
            StageAction::Consume(consumer) => {
                for row in view.iter() {
                    consumer.consume(&row, &scope, sink)?;
                }
            }
        }
        Ok(report)
    }
}

/// Row counts of one executed stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: String,
    #[serde(serialize_with = "serialize_table_id")]
    pub input: TableId,
    pub input_rows: usize,
    pub selected_rows: usize,
    #[serde(serialize_with = "serialize_optional_table_id")]
    pub output: Option<TableId>,
    pub output_rows: usize,
}

fn serialize_table_id<S: serde::Serializer>(id: &TableId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(id.as_str())
}

fn serialize_optional_table_id<S: serde::Serializer>(
    id: &Option<TableId>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => s.serialize_some(id.as_str()),
        None => s.serialize_none(),
    }
}
