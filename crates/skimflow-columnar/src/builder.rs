#![forbid(unsafe_code)]

use std::sync::Arc;

use crate::bitmap::BitVec;
use crate::error::{ColumnarError, ColumnarResult};
use crate::stats::ColumnStats;
use crate::table::{Column, ColumnData, ColumnSchema, Schema, Table};
use crate::types::Value;

/// Single-writer table builder.
///
/// Every appended row is validated against the schema before any column is touched, so a
/// rejected row leaves the builder unchanged. [`finalize`](Self::finalize) freezes the rows
/// into an `Arc<Table>` exactly once; afterwards both `append` and `finalize` fail with
/// [`ColumnarError::WriterClosed`].
#[derive(Debug)]
pub struct TableBuilder {
    schema: Schema,
    state: WriterState,
}

#[derive(Debug)]
enum WriterState {
    Open {
        columns: Vec<ColumnBuilder>,
        rows: usize,
    },
    Finalized(Arc<Table>),
}

#[derive(Debug)]
struct ColumnBuilder {
    schema: ColumnSchema,
    data: ColumnData,
    validity: BitVec,
    stats: ColumnStats,
}

impl ColumnBuilder {
    fn new(schema: ColumnSchema, rows: usize) -> Self {
        Self {
            data: ColumnData::with_capacity(schema.column_type, rows),
            validity: BitVec::with_capacity_bits(rows),
            stats: ColumnStats::new(schema.column_type),
            schema,
        }
    }

    fn push(&mut self, value: &Value) {
        self.data.push(value);
        self.validity.push(!value.is_null());
        self.stats.observe(value);
    }
}

impl TableBuilder {
    pub fn new(schema: Schema) -> Self {
        Self::with_capacity(schema, 0)
    }

    pub fn with_capacity(schema: Schema, rows: usize) -> Self {
        let columns = schema
            .columns()
            .iter()
            .cloned()
            .map(|col| ColumnBuilder::new(col, rows))
            .collect();
        Self {
            schema,
            state: WriterState::Open { columns, rows: 0 },
        }
    }

    /// Build a table in one go from already materialized rows.
    pub fn build_from_rows<I>(schema: Schema, rows: I) -> ColumnarResult<Arc<Table>>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let mut builder = Self::new(schema);
        for row in rows {
            builder.append(&row)?;
        }
        builder.finalize()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of successful appends so far (or the row count of the finalized table).
    pub fn row_count(&self) -> usize {
        match &self.state {
            WriterState::Open { rows, .. } => *rows,
            WriterState::Finalized(table) => table.row_count(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, WriterState::Finalized(_))
    }

    /// The table produced by the first `finalize` call, if any.
    pub fn table(&self) -> Option<&Arc<Table>> {
        match &self.state {
            WriterState::Finalized(table) => Some(table),
            WriterState::Open { .. } => None,
        }
    }

    pub fn append(&mut self, row: &[Value]) -> ColumnarResult<()> {
        let WriterState::Open { columns, rows } = &mut self.state else {
            return Err(self.closed());
        };
        self.schema.check_row(row)?;

        for (builder, value) in columns.iter_mut().zip(row) {
            builder.push(value);
        }
        *rows += 1;
        Ok(())
    }

    pub fn finalize(&mut self) -> ColumnarResult<Arc<Table>> {
        let WriterState::Open { columns, rows } = &mut self.state else {
            return Err(self.closed());
        };
        let rows = *rows;
        let columns = std::mem::take(columns);

        let table_id = self.schema.id().clone();
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|b| Column::new(table_id.clone(), b.schema, b.data, b.validity, b.stats))
            .collect();
        let table = Arc::new(Table::from_parts(self.schema.clone(), columns, rows));

        log::debug!("finalized {} with {rows} rows", table_id);
        self.state = WriterState::Finalized(table.clone());
        Ok(table)
    }

    fn closed(&self) -> ColumnarError {
        ColumnarError::WriterClosed {
            table: self.schema.id().clone(),
        }
    }
}
