#![forbid(unsafe_code)]

use crate::error::{ColumnarError, ColumnarResult, SchemaError};
use crate::filter::{selection_mask, Predicate};
use crate::store::TableStore;
use crate::table::Table;
use crate::types::{TableId, Value};

/// A `(table, row)` back-reference read from an index column.
///
/// The row is kept signed so that corrupt negative indices surface as dangling references
/// instead of wrapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowRef {
    pub table: TableId,
    pub row: i64,
}

/// Non-owning positional handle into a table.
#[derive(Clone, Copy, Debug)]
pub struct RowView<'a> {
    table: &'a Table,
    row: usize,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(table: &'a Table, row: usize) -> Self {
        debug_assert!(row < table.row_count());
        Self { table, row }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn position(&self) -> usize {
        self.row
    }

    pub fn get(&self, column: &str) -> ColumnarResult<Value> {
        self.table.value_at(column, self.row)
    }

    /// Numeric value of a column (ints widen). Null or non-numeric values are an error.
    pub fn f64(&self, column: &str) -> ColumnarResult<f64> {
        let value = self.get(column)?;
        value.as_f64().ok_or_else(|| self.undefined(column, &value))
    }

    pub fn i64(&self, column: &str) -> ColumnarResult<i64> {
        let value = self.get(column)?;
        value.as_i64().ok_or_else(|| self.undefined(column, &value))
    }

    pub fn bool(&self, column: &str) -> ColumnarResult<bool> {
        let value = self.get(column)?;
        value.as_bool().ok_or_else(|| self.undefined(column, &value))
    }

    /// Read an index column into an explicit [`RowRef`].
    pub fn index(&self, column: &str) -> ColumnarResult<RowRef> {
        let col = self.table.column(column)?;
        let Some(target) = col.references() else {
            return Err(SchemaError::InvalidIndexColumn {
                table: self.table.id().clone(),
                column: column.to_owned(),
            }
            .into());
        };
        match col.value(self.row)? {
            Value::Int(row) => Ok(RowRef {
                table: target.clone(),
                row,
            }),
            _ => Err(SchemaError::NullIndex {
                table: self.table.id().clone(),
                column: column.to_owned(),
            }
            .into()),
        }
    }

    /// Follow an index column to the referenced row in `store`.
    pub fn follow<'s>(&self, column: &str, store: &'s TableStore) -> ColumnarResult<RowView<'s>> {
        store.resolve(&self.index(column)?)
    }

    fn undefined(&self, column: &str, value: &Value) -> ColumnarError {
        ColumnarError::Eval(format!(
            "{}[{column}] row {} is {}",
            self.table.id(),
            self.row,
            value.type_label()
        ))
    }
}

/// Ordered subsequence of a table's row positions that satisfied a predicate.
///
/// Positions are strictly increasing; column data is read through the borrowed table.
#[derive(Clone, Debug)]
pub struct FilteredView<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Every row of `table`.
    pub fn all(table: &'a Table) -> Self {
        Self {
            table,
            rows: (0..table.row_count()).collect(),
        }
    }

    /// Rows of `table` for which `predicate` holds.
    ///
    /// The predicate is validated against the schema first (unknown columns are fatal). Rows
    /// whose evaluation fails are excluded rather than aborting.
    pub fn new<P>(table: &'a Table, predicate: &P) -> ColumnarResult<Self>
    where
        P: Predicate + ?Sized,
    {
        let mask = selection_mask(table, predicate)?;
        Ok(Self {
            table,
            rows: mask.iter_ones().collect(),
        })
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn positions(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = RowView<'a>> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&row| RowView::new(table, row))
    }
}
