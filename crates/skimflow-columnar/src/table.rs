#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::error::{ColumnarError, ColumnarResult, SchemaError};
use crate::stats::ColumnStats;
use crate::types::{ColumnType, TableId, Value};
use crate::view::RowView;

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    /// Set for index columns: values are row positions into this table.
    pub references: Option<TableId>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            references: None,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int64)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float64)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    /// An `Int64` column whose values are row positions into `target`.
    pub fn index(name: impl Into<String>, target: impl Into<TableId>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Int64,
            references: Some(target.into()),
        }
    }

    pub fn is_index(&self) -> bool {
        self.references.is_some()
    }
}

/// Ordered `(name, type)` list declared once per table kind, plus the table identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    id: TableId,
    columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn new(id: impl Into<TableId>, columns: Vec<ColumnSchema>) -> ColumnarResult<Self> {
        let id = id.into();
        for (idx, col) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c.name == col.name) {
                return Err(SchemaError::DuplicateColumn {
                    table: id,
                    column: col.name.clone(),
                }
                .into());
            }
            if col.is_index() && col.column_type != ColumnType::Int64 {
                return Err(SchemaError::InvalidIndexColumn {
                    table: id,
                    column: col.name.clone(),
                }
                .into());
            }
        }
        Ok(Self { id, columns })
    }

    pub fn id(&self) -> &TableId {
        &self.id
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> ColumnarResult<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                SchemaError::UnknownColumn {
                    table: self.id.clone(),
                    column: name.to_owned(),
                }
                .into()
            })
    }

    /// Check arity and per-position types of a row without storing anything.
    pub fn check_row(&self, row: &[Value]) -> ColumnarResult<()> {
        if row.len() != self.columns.len() {
            return Err(SchemaError::ArityMismatch {
                table: self.id.clone(),
                expected: self.columns.len(),
                actual: row.len(),
            }
            .into());
        }
        for (col, value) in self.columns.iter().zip(row) {
            match value.column_type() {
                None if col.is_index() => {
                    return Err(SchemaError::NullIndex {
                        table: self.id.clone(),
                        column: col.name.clone(),
                    }
                    .into())
                }
                None => {}
                Some(t) if t == col.column_type => {}
                Some(_) => {
                    return Err(SchemaError::TypeMismatch {
                        table: self.id.clone(),
                        column: col.name.clone(),
                        expected: col.column_type,
                        actual: value.type_label(),
                    }
                    .into())
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(BitVec),
}

impl ColumnData {
    pub(crate) fn with_capacity(column_type: ColumnType, rows: usize) -> Self {
        match column_type {
            ColumnType::Int64 => ColumnData::Int(Vec::with_capacity(rows)),
            ColumnType::Float64 => ColumnData::Float(Vec::with_capacity(rows)),
            ColumnType::Boolean => ColumnData::Bool(BitVec::with_capacity_bits(rows)),
        }
    }

    /// Store a value already checked against the column type; `Null` stores a placeholder.
    pub(crate) fn push(&mut self, value: &Value) {
        match self {
            ColumnData::Int(v) => v.push(value.as_i64().unwrap_or(0)),
            ColumnData::Float(v) => v.push(value.as_f64().unwrap_or(0.0)),
            ColumnData::Bool(v) => v.push(value.as_bool().unwrap_or(false)),
        }
    }

    fn get(&self, row: usize) -> Value {
        match self {
            ColumnData::Int(v) => Value::Int(v[row]),
            ColumnData::Float(v) => Value::Float(v[row]),
            ColumnData::Bool(v) => Value::Bool(v.get(row)),
        }
    }
}

// Floats compare by bit pattern so two builds of the same rows are equal even with NaNs.
impl PartialEq for ColumnData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnData::Int(a), ColumnData::Int(b)) => a == b,
            (ColumnData::Float(a), ColumnData::Float(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    table: TableId,
    schema: ColumnSchema,
    data: ColumnData,
    /// `None` when every value is present.
    validity: Option<BitVec>,
    len: usize,
    stats: ColumnStats,
}

impl Column {
    pub(crate) fn new(
        table: TableId,
        schema: ColumnSchema,
        data: ColumnData,
        validity: BitVec,
        stats: ColumnStats,
    ) -> Self {
        let len = validity.len();
        let validity = if validity.all_true() {
            None
        } else {
            Some(validity)
        };
        Self {
            table,
            schema,
            data,
            validity,
            len,
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.schema.column_type
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn references(&self) -> Option<&TableId> {
        self.schema.references.as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stats(&self) -> &ColumnStats {
        &self.stats
    }

    pub fn is_valid(&self, row: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v.get(row))
    }

    pub fn value(&self, row: usize) -> ColumnarResult<Value> {
        if row >= self.len {
            return Err(ColumnarError::OutOfRange {
                table: self.table.clone(),
                row,
                row_count: self.len,
            });
        }
        if !self.is_valid(row) {
            return Ok(Value::Null);
        }
        Ok(self.data.get(row))
    }

    /// Iterate every value in row order.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len).map(move |row| {
            if self.is_valid(row) {
                self.data.get(row)
            } else {
                Value::Null
            }
        })
    }
}

/// An immutable table: columns positionally aligned, all of length `row_count`.
///
/// Tables are only created by [`TableBuilder::finalize`](crate::TableBuilder::finalize) and
/// shared as `Arc<Table>`; nothing mutates them afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    schema: Schema,
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub(crate) fn from_parts(schema: Schema, columns: Vec<Column>, rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == rows));
        Self {
            schema,
            columns,
            rows,
        }
    }

    pub fn id(&self) -> &TableId {
        self.schema.id()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> ColumnarResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| {
                SchemaError::UnknownColumn {
                    table: self.id().clone(),
                    column: name.to_owned(),
                }
                .into()
            })
    }

    pub fn value_at(&self, column: &str, row: usize) -> ColumnarResult<Value> {
        self.column(column)?.value(row)
    }

    pub fn row(&self, row: usize) -> ColumnarResult<RowView<'_>> {
        if row >= self.rows {
            return Err(ColumnarError::OutOfRange {
                table: self.id().clone(),
                row,
                row_count: self.rows,
            });
        }
        Ok(RowView::new(self, row))
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = RowView<'_>> + '_ {
        (0..self.rows).map(move |row| RowView::new(self, row))
    }

    /// All values of one row, in schema order.
    pub fn row_values(&self, row: usize) -> ColumnarResult<Vec<Value>> {
        self.row(row)?;
        self.columns.iter().map(|c| c.value(row)).collect()
    }
}
