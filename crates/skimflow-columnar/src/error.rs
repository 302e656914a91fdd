#![forbid(unsafe_code)]

use crate::types::{ColumnType, TableId};

pub type ColumnarResult<T> = Result<T, ColumnarError>;

/// A name, type or arity mismatch against a declared [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown column {table}[{column}]")]
    UnknownColumn { table: TableId, column: String },

    #[error("duplicate column {table}[{column}]")]
    DuplicateColumn { table: TableId, column: String },

    #[error("arity mismatch for {table}: expected {expected} values, got {actual}")]
    ArityMismatch {
        table: TableId,
        expected: usize,
        actual: usize,
    },

    #[error("type mismatch for {table}[{column}]: expected {expected}, got {actual}")]
    TypeMismatch {
        table: TableId,
        column: String,
        expected: ColumnType,
        actual: &'static str,
    },

    #[error("{table}[{column}] is not an int64 index column")]
    InvalidIndexColumn { table: TableId, column: String },

    #[error("index column {table}[{column}] cannot hold null")]
    NullIndex { table: TableId, column: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ColumnarError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("row {row} out of range for {table} ({row_count} rows)")]
    OutOfRange {
        table: TableId,
        row: usize,
        row_count: usize,
    },

    #[error("dangling reference into {table}: row {row} (table has {row_count} rows)")]
    DanglingReference {
        table: TableId,
        row: i64,
        row_count: usize,
    },

    #[error("duplicate table: {table}")]
    DuplicateTable { table: TableId },

    #[error("unknown table: {table}")]
    UnknownTable { table: TableId },

    #[error("writer for {table} is already finalized")]
    WriterClosed { table: TableId },

    #[error("evaluation error: {0}")]
    Eval(String),
}

impl ColumnarError {
    pub fn is_schema_error(&self) -> bool {
        matches!(self, ColumnarError::Schema(_))
    }
}
