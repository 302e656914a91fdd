//! Immutable in-memory columnar tables for derived-table pipelines.
//!
//! This crate focuses on:
//! - Typed columns (`Int64`, `Float64`, `Boolean`) with validity bitmaps and build-time stats.
//! - A single-writer [`TableBuilder`] that validates every row against a declared [`Schema`]
//!   and freezes into an `Arc<Table>` exactly once.
//! - Row predicates ([`FilterExpr`] or any closure) producing ordered [`FilteredView`]s that
//!   never copy column data.
//! - A [`TableStore`] keyed by table identity, resolving index columns into rows of other
//!   tables through explicit [`RowRef`]s.

#![forbid(unsafe_code)]

mod bitmap;
mod builder;
mod error;
mod filter;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
pub mod parallel;
mod stats;
mod store;
mod table;
mod types;
mod view;

pub use crate::bitmap::BitVec;
pub use crate::builder::TableBuilder;
pub use crate::error::{ColumnarError, ColumnarResult, SchemaError};
pub use crate::filter::{selection_mask, AllOf, CmpOp, FilterExpr, Predicate, ScalarExpr};
pub use crate::stats::ColumnStats;
pub use crate::store::TableStore;
pub use crate::table::{Column, ColumnSchema, Schema, Table};
pub use crate::types::{ColumnType, TableId, Value};
pub use crate::view::{FilteredView, RowRef, RowView};
