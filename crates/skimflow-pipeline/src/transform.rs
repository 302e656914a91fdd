use std::fmt;
use std::sync::Arc;

use skimflow_columnar::{
    ColumnarResult, FilteredView, RowView, Schema, Table, TableBuilder, TableStore, Value,
};

/// Computes one output row of a derived table from one input row.
///
/// Implementations must be pure: the same input row and store always yield the same values.
/// Index columns of the input row are resolved through `store`.
pub trait RowTransform: Send + Sync {
    fn output_schema(&self) -> &Schema;

    fn compute_row(&self, row: &RowView<'_>, store: &TableStore) -> ColumnarResult<Vec<Value>>;
}

/// A [`RowTransform`] backed by a closure.
pub struct FnTransform<F> {
    schema: Schema,
    compute: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&RowView<'_>, &TableStore) -> ColumnarResult<Vec<Value>> + Send + Sync,
{
    pub fn new(schema: Schema, compute: F) -> Self {
        Self { schema, compute }
    }
}

impl<F> fmt::Debug for FnTransform<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransform")
            .field("output", self.schema.id())
            .finish_non_exhaustive()
    }
}

impl<F> RowTransform for FnTransform<F>
where
    F: Fn(&RowView<'_>, &TableStore) -> ColumnarResult<Vec<Value>> + Send + Sync,
{
    fn output_schema(&self) -> &Schema {
        &self.schema
    }

    fn compute_row(&self, row: &RowView<'_>, store: &TableStore) -> ColumnarResult<Vec<Value>> {
        (self.compute)(row, store)
    }
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
const PARALLEL_MIN_ROWS: usize = 1_024;

/// Run `transform` over every row of `view`, in view order, into a new finalized table.
///
/// Stops at the first row (in view order) whose computation or append fails.
pub fn materialize<T>(
    view: &FilteredView<'_>,
    transform: &T,
    store: &TableStore,
) -> ColumnarResult<Arc<Table>>
where
    T: RowTransform + ?Sized,
{
    let mut builder = TableBuilder::with_capacity(transform.output_schema().clone(), view.len());

    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if view.len() >= PARALLEL_MIN_ROWS {
            if let Some(pool) = skimflow_columnar::parallel::rayon_pool() {
                let rows = pool.install(|| compute_parallel(view, transform, store));
                for row in rows {
                    builder.append(&row?)?;
                }
                return builder.finalize();
            }
        }
    }

    for row in view.iter() {
        builder.append(&transform.compute_row(&row, store)?)?;
    }
    builder.finalize()
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn compute_parallel<T>(
    view: &FilteredView<'_>,
    transform: &T,
    store: &TableStore,
) -> Vec<ColumnarResult<Vec<Value>>>
where
    T: RowTransform + ?Sized,
{
    use rayon::prelude::*;

    let table = view.table();
    view.positions()
        .par_iter()
        .map(|&pos| transform.compute_row(&table.row(pos)?, store))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skimflow_columnar::{ColumnSchema, ColumnarError, ScalarExpr, SchemaError};

    fn input() -> Arc<Table> {
        let schema = Schema::new("Tracks", vec![ColumnSchema::float("pt")]).unwrap();
        TableBuilder::build_from_rows(
            schema,
            [1.0, 5.0, 9.0].into_iter().map(|v| vec![Value::Float(v)]),
        )
        .unwrap()
    }

    fn doubled() -> impl RowTransform {
        let schema = Schema::new("Doubled", vec![ColumnSchema::float("pt2")]).unwrap();
        FnTransform::new(schema, |row, _store| Ok(vec![Value::Float(row.f64("pt")? * 2.0)]))
    }

    #[test]
    fn materialize_follows_view_order() {
        let table = input();
        let view = FilteredView::new(&table, &ScalarExpr::col("pt").gt(4.0)).unwrap();
        let out = materialize(&view, &doubled(), &TableStore::new()).unwrap();

        assert_eq!(out.id().as_str(), "Doubled");
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.value_at("pt2", 0).unwrap(), Value::Float(10.0));
        assert_eq!(out.value_at("pt2", 1).unwrap(), Value::Float(18.0));
    }

    #[test]
    fn wrong_arity_from_transform_is_a_schema_error() {
        let table = input();
        let schema = Schema::new(
            "Wide",
            vec![ColumnSchema::float("a"), ColumnSchema::float("b")],
        )
        .unwrap();
        let narrow = FnTransform::new(schema, |_row, _store| Ok(vec![Value::Float(1.0)]));

        let err = materialize(&FilteredView::all(&table), &narrow, &TableStore::new()).unwrap_err();
        assert!(matches!(
            err,
            ColumnarError::Schema(SchemaError::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }
}
