#![forbid(unsafe_code)]

use std::ops::Range;

use crate::bitmap::BitVec;
use crate::error::{ColumnarError, ColumnarResult, SchemaError};
use crate::table::{Schema, Table};
use crate::types::ColumnType;
use crate::view::RowView;

/// Below this many rows the parallel path is not worth the pool hop.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
const PARALLEL_MIN_ROWS: usize = 16_384;

/// A boolean function of one row.
///
/// An `Err` from [`evaluate`](Predicate::evaluate) means "undefined for this row" and is
/// treated as `false` by the filter engine. Errors from [`validate`](Predicate::validate)
/// are configuration errors and are fatal.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, row: &RowView<'_>) -> ColumnarResult<bool>;

    fn validate(&self, _schema: &Schema) -> ColumnarResult<()> {
        Ok(())
    }

    /// Returns `true` only when column stats prove that no row of `table` can match.
    fn excludes_all(&self, _table: &Table) -> bool {
        false
    }
}

impl<F> Predicate for F
where
    F: Fn(&RowView<'_>) -> ColumnarResult<bool> + Send + Sync,
{
    fn evaluate(&self, row: &RowView<'_>) -> ColumnarResult<bool> {
        self(row)
    }
}

/// Evaluate `predicate` for every row of `table`, in row order.
pub fn selection_mask<P>(table: &Table, predicate: &P) -> ColumnarResult<BitVec>
where
    P: Predicate + ?Sized,
{
    predicate.validate(table.schema())?;

    let rows = table.row_count();
    if predicate.excludes_all(table) {
        log::trace!("{}: predicate excludes all {rows} rows by column stats", table.id());
        return Ok(BitVec::with_len_all_false(rows));
    }

    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if rows >= PARALLEL_MIN_ROWS {
            if let Some(pool) = crate::parallel::rayon_pool() {
                return Ok(pool.install(|| parallel_mask(table, predicate)));
            }
        }
    }

    Ok(mask_range(table, predicate, 0..rows))
}

fn mask_range<P>(table: &Table, predicate: &P, rows: Range<usize>) -> BitVec
where
    P: Predicate + ?Sized,
{
    let mut mask = BitVec::with_capacity_bits(rows.len());
    for row in rows {
        let view = RowView::new(table, row);
        let keep = match predicate.evaluate(&view) {
            Ok(keep) => keep,
            Err(err) => {
                log::trace!("{}: row {row} excluded: {err}", table.id());
                false
            }
        };
        mask.push(keep);
    }
    mask
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn parallel_mask<P>(table: &Table, predicate: &P) -> BitVec
where
    P: Predicate + ?Sized,
{
    use rayon::prelude::*;

    let rows = table.row_count();
    let step = crate::parallel::PARTITION_ROWS;
    let partitions: Vec<BitVec> = (0..rows.div_ceil(step))
        .into_par_iter()
        .map(|p| mask_range(table, predicate, p * step..((p + 1) * step).min(rows)))
        .collect();

    let mut mask = BitVec::with_capacity_bits(rows);
    for part in &partitions {
        mask.extend_from(part);
    }
    mask
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ne,
}

impl CmpOp {
    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Lte => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Gte => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    /// Whether no value in `[min, max]` can satisfy `value <op> rhs`.
    fn excludes_range(self, min: f64, max: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => min >= rhs,
            CmpOp::Lte => min > rhs,
            CmpOp::Gt => max <= rhs,
            CmpOp::Gte => max < rhs,
            CmpOp::Eq => rhs < min || rhs > max,
            CmpOp::Ne => min == max && min == rhs,
        }
    }
}

/// Numeric expression over one row's columns.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarExpr {
    Column(String),
    Const(f64),
    Add(Box<ScalarExpr>, Box<ScalarExpr>),
    Sub(Box<ScalarExpr>, Box<ScalarExpr>),
    Mul(Box<ScalarExpr>, Box<ScalarExpr>),
    Div(Box<ScalarExpr>, Box<ScalarExpr>),
    Sqrt(Box<ScalarExpr>),
    Abs(Box<ScalarExpr>),
}

impl ScalarExpr {
    pub fn col(name: impl Into<String>) -> Self {
        ScalarExpr::Column(name.into())
    }

    pub fn lit(value: f64) -> Self {
        ScalarExpr::Const(value)
    }

    pub fn sqrt(self) -> Self {
        ScalarExpr::Sqrt(Box::new(self))
    }

    pub fn abs(self) -> Self {
        ScalarExpr::Abs(Box::new(self))
    }

    pub fn lt(self, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        self.cmp(CmpOp::Lt, rhs)
    }

    pub fn lte(self, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        self.cmp(CmpOp::Lte, rhs)
    }

    pub fn gt(self, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        self.cmp(CmpOp::Gt, rhs)
    }

    pub fn gte(self, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        self.cmp(CmpOp::Gte, rhs)
    }

    pub fn eq_to(self, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        self.cmp(CmpOp::Eq, rhs)
    }

    pub fn ne_to(self, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        self.cmp(CmpOp::Ne, rhs)
    }

    pub fn cmp(self, op: CmpOp, rhs: impl Into<ScalarExpr>) -> FilterExpr {
        FilterExpr::Cmp {
            lhs: self,
            op,
            rhs: rhs.into(),
        }
    }

    /// Evaluate to a finite number; anything undefined (null, NaN, infinities) is an error.
    pub fn eval(&self, row: &RowView<'_>) -> ColumnarResult<f64> {
        let v = match self {
            ScalarExpr::Column(name) => row.f64(name)?,
            ScalarExpr::Const(v) => *v,
            ScalarExpr::Add(a, b) => a.eval(row)? + b.eval(row)?,
            ScalarExpr::Sub(a, b) => a.eval(row)? - b.eval(row)?,
            ScalarExpr::Mul(a, b) => a.eval(row)? * b.eval(row)?,
            ScalarExpr::Div(a, b) => {
                let denom = b.eval(row)?;
                if denom == 0.0 {
                    return Err(ColumnarError::Eval("division by zero".to_owned()));
                }
                a.eval(row)? / denom
            }
            ScalarExpr::Sqrt(a) => {
                let v = a.eval(row)?;
                if v < 0.0 {
                    return Err(ColumnarError::Eval(format!("sqrt of negative value {v}")));
                }
                v.sqrt()
            }
            ScalarExpr::Abs(a) => a.eval(row)?.abs(),
        };
        if !v.is_finite() {
            return Err(ColumnarError::Eval(format!("non-finite value {v}")));
        }
        Ok(v)
    }

    fn validate(&self, schema: &Schema) -> ColumnarResult<()> {
        match self {
            ScalarExpr::Column(name) => {
                let col = schema.require_column(name)?;
                if !col.column_type.is_numeric() {
                    return Err(SchemaError::TypeMismatch {
                        table: schema.id().clone(),
                        column: name.clone(),
                        expected: ColumnType::Float64,
                        actual: col.column_type.label(),
                    }
                    .into());
                }
                Ok(())
            }
            ScalarExpr::Const(_) => Ok(()),
            ScalarExpr::Add(a, b)
            | ScalarExpr::Sub(a, b)
            | ScalarExpr::Mul(a, b)
            | ScalarExpr::Div(a, b) => {
                a.validate(schema)?;
                b.validate(schema)
            }
            ScalarExpr::Sqrt(a) | ScalarExpr::Abs(a) => a.validate(schema),
        }
    }
}

impl From<f64> for ScalarExpr {
    fn from(value: f64) -> Self {
        ScalarExpr::Const(value)
    }
}

impl From<&str> for ScalarExpr {
    fn from(value: &str) -> Self {
        ScalarExpr::col(value)
    }
}

macro_rules! scalar_binop {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl std::ops::$trait for ScalarExpr {
            type Output = ScalarExpr;

            fn $method(self, rhs: ScalarExpr) -> ScalarExpr {
                ScalarExpr::$variant(Box::new(self), Box::new(rhs))
            }
        }
    };
}

scalar_binop!(Add, add, Add);
scalar_binop!(Sub, sub, Sub);
scalar_binop!(Mul, mul, Mul);
scalar_binop!(Div, div, Div);

/// Declarative row predicate.
///
/// `And`/`Or` short-circuit left to right. `Not` of an undefined operand stays undefined, so
/// negating a filter never lets a malformed row through.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    Cmp {
        lhs: ScalarExpr,
        op: CmpOp,
        rhs: ScalarExpr,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    /// A boolean column.
    IsTrue(String),
    /// Bit `bit` of an int64 flag column is set.
    TestBit { column: String, bit: u32 },
    IsNull(String),
}

impl FilterExpr {
    pub fn is_true(column: impl Into<String>) -> Self {
        FilterExpr::IsTrue(column.into())
    }

    pub fn test_bit(column: impl Into<String>, bit: u32) -> Self {
        FilterExpr::TestBit {
            column: column.into(),
            bit,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        FilterExpr::IsNull(column.into())
    }

    pub fn and(self, other: FilterExpr) -> Self {
        FilterExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FilterExpr) -> Self {
        FilterExpr::Or(Box::new(self), Box::new(other))
    }

    fn require_type(schema: &Schema, column: &str, expected: ColumnType) -> ColumnarResult<()> {
        let col = schema.require_column(column)?;
        if col.column_type != expected {
            return Err(SchemaError::TypeMismatch {
                table: schema.id().clone(),
                column: column.to_owned(),
                expected,
                actual: col.column_type.label(),
            }
            .into());
        }
        Ok(())
    }
}

impl std::ops::Not for FilterExpr {
    type Output = FilterExpr;

    fn not(self) -> FilterExpr {
        FilterExpr::Not(Box::new(self))
    }
}

impl Predicate for FilterExpr {
    fn evaluate(&self, row: &RowView<'_>) -> ColumnarResult<bool> {
        match self {
            FilterExpr::Cmp { lhs, op, rhs } => Ok(op.apply(lhs.eval(row)?, rhs.eval(row)?)),
            FilterExpr::And(a, b) => Ok(a.evaluate(row)? && b.evaluate(row)?),
            FilterExpr::Or(a, b) => Ok(a.evaluate(row)? || b.evaluate(row)?),
            FilterExpr::Not(a) => Ok(!a.evaluate(row)?),
            FilterExpr::IsTrue(column) => row.bool(column),
            FilterExpr::TestBit { column, bit } => {
                if *bit >= 64 {
                    return Err(ColumnarError::Eval(format!("bit {bit} out of range")));
                }
                Ok((row.i64(column)? >> bit) & 1 == 1)
            }
            FilterExpr::IsNull(column) => Ok(row.get(column)?.is_null()),
        }
    }

    fn validate(&self, schema: &Schema) -> ColumnarResult<()> {
        match self {
            FilterExpr::Cmp { lhs, rhs, .. } => {
                lhs.validate(schema)?;
                rhs.validate(schema)
            }
            FilterExpr::And(a, b) | FilterExpr::Or(a, b) => {
                a.validate(schema)?;
                b.validate(schema)
            }
            FilterExpr::Not(a) => a.validate(schema),
            FilterExpr::IsTrue(column) => Self::require_type(schema, column, ColumnType::Boolean),
            FilterExpr::TestBit { column, .. } => {
                Self::require_type(schema, column, ColumnType::Int64)
            }
            FilterExpr::IsNull(column) => schema.require_column(column).map(|_| ()),
        }
    }

    fn excludes_all(&self, table: &Table) -> bool {
        match self {
            FilterExpr::Cmp {
                lhs: ScalarExpr::Column(name),
                op,
                rhs: ScalarExpr::Const(rhs),
            } => {
                let Ok(col) = table.column(name) else {
                    return false;
                };
                match (col.stats().min, col.stats().max) {
                    (Some(min), Some(max)) => op.excludes_range(min, max, *rhs),
                    // Only nulls/NaNs: every row is undefined.
                    _ => true,
                }
            }
            FilterExpr::IsTrue(name) => table
                .column(name)
                .is_ok_and(|col| col.stats().sum.unwrap_or(0.0) == 0.0),
            FilterExpr::And(a, b) => a.excludes_all(table) || b.excludes_all(table),
            FilterExpr::Or(a, b) => a.excludes_all(table) && b.excludes_all(table),
            _ => false,
        }
    }
}

/// Conjunction of predicates evaluated in declaration order.
pub struct AllOf(Vec<Box<dyn Predicate>>);

impl AllOf {
    pub fn new(predicates: Vec<Box<dyn Predicate>>) -> Self {
        Self(predicates)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, predicate: Box<dyn Predicate>) {
        self.0.push(predicate);
    }
}

impl std::fmt::Debug for AllOf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllOf({} predicates)", self.0.len())
    }
}

impl Predicate for AllOf {
    fn evaluate(&self, row: &RowView<'_>) -> ColumnarResult<bool> {
        for predicate in &self.0 {
            if !predicate.evaluate(row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn validate(&self, schema: &Schema) -> ColumnarResult<()> {
        self.0.iter().try_for_each(|p| p.validate(schema))
    }

    fn excludes_all(&self, table: &Table) -> bool {
        self.0.iter().any(|p| p.excludes_all(table))
    }
}
