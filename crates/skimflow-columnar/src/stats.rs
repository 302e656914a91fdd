#![forbid(unsafe_code)]

use crate::types::{ColumnType, Value};

/// Per-column summary collected while the column is built.
///
/// `min`/`max`/`sum` only consider non-null values; NaN floats are skipped so the bounds stay
/// usable for predicate pruning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnStats {
    pub column_type: ColumnType,
    pub null_count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
}

impl ColumnStats {
    pub(crate) fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            ..Self::default()
        }
    }

    pub(crate) fn observe(&mut self, value: &Value) {
        let v = match value {
            Value::Null => {
                self.null_count += 1;
                return;
            }
            Value::Bool(b) => {
                // Booleans only track the number of `true` values.
                self.sum = Some(self.sum.unwrap_or(0.0) + if *b { 1.0 } else { 0.0 });
                return;
            }
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
        };
        if v.is_nan() {
            return;
        }
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
        self.sum = Some(self.sum.unwrap_or(0.0) + v);
    }
}
