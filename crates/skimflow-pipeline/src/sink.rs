use std::collections::BTreeMap;

/// Destination for histogram fills made by terminal stages.
///
/// Binning is the sink's business; stages only report named values.
pub trait HistogramSink {
    fn fill(&mut self, name: &str, value: f64);
}

/// Discards every fill.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl HistogramSink for NullSink {
    fn fill(&mut self, _name: &str, _value: f64) {}
}

/// Keeps every fill, grouped by histogram name, in fill order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingSink {
    fills: BTreeMap<String, Vec<f64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, name: &str) -> &[f64] {
        self.fills.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, name: &str) -> usize {
        self.values(name).len()
    }

    pub fn mean(&self, name: &str) -> Option<f64> {
        let values = self.values(name);
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Histogram names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fills.keys().map(String::as_str)
    }

    pub fn total_fills(&self) -> usize {
        self.fills.values().map(Vec::len).sum()
    }
}

impl HistogramSink for RecordingSink {
    fn fill(&mut self, name: &str, value: f64) {
        match self.fills.get_mut(name) {
            Some(values) => values.push(value),
            None => {
                self.fills.insert(name.to_owned(), vec![value]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_groups_fills_in_order() {
        let mut sink = RecordingSink::new();
        sink.fill("hPt", 5.0);
        sink.fill("hCosp", 0.9);
        sink.fill("hPt", 9.0);

        assert_eq!(sink.values("hPt"), &[5.0, 9.0]);
        assert_eq!(sink.count("hCosp"), 1);
        assert_eq!(sink.count("hMassD0"), 0);
        assert_eq!(sink.mean("hPt"), Some(7.0));
        assert_eq!(sink.mean("hMassD0"), None);
        assert_eq!(sink.names().collect::<Vec<_>>(), vec!["hCosp", "hPt"]);
        assert_eq!(sink.total_fills(), 3);
    }
}
