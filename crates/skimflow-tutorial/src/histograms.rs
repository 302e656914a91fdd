use serde::Serialize;

/// Binning of a one-dimensional histogram as declared by a task.
///
/// Fills are reported to a `HistogramSink` by name; the binning is only carried along for
/// sinks and reports that want it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

impl HistogramSpec {
    pub const fn new(
        name: &'static str,
        title: &'static str,
        bins: usize,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            name,
            title,
            bins,
            min,
            max,
        }
    }

    /// Bin index of `value`, or `None` for underflow, overflow and NaN.
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) || self.bins == 0 {
            return None;
        }
        let width = (self.max - self.min) / self.bins as f64;
        let bin = ((value - self.min) / width) as usize;
        Some(bin.min(self.bins - 1))
    }
}

pub const H_MASS_K0_SHORT: HistogramSpec =
    HistogramSpec::new("hMassK0Short", "hMassK0Short", 200, 0.450, 0.550);

pub const H_VERTEX_Z: &str = "hVertexZ";

/// `hVertexZ` takes its bin count from the `nBins` option.
pub fn h_vertex_z(bins: usize) -> HistogramSpec {
    HistogramSpec::new(H_VERTEX_Z, H_VERTEX_Z, bins, -15.0, 15.0)
}

pub const H_MASS_D0: HistogramSpec = HistogramSpec::new(
    "hMassD0",
    ";M(Kpi) (GeV/c^2);counts",
    300,
    1.75,
    2.05,
);
pub const H_MASS_D0BAR: HistogramSpec = HistogramSpec::new(
    "hMassD0bar",
    ";M(piK) (GeV/c^2);counts",
    300,
    1.75,
    2.05,
);
pub const H_PT: HistogramSpec = HistogramSpec::new("hPt", ";p_T (GeV/c);counts", 50, 0.0, 50.0);
pub const H_COSP: HistogramSpec =
    HistogramSpec::new("hCosp", ";cos(theta_P) ;counts", 100, 0.8, 1.0);

pub fn vzero_histograms(n_bins: usize) -> Vec<HistogramSpec> {
    vec![h_vertex_z(n_bins), H_MASS_K0_SHORT]
}

pub fn derived_table_histograms() -> Vec<HistogramSpec> {
    vec![H_MASS_D0, H_MASS_D0BAR, H_PT, H_COSP]
}
