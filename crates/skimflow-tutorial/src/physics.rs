//! Two-prong candidate kinematics.

use skimflow_columnar::{ColumnarResult, RowView};

/// Charged pion mass in GeV/c².
pub const MASS_PION: f64 = 0.13957039;
/// Charged kaon mass in GeV/c².
pub const MASS_KAON: f64 = 0.493677;

/// Momenta of the two daughters of a candidate, in GeV/c.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prong2 {
    pub prong0: [f64; 3],
    pub prong1: [f64; 3],
}

impl Prong2 {
    pub fn from_row(row: &RowView<'_>) -> ColumnarResult<Self> {
        Ok(Self {
            prong0: [
                row.f64("px_prong0")?,
                row.f64("py_prong0")?,
                row.f64("pz_prong0")?,
            ],
            prong1: [
                row.f64("px_prong1")?,
                row.f64("py_prong1")?,
                row.f64("pz_prong1")?,
            ],
        })
    }

    pub fn px(&self) -> f64 {
        self.prong0[0] + self.prong1[0]
    }

    pub fn py(&self) -> f64 {
        self.prong0[1] + self.prong1[1]
    }

    pub fn pz(&self) -> f64 {
        self.prong0[2] + self.prong1[2]
    }

    /// Same operation order as [`candidate_pt`](crate::tasks::candidate_pt), so a row's
    /// stored `pt` always agrees with the cut that selected it.
    pub fn pt(&self) -> f64 {
        let (px, py) = (self.px(), self.py());
        (px * px + py * py).sqrt()
    }

    /// Invariant mass with `m0` assigned to prong 0 and `m1` to prong 1.
    pub fn inv_mass(&self, m0: f64, m1: f64) -> f64 {
        let e0 = energy(&self.prong0, m0);
        let e1 = energy(&self.prong1, m1);
        let (px, py, pz) = (self.px(), self.py(), self.pz());
        let m2 = (e0 + e1).powi(2) - (px * px + py * py + pz * pz);
        m2.max(0.0).sqrt()
    }

    /// D0 → π⁺K⁻ hypothesis: prong 0 is the pion.
    pub fn inv_mass_d0(&self) -> f64 {
        self.inv_mass(MASS_PION, MASS_KAON)
    }

    /// D0bar → K⁺π⁻ hypothesis: prong 0 is the kaon.
    pub fn inv_mass_d0bar(&self) -> f64 {
        self.inv_mass(MASS_KAON, MASS_PION)
    }
}

fn energy(p: &[f64; 3], mass: f64) -> f64 {
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2] + mass * mass).sqrt()
}
