//! The tutorial analysis tasks, expressed as pipeline stages.

use skimflow_columnar::{
    ColumnarResult, FilterExpr, RowView, ScalarExpr, Schema, TableStore, Value,
};
use skimflow_pipeline::{FnConsumer, HistogramSink, RowTransform, Stage};

use crate::aod::{self, DecayType};
use crate::histograms::{
    H_COSP, H_MASS_D0, H_MASS_D0BAR, H_MASS_K0_SHORT, H_PT, H_VERTEX_Z,
};
use crate::physics::Prong2;

pub const VZERO_EXAMPLE_EVENTS: &str = "vzero-example/events";
pub const VZERO_EXAMPLE_V0S: &str = "vzero-example/v0s";
pub const READ_HF_CANDIDATES: &str = "read-hf-candidates";
pub const PRODUCE_DERIVED_TABLE: &str = "produce-derived-table";
pub const PRODUCE_DERIVED_TABLE_FILTER: &str = "produce-derived-table-filter";
pub const READ_DERIVED_TABLE: &str = "read-derived-table";

/// Candidate transverse momentum computed from the prong momenta, usable in filters.
pub fn candidate_pt() -> ScalarExpr {
    let px = ScalarExpr::col("px_prong0") + ScalarExpr::col("px_prong1");
    let py = ScalarExpr::col("py_prong0") + ScalarExpr::col("py_prong1");
    (px.clone() * px + py.clone() * py).sqrt()
}

fn is_d0() -> FilterExpr {
    FilterExpr::test_bit("hfflag", DecayType::D0ToPiK.bit())
}

/// Event selection plus V0 mass spectrum.
///
/// Accepted collisions fill `hVertexZ`; V0s fill `hMassK0Short` only when their collision
/// passed `sel8`.
pub fn vzero_example() -> Vec<Stage> {
    let events = Stage::consume(
        VZERO_EXAMPLE_EVENTS,
        aod::COLLISIONS,
        FnConsumer::new(|collision, _store, sink| {
            sink.fill(H_VERTEX_Z, collision.f64("pos_z")?);
            Ok(())
        }),
    )
    .filter(FilterExpr::is_true("sel8"));

    let v0s = Stage::consume(
        VZERO_EXAMPLE_V0S,
        aod::V0_DATAS,
        FnConsumer::new(|v0, store, sink| {
            let collision = v0.follow("collision_id", store)?;
            if collision.bool("sel8")? {
                sink.fill(H_MASS_K0_SHORT.name, v0.f64("m_k0_short")?);
            }
            Ok(())
        }),
    )
    .reads(aod::COLLISIONS);

    vec![events, v0s]
}

/// Loop over D0-flagged candidates and log their kinematics.
pub fn read_hf_candidates() -> Stage {
    Stage::consume(
        READ_HF_CANDIDATES,
        aod::HF_CAND_PRONG2,
        FnConsumer::new(|cand, _store, _sink| {
            log_candidate(cand, &Prong2::from_row(cand)?)
        }),
    )
    .filter(is_d0())
}

fn log_candidate(row: &RowView<'_>, cand: &Prong2) -> ColumnarResult<()> {
    log::debug!(
        "Candidate with mass(D0) = {}, mass(D0bar) = {}, pt = {}, cos(theta_P) = {}",
        cand.inv_mass_d0(),
        cand.inv_mass_d0bar(),
        cand.pt(),
        row.f64("cpa")?
    );
    Ok(())
}

/// Builds one `MyTable` row per candidate, taking the collision from the positive daughter.
#[derive(Debug)]
pub struct D0Skim {
    schema: Schema,
}

impl D0Skim {
    pub fn new() -> ColumnarResult<Self> {
        Ok(Self {
            schema: aod::my_table()?,
        })
    }
}

impl RowTransform for D0Skim {
    fn output_schema(&self) -> &Schema {
        &self.schema
    }

    fn compute_row(&self, row: &RowView<'_>, store: &TableStore) -> ColumnarResult<Vec<Value>> {
        let cand = Prong2::from_row(row)?;
        log_candidate(row, &cand)?;

        let daughter = row.follow("index0_id", store)?;
        let collision = daughter.index("collision_id")?;
        store.resolve(&collision)?;

        Ok(vec![
            Value::Float(cand.inv_mass_d0()),
            Value::Float(cand.inv_mass_d0bar()),
            Value::Float(cand.pt()),
            Value::Float(row.f64("cpa")?),
            Value::Int(collision.row),
        ])
    }
}

pub fn produce_derived_table() -> ColumnarResult<Stage> {
    Ok(
        Stage::produce(PRODUCE_DERIVED_TABLE, aod::HF_CAND_PRONG2, D0Skim::new()?)
            .filter(is_d0())
            .reads(aod::TRACKS)
            .reads(aod::COLLISIONS),
    )
}

/// Like [`produce_derived_table`], but candidates must first pass `pT > pt_min`.
pub fn produce_derived_table_filter(pt_min: f64) -> ColumnarResult<Stage> {
    Ok(Stage::produce(
        PRODUCE_DERIVED_TABLE_FILTER,
        aod::HF_CAND_PRONG2,
        D0Skim::new()?,
    )
    .filter(candidate_pt().gt(pt_min))
    .filter(is_d0())
    .reads(aod::TRACKS)
    .reads(aod::COLLISIONS))
}

/// Fill the four `MyTable` histograms.
pub fn read_derived_table() -> Stage {
    Stage::consume(
        READ_DERIVED_TABLE,
        aod::MY_TABLE,
        FnConsumer::new(|cand, _store, sink| fill_derived(cand, sink)),
    )
}

fn fill_derived(cand: &RowView<'_>, sink: &mut dyn HistogramSink) -> ColumnarResult<()> {
    sink.fill(H_MASS_D0.name, cand.f64("inv_mass_d0")?);
    sink.fill(H_MASS_D0BAR.name, cand.f64("inv_mass_d0bar")?);
    sink.fill(H_PT.name, cand.f64("pt")?);
    sink.fill(H_COSP.name, cand.f64("cosine_pointing")?);
    Ok(())
}
