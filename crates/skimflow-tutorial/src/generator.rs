//! Deterministic synthetic raw tables.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use skimflow_columnar::{ColumnarResult, TableBuilder, TableStore, Value};
use skimflow_pipeline::{Config, ConfigError};

use crate::aod::{self, DecayType};
use crate::workflow::{N_COLLISIONS, SEED};

const SEL8_EFFICIENCY: f64 = 0.8;
const K0_SHORT_MASS: f64 = 0.497611;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratorOptions {
    pub collisions: usize,
    pub seed: u64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            collisions: N_COLLISIONS.default,
            seed: SEED.default,
        }
    }
}

impl GeneratorOptions {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            collisions: config.get(&N_COLLISIONS)?,
            seed: config.get(&SEED)?,
        })
    }
}

/// Generate `Collisions`, `Tracks`, `V0Datas` and `HfCandProng2`.
///
/// The same options always produce identical tables. Every index column points at an
/// existing row.
pub fn generate(options: &GeneratorOptions) -> ColumnarResult<TableStore> {
    let mut rng = StdRng::seed_from_u64(options.seed);

    let mut collisions = TableBuilder::with_capacity(aod::collisions()?, options.collisions);
    let mut tracks = TableBuilder::new(aod::tracks()?);
    let mut v0s = TableBuilder::new(aod::v0_datas()?);
    let mut candidates = TableBuilder::new(aod::hf_cand_prong2()?);

    for collision in 0..options.collisions {
        let collision_id = Value::from(collision);
        // Sum of uniforms: roughly Gaussian and wide enough to leave some events outside |z| < 15.
        let pos_z: f64 = (0..4).map(|_| rng.gen_range(-5.0f64..5.0)).sum();
        collisions.append(&[
            Value::Float(pos_z),
            Value::Bool(rng.gen_bool(SEL8_EFFICIENCY)),
        ])?;

        let first_track = tracks.row_count();
        let n_tracks = rng.gen_range(2..=12usize);
        for _ in 0..n_tracks {
            let pt = -(1.0 - rng.gen::<f64>()).ln() * 0.8;
            tracks.append(&[collision_id.clone(), Value::Float(pt)])?;
        }

        for _ in 0..rng.gen_range(0..=3usize) {
            let mass = K0_SHORT_MASS + rng.gen_range(-0.02..0.02);
            v0s.append(&[collision_id.clone(), Value::Float(mass)])?;
        }

        for _ in 0..rng.gen_range(0..=3usize) {
            let index0 = first_track + rng.gen_range(0..n_tracks);
            let index1 = first_track + rng.gen_range(0..n_tracks);
            let mut row = vec![Value::from(index0), Value::from(index1)];
            for _ in 0..6 {
                row.push(Value::Float(rng.gen_range(-4.0..4.0)));
            }
            row.push(Value::Float(rng.gen_range(0.8..1.0)));
            row.push(Value::Int(random_flags(&mut rng)));
            candidates.append(&row)?;
        }
    }

    let mut store = TableStore::new();
    for builder in [&mut collisions, &mut tracks, &mut v0s, &mut candidates] {
        store.insert(builder.finalize()?)?;
    }
    log::debug!(
        "generated {} collisions (seed {}): {} tracks, {} V0s, {} candidates",
        options.collisions,
        options.seed,
        tracks.row_count(),
        v0s.row_count(),
        candidates.row_count()
    );
    Ok(store)
}

fn random_flags(rng: &mut StdRng) -> i64 {
    let mut flags = 0;
    if rng.gen_bool(0.7) {
        flags |= DecayType::D0ToPiK.flag();
    }
    for decay in [DecayType::JpsiToEE, DecayType::JpsiToMuMu] {
        if rng.gen_bool(0.1) {
            flags |= decay.flag();
        }
    }
    flags
}
