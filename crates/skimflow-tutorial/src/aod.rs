//! Table layouts used by the tutorial tasks.

use skimflow_columnar::{ColumnSchema, ColumnarResult, Schema};

pub const COLLISIONS: &str = "Collisions";
pub const TRACKS: &str = "Tracks";
pub const V0_DATAS: &str = "V0Datas";
pub const HF_CAND_PRONG2: &str = "HfCandProng2";
pub const MY_TABLE: &str = "MyTable";

/// Bits of the `hfflag` column of [`HF_CAND_PRONG2`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum DecayType {
    D0ToPiK = 0,
    JpsiToEE = 1,
    JpsiToMuMu = 2,
}

impl DecayType {
    pub fn bit(self) -> u32 {
        self as u32
    }

    pub fn flag(self) -> i64 {
        1 << self.bit()
    }
}

/// Reconstructed events with their event-selection decision.
pub fn collisions() -> ColumnarResult<Schema> {
    Schema::new(
        COLLISIONS,
        vec![ColumnSchema::float("pos_z"), ColumnSchema::boolean("sel8")],
    )
}

pub fn tracks() -> ColumnarResult<Schema> {
    Schema::new(
        TRACKS,
        vec![
            ColumnSchema::index("collision_id", COLLISIONS),
            ColumnSchema::float("pt"),
        ],
    )
}

pub fn v0_datas() -> ColumnarResult<Schema> {
    Schema::new(
        V0_DATAS,
        vec![
            ColumnSchema::index("collision_id", COLLISIONS),
            ColumnSchema::float("m_k0_short"),
        ],
    )
}

/// Two-prong heavy-flavour candidates. Prong 0 is the positive daughter.
pub fn hf_cand_prong2() -> ColumnarResult<Schema> {
    Schema::new(
        HF_CAND_PRONG2,
        vec![
            ColumnSchema::index("index0_id", TRACKS),
            ColumnSchema::index("index1_id", TRACKS),
            ColumnSchema::float("px_prong0"),
            ColumnSchema::float("py_prong0"),
            ColumnSchema::float("pz_prong0"),
            ColumnSchema::float("px_prong1"),
            ColumnSchema::float("py_prong1"),
            ColumnSchema::float("pz_prong1"),
            ColumnSchema::float("cpa"),
            ColumnSchema::int("hfflag"),
        ],
    )
}

/// Derived table of D0 candidates.
pub fn my_table() -> ColumnarResult<Schema> {
    Schema::new(
        MY_TABLE,
        vec![
            ColumnSchema::float("inv_mass_d0"),
            ColumnSchema::float("inv_mass_d0bar"),
            ColumnSchema::float("pt"),
            ColumnSchema::float("cosine_pointing"),
            ColumnSchema::index("collision_id", COLLISIONS),
        ],
    )
}
