//! The derived-table analysis tutorial, run on [`skimflow_pipeline`].
//!
//! Raw tables (`Collisions`, `Tracks`, `V0Datas`, `HfCandProng2`) come from a seeded
//! [`generator`]; [`tasks`] turns each tutorial step into pipeline stages and [`workflow`]
//! assembles them.

#![forbid(unsafe_code)]

pub mod aod;
pub mod cli;
pub mod generator;
pub mod histograms;
pub mod physics;
pub mod tasks;
pub mod workflow;
