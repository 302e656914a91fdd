//! Workflow assembly: which tasks run, in which order, with which options.
//!
//! Options are read from the [`Config`] once, while the pipeline is built.

use skimflow_columnar::ColumnarResult;
use skimflow_pipeline::{
    Config, Configurable, Pipeline, PipelineBuilder, PipelineError, PipelineResult, Stage,
};

use crate::aod;
use crate::histograms::{derived_table_histograms, vzero_histograms, HistogramSpec};
use crate::tasks;

pub const N_BINS: Configurable<usize> = Configurable::new("nBins", 100, "N bins in all histos");
pub const PT_MIN: Configurable<f64> = Configurable::new(
    "ptMin",
    4.0,
    "minimum candidate pT (GeV/c) applied by the filtered producer",
);
pub const SEED: Configurable<u64> = Configurable::new("seed", 42, "synthetic data seed");
pub const N_COLLISIONS: Configurable<usize> =
    Configurable::new("nCollisions", 1_000, "number of synthetic collisions");

pub const KNOWN_OPTIONS: [&str; 4] = [N_BINS.name, PT_MIN.name, SEED.name, N_COLLISIONS.name];

/// Which task fills `MyTable`. Only one of them may run in a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Producer {
    Unfiltered,
    Filtered,
}

fn task<T>(name: &str, built: ColumnarResult<T>) -> PipelineResult<T> {
    built.map_err(|source| PipelineError::Stage {
        stage: name.to_owned(),
        source,
    })
}

fn producer_stage(config: &Config, producer: Producer) -> PipelineResult<Stage> {
    match producer {
        Producer::Unfiltered => task(
            tasks::PRODUCE_DERIVED_TABLE,
            tasks::produce_derived_table(),
        ),
        Producer::Filtered => {
            let pt_min = config.get(&PT_MIN)?;
            task(
                tasks::PRODUCE_DERIVED_TABLE_FILTER,
                tasks::produce_derived_table_filter(pt_min),
            )
        }
    }
}

fn add_vzero(builder: &mut PipelineBuilder, config: &Config) -> PipelineResult<()> {
    // Validated here so a bad value fails the build rather than the histogram report.
    config.get(&N_BINS)?;
    builder.add_source(aod::COLLISIONS);
    builder.add_source(aod::V0_DATAS);
    for stage in tasks::vzero_example() {
        builder.add_stage(stage);
    }
    Ok(())
}

fn add_skimming(
    builder: &mut PipelineBuilder,
    config: &Config,
    producer: Producer,
) -> PipelineResult<()> {
    builder.add_source(aod::COLLISIONS);
    builder.add_source(aod::TRACKS);
    builder.add_source(aod::HF_CAND_PRONG2);
    builder.add_stage(tasks::read_hf_candidates());
    builder.add_stage(producer_stage(config, producer)?);
    // The reader is registered twice; both instances run and fill the same histograms.
    builder.add_stage(tasks::read_derived_table());
    builder.add_stage(tasks::read_derived_table());
    Ok(())
}

/// Event selection and V0 mass spectrum.
pub fn vzero_workflow(config: &Config) -> PipelineResult<Pipeline> {
    let mut builder = Pipeline::builder();
    add_vzero(&mut builder, config)?;
    builder.build()
}

/// Candidate reader, one `MyTable` producer and two derived-table readers.
pub fn skimming_workflow(config: &Config, producer: Producer) -> PipelineResult<Pipeline> {
    let mut builder = Pipeline::builder();
    add_skimming(&mut builder, config, producer)?;
    builder.build()
}

/// Every skimming task at once, including both `MyTable` producers.
///
/// Two producers of one table is rejected with [`PipelineError::DuplicateTable`]; this exists
/// to show that the graph catches it before anything runs.
pub fn all_skimming_tasks(config: &Config) -> PipelineResult<Pipeline> {
    Pipeline::builder()
        .source(aod::COLLISIONS)
        .source(aod::TRACKS)
        .source(aod::HF_CAND_PRONG2)
        .stage(tasks::read_hf_candidates())
        .stage(producer_stage(config, Producer::Unfiltered)?)
        .stage(producer_stage(config, Producer::Filtered)?)
        .stage(tasks::read_derived_table())
        .stage(tasks::read_derived_table())
        .build()
}

/// V0 example followed by the skimming chain.
pub fn tutorial_workflow(config: &Config, producer: Producer) -> PipelineResult<Pipeline> {
    let mut builder = Pipeline::builder();
    add_vzero(&mut builder, config)?;
    add_skimming(&mut builder, config, producer)?;
    builder.build()
}

/// Histograms filled by the tasks of a workflow, for reporting.
pub fn histograms(
    config: &Config,
    vzero: bool,
    skimming: bool,
) -> PipelineResult<Vec<HistogramSpec>> {
    let mut specs = Vec::new();
    if vzero {
        specs.extend(vzero_histograms(config.get(&N_BINS)?));
    }
    if skimming {
        specs.extend(derived_table_histograms());
    }
    Ok(specs)
}
