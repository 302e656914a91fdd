use std::collections::HashSet;

use serde::Serialize;
use skimflow_columnar::{ColumnarError, TableId, TableStore};

use crate::error::{PipelineError, PipelineResult};
use crate::sink::HistogramSink;
use crate::stage::{Stage, StageReport};

/// Collects source declarations and stages in declaration order.
///
/// Nothing is checked until [`build`](Self::build).
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    sources: Vec<TableId>,
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a raw input table that must be present in the store when the pipeline runs.
    pub fn source(mut self, table: impl Into<TableId>) -> Self {
        self.add_source(table);
        self
    }

    pub fn add_source(&mut self, table: impl Into<TableId>) {
        let table = table.into();
        if !self.sources.contains(&table) {
            self.sources.push(table);
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn add_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Validate the stage graph.
    ///
    /// Every input and declared reference must be a source or the output of an *earlier*
    /// stage, which rules out cycles. Every output must be new. Terminal stages may repeat.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let mut available: HashSet<TableId> = self.sources.iter().cloned().collect();

        for stage in &self.stages {
            let needed = std::iter::once(stage.input()).chain(stage.references());
            for table in needed {
                if !available.contains(table) {
                    return Err(PipelineError::UnknownTable {
                        table: table.clone(),
                        stage: stage.name().to_owned(),
                    });
                }
            }

            if let Some(output) = stage.output() {
                if !available.insert(output.clone()) {
                    return Err(PipelineError::DuplicateTable {
                        table: output.clone(),
                        stage: stage.name().to_owned(),
                    });
                }
            }
        }

        log::debug!(
            "built pipeline: {} sources, {} stages",
            self.sources.len(),
            self.stages.len()
        );
        Ok(Pipeline {
            sources: self.sources,
            stages: self.stages,
        })
    }
}

/// A validated, immutable sequence of stages.
#[derive(Debug)]
pub struct Pipeline {
    sources: Vec<TableId>,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn sources(&self) -> &[TableId] {
        &self.sources
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Derived tables in production order.
    pub fn outputs(&self) -> impl Iterator<Item = &TableId> + '_ {
        self.stages.iter().filter_map(Stage::output)
    }

    /// Execute every stage in order against `store`.
    ///
    /// Each produced table is inserted into `store` before the next stage starts. The first
    /// failure aborts the run; tables inserted by earlier stages stay in the store.
    pub fn run(
        &self,
        store: &mut TableStore,
        sink: &mut dyn HistogramSink,
    ) -> PipelineResult<RunReport> {
        for table in &self.sources {
            if !store.contains(table.as_str()) {
                return Err(PipelineError::MissingSource {
                    table: table.clone(),
                });
            }
        }
        for stage in &self.stages {
            if let Some(output) = stage.output() {
                if store.contains(output.as_str()) {
                    return Err(PipelineError::Stage {
                        stage: stage.name().to_owned(),
                        source: ColumnarError::DuplicateTable {
                            table: output.clone(),
                        },
                    });
                }
            }
        }

        let mut report = RunReport::default();
        for stage in &self.stages {
            log::debug!("stage `{}`: reading {}", stage.name(), stage.input());
            let stage_report = stage
                .execute(store, sink)
                .map_err(PipelineError::stage(stage.name()))?;
            log::debug!(
                "stage `{}`: {} of {} rows selected, {} written",
                stage_report.stage,
                stage_report.selected_rows,
                stage_report.input_rows,
                stage_report.output_rows
            );
            report.stages.push(stage_report);
        }
        Ok(report)
    }
}

/// Per-stage row counts of one run, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
}

impl RunReport {
    /// The first executed stage named `name`.
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &TableId> + '_ {
        self.stages.iter().filter_map(|s| s.output.as_ref())
    }
}
