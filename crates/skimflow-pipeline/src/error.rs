use skimflow_columnar::{ColumnarError, TableId};
use thiserror::Error;

use crate::config::ConfigError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("stage `{stage}` produces {table}, which is already produced by a source or an earlier stage")]
    DuplicateTable { table: TableId, stage: String },

    #[error("stage `{stage}` depends on {table}, which is neither a source nor produced by an earlier stage")]
    UnknownTable { table: TableId, stage: String },

    #[error("source table {table} is missing from the store")]
    MissingSource { table: TableId },

    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: ColumnarError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub(crate) fn stage(stage: &str) -> impl FnOnce(ColumnarError) -> PipelineError + '_ {
        move |source| PipelineError::Stage {
            stage: stage.to_owned(),
            source,
        }
    }

    /// The underlying columnar error of a failed stage, if any.
    pub fn columnar(&self) -> Option<&ColumnarError> {
        match self {
            PipelineError::Stage { source, .. } => Some(source),
            _ => None,
        }
    }
}
