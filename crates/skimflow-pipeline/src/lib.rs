//! Stage graph over [`skimflow_columnar`] tables.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Each stage filters one input table and
//! then either materializes a derived table through a [`RowTransform`] or consumes the rows
//! (filling histograms through a [`HistogramSink`]). Every table is produced exactly once;
//! the graph is validated up front by [`PipelineBuilder::build`].

#![forbid(unsafe_code)]

mod config;
mod error;
mod graph;
mod sink;
mod stage;
mod transform;

pub use crate::config::{Config, ConfigError, ConfigValue, Configurable, FromConfigValue};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::graph::{Pipeline, PipelineBuilder, RunReport};
pub use crate::sink::{HistogramSink, NullSink, RecordingSink};
pub use crate::stage::{FnConsumer, RowConsumer, Stage, StageAction, StageReport};
pub use crate::transform::{materialize, FnTransform, RowTransform};
