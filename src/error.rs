use thiserror::Error;

use crate::data::model::{MetricFamily, MetricKind};

/// Errors that abort a single aggregation or assembly request.
///
/// An empty result is not an error: it is returned as an empty
/// [`CycleStatistics`](crate::aggregate::CycleStatistics) or
/// [`PlotDataset`](crate::plot::PlotDataset).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotError {
    /// The requested metric has no field in the record set's schema.
    #[error("metric '{metric}' is not available in {family} records")]
    InvalidMetricSelector {
        metric: MetricKind,
        family: MetricFamily,
    },

    /// A record does not have the shape its family declares.
    #[error("{family} record {index} does not match the schema: {reason}")]
    SchemaMismatch {
        family: MetricFamily,
        index: usize,
        reason: String,
    },

    /// A filter refers to something the run does not have.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}
