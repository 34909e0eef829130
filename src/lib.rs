//! Per-cycle aggregation of sequencing run metrics into candlestick plot
//! series.
//!
//! ```text
//!  MetricSet + RunInfo + MetricKind + FilterOptions
//!        │
//!        ▼
//!   aggregate  → CycleStatistics   (cycle, channel) → MetricStat
//!        │
//!        ▼
//!   assemble   → PlotDataset       labelled series + axes + title
//! ```

pub mod aggregate;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod plot;
pub mod run;
pub mod stat;

pub use aggregate::{aggregate, CycleStatistics, GroupKey};
pub use data::filter::{CycleRange, FilterOptions, RecordKey};
pub use data::model::{
    FieldValue, MetricFamily, MetricKind, MetricRecord, MetricSet, RunMetrics,
};
pub use error::PlotError;
pub use plot::{assemble, plot_by_cycle, Axis, CandleStickPoint, PlotDataset, Series};
pub use run::{FlowcellLayout, InstrumentType, ReadInfo, RunInfo, TileNaming};
pub use stat::MetricStat;
