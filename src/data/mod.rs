/// Data layer: record types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → MetricSet (one family)
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  MetricSet    │  Vec<MetricRecord>, family schema
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterOptions::matches(RecordKey)
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
