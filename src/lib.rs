//! Statistical time-series aggregator.
//!
//! Fetches per-variable, per-place observation series from a stats REST
//! endpoint, optionally normalizes them per capita, reconciles the dates
//! common to every variable, and reshapes the result for charting:
//! by place, by variable over time, by time, or as a single snapshot.
//!
//! Modules:
//! - `model`      - wire types, chart output types, `StatsError`.
//! - `labels`     - variable id to display label table.
//! - `config`     - TOML configuration with environment overrides.
//! - `logging`    - structured console/file logging.
//! - `ingest`     - the `StatsSource` seam and its HTTP implementation.
//! - `analysis`   - per-capita normalization and date reconciliation.
//! - `fetch`      - concurrent fetch orchestration and assembly.
//! - `stats_data` - the assembled dataset and its reshaping accessors.

pub mod analysis;
pub mod config;
pub mod fetch;
pub mod ingest;
pub mod labels;
pub mod logging;
pub mod model;
pub mod stats_data;

pub use fetch::{FetchOptions, SettledStats, fetch_stats_data, fetch_stats_data_settled};
pub use labels::VariableLabels;
pub use model::{DataGroup, DataPoint, PlaceSeries, StatsApiResponse, StatsError};
pub use stats_data::StatsData;
