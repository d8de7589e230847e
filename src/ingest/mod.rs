/// Data ingestion from the stats API.
///
/// Submodules:
/// - `stats_api` - URL building, response parsing and the `StatsSource`
///   seam with its reqwest-backed implementation.

pub mod stats_api;

pub use stats_api::{DisplayNames, HttpStatsSource, StatsSource};
