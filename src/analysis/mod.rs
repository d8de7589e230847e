/// Data reshaping utilities for the stats aggregator.
///
/// Everything here is a pure, synchronous transformation over already
/// fetched payloads.
///
/// Submodules:
/// - `per_capita` - population lookup by year and per-capita rewriting.
/// - `dates`      - date-set reconciliation across variables.

pub mod dates;
pub mod per_capita;
