/// Core data types for the statistics aggregator.
///
/// This module defines the shared domain model imported by all other modules:
/// the wire shape of the stats API, the chart-facing output points, and the
/// crate error type. It contains no logic and no I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Well-known variables
// ---------------------------------------------------------------------------

/// Variable used as the per-capita denominator when no explicit
/// denominator is configured.
pub const TOTAL_POPULATION: &str = "Count_Person";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One place's time series for a single statistical variable.
///
/// Corresponds to one value of the `/api/stats/{variable}` response object.
/// Dates are kept as strings (`"2012"`, `"2012-07"`, `"2012-07-01"`) and
/// ordered lexicographically, which matches chronological order only for
/// zero-padded ISO-like dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSeries {
    #[serde(default)]
    pub data: BTreeMap<String, f64>,
    #[serde(default)]
    pub place_name: String,
}

impl PlaceSeries {
    /// True if the series carries at least one observation.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Body of a `/api/stats/{variable}` response: place id to series.
///
/// A `null` entry means the place is known to the backend but has no
/// series for the variable.
pub type StatsApiResponse = BTreeMap<String, Option<PlaceSeries>>;

// ---------------------------------------------------------------------------
// Chart output types
// ---------------------------------------------------------------------------

/// A single labeled value handed to a chart.
///
/// `value` is `None` when the underlying (variable, place, date) triple
/// does not exist in the fetched data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub label: String,
    pub value: Option<f64>,
}

impl DataPoint {
    pub fn new(label: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// A labeled series of points, one chart group (bar cluster, line, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataGroup {
    pub label: String,
    pub points: Vec<DataPoint>,
}

impl DataGroup {
    pub fn new(label: impl Into<String>, points: Vec<DataPoint>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching, configuring or decoding stats data.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsError {
    /// Non-2xx HTTP response from the stats API.
    HttpError(u16),
    /// The request never produced a response (connect, timeout, TLS, ...).
    RequestFailed(String),
    /// The response body could not be deserialized.
    ParseError(String),
    /// Configuration file missing, unreadable or invalid.
    ConfigError(String),
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::HttpError(code) => write!(f, "HTTP error: {}", code),
            StatsError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            StatsError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            StatsError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for StatsError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
