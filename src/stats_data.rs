/// The fetched dataset and its chart-shaped views.
///
/// A `StatsData` is built once per fetch cycle and is read-only afterwards.
/// Every accessor borrows it immutably and allocates a fresh result, so the
/// same dataset can be queried repeatedly (and from several threads) without
/// coordination.
///
/// Accessors never synthesize values: a (variable, place, date) triple that
/// was not fetched shows up as a `None` point value.

use crate::labels::VariableLabels;
use crate::model::{DataGroup, DataPoint, PlaceSeries, StatsApiResponse};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Number of groups `time_groups_sampled` aims for.
pub const SAMPLED_TIME_GROUPS: usize = 5;

/// Stats keyed by variable, then by place.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsData {
    /// Places in caller order.
    pub places: Vec<String>,
    /// Variables in caller order.
    pub variables: Vec<String>,
    /// Reconciled dates, ascending.
    pub dates: Vec<String>,
    /// Variable -> place -> series (already per-capita if requested).
    pub data: BTreeMap<String, StatsApiResponse>,
    /// Latest date complete for every place with data; see
    /// `analysis::dates::latest_common_date`.
    pub latest_common_date: Option<String>,
    /// (variable, place) pairs left raw under a per-capita request because
    /// no population series was available for the place.
    pub unnormalized: Vec<(String, String)>,
    labels: Arc<VariableLabels>,
}

impl StatsData {
    pub fn new(
        places: Vec<String>,
        variables: Vec<String>,
        dates: Vec<String>,
        data: BTreeMap<String, StatsApiResponse>,
        labels: Arc<VariableLabels>,
    ) -> Self {
        Self {
            places,
            variables,
            dates,
            data,
            latest_common_date: None,
            unnormalized: Vec::new(),
            labels,
        }
    }

    /// Series of `variable` for `place`, if one was fetched.
    pub fn series(&self, variable: &str, place: &str) -> Option<&PlaceSeries> {
        self.data
            .get(variable)
            .and_then(|resp| resp.get(place))
            .and_then(|entry| entry.as_ref())
    }

    /// Observation for one (variable, place, date) triple.
    pub fn value(&self, variable: &str, place: &str, date: &str) -> Option<f64> {
        self.series(variable, place)
            .and_then(|series| series.data.get(date))
            .copied()
    }

    fn default_place<'a>(&'a self, place: Option<&'a str>) -> Option<&'a str> {
        place.or_else(|| self.places.first().map(String::as_str))
    }

    fn default_date<'a>(&'a self, date: Option<&'a str>) -> Option<&'a str> {
        date.or_else(|| self.dates.last().map(String::as_str))
    }

    /// Group data by place with one point per variable, for a fixed date.
    ///
    /// `date` defaults to the last reconciled date. A variable contributes a
    /// point only when the place has a value at that date; places left
    /// without points are omitted.
    pub fn place_groups(&self, date: Option<&str>) -> Vec<DataGroup> {
        let Some(date) = self.default_date(date) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for place in &self.places {
            let mut points = Vec::new();
            let mut place_name = place.as_str();
            for variable in &self.variables {
                let Some(series) = self.series(variable, place) else {
                    continue;
                };
                if let Some(value) = series.data.get(date) {
                    points.push(DataPoint::new(self.labels.label_for(variable), Some(*value)));
                    if !series.place_name.is_empty() {
                        place_name = series.place_name.as_str();
                    }
                }
            }
            if !points.is_empty() {
                result.push(DataGroup::new(place_name, points));
            }
        }
        result
    }

    /// Group data by variable, one point per date, for a fixed place.
    ///
    /// `place` defaults to the first place. Every variable yields a group
    /// with one point per reconciled date, even when values are missing.
    pub fn variable_groups_over_time(&self, place: Option<&str>) -> Vec<DataGroup> {
        let Some(place) = self.default_place(place) else {
            return Vec::new();
        };

        self.variables
            .iter()
            .map(|variable| {
                let points = self
                    .dates
                    .iter()
                    .map(|date| DataPoint::new(date.as_str(), self.value(variable, place, date)))
                    .collect();
                DataGroup::new(self.labels.label_for(variable), points)
            })
            .collect()
    }

    /// Group data by date, one point per variable, for a fixed place.
    ///
    /// The transpose of `variable_groups_over_time`.
    pub fn time_groups(&self, place: Option<&str>) -> Vec<DataGroup> {
        let Some(place) = self.default_place(place) else {
            return Vec::new();
        };

        self.dates
            .iter()
            .map(|date| {
                let points = self
                    .variables
                    .iter()
                    .map(|variable| {
                        DataPoint::new(
                            self.labels.label_for(variable),
                            self.value(variable, place, date),
                        )
                    })
                    .collect();
                DataGroup::new(date.as_str(), points)
            })
            .collect()
    }

    /// `time_groups` thinned to roughly `SAMPLED_TIME_GROUPS` evenly spaced
    /// dates, for charts that cannot fit one bar cluster per date.
    pub fn time_groups_sampled(&self, place: Option<&str>) -> Vec<DataGroup> {
        let groups = self.time_groups(place);
        let interval = groups.len() / SAMPLED_TIME_GROUPS;
        if interval == 0 {
            return groups;
        }
        groups
            .into_iter()
            .enumerate()
            .filter(|(index, _)| index % interval == 0)
            .map(|(_, group)| group)
            .collect()
    }

    /// One point per variable for a place and date.
    ///
    /// Defaults to the first place and the last reconciled date.
    pub fn stats_point(&self, place: Option<&str>, date: Option<&str>) -> Vec<DataPoint> {
        let (Some(place), Some(date)) = (self.default_place(place), self.default_date(date)) else {
            return Vec::new();
        };

        self.variables
            .iter()
            .map(|variable| {
                DataPoint::new(
                    self.labels.label_for(variable),
                    self.value(variable, place, date),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
