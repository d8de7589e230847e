//! Date-set reconciliation across variables.
//!
//! Dates are compared as strings. Ordering is only chronological for
//! zero-padded ISO-like dates (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`) of the same
//! granularity; the stats API only emits those.

use crate::model::{PlaceSeries, StatsApiResponse};
use std::collections::{BTreeMap, BTreeSet};

/// Dates present in every place series that has data, across all
/// `variables`, sorted ascending.
///
/// The running set starts from the first series with data (variables in
/// the given order, places in key order) and is intersected with every
/// later one. Null and empty series do not participate.
pub fn reconcile_dates(
    variables: &[String],
    data: &BTreeMap<String, StatsApiResponse>,
) -> Vec<String> {
    let mut running: Option<BTreeSet<String>> = None;

    for variable in variables {
        let Some(response) = data.get(variable) else {
            continue;
        };
        for series in response.values().flatten().filter(|s| s.has_data()) {
            if let Some(dates) = running.as_mut() {
                dates.retain(|date| series.data.contains_key(date));
            } else {
                running = Some(series.data.keys().cloned().collect());
            }
        }
    }

    running
        .map(|dates| dates.into_iter().collect())
        .unwrap_or_default()
}

/// The latest of `dates` for which every place with any data has a value
/// for every variable. Falls back to the last entry of `dates`.
pub fn latest_common_date(
    places: &[String],
    variables: &[String],
    data: &BTreeMap<String, StatsApiResponse>,
    dates: &[String],
) -> Option<String> {
    let places_with_data: Vec<&String> = places
        .iter()
        .filter(|place| {
            variables
                .iter()
                .any(|v| series_for(data, v, place).is_some_and(|s| s.has_data()))
        })
        .collect();

    dates
        .iter()
        .rev()
        .find(|date| {
            places_with_data.iter().all(|place| {
                variables.iter().all(|v| {
                    series_for(data, v, place)
                        .is_some_and(|s| s.data.contains_key(date.as_str()))
                })
            })
        })
        .or_else(|| dates.last())
        .cloned()
}

fn series_for<'a>(
    data: &'a BTreeMap<String, StatsApiResponse>,
    variable: &str,
    place: &str,
) -> Option<&'a PlaceSeries> {
    data.get(variable)
        .and_then(|resp| resp.get(place))
        .and_then(|entry| entry.as_ref())
}
