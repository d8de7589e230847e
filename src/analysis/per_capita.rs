//! Per-capita normalization.
//!
//! Divides every observation of a series by the population of the same
//! year, optionally scaled (`scaling = 1000` gives "per 1000 people").
//! Population series rarely cover the same range as the target variable,
//! so a missing year resolves to the nearest year the population series
//! does have.
//!
//! All functions here are pure: they return new series and never touch
//! the fetched payload.

use crate::model::PlaceSeries;
use std::collections::BTreeMap;

/// Calendar-year prefix of a date string (`"2012-07-01"` -> `"2012"`).
pub fn year_of(date: &str) -> &str {
    date.split('-').next().unwrap_or(date)
}

/// A population series indexed by calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationByYear {
    years: BTreeMap<String, f64>,
    earliest: f64,
    latest: f64,
}

impl PopulationByYear {
    /// Indexes `series` by year. When several dates fall in the same year
    /// the latest one wins. Returns `None` for an empty series.
    pub fn from_series(series: &PlaceSeries) -> Option<Self> {
        let mut years = BTreeMap::new();
        for (date, value) in &series.data {
            years.insert(year_of(date).to_string(), *value);
        }
        let earliest = *years.values().next()?;
        let latest = *years.values().next_back()?;
        Some(Self {
            years,
            earliest,
            latest,
        })
    }

    /// Population to use for an observation dated `date`.
    ///
    /// Exact year if present; the earliest year for dates before the
    /// series; the latest year for dates after it; otherwise the
    /// numerically closest year (ties go to the earlier year).
    pub fn population_for(&self, date: &str) -> f64 {
        let year = year_of(date);
        if let Some(pop) = self.years.get(year) {
            return *pop;
        }

        let first = self.years.keys().next().map(String::as_str).unwrap_or(year);
        let last = self.years.keys().next_back().map(String::as_str).unwrap_or(year);
        if year < first {
            return self.earliest;
        }
        if year > last {
            return self.latest;
        }

        let Ok(target) = year.parse::<i64>() else {
            return self.latest;
        };
        let mut best: Option<(i64, f64)> = None;
        for (y, pop) in &self.years {
            let Ok(candidate) = y.parse::<i64>() else {
                continue;
            };
            let diff = (candidate - target).abs();
            if best.map_or(true, |(best_diff, _)| diff < best_diff) {
                best = Some((diff, *pop));
            }
        }
        best.map(|(_, pop)| pop).unwrap_or(self.latest)
    }
}

/// Returns a copy of `series` with every value divided by
/// `population / scaling`.
///
/// A zero population yields `0` instead of an infinite rate.
pub fn compute_per_capita(
    series: &PlaceSeries,
    population: &PopulationByYear,
    scaling: f64,
) -> PlaceSeries {
    let data = series
        .data
        .iter()
        .map(|(date, value)| {
            let pop = population.population_for(date);
            let normalized = if pop == 0.0 { 0.0 } else { value / (pop / scaling) };
            (date.clone(), normalized)
        })
        .collect();

    PlaceSeries {
        data,
        place_name: series.place_name.clone(),
    }
}
