/// Fetch orchestration: one request per variable, issued concurrently.
///
/// Every variable (and, for per-capita requests, every distinct denominator
/// variable, plus the optional display-name lookup) is fetched on its own
/// scoped worker thread. The calling thread blocks until every request has
/// settled, then assembles a `StatsData` synchronously.
///
/// Two join policies are offered:
/// - `fetch_stats_data` is all-or-nothing: any failed request fails the
///   whole cycle and no partial dataset is returned.
/// - `fetch_stats_data_settled` keeps whatever succeeded and reports the
///   failed variables next to the dataset.
///
/// No retries, no caching: repeated calls redo every request.

use crate::analysis::dates::{latest_common_date, reconcile_dates};
use crate::analysis::per_capita::{PopulationByYear, compute_per_capita};
use crate::config::PerCapitaConfig;
use crate::ingest::{DisplayNames, StatsSource};
use crate::labels::VariableLabels;
use crate::logging::{self, Component};
use crate::model::{StatsApiResponse, StatsError, TOTAL_POPULATION};
use crate::stats_data::StatsData;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-fetch knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Divide every observation by a population series.
    pub per_capita: bool,
    /// Per-capita results are expressed per `scaling` people.
    pub scaling: f64,
    /// Denominator for variables without an explicit one.
    pub population_variable: String,
    /// Explicit per-variable denominators. When non-empty, only the listed
    /// variables are normalized.
    pub denominators: HashMap<String, String>,
    /// Also fetch display names and use them as place names.
    pub resolve_display_names: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            per_capita: false,
            scaling: 1.0,
            population_variable: TOTAL_POPULATION.to_string(),
            denominators: HashMap::new(),
            resolve_display_names: false,
        }
    }
}

impl FetchOptions {
    /// Options seeded from the `[per_capita]` config section; per-capita
    /// itself stays off until requested.
    pub fn from_config(config: &PerCapitaConfig) -> Self {
        Self {
            scaling: config.scaling,
            population_variable: config.population_variable.clone(),
            denominators: config.denominators.clone(),
            ..Self::default()
        }
    }

    /// Denominator variable to normalize `variable` by, if any.
    pub fn denominator_for(&self, variable: &str) -> Option<&str> {
        if !self.per_capita {
            return None;
        }
        if self.denominators.is_empty() {
            return Some(self.population_variable.as_str());
        }
        self.denominators.get(variable).map(String::as_str)
    }

    /// Distinct denominators needed for `variables`, in first-use order.
    pub fn denominator_variables(&self, variables: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for variable in variables {
            if let Some(denominator) = self.denominator_for(variable) {
                if !result.iter().any(|d| d == denominator) {
                    result.push(denominator.to_string());
                }
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Settled results
// ---------------------------------------------------------------------------

/// A variable that could not be fetched in a settle-all cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableFailure {
    pub variable: String,
    pub error: StatsError,
}

/// Outcome of `fetch_stats_data_settled`.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledStats {
    /// Dataset built from the variables that succeeded.
    pub data: StatsData,
    /// Variables dropped from `data`, in request order.
    pub failures: Vec<VariableFailure>,
}

impl SettledStats {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Concurrent fetch
// ---------------------------------------------------------------------------

struct FetchedPayloads {
    variables: Vec<(String, Result<StatsApiResponse, StatsError>)>,
    denominators: BTreeMap<String, Result<StatsApiResponse, StatsError>>,
    display_names: Option<Result<DisplayNames, StatsError>>,
}

fn join_worker<T>(handle: thread::ScopedJoinHandle<'_, Result<T, StatsError>>) -> Result<T, StatsError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(StatsError::RequestFailed("fetch worker panicked".to_string())))
}

fn fetch_all<S: StatsSource + ?Sized>(
    source: &S,
    places: &[String],
    variables: &[String],
    options: &FetchOptions,
) -> FetchedPayloads {
    let denominators = options.denominator_variables(variables);
    logging::debug(
        Component::Fetch,
        None,
        &format!(
            "Requesting {} variables and {} denominators for {} places",
            variables.len(),
            denominators.len(),
            places.len()
        ),
    );

    thread::scope(|scope| {
        let variable_handles: Vec<_> = variables
            .iter()
            .map(|variable| {
                let handle = scope.spawn(move || source.fetch_variable(variable, places));
                (variable.clone(), handle)
            })
            .collect();
        let denominator_handles: Vec<_> = denominators
            .iter()
            .map(|variable| {
                let handle = scope.spawn(move || source.fetch_variable(variable, places));
                (variable.clone(), handle)
            })
            .collect();
        let names_handle = options
            .resolve_display_names
            .then(|| scope.spawn(move || source.fetch_display_names(places)));

        FetchedPayloads {
            variables: variable_handles
                .into_iter()
                .map(|(variable, handle)| (variable, join_worker(handle)))
                .collect(),
            denominators: denominator_handles
                .into_iter()
                .map(|(variable, handle)| (variable, join_worker(handle)))
                .collect(),
            display_names: names_handle.map(join_worker),
        }
    })
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Fetch statistical time series for `places` x `variables`.
///
/// All requests run concurrently; the first failure (in request order)
/// is returned and no dataset is built.
pub fn fetch_stats_data<S: StatsSource + ?Sized>(
    source: &S,
    labels: Arc<VariableLabels>,
    places: &[String],
    variables: &[String],
    options: &FetchOptions,
) -> Result<StatsData, StatsError> {
    let fetched = fetch_all(source, places, variables, options);

    let mut responses = BTreeMap::new();
    for (variable, result) in fetched.variables {
        match result {
            Ok(response) => {
                responses.insert(variable, response);
            }
            Err(err) => {
                logging::log_fetch_failure(&variable, "fetch", &err);
                return Err(err);
            }
        }
    }

    let mut denominators = BTreeMap::new();
    for (variable, result) in fetched.denominators {
        match result {
            Ok(response) => {
                denominators.insert(variable, response);
            }
            Err(err) => {
                logging::log_fetch_failure(&variable, "denominator fetch", &err);
                return Err(err);
            }
        }
    }

    let display_names = match fetched.display_names {
        Some(Ok(names)) => Some(names),
        Some(Err(err)) => {
            logging::log_fetch_failure("displayname", "display name fetch", &err);
            return Err(err);
        }
        None => None,
    };

    logging::log_fetch_summary(variables.len(), variables.len(), 0);
    Ok(assemble_stats_data(
        places,
        variables,
        responses,
        &denominators,
        display_names.as_ref(),
        labels,
        options,
    ))
}

/// Like `fetch_stats_data`, but keeps the variables that succeeded.
///
/// A variable fails when its own request fails or when the denominator it
/// needs could not be fetched. A failed display-name lookup is logged and
/// the API place names are kept.
pub fn fetch_stats_data_settled<S: StatsSource + ?Sized>(
    source: &S,
    labels: Arc<VariableLabels>,
    places: &[String],
    variables: &[String],
    options: &FetchOptions,
) -> SettledStats {
    let fetched = fetch_all(source, places, variables, options);

    let mut denominators = BTreeMap::new();
    let mut denominator_errors = BTreeMap::new();
    for (variable, result) in fetched.denominators {
        match result {
            Ok(response) => {
                denominators.insert(variable, response);
            }
            Err(err) => {
                logging::log_fetch_failure(&variable, "denominator fetch", &err);
                denominator_errors.insert(variable, err);
            }
        }
    }

    let mut succeeded = Vec::new();
    let mut responses = BTreeMap::new();
    let mut failures = Vec::new();
    for (variable, result) in fetched.variables {
        let denominator_error = options
            .denominator_for(&variable)
            .and_then(|d| denominator_errors.get(d));
        match (result, denominator_error) {
            (Ok(response), None) => {
                succeeded.push(variable.clone());
                responses.insert(variable, response);
            }
            (Ok(_), Some(err)) => failures.push(VariableFailure {
                variable,
                error: err.clone(),
            }),
            (Err(err), _) => {
                logging::log_fetch_failure(&variable, "fetch", &err);
                failures.push(VariableFailure { variable, error: err });
            }
        }
    }

    let display_names = match fetched.display_names {
        Some(Ok(names)) => Some(names),
        Some(Err(err)) => {
            logging::log_fetch_failure("displayname", "display name fetch", &err);
            None
        }
        None => None,
    };

    logging::log_fetch_summary(variables.len(), succeeded.len(), failures.len());
    let data = assemble_stats_data(
        places,
        &succeeded,
        responses,
        &denominators,
        display_names.as_ref(),
        labels,
        options,
    );
    SettledStats { data, failures }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Builds a `StatsData` from already fetched payloads.
///
/// Applies per-capita normalization and display names, then reconciles
/// the date set. Performs no I/O.
pub fn assemble_stats_data(
    places: &[String],
    variables: &[String],
    mut responses: BTreeMap<String, StatsApiResponse>,
    denominators: &BTreeMap<String, StatsApiResponse>,
    display_names: Option<&DisplayNames>,
    labels: Arc<VariableLabels>,
    options: &FetchOptions,
) -> StatsData {
    let mut data = BTreeMap::new();
    let mut unnormalized = Vec::new();

    for variable in variables {
        let Some(response) = responses.remove(variable) else {
            continue;
        };
        let response = match options.denominator_for(variable) {
            Some(denominator) => normalize_response(
                variable,
                response,
                denominators.get(denominator),
                options.scaling,
                &mut unnormalized,
            ),
            None => response,
        };
        data.insert(variable.clone(), response);
    }

    if let Some(names) = display_names {
        apply_display_names(&mut data, names);
    }

    let dates = reconcile_dates(variables, &data);
    logging::debug(
        Component::Dates,
        None,
        &format!("{} dates common to all variables", dates.len()),
    );
    let latest = latest_common_date(places, variables, &data, &dates);

    let mut stats = StatsData::new(places.to_vec(), variables.to_vec(), dates, data, labels);
    stats.latest_common_date = latest;
    stats.unnormalized = unnormalized;
    stats
}

/// Per-capita pass over one variable's response.
///
/// Places without a usable population series are kept raw and recorded
/// in `unnormalized`.
fn normalize_response(
    variable: &str,
    response: StatsApiResponse,
    population: Option<&StatsApiResponse>,
    scaling: f64,
    unnormalized: &mut Vec<(String, String)>,
) -> StatsApiResponse {
    response
        .into_iter()
        .map(|(place, entry)| {
            let Some(series) = entry else {
                return (place, None);
            };
            let index = population
                .and_then(|resp| resp.get(&place))
                .and_then(|entry| entry.as_ref())
                .and_then(PopulationByYear::from_series);
            let series = match index {
                Some(index) => compute_per_capita(&series, &index, scaling),
                None => {
                    if series.has_data() {
                        logging::warn(
                            Component::PerCapita,
                            Some(place.as_str()),
                            &format!("no population series, {} left unnormalized", variable),
                        );
                        unnormalized.push((variable.to_string(), place.clone()));
                    }
                    series
                }
            };
            (place, Some(series))
        })
        .collect()
}

/// Empty display names keep the API place name.
fn apply_display_names(data: &mut BTreeMap<String, StatsApiResponse>, names: &DisplayNames) {
    for response in data.values_mut() {
        for (place, entry) in response.iter_mut() {
            let name = names.get(place).filter(|name| !name.is_empty());
            if let (Some(series), Some(name)) = (entry.as_mut(), name) {
                series.place_name = name.clone();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
