/// Command line front end: fetch once, print one chart shape as JSON.
///
/// Example:
///   stats_aggregator --places geoId/05,geoId/06 --vars Count_Person,Count_Person_Male \
///                    --shape places --date 2012

use clap::{Parser, ValueEnum};
use stats_aggregator::config::{StatsConfig, load_config};
use stats_aggregator::fetch::{FetchOptions, fetch_stats_data, fetch_stats_data_settled};
use stats_aggregator::ingest::HttpStatsSource;
use stats_aggregator::labels::load_labels;
use stats_aggregator::logging::{self, Component};
use stats_aggregator::model::StatsError;
use stats_aggregator::stats_data::StatsData;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "stats.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// One group per place at a fixed date
    Places,
    /// One group per variable over time, for one place
    Variables,
    /// One group per date, for one place
    Times,
    /// `times`, thinned to about five dates
    Sampled,
    /// One point per variable, for one place and date
    Point,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./stats.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// TOML file of `variable_id = "label"` entries, layered over the
    /// config's `[labels]` section
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Comma-separated place ids
    #[arg(long, value_delimiter = ',', required = true)]
    places: Vec<String>,

    /// Comma-separated variable ids
    #[arg(long = "vars", value_delimiter = ',', required = true)]
    variables: Vec<String>,

    /// Divide by population
    #[arg(long)]
    per_capita: bool,

    /// Per-capita results per N people (overrides config)
    #[arg(long, value_name = "N")]
    scaling: Option<f64>,

    #[arg(long, value_enum, default_value_t = Shape::Places)]
    shape: Shape,

    /// Place for the variables/times/sampled/point shapes
    #[arg(long)]
    place: Option<String>,

    /// Date for the places/point shapes
    #[arg(long)]
    date: Option<String>,

    /// Resolve display names for places
    #[arg(long)]
    display_names: bool,

    /// Keep variables that fetched successfully instead of failing
    #[arg(long)]
    settled: bool,
}

impl Cli {
    fn trimmed(mut self) -> Self {
        for list in [&mut self.places, &mut self.variables] {
            *list = list
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        self
    }
}

fn load(cli: &Cli) -> Result<StatsConfig, StatsError> {
    match &cli.config {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG).exists() => load_config(Path::new(DEFAULT_CONFIG)),
        None => {
            dotenv::dotenv().ok();
            StatsConfig::default().apply_env_overrides()
        }
    }
}

fn render(stats: &StatsData, cli: &Cli) -> Result<String, serde_json::Error> {
    let place = cli.place.as_deref();
    let date = cli.date.as_deref();
    match cli.shape {
        Shape::Places => serde_json::to_string_pretty(&stats.place_groups(date)),
        Shape::Variables => serde_json::to_string_pretty(&stats.variable_groups_over_time(place)),
        Shape::Times => serde_json::to_string_pretty(&stats.time_groups(place)),
        Shape::Sampled => serde_json::to_string_pretty(&stats.time_groups_sampled(place)),
        Shape::Point => serde_json::to_string_pretty(&stats.stats_point(place, date)),
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = load(&cli).map_err(|e| e.to_string())?;
    let level = config.log_level().map_err(|e| e.to_string())?;
    logging::init_logger(level, config.logging.file.as_deref(), config.logging.timestamps);
    logging::info(
        Component::Config,
        None,
        &format!("Using stats API at {}", config.api.base_url),
    );

    let source = HttpStatsSource::new(&config.api).map_err(|e| e.to_string())?;
    let labels = match &cli.labels {
        Some(path) => load_labels(path, config.variable_labels()).map_err(|e| e.to_string())?,
        None => config.variable_labels(),
    };
    let labels = Arc::new(labels);
    let mut options = FetchOptions::from_config(&config.per_capita);
    options.per_capita = cli.per_capita;
    options.resolve_display_names = cli.display_names;
    if let Some(scaling) = cli.scaling {
        if !(scaling.is_finite() && scaling > 0.0) {
            return Err(format!("--scaling must be a positive number, got {}", scaling));
        }
        options.scaling = scaling;
    }

    let stats = if cli.settled {
        let settled =
            fetch_stats_data_settled(&source, labels, &cli.places, &cli.variables, &options);
        for failure in &settled.failures {
            logging::warn(
                Component::Fetch,
                Some(failure.variable.as_str()),
                &format!("dropped: {}", failure.error),
            );
        }
        settled.data
    } else {
        fetch_stats_data(&source, labels, &cli.places, &cli.variables, &options)
            .map_err(|e| e.to_string())?
    };

    for (variable, place) in &stats.unnormalized {
        logging::warn(
            Component::PerCapita,
            Some(place.as_str()),
            &format!("{} is not per capita (no population data)", variable),
        );
    }

    println!("{}", render(&stats, &cli).map_err(|e| e.to_string())?);
    Ok(())
}

fn main() {
    // clap exits with status 2 on usage errors.
    let cli = Cli::parse().trimmed();
    if cli.places.is_empty() || cli.variables.is_empty() {
        eprintln!("error: --places and --vars need at least one id each");
        process::exit(2);
    }

    if let Err(msg) = run(cli) {
        logging::error(Component::System, None, &msg);
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
