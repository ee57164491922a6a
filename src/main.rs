use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use housing_explorer::data::export::export_csv_file;
use housing_explorer::data::filter::{apply_to_dataset, FilterCriteria, IncomeBracket};
use housing_explorer::data::loader::load_file;
use housing_explorer::data::stats::{price_histogram, HistogramBin, SummaryStats, DEFAULT_BINS};
use housing_explorer::MalformedRecordError;

/// CLI-compatible income bracket enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliIncomeBracket {
    /// Median income at or below 2.5
    Low,
    /// Median income strictly between 2.5 and 4.5
    Medium,
    /// Median income at or above 4.5
    High,
    /// No income restriction
    All,
}

impl From<CliIncomeBracket> for IncomeBracket {
    fn from(cli: CliIncomeBracket) -> Self {
        match cli {
            CliIncomeBracket::Low => IncomeBracket::Low,
            CliIncomeBracket::Medium => IncomeBracket::Medium,
            CliIncomeBracket::High => IncomeBracket::High,
            CliIncomeBracket::All => IncomeBracket::All,
        }
    }
}

/// Filter a California housing table and print summary statistics as JSON.
#[derive(Debug, Parser)]
#[command(name = "housing-explorer", version, about)]
struct Cli {
    /// Housing table (.csv, .json or .parquet)
    file: PathBuf,

    /// JSON file with filter criteria; flags below override its fields
    #[arg(long)]
    criteria: Option<PathBuf>,

    /// Lowest median house value to keep (inclusive)
    #[arg(long)]
    min_price: Option<f64>,

    /// Highest median house value to keep (inclusive)
    #[arg(long)]
    max_price: Option<f64>,

    /// Location category to keep; repeat for several
    #[arg(long = "location")]
    locations: Vec<String>,

    /// Income bracket to keep
    #[arg(long, value_enum)]
    income: Option<CliIncomeBracket>,

    /// Minimum housing median age (inclusive)
    #[arg(long)]
    min_age: Option<f64>,

    /// Number of bins in the house-value histogram
    #[arg(long, default_value_t = DEFAULT_BINS)]
    bins: usize,

    /// Write the filtered rows to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Debug logging when RUST_LOG is not set
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    source: String,
    total_records: usize,
    criteria: &'a FilterCriteria,
    summary: &'a SummaryStats,
    histogram: Vec<HistogramBin>,
}

impl Cli {
    fn criteria(&self) -> Result<FilterCriteria> {
        let mut criteria = match &self.criteria {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading criteria {}", path.display()))?;
                serde_json::from_str::<FilterCriteria>(&text)
                    .with_context(|| format!("parsing criteria {}", path.display()))?
            }
            None => FilterCriteria::default(),
        };

        if self.min_price.is_some() {
            criteria.price_range.min = self.min_price;
        }
        if self.max_price.is_some() {
            criteria.price_range.max = self.max_price;
        }
        if !self.locations.is_empty() {
            criteria.location_categories = self.locations.iter().cloned().collect();
        }
        if let Some(income) = self.income {
            criteria.income_bracket = income.into();
        }
        if self.min_age.is_some() {
            criteria.min_house_age = self.min_age;
        }
        Ok(criteria)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let criteria = cli.criteria()?;
    let dataset = load_file(&cli.file)?;
    let result = apply_to_dataset(&dataset, &criteria);
    log::info!(
        "{} of {} records match the criteria",
        result.len(),
        dataset.len()
    );

    let report = Report {
        source: cli.file.display().to_string(),
        total_records: dataset.len(),
        criteria: &criteria,
        summary: &result.stats,
        histogram: price_histogram(&result.records, cli.bins),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialising report")?
    );

    if let Some(path) = &cli.export {
        export_csv_file(&result.records, path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(bad) = e.downcast_ref::<MalformedRecordError>() {
                log::warn!("Data-quality warning: {bad}");
                ExitCode::from(2)
            } else {
                log::error!("{e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
