use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::MalformedRecordError;
use super::model::{HousingDataset, HousingRecord, RawRow};
use super::stats::{summarize, SummaryStats};

/// Upper bound (inclusive) of the Low income bracket.
pub const LOW_INCOME_MAX: f64 = 2.5;
/// Lower bound (inclusive) of the High income bracket.
pub const HIGH_INCOME_MIN: f64 = 4.5;
/// Location selection that means "every category".
pub const ALL_LOCATIONS: &str = "All";

// ---------------------------------------------------------------------------
// Income bracket
// ---------------------------------------------------------------------------

/// Median-income band, in units of $10k.
///
/// Low and High are closed at their inner edge; Medium is open on both ends,
/// so 2.5 is Low and 4.5 is High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeBracket {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[default]
    #[serde(alias = "All", alias = "ALL")]
    All,
}

impl IncomeBracket {
    /// Whether `income` falls inside this bracket.
    pub fn contains(self, income: f64) -> bool {
        match self {
            IncomeBracket::Low => income <= LOW_INCOME_MAX,
            IncomeBracket::Medium => income > LOW_INCOME_MAX && income < HIGH_INCOME_MIN,
            IncomeBracket::High => income >= HIGH_INCOME_MIN,
            IncomeBracket::All => true,
        }
    }

    /// The single concrete bracket an income belongs to (never `All`).
    pub fn classify(income: f64) -> IncomeBracket {
        if income <= LOW_INCOME_MAX {
            IncomeBracket::Low
        } else if income < HIGH_INCOME_MIN {
            IncomeBracket::Medium
        } else {
            IncomeBracket::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IncomeBracket::Low => "Low",
            IncomeBracket::Medium => "Medium",
            IncomeBracket::High => "High",
            IncomeBracket::All => "All",
        }
    }
}

impl fmt::Display for IncomeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown income bracket '{0}' (expected low, medium, high or all)")]
pub struct ParseIncomeBracketError(String);

impl FromStr for IncomeBracket {
    type Err = ParseIncomeBracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(IncomeBracket::Low),
            "medium" => Ok(IncomeBracket::Medium),
            "high" => Ok(IncomeBracket::High),
            "all" => Ok(IncomeBracket::All),
            _ => Err(ParseIncomeBracketError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Price range
// ---------------------------------------------------------------------------

/// Inclusive interval over `median_house_value`. A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// One-sided lower bound, as used by the single-slider dashboards.
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |lo| value >= lo) && self.max.map_or(true, |hi| value <= hi)
    }
}

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Everything a user can restrict. The default restricts nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub price_range: PriceRange,
    /// Accepted `ocean_proximity` values. Empty, or containing
    /// [`ALL_LOCATIONS`], means no restriction.
    pub location_categories: BTreeSet<String>,
    pub income_bracket: IncomeBracket,
    pub min_house_age: Option<f64>,
}

impl FilterCriteria {
    /// Criteria that pass every record of `dataset` while still carrying its
    /// price bounds and full category list, mirroring freshly-initialised
    /// dashboard widgets.
    pub fn spanning(dataset: &HousingDataset) -> Self {
        let price_range = match dataset.price_bounds() {
            Some((lo, hi)) => PriceRange::between(lo, hi),
            None => PriceRange::unbounded(),
        };
        Self {
            price_range,
            location_categories: dataset.categories.clone(),
            ..Self::default()
        }
    }

    pub fn with_price_range(mut self, price_range: PriceRange) -> Self {
        self.price_range = price_range;
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.location_categories = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_income_bracket(mut self, bracket: IncomeBracket) -> Self {
        self.income_bracket = bracket;
        self
    }

    pub fn with_min_house_age(mut self, age: f64) -> Self {
        self.min_house_age = Some(age);
        self
    }

    /// The location set to test membership against, or `None` when the
    /// selection does not exclude anything. `universe` is the set of
    /// categories present in the data, when known.
    fn location_restriction(&self, universe: Option<&BTreeSet<String>>) -> Option<&BTreeSet<String>> {
        let selected = &self.location_categories;
        let all = |s: &String| s.trim().eq_ignore_ascii_case(ALL_LOCATIONS);
        if selected.is_empty() || selected.iter().any(all) {
            return None;
        }
        if universe.is_some_and(|all| all.is_subset(selected)) {
            return None;
        }
        Some(selected)
    }

    /// Whether a single record passes every active dimension.
    pub fn matches(&self, record: &HousingRecord) -> bool {
        self.passes(record, self.location_restriction(None))
    }

    fn passes(&self, record: &HousingRecord, locations: Option<&BTreeSet<String>>) -> bool {
        self.price_range.contains(record.median_house_value)
            && locations.map_or(true, |set| set.contains(&record.ocean_proximity))
            && self.income_bracket.contains(record.median_income)
            && self
                .min_house_age
                .map_or(true, |age| record.housing_median_age >= age)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Records that passed the criteria, in input order, with their summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredResult {
    pub records: Vec<HousingRecord>,
    pub stats: SummaryStats,
}

impl FilteredResult {
    fn from_indices(records: &[HousingRecord], indices: &[usize]) -> Self {
        let records: Vec<HousingRecord> = indices.iter().map(|&i| records[i].clone()).collect();
        let stats = summarize(&records);
        FilteredResult { records, stats }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn select(
    records: &[HousingRecord],
    criteria: &FilterCriteria,
    universe: Option<&BTreeSet<String>>,
) -> Vec<usize> {
    let locations = criteria.location_restriction(universe);
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| criteria.passes(record, locations))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of records passing all active filters, ascending.
pub fn filtered_indices(records: &[HousingRecord], criteria: &FilterCriteria) -> Vec<usize> {
    select(records, criteria, None)
}

/// Like [`filtered_indices`], but a location selection covering the
/// dataset's whole category universe is skipped outright.
pub fn filtered_dataset_indices(dataset: &HousingDataset, criteria: &FilterCriteria) -> Vec<usize> {
    select(&dataset.records, criteria, Some(&dataset.categories))
}

/// Filter `records` and summarise the survivors. The input is untouched.
pub fn apply(records: &[HousingRecord], criteria: &FilterCriteria) -> FilteredResult {
    let indices = filtered_indices(records, criteria);
    log::debug!(
        "filter kept {} of {} records ({:?})",
        indices.len(),
        records.len(),
        criteria
    );
    FilteredResult::from_indices(records, &indices)
}

/// [`apply`] over a loaded dataset.
pub fn apply_to_dataset(dataset: &HousingDataset, criteria: &FilterCriteria) -> FilteredResult {
    let indices = filtered_dataset_indices(dataset, criteria);
    log::debug!(
        "filter kept {} of {} records",
        indices.len(),
        dataset.len()
    );
    FilteredResult::from_indices(&dataset.records, &indices)
}

/// Validate raw rows, then filter. Nothing is filtered if any row is
/// malformed.
pub fn apply_rows(
    rows: &[RawRow],
    criteria: &FilterCriteria,
) -> Result<FilteredResult, MalformedRecordError> {
    let dataset = HousingDataset::from_rows(rows)?;
    Ok(apply_to_dataset(&dataset, criteria))
}
