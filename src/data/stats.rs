use std::collections::HashMap;

use serde::Serialize;

use super::model::HousingRecord;

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Aggregates over a filtered record set. Every aggregate is `None` when
/// `count` is zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean_price: Option<f64>,
    pub mean_income: Option<f64>,
    pub mean_house_age: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub income_min: Option<f64>,
    pub income_max: Option<f64>,
    pub modal_category: Option<String>,
}

#[derive(Default)]
struct Extent {
    bounds: Option<(f64, f64)>,
}

impl Extent {
    fn push(&mut self, v: f64) {
        self.bounds = Some(match self.bounds {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }

    fn min(&self) -> Option<f64> {
        self.bounds.map(|(lo, _)| lo)
    }

    fn max(&self) -> Option<f64> {
        self.bounds.map(|(_, hi)| hi)
    }
}

/// Count, means, extents and modal category in a single pass.
pub fn summarize<'a, I>(records: I) -> SummaryStats
where
    I: IntoIterator<Item = &'a HousingRecord>,
{
    let mut count = 0usize;
    let (mut price_sum, mut income_sum, mut age_sum) = (0.0, 0.0, 0.0);
    let mut price = Extent::default();
    let mut income = Extent::default();
    let mut categories = CategoryCounter::default();

    for r in records {
        count += 1;
        price_sum += r.median_house_value;
        income_sum += r.median_income;
        age_sum += r.housing_median_age;
        price.push(r.median_house_value);
        income.push(r.median_income);
        categories.push(&r.ocean_proximity);
    }

    let mean = |sum: f64| (count > 0).then(|| sum / count as f64);

    SummaryStats {
        count,
        mean_price: mean(price_sum),
        mean_income: mean(income_sum),
        mean_house_age: mean(age_sum),
        price_min: price.min(),
        price_max: price.max(),
        income_min: income.min(),
        income_max: income.max(),
        modal_category: categories.modal().map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Category counts
// ---------------------------------------------------------------------------

/// Occurrence counts that remember first-appearance order.
#[derive(Default)]
struct CategoryCounter<'a> {
    order: Vec<(&'a str, usize)>,
    index: HashMap<&'a str, usize>,
}

impl<'a> CategoryCounter<'a> {
    fn push(&mut self, category: &'a str) {
        match self.index.get(category) {
            Some(&slot) => self.order[slot].1 += 1,
            None => {
                self.index.insert(category, self.order.len());
                self.order.push((category, 1));
            }
        }
    }

    /// Most frequent category; the earliest seen wins a tie.
    fn modal(&self) -> Option<&'a str> {
        let mut best: Option<(&'a str, usize)> = None;
        for &(category, n) in &self.order {
            if best.map_or(true, |(_, top)| n > top) {
                best = Some((category, n));
            }
        }
        best.map(|(category, _)| category)
    }
}

/// Per-category counts in order of first appearance.
pub fn category_counts<'a, I>(records: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a HousingRecord>,
{
    let mut counter = CategoryCounter::default();
    for r in records {
        counter.push(&r.ocean_proximity);
    }
    counter
        .order
        .into_iter()
        .map(|(category, n)| (category.to_string(), n))
        .collect()
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Bin count used by the house-value distribution chart.
pub const DEFAULT_BINS: usize = 30;

/// One equal-width bin. All bins are half-open `[lower, upper)` except the
/// last, which also includes `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over finite `values`.
///
/// A constant input is spread over `[v - 0.5, v + 0.5]`. Empty input or
/// `bins == 0` gives no bins.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if bins == 0 || values.is_empty() {
        return Vec::new();
    }
    let mut extent = Extent::default();
    values.iter().for_each(|&v| extent.push(v));
    let Some((mut lo, mut hi)) = extent.bounds else {
        return Vec::new();
    };
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let slot = (((v - lo) / width) as usize).min(bins - 1);
        counts[slot] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + i as f64 * width,
            upper: if i + 1 == bins {
                hi
            } else {
                lo + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

/// Histogram of `median_house_value`.
pub fn price_histogram<'a, I>(records: I, bins: usize) -> Vec<HistogramBin>
where
    I: IntoIterator<Item = &'a HousingRecord>,
{
    let values: Vec<f64> = records.into_iter().map(|r| r.median_house_value).collect();
    histogram(&values, bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: f64, income: f64, age: f64, category: &str) -> HousingRecord {
        HousingRecord {
            longitude: -118.0,
            latitude: 34.0,
            housing_median_age: age,
            total_rooms: Some(1000.0),
            total_bedrooms: None,
            population: Some(800.0),
            households: Some(300.0),
            median_income: income,
            median_house_value: value,
            ocean_proximity: category.to_string(),
        }
    }

    #[test]
    fn empty_input_has_null_aggregates() {
        let none: Vec<HousingRecord> = Vec::new();
        let stats = summarize(&none);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_price, None);
        assert_eq!(stats.mean_income, None);
        assert_eq!(stats.mean_house_age, None);
        assert_eq!(stats.price_min, None);
        assert_eq!(stats.income_max, None);
        assert_eq!(stats.modal_category, None);
    }

    #[test]
    fn means_and_extents() {
        let records = vec![
            record(100000.0, 2.0, 10.0, "INLAND"),
            record(200000.0, 4.0, 20.0, "INLAND"),
            record(600000.0, 6.0, 60.0, "ISLAND"),
        ];
        let stats = summarize(&records);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean_price, Some(300000.0));
        assert_eq!(stats.mean_income, Some(4.0));
        assert_eq!(stats.mean_house_age, Some(30.0));
        assert_eq!(stats.price_min, Some(100000.0));
        assert_eq!(stats.price_max, Some(600000.0));
        assert_eq!(stats.income_min, Some(2.0));
        assert_eq!(stats.income_max, Some(6.0));
        assert_eq!(stats.modal_category.as_deref(), Some("INLAND"));
    }

    #[test]
    fn modal_tie_goes_to_first_seen() {
        let records = vec![
            record(1.0, 1.0, 1.0, "NEAR OCEAN"),
            record(1.0, 1.0, 1.0, "INLAND"),
            record(1.0, 1.0, 1.0, "INLAND"),
            record(1.0, 1.0, 1.0, "NEAR OCEAN"),
        ];
        assert_eq!(
            summarize(&records).modal_category.as_deref(),
            Some("NEAR OCEAN")
        );
        assert_eq!(
            category_counts(&records),
            vec![("NEAR OCEAN".to_string(), 2), ("INLAND".to_string(), 2)]
        );
    }

    #[test]
    fn empty_summary_serializes_nulls() {
        let json = serde_json::to_value(summarize(std::iter::empty())).unwrap();
        assert_eq!(json["count"], 0);
        assert!(json["mean_price"].is_null());
        assert!(json["modal_category"].is_null());
    }

    #[test]
    fn histogram_counts_cover_all_values() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0];
        let bins = histogram(&values, 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[4].upper, 10.0);
        // 10.0 sits on the closed right edge of the last bin
        assert_eq!(bins[4].count, 2);
    }

    #[test]
    fn histogram_of_constant_values() {
        let bins = histogram(&[7.0, 7.0, 7.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].lower, 6.5);
        assert_eq!(bins[1].upper, 7.5);
        assert_eq!(bins[1].count, 3);
    }

    #[test]
    fn histogram_of_nothing() {
        assert!(histogram(&[], DEFAULT_BINS).is_empty());
        assert!(histogram(&[1.0], 0).is_empty());
    }

    #[test]
    fn price_histogram_uses_house_value() {
        let records = vec![record(100.0, 1.0, 1.0, "A"), record(200.0, 1.0, 1.0, "A")];
        let bins = price_histogram(&records, 2);
        assert_eq!(bins[0].lower, 100.0);
        assert_eq!(bins[1].upper, 200.0);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 1);
    }
}
