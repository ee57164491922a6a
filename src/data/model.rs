use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{MalformedReason, MalformedRecordError};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const LONGITUDE: &str = "longitude";
pub const LATITUDE: &str = "latitude";
pub const HOUSING_MEDIAN_AGE: &str = "housing_median_age";
pub const TOTAL_ROOMS: &str = "total_rooms";
pub const TOTAL_BEDROOMS: &str = "total_bedrooms";
pub const POPULATION: &str = "population";
pub const HOUSEHOLDS: &str = "households";
pub const MEDIAN_INCOME: &str = "median_income";
pub const MEDIAN_HOUSE_VALUE: &str = "median_house_value";
pub const OCEAN_PROXIMITY: &str = "ocean_proximity";

/// Canonical column order, matching the published California housing CSV.
pub const COLUMNS: [&str; 10] = [
    LONGITUDE,
    LATITUDE,
    HOUSING_MEDIAN_AGE,
    TOTAL_ROOMS,
    TOTAL_BEDROOMS,
    POPULATION,
    HOUSEHOLDS,
    MEDIAN_INCOME,
    MEDIAN_HOUSE_VALUE,
    OCEAN_PROXIMITY,
];

/// Short column names used by the dashboard copies of the dataset.
const ALIASES: [(&str, &str); 2] = [(OCEAN_PROXIMITY, "location"), (MEDIAN_INCOME, "income")];

// ---------------------------------------------------------------------------
// CellValue – a single decoded cell before validation
// ---------------------------------------------------------------------------

/// A loosely-typed cell as read from a source file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

/// One undecoded row: column name → cell.
pub type RawRow = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// HousingRecord – one validated row
// ---------------------------------------------------------------------------

/// One census block group. Field order follows [`COLUMNS`] so CSV export
/// reproduces the source layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub housing_median_age: f64,
    pub total_rooms: Option<f64>,
    pub total_bedrooms: Option<f64>,
    pub population: Option<f64>,
    pub households: Option<f64>,
    pub median_income: f64,
    pub median_house_value: f64,
    pub ocean_proximity: String,
}

impl HousingRecord {
    /// Validate a raw row. `position` is only used for error reporting.
    ///
    /// Location, price, income and age are required; the room and population
    /// counts may be blank (the public dataset has gaps in `total_bedrooms`)
    /// but must be numeric when present.
    pub fn from_row(position: usize, row: &RawRow) -> Result<Self, MalformedRecordError> {
        Ok(HousingRecord {
            longitude: required_number(row, position, LONGITUDE)?,
            latitude: required_number(row, position, LATITUDE)?,
            housing_median_age: required_number(row, position, HOUSING_MEDIAN_AGE)?,
            total_rooms: optional_number(row, position, TOTAL_ROOMS)?,
            total_bedrooms: optional_number(row, position, TOTAL_BEDROOMS)?,
            population: optional_number(row, position, POPULATION)?,
            households: optional_number(row, position, HOUSEHOLDS)?,
            median_income: required_number(row, position, MEDIAN_INCOME)?,
            median_house_value: required_number(row, position, MEDIAN_HOUSE_VALUE)?,
            ocean_proximity: required_text(row, position, OCEAN_PROXIMITY)?,
        })
    }
}

/// Whether `name` holds the location category, under its canonical name or
/// an alias. Its cells are text even when they look numeric.
pub fn is_category_column(name: &str) -> bool {
    name == OCEAN_PROXIMITY
        || ALIASES
            .iter()
            .any(|(canonical, alias)| *canonical == OCEAN_PROXIMITY && *alias == name)
}

/// Find a column by canonical name or alias. Null cells and blank text count
/// as absent.
fn lookup<'a>(row: &'a RawRow, field: &str) -> Option<&'a CellValue> {
    let present = |cell: &&CellValue| match cell {
        CellValue::Null => false,
        CellValue::Text(s) => !s.trim().is_empty(),
        CellValue::Number(_) => true,
    };
    row.get(field).filter(present).or_else(|| {
        ALIASES
            .iter()
            .filter(|(canonical, _)| *canonical == field)
            .find_map(|(_, alias)| row.get(*alias).filter(present))
    })
}

fn to_number(
    cell: &CellValue,
    position: usize,
    field: &'static str,
) -> Result<f64, MalformedRecordError> {
    let value = match cell {
        CellValue::Number(v) => *v,
        CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            MalformedRecordError::new(position, field, MalformedReason::NotNumeric(s.clone()))
        })?,
        CellValue::Null => {
            return Err(MalformedRecordError::new(
                position,
                field,
                MalformedReason::Missing,
            ))
        }
    };
    if !value.is_finite() {
        return Err(MalformedRecordError::new(
            position,
            field,
            MalformedReason::NotFinite(value),
        ));
    }
    Ok(value)
}

fn required_number(
    row: &RawRow,
    position: usize,
    field: &'static str,
) -> Result<f64, MalformedRecordError> {
    match lookup(row, field) {
        Some(cell) => to_number(cell, position, field),
        None => Err(MalformedRecordError::new(
            position,
            field,
            MalformedReason::Missing,
        )),
    }
}

fn optional_number(
    row: &RawRow,
    position: usize,
    field: &'static str,
) -> Result<Option<f64>, MalformedRecordError> {
    lookup(row, field)
        .map(|cell| to_number(cell, position, field))
        .transpose()
}

fn required_text(
    row: &RawRow,
    position: usize,
    field: &'static str,
) -> Result<String, MalformedRecordError> {
    match lookup(row, field) {
        Some(CellValue::Text(s)) => Ok(s.trim().to_string()),
        Some(other) => Ok(other.to_string()),
        None => Err(MalformedRecordError::new(
            position,
            field,
            MalformedReason::Missing,
        )),
    }
}

// ---------------------------------------------------------------------------
// HousingDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The validated table with its category universe.
#[derive(Debug, Clone, Default)]
pub struct HousingDataset {
    /// All records in source order.
    pub records: Vec<HousingRecord>,
    /// Sorted set of distinct `ocean_proximity` values.
    pub categories: BTreeSet<String>,
}

impl HousingDataset {
    /// Build the category index from already-validated records.
    pub fn from_records(records: Vec<HousingRecord>) -> Self {
        let categories = records
            .iter()
            .map(|r| r.ocean_proximity.clone())
            .collect();
        HousingDataset {
            records,
            categories,
        }
    }

    /// Validate every row before anything else sees the table. Fails on the
    /// first malformed row.
    pub fn from_rows(rows: &[RawRow]) -> Result<Self, MalformedRecordError> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| HousingRecord::from_row(i, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_records(records))
    }

    /// Lowest and highest `median_house_value`, or `None` for an empty table.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        self.records.iter().fold(None, |acc, r| {
            let v = r.median_house_value;
            Some(match acc {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            })
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row() -> RawRow {
        let mut row = RawRow::new();
        row.insert(LONGITUDE.into(), (-122.23).into());
        row.insert(LATITUDE.into(), 37.88.into());
        row.insert(HOUSING_MEDIAN_AGE.into(), 41.0.into());
        row.insert(TOTAL_ROOMS.into(), 880.0.into());
        row.insert(TOTAL_BEDROOMS.into(), 129.0.into());
        row.insert(POPULATION.into(), 322.0.into());
        row.insert(HOUSEHOLDS.into(), 126.0.into());
        row.insert(MEDIAN_INCOME.into(), 8.3252.into());
        row.insert(MEDIAN_HOUSE_VALUE.into(), 452600.0.into());
        row.insert(OCEAN_PROXIMITY.into(), "NEAR BAY".into());
        row
    }

    #[test]
    fn validates_complete_row() {
        let record = HousingRecord::from_row(0, &full_row()).unwrap();
        assert_eq!(record.median_house_value, 452600.0);
        assert_eq!(record.total_bedrooms, Some(129.0));
        assert_eq!(record.ocean_proximity, "NEAR BAY");
    }

    #[test]
    fn numeric_text_is_accepted() {
        let mut row = full_row();
        row.insert(MEDIAN_INCOME.into(), " 3.5 ".into());
        let record = HousingRecord::from_row(0, &row).unwrap();
        assert_eq!(record.median_income, 3.5);
    }

    #[test]
    fn missing_required_field_is_reported_with_position() {
        let mut row = full_row();
        row.remove(MEDIAN_HOUSE_VALUE);
        let err = HousingRecord::from_row(12, &row).unwrap_err();
        assert_eq!(err.position, 12);
        assert_eq!(err.field, MEDIAN_HOUSE_VALUE);
        assert_eq!(err.reason, MalformedReason::Missing);
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let mut row = full_row();
        row.insert(HOUSING_MEDIAN_AGE.into(), "old".into());
        let err = HousingRecord::from_row(3, &row).unwrap_err();
        assert_eq!(err.field, HOUSING_MEDIAN_AGE);
        assert_eq!(err.reason, MalformedReason::NotNumeric("old".into()));
    }

    #[test]
    fn nan_is_rejected() {
        let mut row = full_row();
        row.insert(LATITUDE.into(), "NaN".into());
        let err = HousingRecord::from_row(0, &row).unwrap_err();
        assert_eq!(err.field, LATITUDE);
        assert!(matches!(err.reason, MalformedReason::NotFinite(_)));
    }

    #[test]
    fn blank_optional_field_becomes_none() {
        let mut row = full_row();
        row.insert(TOTAL_BEDROOMS.into(), CellValue::Null);
        row.insert(POPULATION.into(), "".into());
        let record = HousingRecord::from_row(0, &row).unwrap();
        assert_eq!(record.total_bedrooms, None);
        assert_eq!(record.population, None);
    }

    #[test]
    fn bad_optional_field_is_still_rejected() {
        let mut row = full_row();
        row.insert(HOUSEHOLDS.into(), "many".into());
        let err = HousingRecord::from_row(0, &row).unwrap_err();
        assert_eq!(err.field, HOUSEHOLDS);
    }

    #[test]
    fn dashboard_aliases_are_recognised() {
        let mut row = full_row();
        row.remove(OCEAN_PROXIMITY);
        row.remove(MEDIAN_INCOME);
        row.insert("location".into(), "INLAND".into());
        row.insert("income".into(), 2.1.into());
        let record = HousingRecord::from_row(0, &row).unwrap();
        assert_eq!(record.ocean_proximity, "INLAND");
        assert_eq!(record.median_income, 2.1);
    }

    #[test]
    fn category_columns_are_recognised() {
        assert!(is_category_column(OCEAN_PROXIMITY));
        assert!(is_category_column("location"));
        assert!(!is_category_column(MEDIAN_INCOME));
        assert!(!is_category_column("income"));
    }

    #[test]
    fn dataset_reports_first_bad_row() {
        let mut bad = full_row();
        bad.remove(LONGITUDE);
        let rows = vec![full_row(), full_row(), bad, full_row()];
        let err = HousingDataset::from_rows(&rows).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.field, LONGITUDE);
    }

    #[test]
    fn dataset_indexes_categories_and_price_bounds() {
        let mut inland = full_row();
        inland.insert(OCEAN_PROXIMITY.into(), "INLAND".into());
        inland.insert(MEDIAN_HOUSE_VALUE.into(), 90000.0.into());
        let ds = HousingDataset::from_rows(&[full_row(), inland]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.categories.iter().cloned().collect::<Vec<_>>(),
            vec!["INLAND".to_string(), "NEAR BAY".to_string()]
        );
        assert_eq!(ds.price_bounds(), Some((90000.0, 452600.0)));
        assert_eq!(HousingDataset::default().price_bounds(), None);
    }
}
