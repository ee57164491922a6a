use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{is_category_column, CellValue, HousingDataset, RawRow};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and validate a housing table. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one line per block group
/// * `.json`    – `[{ "median_house_value": ..., "ocean_proximity": ... }, ...]`
/// * `.parquet` – flat numeric / string columns
///
/// A malformed row aborts the load; the resulting error downcasts to
/// [`MalformedRecordError`](super::error::MalformedRecordError).
pub fn load_file(path: &Path) -> Result<HousingDataset> {
    let rows = read_rows(path)?;
    let dataset = HousingDataset::from_rows(&rows)
        .with_context(|| format!("validating records in {}", path.display()))?;
    log::info!(
        "Loaded {} records ({} categories) from {}",
        dataset.len(),
        dataset.categories.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode a file into raw rows without validating them.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening CSV {}", path.display()))?;
            read_csv(file)
        }
        "json" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading JSON {}", path.display()))?;
            read_json(&text)
        }
        "parquet" | "pq" => read_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, any column order. Blank cells
/// become [`CellValue::Null`]. Short rows are accepted here; their missing
/// cells are simply absent from the row, so validation reports them with
/// the row's position.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| {
                let cell = if is_category_column(name) {
                    text_cell(value)
                } else {
                    guess_cell(value)
                };
                (name.clone(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn text_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(s.to_string())
    }
}

fn guess_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Number(v),
        _ => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "longitude": -122.23, "latitude": 37.88, "median_house_value": 452600.0,
///     "ocean_proximity": "NEAR BAY", ... },
///   ...
/// ]
/// ```
pub fn read_json(text: &str) -> Result<Vec<RawRow>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| -> Result<RawRow> {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(obj
                .iter()
                .map(|(key, val)| (key.clone(), json_to_cell(val)))
                .collect())
        })
        .collect()
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Number(n) => match n.as_f64() {
            Some(v) => CellValue::Number(v),
            None => CellValue::Text(n.to_string()),
        },
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per field.
///
/// Any integer, float or decimal column is read as `f64`; dictionary-encoded
/// columns (Pandas `category`) are decoded to their string values. Other
/// column types are an error. Works with files written by both Pandas
/// (`df.to_parquet()`) and Polars (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening parquet file {}", path.display()))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, col)| Ok((field.name().clone(), normalize_column(field.name(), col)?)))
            .collect::<Result<Vec<(String, ArrayRef)>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .map(|(name, col)| (name.clone(), extract_cell(col, row)))
                    .collect(),
            );
        }
    }
    Ok(rows)
}

/// Cast a column to one of the layouts [`extract_cell`] reads: Float64,
/// Utf8/LargeUtf8, Boolean or Null.
fn normalize_column(name: &str, col: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Float64
        | DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Boolean
        | DataType::Null => return Ok(col.clone()),
        DataType::Dictionary(_, values) => match values.as_ref() {
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => DataType::Utf8,
            v if v.is_numeric() => DataType::Float64,
            v => bail!("Column '{name}': unsupported dictionary value type {v}"),
        },
        DataType::Utf8View => DataType::Utf8,
        t if t.is_numeric() => DataType::Float64,
        t => bail!("Column '{name}': unsupported parquet column type {t}"),
    };
    cast(col, &target).with_context(|| format!("Column '{name}': converting to {target}"))
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Float64 => CellValue::Number(col.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => CellValue::Text(col.as_boolean().value(row).to_string()),
        // normalize_column admits nothing else; a Null column is null at every row
        _ => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Date32Array, DictionaryArray, Int16Array};
    use arrow::datatypes::Int32Type;

    use super::*;
    use crate::data::error::MalformedReason;
    use crate::data::model::{
        HOUSING_MEDIAN_AGE, MEDIAN_HOUSE_VALUE, MEDIAN_INCOME, OCEAN_PROXIMITY, TOTAL_BEDROOMS,
    };

    const CSV: &str = "\
longitude,latitude,housing_median_age,total_rooms,total_bedrooms,population,households,median_income,median_house_value,ocean_proximity
-122.23,37.88,41.0,880.0,129.0,322.0,126.0,8.3252,452600.0,NEAR BAY
-121.24,38.79,23.0,1824.0,,1101.0,408.0,2.1042,94300.0,INLAND
";

    #[test]
    fn csv_blank_cells_are_null() {
        let rows = read_csv(CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][TOTAL_BEDROOMS], CellValue::Null);
        assert_eq!(rows[0][MEDIAN_HOUSE_VALUE], CellValue::Number(452600.0));
        assert_eq!(rows[0][OCEAN_PROXIMITY], CellValue::Text("NEAR BAY".into()));

        let ds = HousingDataset::from_rows(&rows).unwrap();
        assert_eq!(ds.records[1].total_bedrooms, None);
    }

    #[test]
    fn short_csv_row_is_malformed_at_its_position() {
        let short = format!("{CSV}-120.0,36.0,10.0,500.0\n");
        let rows = read_csv(short.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        let err = HousingDataset::from_rows(&rows).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.field, MEDIAN_INCOME);
        assert_eq!(err.reason, MalformedReason::Missing);
    }

    #[test]
    fn numeric_looking_category_keeps_its_text() {
        let csv = CSV.replace("NEAR BAY", "01");
        let rows = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0][OCEAN_PROXIMITY], CellValue::Text("01".into()));
        let ds = HousingDataset::from_rows(&rows).unwrap();
        assert_eq!(ds.records[0].ocean_proximity, "01");
        // numeric columns are still guessed
        assert_eq!(rows[0][MEDIAN_HOUSE_VALUE], CellValue::Number(452600.0));
    }

    #[test]
    fn small_integer_and_dictionary_columns_are_normalized() {
        let ages: ArrayRef = Arc::new(Int16Array::from(vec![41, 23]));
        let ages = normalize_column(HOUSING_MEDIAN_AGE, &ages).unwrap();
        assert_eq!(extract_cell(&ages, 1), CellValue::Number(23.0));

        let dict: DictionaryArray<Int32Type> = vec!["INLAND", "NEAR BAY", "INLAND"]
            .into_iter()
            .collect();
        let dict: ArrayRef = Arc::new(dict);
        let categories = normalize_column(OCEAN_PROXIMITY, &dict).unwrap();
        assert_eq!(extract_cell(&categories, 1), CellValue::Text("NEAR BAY".into()));
        assert_eq!(extract_cell(&categories, 2), CellValue::Text("INLAND".into()));
    }

    #[test]
    fn unsupported_parquet_type_is_an_error() {
        let dates: ArrayRef = Arc::new(Date32Array::from(vec![19000]));
        let err = normalize_column("surveyed", &dates).unwrap_err();
        assert!(err.to_string().contains("surveyed"), "{err}");
    }

    #[test]
    fn json_records_decode() {
        let rows = read_json(
            r#"[{"longitude": -118.0, "latitude": 34.0, "housing_median_age": 12,
                 "median_income": 4.5, "median_house_value": 250000,
                 "ocean_proximity": "<1H OCEAN", "total_rooms": null}]"#,
        )
        .unwrap();
        let ds = HousingDataset::from_rows(&rows).unwrap();
        assert_eq!(ds.records[0].housing_median_age, 12.0);
        assert_eq!(ds.records[0].total_rooms, None);
        assert_eq!(ds.records[0].ocean_proximity, "<1H OCEAN");
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(read_json(r#"{"a": 1}"#).is_err());
        assert!(read_json("[1, 2]").is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read_rows(Path::new("housing.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }
}
