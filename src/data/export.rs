use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::{HousingRecord, COLUMNS};

/// Write records as CSV in canonical column order. The header is written
/// even when there are no records. Missing optional counts are left blank.
pub fn write_csv<'a, I, W>(records: I, writer: W) -> Result<()>
where
    I: IntoIterator<Item = &'a HousingRecord>,
    W: Write,
{
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    out.write_record(COLUMNS).context("writing CSV header")?;
    for (i, record) in records.into_iter().enumerate() {
        out.serialize(record)
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    out.flush().context("flushing CSV output")?;
    Ok(())
}

/// CSV export into a `String`, for download buttons and clipboards.
pub fn to_csv_string<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a HousingRecord>,
{
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

/// Write a CSV export to `path`, replacing any existing file.
pub fn export_csv_file<'a, I>(records: I, path: &Path) -> Result<()>
where
    I: IntoIterator<Item = &'a HousingRecord>,
{
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(records, std::io::BufWriter::new(file))?;
    log::info!("Exported filtered rows to {}", path.display());
    Ok(())
}

/// Records-oriented JSON array, readable by the JSON loader.
pub fn write_json<'a, I, W>(records: I, writer: W) -> Result<()>
where
    I: IntoIterator<Item = &'a HousingRecord>,
    W: Write,
{
    let rows: Vec<&HousingRecord> = records.into_iter().collect();
    serde_json::to_writer_pretty(writer, &rows).context("writing JSON export")?;
    Ok(())
}
