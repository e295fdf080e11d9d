use crate::record::{BenchmarkRecord, ExternalRow};
use anyhow::{Context, Result};
use std::path::Path;

/// Read canonical-schema rows from a CSV file. Rows are not validated here;
/// pass them to `BenchmarkStore::extend_from`.
pub fn read_rows(path: &Path) -> Result<Vec<ExternalRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let row: ExternalRow =
            row.with_context(|| format!("Malformed row {} in {}", index, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write records in the canonical interchange schema.
pub fn write_records(path: &Path, records: &[BenchmarkRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}
