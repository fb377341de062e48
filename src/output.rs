// src/output.rs
//
// Single-shot CSV serialization of the accumulated record set.

use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::record::{RecordSet, Value};

/// Write the whole record set to `path`: one header row in first-seen
/// column order, then one row per record. Absent and null fields render
/// as empty cells.
pub fn write_csv(path: &Path, records: &RecordSet) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    if !records.columns().is_empty() {
        writer
            .write_record(records.columns())
            .context("writing CSV header")?;
    }

    for record in records.records() {
        let row: Vec<String> = records
            .columns()
            .iter()
            .map(|column| record.value(column).map(Value::render).unwrap_or_default())
            .collect();
        writer.write_record(&row).context("writing CSV row")?;
    }

    writer.flush().context("flushing CSV output")?;
    Ok(())
}
