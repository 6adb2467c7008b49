//! Output formatting and persistence for cleaned tables and summaries.
//!
//! Supports JSON logging of summaries and CSV export (plain or gzip).

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::table::Table;

/// Logs a summary as pretty-printed JSON.
pub fn print_json(label: &str, value: &impl Serialize) -> Result<()> {
    info!(section = label, "{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `table` as CSV: header with every column in table order, one line
/// per record, no index column.
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(table.columns())?;
    for record in table.records() {
        wtr.write_record(table.columns().iter().map(|col| {
            record
                .get(col)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Renders `table` as a CSV string, the payload of a dashboard download.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_table(&mut buf, table)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes `table` to `path` as CSV, replacing any existing file.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_table(file, table)?;
    debug!(path = %path.display(), rows = table.len(), "CSV written");
    Ok(())
}

/// Writes `table` to `path` as gzip-compressed CSV.
pub fn write_csv_gz(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    write_table(&mut encoder, table)?;
    encoder.finish()?;
    debug!(path = %path.display(), rows = table.len(), "Gzipped CSV written");
    Ok(())
}
