// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! CSV serialization of enriched records.

use crate::error::{Result, ScrapeError};
use crate::record::{Field, Record};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `records` with a header row to any writer.
///
/// The header is written even when `records` is empty.
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(Field::ALL.iter().map(|f| f.header()))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write `records` to it.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let wrap = |source: csv::Error| ScrapeError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(|e| wrap(csv::Error::from(e)))?;
    write_records(file, records).map_err(wrap)?;
    info!(rows = records.len(), "wrote {}", path.display());
    Ok(())
}

/// Sibling path marked as partial output: `out.csv` becomes `out.partial.csv`.
pub fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scraped_data");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.partial.{ext}"),
        None => format!("{stem}.partial"),
    };
    path.with_file_name(name)
}
