//! CSV sheets <-> [`Table`].
//!
//! A first row counts as a header only when none of its cells is numeric; otherwise
//! the sheet gets the default `token, y, date` headers. Rows with any empty cell, or
//! with a width different from the header, are dropped.

use anyhow::{Context, Result};
use log::debug;
use predictor_core::{Cell, Row, Table};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::cells::parse_cell;

/// Headers assumed for sheets without a header row.
pub const DEFAULT_COLUMNS: [&str; 3] = ["token", "y", "date"];

pub fn default_headers(width: usize) -> Vec<String> {
    (0..width)
        .map(|i| match DEFAULT_COLUMNS.get(i) {
            Some(h) => h.to_string(),
            None => format!("column{}", i + 1),
        })
        .collect()
}

/// True when the record looks like a header row.
pub fn is_header_record(record: &csv::StringRecord) -> bool {
    !record.is_empty()
        && record
            .iter()
            .all(|s| !s.trim().is_empty() && !matches!(parse_cell(s), Cell::Number(_)))
}

pub fn read_table_from_reader<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result.context("reading csv record")?;
        if record.iter().all(|s| s.trim().is_empty()) {
            continue;
        }

        let width = match &headers {
            Some(h) => h.len(),
            None => {
                if is_header_record(&record) {
                    headers = Some(record.iter().map(|s| s.trim().to_string()).collect());
                    continue;
                }
                let h = default_headers(record.len());
                let width = h.len();
                headers = Some(h);
                width
            }
        };

        let row = Row::new(record.iter().map(parse_cell).collect());
        if row.len() == width && row.is_complete() {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!("read_table: dropped {dropped} partial rows");
    }

    Ok(Table::new(headers.unwrap_or_default(), rows))
}

pub fn read_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_table_from_reader(file).with_context(|| format!("parsing {}", path.display()))
}

/// Write rows as CSV, preceded by `headers` when given.
pub fn write_rows<W: Write>(writer: W, headers: Option<&[String]>, rows: &[Row]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    if let Some(headers) = headers {
        wtr.write_record(headers)?;
    }
    for row in rows {
        wtr.write_record(row.cells.iter().map(|c| c.to_string()))?;
    }
    wtr.flush().context("flushing csv output")?;
    Ok(())
}

pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<()> {
    write_rows(writer, Some(&table.headers), &table.rows)
}

pub fn write_table_path(path: impl AsRef<Path>, table: &Table) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_table(file, table)
}
