//! History file maintenance: the CSV the forecaster reads.
//!
//! A history is the current sheet's columns plus a `date` column. Task sheets already
//! carry their date and are copied as-is.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use log::info;
use predictor_core::{Cell, Row, Schema, Table};
use std::fs::OpenOptions;
use std::path::Path;

use crate::sheets::dated_sheets;
use crate::table::{read_table, write_rows, write_table_path, DEFAULT_COLUMNS};

pub const DATE_COLUMN: &str = "date";

/// Headers a history built from `sheet_headers` carries.
pub fn history_headers(sheet_headers: &[String]) -> Vec<String> {
    let mut headers = sheet_headers.to_vec();
    if !Schema::is_structured(sheet_headers) {
        headers.push(DATE_COLUMN.to_string());
    }
    headers
}

fn stamp(rows: &[Row], date: NaiveDate) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            let mut cells = row.cells.clone();
            cells.push(Cell::Date(date));
            Row::new(cells)
        })
        .collect()
}

fn same_headers(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.trim().to_lowercase() == y.trim().to_lowercase())
}

/// Append the current sheet to the history at `history_path`, creating it if needed.
///
/// Plain sheets: every row is stamped with `date`. Task sheets: only rows dated after
/// the newest history row are appended. Returns the number of appended rows.
pub fn save_history(current: &Table, history_path: impl AsRef<Path>, date: NaiveDate) -> Result<usize> {
    let history_path = history_path.as_ref();
    let headers = history_headers(&current.headers);
    let structured = Schema::is_structured(&current.headers);

    let existing = if history_path.exists() {
        let history = read_table(history_path)?;
        if !same_headers(&history.headers, &headers) {
            bail!(
                "history {} has headers {:?}, expected {:?}",
                history_path.display(),
                history.headers,
                headers
            );
        }
        Some(history)
    } else {
        None
    };

    let rows = if structured {
        let date_col = Schema::Structured.date_column();
        let last_saved = existing
            .as_ref()
            .and_then(|h| h.rows.iter().filter_map(|r| r.get(date_col)?.as_date()).max());
        current
            .rows
            .iter()
            .filter(|r| match (last_saved, r.get(date_col).and_then(Cell::as_date)) {
                (Some(last), Some(d)) => d > last,
                (None, Some(_)) => true,
                (_, None) => false,
            })
            .cloned()
            .collect()
    } else {
        stamp(&current.rows, date)
    };

    if existing.is_none() {
        write_table_path(history_path, &Table::new(headers, rows.clone()))?;
    } else if !rows.is_empty() {
        let file = OpenOptions::new()
            .append(true)
            .open(history_path)
            .with_context(|| format!("opening {} for append", history_path.display()))?;
        write_rows(file, None, &rows)?;
    }

    info!("save_history: appended {} rows into {}", rows.len(), history_path.display());
    Ok(rows.len())
}

/// Build a history from the dated sheets in `sheets_dir`.
///
/// Does nothing when `history_path` already exists. Returns the number of sheets loaded.
pub fn initialize_history(sheets_dir: impl AsRef<Path>, history_path: impl AsRef<Path>) -> Result<usize> {
    let history_path = history_path.as_ref();
    if history_path.exists() {
        info!("initialize_history: {} already exists", history_path.display());
        return Ok(0);
    }

    let sheets = dated_sheets(sheets_dir)?;
    let mut history: Option<Table> = None;

    for sheet in &sheets {
        let table = read_table(&sheet.path)?;
        let headers = history_headers(&table.headers);
        let rows = if Schema::is_structured(&table.headers) {
            table.rows
        } else {
            stamp(&table.rows, sheet.date)
        };
        info!(
            "initialize_history: {} rows from {}",
            rows.len(),
            sheet.path.display()
        );

        match history.as_mut() {
            None => history = Some(Table::new(headers, rows)),
            Some(h) if same_headers(&h.headers, &headers) => h.rows.extend(rows),
            Some(h) => bail!(
                "{} has headers {:?}, expected {:?}",
                sheet.path.display(),
                table.headers,
                h.headers
            ),
        }
    }

    let history = history.unwrap_or_else(|| {
        Table::new(DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(), vec![])
    });
    write_table_path(history_path, &history)?;
    info!(
        "initialize_history: parsed {} sheets into {}",
        sheets.len(),
        history_path.display()
    );
    Ok(sheets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 11, d).unwrap()
    }

    fn sheet(rows: &[(&str, f64)]) -> Table {
        Table::new(
            vec!["token".into(), "y".into()],
            rows.iter()
                .map(|(t, y)| Row::new(vec![Cell::text(*t), Cell::Number(*y)]))
                .collect(),
        )
    }

    #[test]
    fn test_save_history_stamps_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        assert_eq!(save_history(&sheet(&[("milk", 1.0), ("bread", 2.0)]), &path, day(6)).unwrap(), 2);
        assert_eq!(save_history(&sheet(&[("milk", 3.0)]), &path, day(13)).unwrap(), 1);

        let history = read_table(&path).unwrap();
        assert_eq!(history.headers, vec!["token", "y", "date"]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.rows[2].cells[2], Cell::Date(day(13)));
    }

    #[test]
    fn test_save_history_rejects_other_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, "name,qty,date\nmilk,1,2021-11-06\n").unwrap();
        assert!(save_history(&sheet(&[("milk", 1.0)]), &path, day(6)).is_err());
    }

    #[test]
    fn test_save_structured_history_only_appends_newer_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let headers: Vec<String> = ["project-task", "effort", "description", "date"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = |d: u32| {
            Row::new(vec![Cell::text("A"), Cell::Number(1.0), Cell::text("B"), Cell::Date(day(d))])
        };

        let first = Table::new(headers.clone(), vec![row(1), row(2)]);
        assert_eq!(save_history(&first, &path, day(20)).unwrap(), 2);

        let second = Table::new(headers, vec![row(1), row(2), row(3)]);
        assert_eq!(save_history(&second, &path, day(20)).unwrap(), 1);
        assert_eq!(read_table(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_initialize_history_from_dated_sheets() {
        let sheets = tempfile::tempdir().unwrap();
        fs::write(sheets.path().join("2021.11.06.csv"), "token,y\nmilk,1\nbread,2\n").unwrap();
        fs::write(sheets.path().join("13.11.2021.csv"), "token,y\nmilk,3\n").unwrap();
        fs::write(sheets.path().join("Sheet1.csv"), "token,y\nignored,1\n").unwrap();

        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("history.csv");
        assert_eq!(initialize_history(sheets.path(), &path).unwrap(), 2);

        let history = read_table(&path).unwrap();
        assert_eq!(history.headers, vec!["token", "y", "date"]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.rows[2].cells, vec![Cell::text("milk"), Cell::Number(3.0), Cell::Date(day(13))]);

        // Second call is a no-op.
        assert_eq!(initialize_history(sheets.path(), &path).unwrap(), 0);
    }
}
