//! Sheets named by date (`2021.11.06.csv`, `06.11.2021.csv`, ...), used to seed a history.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cells::parse_date;

/// A sheet file whose name carries the day its rows were recorded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedSheet {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Day encoded in a sheet name, if any. Backslashes are read as slashes.
pub fn sheet_date(name: &str) -> Option<NaiveDate> {
    let re = Regex::new(r"^\s*\d{1,4}[./-]\d{1,2}[./-]\d{1,4}\s*$").ok()?;
    let normalized = name.replace('\\', "/");
    if !re.is_match(&normalized) {
        return None;
    }
    parse_date(&normalized)
}

/// CSV files in `dir` whose stem is a date, oldest first.
pub fn dated_sheets(dir: impl AsRef<Path>) -> Result<Vec<DatedSheet>> {
    let dir = dir.as_ref();
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        let Some(date) = path.file_stem().and_then(|s| s.to_str()).and_then(sheet_date) else {
            continue;
        };
        out.push(DatedSheet { date, path });
    }
    out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sheet_names() {
        assert_eq!(sheet_date("2021.11.06"), Some(day(2021, 11, 6)));
        assert_eq!(sheet_date("06.11.2021"), Some(day(2021, 11, 6)));
        assert_eq!(sheet_date("2021-11-06"), Some(day(2021, 11, 6)));
        assert_eq!(sheet_date("11\\06\\2021"), Some(day(2021, 11, 6)));
        assert_eq!(sheet_date("Sheet 1"), None);
        assert_eq!(sheet_date("PredictorHistory"), None);
    }

    #[test]
    fn test_dated_sheets_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["13.11.2021.csv", "2021.11.06.csv", "notes.csv", "2021.11.10.txt"] {
            fs::write(dir.path().join(name), "token,y\nmilk,1\n").unwrap();
        }
        let sheets = dated_sheets(dir.path()).unwrap();
        let dates: Vec<_> = sheets.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(2021, 11, 6), day(2021, 11, 13)]);
    }
}
