//! Raw sheet text -> typed cells.
//!
//! Order of interpretation: number, calendar date, text. Text is kept byte-for-byte
//! (token values are grouped by exact equality).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use predictor_core::Cell;

/// Date-only layouts seen in exported sheets.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];

/// Timestamp layouts; the time of day is discarded.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

pub fn parse_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() {
        return Cell::Text(String::new());
    }
    if let Ok(n) = s.parse::<f64>() {
        if n.is_finite() {
            return Cell::Number(n);
        }
    }
    if let Some(d) = parse_date(s) {
        return Cell::Date(d);
    }
    Cell::Text(raw.to_string())
}

/// Parse a calendar day, dropping any time-of-day component.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_cell("2"), Cell::Number(2.0));
        assert_eq!(parse_cell(" 0.3 "), Cell::Number(0.3));
        assert_eq!(parse_cell("NaN"), Cell::text("NaN"));
    }

    #[test]
    fn test_dates() {
        assert_eq!(parse_cell("2021-11-06"), Cell::Date(day(2021, 11, 6)));
        assert_eq!(parse_cell("06.11.2021"), Cell::Date(day(2021, 11, 6)));
        assert_eq!(parse_cell("11/06/2021"), Cell::Date(day(2021, 11, 6)));
        assert_eq!(parse_cell("2021.11.06"), Cell::Date(day(2021, 11, 6)));
        assert_eq!(parse_cell("2021-10-30T21:00:00.000Z"), Cell::Date(day(2021, 10, 30)));
        assert_eq!(parse_cell("2021-10-30 21:00:00"), Cell::Date(day(2021, 10, 30)));
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        assert_eq!(parse_cell("Помидоры "), Cell::text("Помидоры "));
        assert_eq!(parse_cell("2 шт"), Cell::text("2 шт"));
        assert_eq!(parse_cell("   "), Cell::text(""));
    }
}
