//! Canonical tabular representation: cells, rows and a table with a shared header.
//!
//! Every boundary (CSV files, remote payloads) converts into these types; nothing
//! downstream sees array-of-arrays vs key/value maps.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single scalar value from a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Numeric view of the cell. Text is accepted when it parses as a number
    /// (a decimal comma is tolerated).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().replace(',', ".").parse().ok(),
            Cell::Date(_) => None,
        }
    }

    /// Calendar-day view of the cell. Text is accepted in ISO `YYYY-MM-DD` form.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            Cell::Number(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            Cell::Date(_) => false,
        }
    }

    /// Grouping identity of this cell. Numbers stay numbers, dates become ISO text.
    pub fn to_token(&self) -> Token {
        match self {
            Cell::Number(n) => Token::Number(*n),
            Cell::Date(d) => Token::Text(d.format("%Y-%m-%d").to_string()),
            Cell::Text(s) => Token::Text(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<Token> for Cell {
    fn from(token: Token) -> Self {
        match token {
            Token::Number(n) => Cell::Number(n),
            Token::Text(s) => Cell::Text(s),
        }
    }
}

/// Key a quantity is forecast for.
///
/// Keeps the type of the source cell: a numeric key `2021` and a text key `"2021"`
/// are different tokens.
#[derive(Debug, Clone)]
pub enum Token {
    Text(String),
    Number(f64),
}

impl Token {
    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Token {}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => a.total_cmp(b),
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
            (Token::Number(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Number(_)) => Ordering::Greater,
        }
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Token::Text(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Token::Number(n) => {
                1u8.hash(state);
                n.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => f.write_str(s),
            Token::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One sheet row, positionally aligned with [`Table::headers`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn get(&self, idx: usize) -> Option<&Cell> {
        self.cells.get(idx)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell carries a value (no partial rows).
    pub fn is_complete(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| !c.is_empty())
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

/// Headers plus rows. All rows share the header schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Position of a header, compared case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
