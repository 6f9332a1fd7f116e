//! Tokenizer: turns a sheet into per-token histories and predictions back into rows.
//!
//! Two schemas, chosen once per batch from the headers:
//! - `Structured`: headers are exactly `project-task, effort, description, date`;
//!   the token is `task###description` and the quantity is `effort`
//! - `Generic`: date and quantity columns are resolved by keyword, the first other
//!   column is the token

use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::cell::{Cell, Row, Table, Token};
use crate::columns::{resolve_date_column, resolve_quantity_column};
use crate::error::SchemaError;
use crate::history::{limit_history, History, Observation, Period};

/// Lower-cased headers of the structured (task tracking) schema.
pub const STRUCTURED_COLUMNS: [&str; 4] = ["project-task", "effort", "description", "date"];

/// Joins task and description into one token. Not expected in user data.
pub const KEY_SEPARATOR: &str = "###";

const TASK_COL: usize = 0;
const EFFORT_COL: usize = 1;
const DESCRIPTION_COL: usize = 2;
const STRUCTURED_DATE_COL: usize = 3;

/// Column roles of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Generic {
        key: usize,
        date: usize,
        quantity: usize,
    },
    Structured,
}

impl Schema {
    pub fn is_structured(headers: &[String]) -> bool {
        headers.len() == STRUCTURED_COLUMNS.len()
            && headers
                .iter()
                .zip(STRUCTURED_COLUMNS)
                .all(|(h, s)| h.trim().to_lowercase() == s)
    }

    /// Resolve column roles for a header row.
    pub fn resolve_columns(headers: &[String]) -> Result<Self, SchemaError> {
        if Self::is_structured(headers) {
            return Ok(Schema::Structured);
        }

        let date = resolve_date_column(headers)
            .ok_or_else(|| SchemaError::NoDateColumn(headers.to_vec()))?;
        let quantity = resolve_quantity_column(headers)
            .ok_or_else(|| SchemaError::NoQuantityColumn(headers.to_vec()))?;

        let date_lower = date.header.trim().to_lowercase();
        let quantity_lower = quantity.header.trim().to_lowercase();
        let key = headers
            .iter()
            .position(|h| {
                let lower = h.trim().to_lowercase();
                lower != date_lower && lower != quantity_lower
            })
            .ok_or_else(|| SchemaError::NoKeyColumn {
                date: date.header.clone(),
                quantity: quantity.header.clone(),
            })?;

        Ok(Schema::Generic {
            key,
            date: date.index,
            quantity: quantity.index,
        })
    }

    pub fn date_column(&self) -> usize {
        match self {
            Schema::Generic { date, .. } => *date,
            Schema::Structured => STRUCTURED_DATE_COL,
        }
    }

    pub fn quantity_column(&self) -> usize {
        match self {
            Schema::Generic { quantity, .. } => *quantity,
            Schema::Structured => EFFORT_COL,
        }
    }

    /// Period used when the caller does not configure one.
    pub fn default_period(&self) -> Period {
        match self {
            Schema::Generic { .. } => Period::Weekly,
            Schema::Structured => Period::Monthly,
        }
    }
}

/// Token for a structured task/description pair.
pub fn group_key(task: &str, description: &str) -> String {
    format!("{task}{KEY_SEPARATOR}{description}")
}

#[derive(Debug, Clone)]
enum RowKey {
    Token(Token),
    Task { task: String, description: String },
}

impl RowKey {
    fn token(&self) -> Token {
        match self {
            RowKey::Token(token) => token.clone(),
            RowKey::Task { task, description } => Token::Text(group_key(task, description)),
        }
    }
}

/// Per-batch tokenizer. Holds the parsed observations of one table.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    headers: Vec<String>,
    schema: Schema,
    rows: Vec<(RowKey, Observation)>,
    days: Vec<NaiveDate>,
    max_quantity: f64,
}

impl Tokenizer {
    /// Resolve the schema and parse every row. Rows without a usable date or
    /// quantity are skipped.
    pub fn new(table: &Table) -> Result<Self, SchemaError> {
        let schema = Schema::resolve_columns(&table.headers)?;
        debug!("tokenizer: headers={:?} schema={:?}", table.headers, schema);

        let mut rows = Vec::with_capacity(table.rows.len());
        let mut skipped = 0usize;
        for row in &table.rows {
            match parse_row(&schema, row) {
                Some(parsed) => rows.push(parsed),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("tokenizer: skipped {skipped} rows without a usable date or quantity");
        }

        let mut days: Vec<NaiveDate> = rows.iter().map(|(_, o)| o.date).collect();
        days.sort();
        days.dedup();

        let mut per_day: BTreeMap<(Token, NaiveDate), f64> = BTreeMap::new();
        for (key, obs) in &rows {
            *per_day.entry((key.token(), obs.date)).or_insert(0.0) += obs.quantity;
        }
        let max_quantity = per_day.values().copied().fold(0.0_f64, f64::max);

        Ok(Self {
            headers: table.headers.clone(),
            schema,
            rows,
            days,
            max_quantity,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Distinct days present anywhere in the batch, ascending.
    pub fn history_days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    /// Largest per-day quantity of any token in the batch, after same-day rows are
    /// summed. Ceiling for forecasts.
    pub fn max_quantity(&self) -> f64 {
        self.max_quantity
    }

    /// Group rows into eligible per-token histories.
    pub fn group_into_histories(&self, period: Period) -> BTreeMap<Token, History> {
        let Some(last_day) = self.last_day() else {
            return BTreeMap::new();
        };

        let buckets: BTreeMap<Token, Vec<Observation>> = match self.schema {
            Schema::Generic { .. } => {
                let mut by_token: BTreeMap<Token, Vec<Observation>> = BTreeMap::new();
                for (key, obs) in &self.rows {
                    if let RowKey::Token(token) = key {
                        by_token.entry(token.clone()).or_default().push(*obs);
                    }
                }
                by_token
            }
            Schema::Structured => {
                let mut by_task: BTreeMap<&str, BTreeMap<&str, Vec<Observation>>> = BTreeMap::new();
                for (key, obs) in &self.rows {
                    if let RowKey::Task { task, description } = key {
                        by_task
                            .entry(task.as_str())
                            .or_default()
                            .entry(description.as_str())
                            .or_default()
                            .push(*obs);
                    }
                }
                by_task
                    .into_iter()
                    .flat_map(|(task, by_description)| {
                        by_description.into_iter().map(move |(description, history)| {
                            (Token::Text(group_key(task, description)), history)
                        })
                    })
                    .collect()
            }
        };

        let total = buckets.len();
        let result: BTreeMap<Token, History> = buckets
            .into_iter()
            .filter_map(|(token, history)| {
                let history = collapse_same_day(history);
                limit_history(&history, last_day, period).map(|h| (token, h))
            })
            .collect();

        debug!(
            "tokenizer: {} unique tokens, {} eligible for period={} days",
            total,
            result.len(),
            period.days()
        );
        result
    }

    /// Rebuild an output row from a predicted token/quantity.
    ///
    /// Generic rows are `(token, quantity)`. Structured rows are
    /// `(task, quantity, description, date)` with `date` as the predicted day.
    pub fn expand_prediction(&self, token: &Token, quantity: f64, date: NaiveDate) -> Row {
        match self.schema {
            Schema::Generic { .. } => Row::new(vec![Cell::from(token.clone()), Cell::Number(quantity)]),
            Schema::Structured => {
                let key = token.to_string();
                let (task, description) = key.split_once(KEY_SEPARATOR).unwrap_or((key.as_str(), ""));
                Row::new(vec![
                    Cell::text(task),
                    Cell::Number(quantity),
                    Cell::text(description),
                    Cell::Date(date),
                ])
            }
        }
    }

    /// Headers matching rows produced by [`Tokenizer::expand_prediction`].
    pub fn output_headers(&self) -> Vec<String> {
        match self.schema {
            Schema::Generic { key, quantity, .. } => {
                vec![self.headers[key].clone(), self.headers[quantity].clone()]
            }
            Schema::Structured => self.headers.clone(),
        }
    }
}

fn parse_row(schema: &Schema, row: &Row) -> Option<(RowKey, Observation)> {
    let date = row.get(schema.date_column())?.as_date()?;
    let quantity = row.get(schema.quantity_column())?.as_number()?;
    let key = match schema {
        Schema::Generic { key, .. } => RowKey::Token(row.get(*key)?.to_token()),
        Schema::Structured => RowKey::Task {
            task: row.get(TASK_COL)?.to_string(),
            description: row.get(DESCRIPTION_COL)?.to_string(),
        },
    };
    Some((key, Observation::new(date, quantity)))
}

/// Sort by date and sum quantities that share a day.
fn collapse_same_day(mut history: Vec<Observation>) -> History {
    history.sort_by_key(|o| o.date);
    let mut out: History = Vec::with_capacity(history.len());
    for obs in history {
        match out.last_mut() {
            Some(prev) if prev.date == obs.date => prev.quantity += obs.quantity,
            _ => out.push(obs),
        }
    }
    out
}
