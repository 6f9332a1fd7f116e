//! Errors surfaced by the core to its callers.

use thiserror::Error;

/// The batch's headers cannot be mapped to key/date/quantity roles.
/// No forecast is attempted for such a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no date column among headers {0:?}")]
    NoDateColumn(Vec<String>),

    #[error("no quantity column among headers {0:?}")]
    NoQuantityColumn(Vec<String>),

    #[error("no key column left after date '{date}' and quantity '{quantity}'")]
    NoKeyColumn { date: String, quantity: String },
}
