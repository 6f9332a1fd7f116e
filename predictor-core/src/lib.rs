//! predictor-core: tokenizer, history normalization and the local forecaster.

pub mod batch;
pub mod cell;
pub mod columns;
pub mod config;
pub mod error;
pub mod heuristic;
pub mod history;
pub mod tokenizer;

pub use batch::{finalize, predict_batch, quantize};
pub use cell::{Cell, Row, Table, Token};
pub use columns::{resolve_column, ResolvedColumn, TieBreak};
pub use config::PredictorConfig;
pub use error::SchemaError;
pub use heuristic::{predict_token, Forecaster, LocalForecaster};
pub use history::{fill_gaps, limit_history, normalize, FilledSeries, History, Observation, Period};
pub use tokenizer::{group_key, Schema, Tokenizer, KEY_SEPARATOR, STRUCTURED_COLUMNS};
