//! Forecast settings passed into every batch call.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::history::Period;
use crate::tokenizer::Schema;

pub const DEFAULT_FORECAST_ENDPOINT: &str = "http://127.0.0.1:8080/predict";
/// Ten years.
pub const MAX_PERIOD_LENGTH_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Forecasts are rounded to a multiple of this step.
    pub quantization_step: f64,
    /// Forecasts below this value are dropped as noise.
    pub drop_below: f64,
    /// Period length used by the eligibility windows. Unset: weekly for generic
    /// sheets, monthly for task sheets.
    pub period_length_days: Option<u32>,
    /// Delegate forecasting to `forecast_endpoint_url` instead of the local heuristic.
    pub use_remote: bool,
    pub forecast_endpoint_url: String,
    /// Transport timeout for the remote call.
    pub request_timeout_secs: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            quantization_step: 0.25,
            drop_below: 0.25,
            period_length_days: None,
            use_remote: false,
            forecast_endpoint_url: DEFAULT_FORECAST_ENDPOINT.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl PredictorConfig {
    pub fn period_for(&self, schema: &Schema) -> Period {
        self.period_length_days
            .map(Period::from_days)
            .unwrap_or_else(|| schema.default_period())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.quantization_step.is_finite() && self.quantization_step > 0.0) {
            bail!("quantization_step must be positive, got {}", self.quantization_step);
        }
        if !self.drop_below.is_finite() {
            bail!("drop_below must be finite, got {}", self.drop_below);
        }
        if let Some(days) = self.period_length_days {
            if !(1..=MAX_PERIOD_LENGTH_DAYS).contains(&days) {
                bail!("period_length_days must be between 1 and {MAX_PERIOD_LENGTH_DAYS}, got {days}");
            }
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.use_remote && self.forecast_endpoint_url.trim().is_empty() {
            bail!("use_remote is set but forecast_endpoint_url is empty");
        }
        Ok(())
    }
}
