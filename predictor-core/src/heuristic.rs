//! Forecaster seam plus the local trend / mean-reversion heuristic.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::cell::Token;
use crate::history::FilledSeries;

const MIN_POINTS_FOR_OSCILLATION: usize = 3;

/// Produces one forecast per token for a batch of gap-filled series.
///
/// An `Err` means "no forecast available this batch"; callers log it and carry on.
pub trait Forecaster {
    fn forecast(
        &self,
        series: &BTreeMap<Token, FilledSeries>,
        date_to_predict: NaiveDate,
    ) -> Result<BTreeMap<Token, f64>>;
}

/// Forecast the next period of one series.
///
/// With at least three points, if the last two sit on opposite sides of the series
/// mean the series is treated as oscillating and the mean is returned. Otherwise the
/// last step is extrapolated linearly. The horizon is always one period after the
/// last point.
///
/// Two distinct points always straddle their own mean, so a two-point series is
/// always extrapolated.
pub fn predict_token(series: &FilledSeries) -> f64 {
    let points = series.points();
    let mean = points.iter().map(|o| o.quantity).sum::<f64>() / points.len() as f64;
    let last = series.last().quantity;
    let second_last = series.second_last().quantity;
    let trend = last - second_last;

    if points.len() >= MIN_POINTS_FOR_OSCILLATION && (last - mean) * (second_last - mean) < 0.0 {
        mean
    } else {
        last + trend
    }
}

/// In-process forecaster backed by [`predict_token`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalForecaster;

impl Forecaster for LocalForecaster {
    fn forecast(
        &self,
        series: &BTreeMap<Token, FilledSeries>,
        _date_to_predict: NaiveDate,
    ) -> Result<BTreeMap<Token, f64>> {
        Ok(series
            .iter()
            .map(|(token, s)| (token.clone(), predict_token(s)))
            .collect())
    }
}
