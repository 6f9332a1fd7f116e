//! End-to-end forecast: history table in, predicted table out.

use chrono::NaiveDate;
use log::info;
use predictor_core::{
    predict_batch as predict_with, Forecaster, History, LocalForecaster, PredictorConfig, SchemaError,
    Table, Token, Tokenizer,
};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::remote::RemoteForecaster;

/// The forecaster selected by `config.use_remote`.
pub fn forecaster_for(config: &PredictorConfig) -> Box<dyn Forecaster> {
    if config.use_remote {
        Box::new(RemoteForecaster::from_config(config))
    } else {
        Box::new(LocalForecaster)
    }
}

/// Forecast a grouped batch through the configured path.
pub fn predict_batch(
    histories: &BTreeMap<Token, History>,
    tokenizer: &Tokenizer,
    date_to_predict: NaiveDate,
    config: &PredictorConfig,
) -> BTreeMap<Token, f64> {
    let forecaster = forecaster_for(config);
    predict_with(histories, tokenizer, date_to_predict, config, forecaster.as_ref())
}

/// Tokenize `history`, forecast `date_to_predict` and expand the predictions into rows.
///
/// Fails only when the headers cannot be resolved; every other problem shows up as
/// fewer (or zero) predicted rows.
pub fn forecast_table(
    history: &Table,
    date_to_predict: NaiveDate,
    config: &PredictorConfig,
) -> Result<Table, SchemaError> {
    let start = Instant::now();
    let tokenizer = Tokenizer::new(history)?;
    let period = config.period_for(tokenizer.schema());
    let histories = tokenizer.group_into_histories(period);
    info!(
        "forecast_table: {} rows -> {} tokens in {} ms",
        history.len(),
        histories.len(),
        start.elapsed().as_millis()
    );

    let predictions = predict_batch(&histories, &tokenizer, date_to_predict, config);

    let rows = predictions
        .iter()
        .map(|(token, y)| tokenizer.expand_prediction(token, *y, date_to_predict))
        .collect::<Vec<_>>();
    info!(
        "forecast_table: predicted {} rows for {} in {} ms",
        rows.len(),
        date_to_predict,
        start.elapsed().as_millis()
    );

    Ok(Table::new(tokenizer.output_headers(), rows))
}
