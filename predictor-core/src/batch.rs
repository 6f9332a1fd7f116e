//! Batch prediction: normalize every history, forecast, then threshold/quantize/clamp.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::cell::Token;
use crate::config::PredictorConfig;
use crate::heuristic::Forecaster;
use crate::history::{normalize, FilledSeries, History};
use crate::tokenizer::Tokenizer;

/// Round `value` to the nearest multiple of `step`.
pub fn quantize(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Forecast every eligible history of a batch.
///
/// Ineligible histories are skipped. A failing forecaster yields an empty map.
pub fn predict_batch(
    histories: &BTreeMap<Token, History>,
    tokenizer: &Tokenizer,
    date_to_predict: NaiveDate,
    config: &PredictorConfig,
    forecaster: &dyn Forecaster,
) -> BTreeMap<Token, f64> {
    let days = tokenizer.history_days();
    let period = config.period_for(tokenizer.schema());

    let series: BTreeMap<Token, FilledSeries> = histories
        .iter()
        .filter_map(|(token, history)| {
            normalize(history, days, period).map(|s| (token.clone(), s))
        })
        .collect();

    debug!(
        "predict_batch: history lengths in={:?} out={:?}",
        length_distribution(histories.values().map(|h| h.len())),
        length_distribution(series.values().map(|s| s.len()))
    );

    let raw = match forecaster.forecast(&series, date_to_predict) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("predict_batch: no forecast available for {date_to_predict}: {e:#}");
            return BTreeMap::new();
        }
    };

    let result = finalize(raw, config, tokenizer.max_quantity());
    info!(
        "predict_batch: {} tokens in, {} forecast for {}",
        histories.len(),
        result.len(),
        date_to_predict
    );
    result
}

/// Drop noise, quantize, clamp to the batch maximum.
pub fn finalize(raw: BTreeMap<Token, f64>, config: &PredictorConfig, max_quantity: f64) -> BTreeMap<Token, f64> {
    raw.into_iter()
        .filter_map(|(token, y)| {
            if !y.is_finite() || y < config.drop_below {
                debug!("finalize: dropping {token} with forecast {y}");
                return None;
            }
            let y = quantize(y, config.quantization_step).min(max_quantity);
            Some((token, y))
        })
        .collect()
}

/// Length -> number of series with that length.
fn length_distribution(lengths: impl Iterator<Item = usize>) -> BTreeMap<usize, usize> {
    let mut dist = BTreeMap::new();
    for len in lengths {
        *dist.entry(len).or_insert(0) += 1;
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, Row, Table};
    use crate::heuristic::LocalForecaster;
    use crate::history::Period;
    use anyhow::{anyhow, Result};

    struct Failing;

    impl Forecaster for Failing {
        fn forecast(&self, _: &BTreeMap<Token, FilledSeries>, _: NaiveDate) -> Result<BTreeMap<Token, f64>> {
            Err(anyhow!("service unavailable"))
        }
    }

    struct Fixed(f64);

    impl Forecaster for Fixed {
        fn forecast(&self, series: &BTreeMap<Token, FilledSeries>, _: NaiveDate) -> Result<BTreeMap<Token, f64>> {
            Ok(series.keys().map(|t| (t.clone(), self.0)).collect())
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn table(rows: &[(&str, f64, u32)]) -> Table {
        Table::new(
            vec!["token".into(), "y".into(), "date".into()],
            rows.iter()
                .map(|(t, y, day)| Row::new(vec![Cell::text(*t), Cell::Number(*y), Cell::Date(d(*day))]))
                .collect(),
        )
    }

    #[test]
    fn test_quantize_rounds_to_step() {
        assert_eq!(quantize(1.1, 0.25), 1.0);
        assert_eq!(quantize(1.13, 0.25), 1.25);
        assert_eq!(quantize(3.6667, 0.25), 3.75);
    }

    #[test]
    fn test_quantize_is_idempotent() {
        for v in [0.0, 0.25, 0.5, 1.75, 12.0, 3.6667] {
            let once = quantize(v, 0.25);
            assert_eq!(quantize(once, 0.25), once);
        }
    }

    #[test]
    fn test_finalize_drops_below_threshold() {
        let mut raw = BTreeMap::new();
        raw.insert(Token::text("noise"), 0.1);
        raw.insert(Token::text("nan"), f64::NAN);
        raw.insert(Token::text("real"), 2.1);
        let out = finalize(raw, &PredictorConfig::default(), 10.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[&Token::text("real")], 2.0);
    }

    #[test]
    fn test_finalize_clamps_to_batch_max() {
        let mut raw = BTreeMap::new();
        raw.insert(Token::text("runaway"), 120.0);
        let out = finalize(raw, &PredictorConfig::default(), 6.0);
        assert_eq!(out[&Token::text("runaway")], 6.0);
    }

    #[test]
    fn test_predict_batch_local() {
        let t = table(&[
            ("eggs", 2.0, 1),
            ("eggs", 4.0, 2),
            ("milk", 5.0, 1),
            ("milk", 1.0, 2),
            ("milk", 5.0, 3),
            ("tea", 1.0, 3),
        ]);
        let tokenizer = Tokenizer::new(&t).unwrap();
        let histories = tokenizer.group_into_histories(Period::Weekly);
        let out = predict_batch(&histories, &tokenizer, d(4), &PredictorConfig::default(), &LocalForecaster);

        // eggs: 2, 4, 0 (day 3 filled) -> oscillation around mean 2 -> 2
        assert_eq!(out[&Token::text("eggs")], 2.0);
        // milk: mean 11/3 -> 3.75 after quantization
        assert_eq!(out[&Token::text("milk")], 3.75);
        // tea: single current point -> flat line
        assert_eq!(out[&Token::text("tea")], 1.0);
    }

    #[test]
    fn test_predict_batch_with_unvalidated_huge_period() {
        let t = table(&[("eggs", 2.0, 1), ("eggs", 4.0, 2)]);
        let tokenizer = Tokenizer::new(&t).unwrap();
        let config = PredictorConfig {
            period_length_days: Some(5_000_000),
            ..PredictorConfig::default()
        };
        let histories = tokenizer.group_into_histories(config.period_for(tokenizer.schema()));
        let out = predict_batch(&histories, &tokenizer, d(3), &config, &LocalForecaster);
        // 2, 4 -> 6, clamped to the batch maximum.
        assert_eq!(out[&Token::text("eggs")], 4.0);
    }

    #[test]
    fn test_predict_batch_failure_is_empty() {
        let t = table(&[("eggs", 2.0, 1), ("eggs", 4.0, 2)]);
        let tokenizer = Tokenizer::new(&t).unwrap();
        let histories = tokenizer.group_into_histories(Period::Weekly);
        let out = predict_batch(&histories, &tokenizer, d(3), &PredictorConfig::default(), &Failing);
        assert!(out.is_empty());
    }

    #[test]
    fn test_predict_batch_applies_threshold() {
        let t = table(&[("eggs", 2.0, 1), ("eggs", 4.0, 2)]);
        let tokenizer = Tokenizer::new(&t).unwrap();
        let histories = tokenizer.group_into_histories(Period::Weekly);
        let out = predict_batch(&histories, &tokenizer, d(3), &PredictorConfig::default(), &Fixed(0.1));
        assert!(out.is_empty());
    }
}
