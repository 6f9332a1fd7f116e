//! Remote forecasting service client.
//!
//! One POST per batch, all tokens coalesced:
//!   {"dateToPredict": "YYYY-MM-DD", "historiesPerToken": {"<token>": [[y, "YYYY-MM-DD"], ...]}}
//! answered by
//!   {"predictions": {"<token>": y, ...}}

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use log::{debug, warn};
use predictor_core::{FilledSeries, Forecaster, PredictorConfig, Token};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    #[serde(rename = "dateToPredict")]
    pub date_to_predict: String,
    #[serde(rename = "historiesPerToken")]
    pub histories_per_token: BTreeMap<String, Vec<(f64, String)>>,
}

#[derive(Debug, Clone, Deserialize)]
struct PredictResponse {
    predictions: BTreeMap<String, Option<f64>>,
}

/// Build the request body plus the wire-key -> token lookup used to read the answer.
pub fn build_request(
    series: &BTreeMap<Token, FilledSeries>,
    date_to_predict: NaiveDate,
) -> (PredictRequest, BTreeMap<String, Token>) {
    let mut histories_per_token = BTreeMap::new();
    let mut lookup = BTreeMap::new();

    for (token, s) in series {
        let key = token.to_string();
        if lookup.contains_key(&key) {
            warn!("remote: token '{key}' is ambiguous on the wire, skipping duplicate");
            continue;
        }
        let points = s
            .points()
            .iter()
            .map(|o| (o.quantity, o.date.format(DATE_FORMAT).to_string()))
            .collect();
        histories_per_token.insert(key.clone(), points);
        lookup.insert(key, token.clone());
    }

    let request = PredictRequest {
        date_to_predict: date_to_predict.format(DATE_FORMAT).to_string(),
        histories_per_token,
    };
    (request, lookup)
}

/// Forecaster that delegates to an HTTP service.
#[derive(Debug, Clone)]
pub struct RemoteForecaster {
    endpoint: String,
    timeout: Duration,
}

impl RemoteForecaster {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PredictorConfig) -> Self {
        Self::new(
            config.forecast_endpoint_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &PredictRequest) -> Result<PredictResponse> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("build http client")?;

        let resp = client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .with_context(|| format!("forecast request to {}", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("forecast service error: {status} {txt}");
        }

        let body = resp.text().await.context("read forecast response")?;
        serde_json::from_str(&body).context("parse forecast response")
    }

    fn post_blocking(&self, request: &PredictRequest) -> Result<PredictResponse> {
        let rt = Runtime::new().context("create tokio runtime")?;
        rt.block_on(self.post(request))
    }
}

impl Forecaster for RemoteForecaster {
    fn forecast(
        &self,
        series: &BTreeMap<Token, FilledSeries>,
        date_to_predict: NaiveDate,
    ) -> Result<BTreeMap<Token, f64>> {
        if series.is_empty() {
            return Ok(BTreeMap::new());
        }

        let (request, lookup) = build_request(series, date_to_predict);
        debug!(
            "remote: posting {} tokens to {} for {}",
            request.histories_per_token.len(),
            self.endpoint,
            request.date_to_predict
        );

        // Blocking on a running runtime is only allowed from a multi-thread worker.
        // On a current-thread runtime the call moves to its own thread and runtime.
        let response = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.post(&request)))?
            }
            Ok(_) => std::thread::scope(|s| s.spawn(|| self.post_blocking(&request)).join())
                .map_err(|_| anyhow!("forecast request thread panicked"))??,
            Err(_) => self.post_blocking(&request)?,
        };

        let mut out = BTreeMap::new();
        for (key, y) in response.predictions {
            match (lookup.get(&key), y) {
                (Some(token), Some(y)) => {
                    out.insert(token.clone(), y);
                }
                (Some(_), None) => debug!("remote: no value for '{key}'"),
                (None, _) => warn!("remote: ignoring prediction for unknown token '{key}'"),
            }
        }
        Ok(out)
    }
}
