//! predictor-service: remote forecasting client and the end-to-end forecast pipeline.

pub mod pipeline;
pub mod remote;

pub use pipeline::{forecast_table, forecaster_for, predict_batch};
pub use remote::{build_request, PredictRequest, RemoteForecaster};
