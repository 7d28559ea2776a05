use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::Settings;
use crate::model::{DemandModel, FeatureMatrix};

const MAX_BACKOFF_SHIFT: u32 = 6;

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<f64>,
}

/// Why one call to the model server failed, and whether calling again could help.
#[derive(Debug)]
enum CallError {
    /// Transport failure, 5xx or 429: the server may answer on a later attempt.
    Transient(anyhow::Error),
    /// The server understood the request and rejected it, or answered with a bad payload.
    Rejected(anyhow::Error),
}

/// Client for a model server that scores a [`FeatureMatrix`] posted as JSON and answers
/// `{"predictions": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpDemandModel {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_attempts: u32,
}

impl HttpDemandModel {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let endpoint = join_endpoint(
            settings.require_model_server_url()?,
            settings.model_predict_path(),
        );
        let http = reqwest::Client::builder()
            .timeout(settings.model_timeout())
            .build()
            .context("failed to build model server http client")?;

        Ok(Self {
            http,
            endpoint,
            api_key: settings.model_api_key.clone(),
            max_attempts: settings.model_retries(),
        })
    }

    fn request(&self, features: &FeatureMatrix) -> reqwest::RequestBuilder {
        let request = self.http.post(&self.endpoint).json(features);
        match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }

    async fn call(&self, features: &FeatureMatrix) -> Result<Vec<f64>, CallError> {
        let res = self
            .request(features)
            .send()
            .await
            .map_err(|e| CallError::Transient(anyhow!(e).context("model server request failed")))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            CallError::Transient(anyhow!(e).context("failed to read model server response"))
        })?;

        if !status.is_success() {
            let err = anyhow!("model server HTTP {status}: {body}");
            return Err(if is_transient(status) {
                CallError::Transient(err)
            } else {
                CallError::Rejected(err)
            });
        }

        parse_predictions(&body, features.len()).map_err(CallError::Rejected)
    }
}

#[async_trait::async_trait]
impl DemandModel for HttpDemandModel {
    fn name(&self) -> &'static str {
        "remote_http_json"
    }

    async fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        features.ensure_schema()?;

        let mut attempt: u32 = 1;
        loop {
            match self.call(features).await {
                Ok(predictions) => return Ok(predictions),
                Err(CallError::Rejected(err)) => return Err(err),
                Err(CallError::Transient(err)) if attempt >= self.max_attempts => {
                    return Err(err.context(format!("model server failed after {attempt} attempts")))
                }
                Err(CallError::Transient(err)) => {
                    let delay = backoff(attempt);
                    tracing::warn!(attempt, ?delay, error = %err, "model server call failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn join_endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Delay before the attempt after `attempt`: 1s, 2s, 4s, ... capped at 64s.
fn backoff(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_secs(1u64 << shift)
}

fn parse_predictions(body: &str, expected_rows: usize) -> Result<Vec<f64>> {
    let parsed = serde_json::from_str::<PredictResponse>(body)
        .with_context(|| format!("model server response is not a prediction list: {body}"))?;
    anyhow::ensure!(
        parsed.predictions.len() == expected_rows,
        "model server returned {} predictions for {expected_rows} rows",
        parsed.predictions.len()
    );
    Ok(parsed.predictions)
}
