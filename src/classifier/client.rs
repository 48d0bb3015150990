use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Classifier, ClassifierError};
use crate::config::{ClassifierConfig, CLASSIFIER_CONNECT_TIMEOUT_SECS};

/// HTTP client for an online prediction endpoint that accepts
/// base64-encoded image instances.
pub struct PredictionClient {
    endpoint: String,
    access_token: Option<String>,
    client: reqwest::Client,
    timeout_secs: u64,
    parameters: PredictParameters,
}

/// Request body for the `:predict` call
#[derive(Debug, Serialize)]
pub struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    confidence_threshold: f64,
    max_predictions: u32,
}

/// Response body from the `:predict` call
#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Value>,
}

impl PredictionClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CLASSIFIER_CONNECT_TIMEOUT_SECS))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
            client,
            timeout_secs: config.timeout.as_secs(),
            parameters: PredictParameters {
                confidence_threshold: config.confidence_threshold,
                max_predictions: config.max_predictions,
            },
        })
    }

    /// Build the request body for one image.
    pub fn request_body(&self, image: &[u8]) -> PredictRequest {
        PredictRequest {
            instances: vec![PredictInstance {
                content: STANDARD.encode(image),
            }],
            parameters: self.parameters.clone(),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClassifierError {
        if e.is_connect() {
            ClassifierError::Connection(self.endpoint.clone())
        } else if e.is_timeout() {
            ClassifierError::Timeout(self.timeout_secs)
        } else {
            ClassifierError::Http(e.to_string())
        }
    }
}

/// Extract the candidate list from a `:predict` response body.
///
/// A response without a `predictions` array yields no candidates.
pub fn parse_predict_response(body: &str) -> Result<Vec<Value>, ClassifierError> {
    let parsed: PredictResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::ResponseParsing(e.to_string()))?;
    Ok(parsed.predictions)
}

#[async_trait]
impl Classifier for PredictionClient {
    async fn classify(&self, image: &[u8]) -> Result<Vec<Value>, ClassifierError> {
        let body = self.request_body(image);
        tracing::info!(endpoint = %self.endpoint, bytes = image.len(), "Sending image for classification");

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        let candidates = parse_predict_response(&text)?;
        tracing::info!(candidates = candidates.len(), "Classification response received");
        Ok(candidates)
    }
}
