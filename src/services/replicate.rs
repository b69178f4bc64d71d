use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::job::{PollOutcome, ResultPair};

/// Client for the Replicate predictions API.
pub struct ReplicateClient {
    http: Client,
    base_url: String,
    api_token: String,
}

#[derive(Serialize)]
struct CreatePrediction<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    audio: &'a str,
    split: &'a str,
}

/// Prediction lifecycle as reported by Replicate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<PredictionStatus>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub urls: Option<PredictionUrls>,
}

impl Prediction {
    /// Error reported in the body, if any. `null` and `""` count as no error.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn status_url(&self) -> Option<&str> {
        self.urls.as_ref()?.get.as_deref()
    }

    /// Map this snapshot onto a poll outcome.
    pub fn outcome(&self) -> PollOutcome {
        match self.status {
            Some(PredictionStatus::Succeeded) => match self.result_pair() {
                Some(pair) => PollOutcome::Succeeded(pair),
                None => PollOutcome::Failed(
                    "prediction succeeded without a vocal/instrumental output pair".to_string(),
                ),
            },
            Some(PredictionStatus::Failed) | Some(PredictionStatus::Canceled) => {
                PollOutcome::Failed(
                    self.error_message()
                        .unwrap_or_else(|| "Replicate prediction failed".to_string()),
                )
            }
            Some(PredictionStatus::Starting) => PollOutcome::Pending,
            Some(PredictionStatus::Processing) | Some(PredictionStatus::Unknown) | None => {
                PollOutcome::Processing
            }
        }
    }

    fn result_pair(&self) -> Option<ResultPair> {
        let urls = self.output.as_ref()?.as_array()?;
        match urls.as_slice() {
            [vocal, instrumental] => Some(ResultPair::new(vocal.as_str()?, instrumental.as_str()?)),
            _ => None,
        }
    }
}

impl ReplicateClient {
    pub fn new(base_url: &str, api_token: &str) -> Result<Self, PredictionError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(PredictionError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Create a prediction that splits `audio_url` into vocals and accompaniment.
    pub async fn create_prediction(
        &self,
        version: &str,
        audio_url: &str,
    ) -> Result<Prediction, PredictionError> {
        let url = format!("{}/v1/predictions", self.base_url);
        let body = CreatePrediction {
            version,
            input: PredictionInput {
                audio: audio_url,
                split: "vocals",
            },
        };

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        let prediction = Self::read_prediction(response).await?;

        if let Some(message) = prediction.error_message() {
            return Err(PredictionError::Rejected(message));
        }
        if prediction.status_url().is_none() {
            return Err(PredictionError::MissingStatusUrl);
        }

        Ok(prediction)
    }

    /// Fetch the current state of a prediction from its status URL.
    pub async fn get_prediction(&self, status_url: &str) -> Result<Prediction, PredictionError> {
        let response = self
            .http
            .get(status_url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await?;

        Self::read_prediction(response).await
    }

    async fn read_prediction(response: reqwest::Response) -> Result<Prediction, PredictionError> {
        let status = response.status();
        let text = response.text().await?;

        // Replicate reports request errors as `{"detail": ...}` with a 4xx status.
        if !status.is_success() {
            return Err(PredictionError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        serde_json::from_str(&text).map_err(PredictionError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Replicate API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("prediction rejected: {0}")]
    Rejected(String),

    #[error("prediction response has no status URL")]
    MissingStatusUrl,

    #[error("failed to parse prediction response: {0}")]
    Parse(#[from] serde_json::Error),
}
