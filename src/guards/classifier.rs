//! External image classifier used by the anti-nude guard.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier returned status {0}")]
    Rejected(u16),
}

/// Classifier answer for one image. `confidence` is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(default)]
    pub is_flagged: bool,
    #[serde(default)]
    pub confidence: f32,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, media_url: &str) -> Result<Classification, ClassifierError>;
}

/// Classifier behind an HTTP endpoint taking `{"url": ...}`.
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    url: &'a str,
}

#[async_trait]
impl ContentClassifier for HttpClassifier {
    async fn classify(&self, media_url: &str) -> Result<Classification, ClassifierError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ClassifyRequest { url: media_url })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Rejected(status.as_u16()));
        }
        let result: Classification = response.json().await?;
        debug!("Classified {}: {:?}", media_url, result);
        Ok(result)
    }
}

/// Stand-in when no classifier is configured: nothing is ever flagged.
pub struct DisabledClassifier;

#[async_trait]
impl ContentClassifier for DisabledClassifier {
    async fn classify(&self, _media_url: &str) -> Result<Classification, ClassifierError> {
        Ok(Classification::default())
    }
}
