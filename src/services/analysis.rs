use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::SessionError;
use crate::models::{AnalysisResult, ChosenImage, PortionMultiplier};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Service answered with a non-2xx status
    #[error("Server error {status}")]
    Status { status: u16, body: String },

    /// Connect failure, timeout, or body read failure
    #[error("{0}")]
    Transport(String),

    /// 2xx response whose body is not an analysis payload
    #[error("invalid analysis response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<ServiceError> for SessionError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Status { status, .. } => SessionError::ServerError { status },
            ServiceError::Transport(detail) | ServiceError::Decode(detail) => {
                SessionError::transport(detail)
            }
        }
    }
}

/// Optional details from a `/health` body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub mock: Option<bool>,
}

/// Remote food analysis service (liveness probe + analyze call)
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Prefix used for every endpoint
    fn base_url(&self) -> &str;

    /// Any 2xx from `/health` counts as alive
    async fn check_health(&self) -> Result<HealthStatus, ServiceError>;

    async fn analyze(
        &self,
        image: &ChosenImage,
        portion: PortionMultiplier,
    ) -> Result<AnalysisResult, ServiceError>;
}

/// HTTP client for the meal analysis API.
pub struct AnalysisClient {
    api_base: String,
    probe_timeout: Duration,
    client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            api_base: config.api_base.clone(),
            probe_timeout: config.probe_timeout,
            client,
        })
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.api_base)
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/analyze", self.api_base)
    }
}

#[async_trait]
impl AnalysisService for AnalysisClient {
    fn base_url(&self) -> &str {
        &self.api_base
    }

    async fn check_health(&self) -> Result<HealthStatus, ServiceError> {
        let url = self.health_url();
        log::debug!("🩺 Probing {}", url);

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Health response status: {}", status);

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Gövde opsiyonel, sadece 2xx önemli
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn analyze(
        &self,
        image: &ChosenImage,
        portion: PortionMultiplier,
    ) -> Result<AnalysisResult, ServiceError> {
        let url = self.analyze_url();

        let file = Part::bytes(image.bytes.clone())
            .file_name(image.display_name().to_string())
            .mime_str(&image.media_type)
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let form = Form::new()
            .part("file", file)
            .text("portion", portion.as_form_value());

        log::info!(
            "🤖 Sending {} ({} bytes, {}) to {} with portion {}",
            image.display_name(),
            image.size(),
            image.media_type,
            url,
            portion.value()
        );

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        log::debug!("📥 Analyze response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Analysis API error ({}): {}", status, body);
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        log::debug!("📄 Raw analysis response size: {} bytes", response_text.len());

        serde_json::from_str(&response_text).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}
