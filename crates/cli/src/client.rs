//! API client for communicating with the optimizer service

use anyhow::{Context, Result};
use optimizer_lib::recommend::{AnalysisReport, Recommendation};
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Non-success response from the service
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub kind: Option<String>,
    pub message: String,
}

/// Error body returned by the service
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct TerraformRequest<'a> {
    recommendations: &'a [Recommendation],
}

/// API client for the optimizer service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Turn a non-success response into an `ApiError`
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let err = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => ApiError {
                status,
                kind: parsed.kind,
                message: parsed.error,
            },
            Err(_) => ApiError {
                status,
                kind: None,
                message: body,
            },
        };
        Err(err.into())
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.base_url.join("api/health").context("Invalid path")?;
        let response = self.client.get(url).send().await.context("Failed to send request")?;
        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// Upload a usage report for analysis
    pub async fn analyze(&self, path: &Path) -> Result<AnalysisReport> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "usage.csv".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .context("Invalid content type")?;
        let form = multipart::Form::new().part("file", part);

        let url = self.base_url.join("api/analyze").context("Invalid path")?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// Render recommendations as a Terraform script
    pub async fn terraform(&self, recommendations: &[Recommendation]) -> Result<String> {
        let url = self.base_url.join("api/terraform").context("Invalid path")?;
        let response = self
            .client
            .post(url)
            .json(&TerraformRequest { recommendations })
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .text()
            .await
            .context("Failed to read response")
    }
}
