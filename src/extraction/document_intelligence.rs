// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote document-intelligence text extraction
//!
//! Talks to an Azure Document Intelligence compatible REST API:
//! submit an analyze request, then poll the returned operation until it
//! finishes. Lines are joined with spaces per image, images with newlines.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{debug, info};

use super::text::TextExtractor;
use super::types::ExtractionError;
use crate::document::PageImage;
use crate::vision::image_utils::encode_page;

const BACKEND: &str = "document-intelligence";

/// Configuration for the document-intelligence backend
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentIntelligenceConfig {
    /// Service endpoint, e.g. `https://<resource>.cognitiveservices.azure.com`
    pub endpoint: Option<String>,
    /// Subscription key
    pub api_key: Option<String>,
    /// Analysis model id
    pub model_id: String,
    /// REST API version
    pub api_version: String,
    /// Delay between operation polls in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum number of polls per image
    pub max_polls: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl DocumentIntelligenceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("DOCUMENT_INTELLIGENCE_ENDPOINT").ok(),
            api_key: env::var("DOCUMENT_INTELLIGENCE_KEY").ok(),
            model_id: env::var("DOCUMENT_INTELLIGENCE_MODEL").unwrap_or(defaults.model_id),
            api_version: env::var("DOCUMENT_INTELLIGENCE_API_VERSION")
                .unwrap_or(defaults.api_version),
            poll_interval_ms: env::var("DOCUMENT_INTELLIGENCE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            max_polls: env::var("DOCUMENT_INTELLIGENCE_MAX_POLLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_polls),
            request_timeout_secs: defaults.request_timeout_secs,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_some() && self.api_key.is_none() {
            return Err("DOCUMENT_INTELLIGENCE_KEY is required with an endpoint".to_string());
        }
        if self.max_polls == 0 {
            return Err("Document intelligence max polls must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Check if endpoint and key are both set
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }
}

impl Default for DocumentIntelligenceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model_id: "prebuilt-document".to_string(),
            api_version: "2023-07-31".to_string(),
            poll_interval_ms: 1000,
            max_polls: 60,
            request_timeout_secs: 60,
        }
    }
}

// --- REST serde structs ---

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    base64_source: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    analyze_result: Option<AnalyzeResult>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Result of one document analysis
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResult {
    #[serde(default)]
    pub pages: Vec<AnalyzedPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzedPage {
    #[serde(default)]
    pub lines: Vec<AnalyzedLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzedLine {
    pub content: String,
}

impl AnalyzeResult {
    /// Every line of every page, space-joined
    pub fn joined_lines(&self) -> String {
        self.pages
            .iter()
            .flat_map(|page| page.lines.iter().map(|line| line.content.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// REST client for the analyze-and-poll protocol
#[derive(Debug, Clone)]
pub struct DocumentIntelligenceClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model_id: String,
    api_version: String,
    poll_interval: Duration,
    max_polls: u32,
    request_timeout: Duration,
}

impl DocumentIntelligenceClient {
    /// Create a new client
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ExtractionError> {
        Self::from_config(&DocumentIntelligenceConfig {
            endpoint: Some(endpoint.to_string()),
            api_key: Some(api_key.to_string()),
            ..DocumentIntelligenceConfig::default()
        })
    }

    pub fn from_config(config: &DocumentIntelligenceConfig) -> Result<Self, ExtractionError> {
        let (endpoint, api_key) = match (&config.endpoint, &config.api_key) {
            (Some(endpoint), Some(key)) => (endpoint, key),
            _ => {
                return Err(ExtractionError::backend(
                    BACKEND,
                    "endpoint and key must both be configured",
                ))
            }
        };

        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ExtractionError::backend(BACKEND, e))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "Document intelligence client configured: endpoint={}, model={}",
            endpoint, config.model_id
        );

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.clone(),
            model_id: config.model_id.clone(),
            api_version: config.api_version.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls.max(1),
            request_timeout,
        })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model_id, self.api_version
        )
    }

    /// Analyze one encoded document and wait for the result
    pub async fn analyze(&self, document: &[u8]) -> Result<AnalyzeResult, ExtractionError> {
        let response = self
            .client
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&AnalyzeRequest {
                base64_source: STANDARD.encode(document),
            })
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED && !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                backend: BACKEND.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let operation_url = operation_location(response.headers())?;
        debug!("Analyze operation accepted: {}", operation_url);
        self.poll(&operation_url).await
    }

    async fn poll(&self, operation_url: &str) -> Result<AnalyzeResult, ExtractionError> {
        for attempt in 0..self.max_polls {
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }

            let response = self
                .client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .await
                .map_err(|e| self.request_error(e))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ExtractionError::Api {
                    backend: BACKEND.to_string(),
                    status: status.as_u16(),
                    message,
                });
            }

            let operation: AnalyzeOperation = response
                .json()
                .await
                .map_err(|e| ExtractionError::invalid(BACKEND, format!("JSON parse error: {}", e)))?;

            match operation.status.as_str() {
                "succeeded" => {
                    return operation
                        .analyze_result
                        .ok_or_else(|| ExtractionError::invalid(BACKEND, "missing analyzeResult"))
                }
                "failed" | "canceled" => {
                    let reason = operation
                        .error
                        .map(|e| format!("{}: {}", e.code, e.message))
                        .unwrap_or_else(|| operation.status.clone());
                    return Err(ExtractionError::backend(BACKEND, reason));
                }
                other => debug!("Analyze operation {} (poll {})", other, attempt + 1),
            }
        }

        Err(ExtractionError::Timeout {
            backend: BACKEND.to_string(),
            timeout_ms: self.poll_interval.as_millis() as u64 * self.max_polls as u64,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout {
                backend: BACKEND.to_string(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            ExtractionError::backend(BACKEND, e)
        }
    }
}

fn operation_location(headers: &HeaderMap) -> Result<String, ExtractionError> {
    headers
        .get("Operation-Location")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .ok_or_else(|| ExtractionError::invalid(BACKEND, "missing Operation-Location header"))
}

/// Text extractor backed by [`DocumentIntelligenceClient`]
#[derive(Debug, Clone)]
pub struct DocumentIntelligenceExtractor {
    client: DocumentIntelligenceClient,
}

impl DocumentIntelligenceExtractor {
    pub fn new(client: DocumentIntelligenceClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &DocumentIntelligenceConfig) -> Result<Self, ExtractionError> {
        Ok(Self::new(DocumentIntelligenceClient::from_config(config)?))
    }
}

#[async_trait]
impl TextExtractor for DocumentIntelligenceExtractor {
    async fn extract_text(&self, images: &[PageImage]) -> Result<String, ExtractionError> {
        let mut texts = Vec::with_capacity(images.len());
        for image in images {
            let (bytes, format) =
                encode_page(image).map_err(|e| ExtractionError::backend(BACKEND, e))?;
            debug!("Sending {:?} image ({} bytes) for analysis", format, bytes.len());

            let result = self.client.analyze(&bytes).await?;
            texts.push(result.joined_lines());
        }
        Ok(texts.join("\n"))
    }

    fn name(&self) -> &'static str {
        BACKEND
    }
}
