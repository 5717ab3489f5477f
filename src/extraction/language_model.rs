// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language model backends for field extraction via OpenAI-compatible APIs

use async_trait::async_trait;
use reqwest::Client;
use std::env;
use std::time::Duration;
use tracing::{debug, info};

use super::types::{ChatMessage, ExtractionError, ModelResponse, ModelSettings};

const BACKEND: &str = "chat-completions";

/// Trait for implementing language model backends
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion with fixed decoding settings
    ///
    /// A single call, never retried here.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<ModelResponse, ExtractionError>;

    /// Get the model name for logging
    fn name(&self) -> &str;
}

/// Configuration for the chat-completions backend
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageModelConfig {
    /// Base URL of the OpenAI-compatible server (or Azure resource)
    pub endpoint: Option<String>,
    /// Model name sent in the request body
    pub model: String,
    /// Bearer token (OpenAI style) or `api-key` (Azure)
    pub api_key: Option<String>,
    /// Azure OpenAI deployment; switches to Azure routing when set
    pub azure_deployment: Option<String>,
    /// Azure OpenAI API version
    pub azure_api_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl LanguageModelConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("LLM_ENDPOINT").ok(),
            model: env::var("LLM_MODEL").unwrap_or(defaults.model),
            api_key: env::var("LLM_API_KEY").ok(),
            azure_deployment: env::var("LLM_AZURE_DEPLOYMENT").ok(),
            azure_api_version: env::var("LLM_AZURE_API_VERSION")
                .unwrap_or(defaults.azure_api_version),
            timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("LLM timeout must be greater than 0".to_string());
        }
        if self.azure_deployment.is_some() && self.api_key.is_none() {
            return Err("LLM_API_KEY is required for Azure deployments".to_string());
        }
        Ok(())
    }
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            azure_deployment: None,
            azure_api_version: "2024-02-01".to_string(),
            timeout_secs: 120,
        }
    }
}

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
enum Routing {
    OpenAi,
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// Client for an OpenAI-compatible chat-completions API
#[derive(Debug, Clone)]
pub struct ChatCompletionsModel {
    client: Client,
    endpoint: String,
    model_name: String,
    api_key: Option<String>,
    routing: Routing,
    timeout: Duration,
}

impl ChatCompletionsModel {
    /// Create a new OpenAI-style client
    pub fn new(endpoint: &str, model_name: &str) -> Result<Self, ExtractionError> {
        Self::from_config(&LanguageModelConfig {
            endpoint: Some(endpoint.to_string()),
            model: model_name.to_string(),
            ..LanguageModelConfig::default()
        })
    }

    pub fn from_config(config: &LanguageModelConfig) -> Result<Self, ExtractionError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| ExtractionError::backend(BACKEND, "LLM_ENDPOINT is not configured"))?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::backend(BACKEND, e))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        let routing = match &config.azure_deployment {
            Some(deployment) => Routing::Azure {
                deployment: deployment.clone(),
                api_version: config.azure_api_version.clone(),
            },
            None => Routing::OpenAi,
        };

        info!(
            "LLM client configured: endpoint={}, model={}, routing={:?}",
            endpoint, config.model, routing
        );

        Ok(Self {
            client,
            endpoint,
            model_name: config.model.clone(),
            api_key: config.api_key.clone(),
            routing,
            timeout,
        })
    }

    /// Attach a bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn completions_url(&self) -> String {
        match &self.routing {
            Routing::OpenAi => format!("{}/v1/chat/completions", self.endpoint),
            Routing::Azure {
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, deployment, api_version
            ),
        }
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<ModelResponse, ExtractionError> {
        let request = ChatRequest {
            model: &self.model_name,
            messages,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
        };

        let mut builder = self.client.post(self.completions_url()).json(&request);
        if let Some(key) = &self.api_key {
            builder = match self.routing {
                Routing::OpenAi => builder.bearer_auth(key),
                Routing::Azure { .. } => builder.header("api-key", key),
            };
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout {
                    backend: BACKEND.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                ExtractionError::backend(BACKEND, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                backend: BACKEND.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::invalid(BACKEND, format!("JSON parse error: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("LLM returned {} characters", content.len());
        Ok(ModelResponse::Text(content))
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
