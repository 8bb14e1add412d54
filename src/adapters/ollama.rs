use crate::domain::ports::CompletionService;
use crate::utils::error::{ClassifierError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// 本機 Ollama 伺服器的 `/api/generate` 客戶端
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 列出伺服器上已下載的模型
    pub async fn health_check(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.endpoint);
        tracing::debug!("Checking model server at: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map_err(|e| translate_error(e, HEALTH_CHECK_TIMEOUT))?;

        if !response.status().is_success() {
            return Err(ClassifierError::ModelUnavailable {
                message: format!("{} returned HTTP {}", url, response.status()),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::ModelParseError {
                message: format!("invalid /api/tags body: {}", e),
            })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// 設定的模型是否已在伺服器上（"llama3" 也接受 "llama3:latest"）
    pub async fn has_model(&self) -> Result<bool> {
        let models = self.health_check().await?;
        let prefix = format!("{}:", self.model);
        Ok(models
            .iter()
            .any(|name| name == &self.model || name.starts_with(&prefix)))
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        tracing::debug!("Making completion request to: {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| translate_error(e, timeout))?;

        tracing::debug!("Model response status: {}", response.status());

        if !response.status().is_success() {
            return Err(ClassifierError::ModelUnavailable {
                message: format!("{} returned HTTP {}", url, response.status()),
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| translate_error(e, timeout))?;

        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| ClassifierError::ModelParseError {
                message: format!("invalid /api/generate body: {}", e),
            })?;

        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn translate_error(error: reqwest::Error, timeout: Duration) -> ClassifierError {
    if error.is_timeout() {
        ClassifierError::ModelTimeout { timeout }
    } else {
        ClassifierError::ModelUnavailable {
            message: error.to_string(),
        }
    }
}
