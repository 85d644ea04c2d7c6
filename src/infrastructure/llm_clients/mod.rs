pub mod ollama;
pub mod openai;
mod stream;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::llm_config::LLMProvider;
use async_trait::async_trait;
use ollama::OllamaClient;
use openai::OpenAIClient;
use std::time::Duration;

#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String>;
    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>>;
}

pub struct RouterClient {
    ollama: OllamaClient,
    openai: OpenAIClient,
}

impl RouterClient {
    pub fn new() -> Self {
        Self {
            ollama: OllamaClient::new(),
            openai: OpenAIClient::new(),
        }
    }
}

impl Default for RouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for RouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Ollama => self.ollama.generate(config, system, user).await,
            LLMProvider::OpenAI => self.openai.generate(config, system, user).await,
        }
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        match config.provider {
            LLMProvider::Ollama => self.ollama.list_models(config).await,
            LLMProvider::OpenAI => self.openai.list_models(config).await,
        }
    }
}

pub(crate) fn request_timeout(config: &LLMConfig) -> Duration {
    Duration::from_secs(config.timeout_secs.max(1))
}

pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(AppError::LLMError(format!("API error ({}): {}", status, text)))
}

pub(crate) fn request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::LLMError(format!("Request timed out: {}", err))
    } else {
        AppError::LLMError(format!("Request failed: {}", err))
    }
}
