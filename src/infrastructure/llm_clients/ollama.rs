use super::stream::{read_stream, StreamLine};
use super::{ensure_success, request_error, request_timeout, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelInfo>,
}

#[derive(Deserialize)]
struct OllamaModelInfo {
    name: String,
}

pub struct OllamaClient {
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn build_request<'a>(config: &'a LLMConfig, system: &'a str, user: &'a str) -> OllamaChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(OllamaMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(OllamaMessage {
            role: "user",
            content: user,
        });

        OllamaChatRequest {
            model: &config.model,
            messages,
            stream: config.stream,
            options: OllamaOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

/// One NDJSON line of an Ollama `/api/chat` stream.
pub(crate) fn parse_stream_line(line: &str) -> StreamLine {
    let Ok(chunk) = serde_json::from_str::<OllamaChatResponse>(line) else {
        return StreamLine::Skip;
    };
    if let Some(error) = chunk.error {
        return StreamLine::Error(format!("Ollama stream error: {}", error));
    }
    match chunk.message {
        Some(message) if !message.content.is_empty() => StreamLine::Content(message.content),
        _ if chunk.done => StreamLine::Done,
        _ => StreamLine::Skip,
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = config.endpoint("api/chat");
        let body = Self::build_request(config, system, user);

        let response = self
            .client
            .post(&url)
            .timeout(request_timeout(config))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        if config.stream {
            return read_stream(response, parse_stream_line).await;
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;
        if let Some(error) = parsed.error {
            return Err(AppError::LLMError(format!("Ollama error: {}", error)));
        }
        parsed
            .message
            .map(|message| message.content)
            .ok_or_else(|| {
                AppError::LLMError("Invalid response format: missing message".to_string())
            })
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        let url = config.endpoint("api/tags");

        let response = self
            .client
            .get(&url)
            .timeout(request_timeout(config))
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }
}
