use super::stream::{read_stream, StreamLine};
use super::{ensure_success, request_error, request_timeout, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Any backend that speaks the OpenAI `/chat/completions` dialect
/// (OpenAI, OpenRouter, LM Studio, vLLM, ...).
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn build_body(config: &LLMConfig, system: &str, user: &str) -> Value {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": user}));

        json!({
            "model": config.model,
            "messages": messages,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "stream": config.stream,
        })
    }

    fn authorize(request: reqwest::RequestBuilder, config: &LLMConfig) -> reqwest::RequestBuilder {
        match config.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
            Some(api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

/// One server-sent-events line of a streamed chat completion.
pub(crate) fn parse_stream_line(line: &str) -> StreamLine {
    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
        return StreamLine::Skip;
    };
    if payload == "[DONE]" {
        return StreamLine::Done;
    }
    let Ok(event) = serde_json::from_str::<Value>(payload) else {
        return StreamLine::Skip;
    };
    if let Some(message) = event["error"]["message"].as_str() {
        return StreamLine::Error(format!("API stream error: {}", message));
    }
    match event["choices"][0]["delta"]["content"].as_str() {
        Some(fragment) if !fragment.is_empty() => StreamLine::Content(fragment.to_string()),
        _ => StreamLine::Skip,
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = config.endpoint("chat/completions");
        let body = Self::build_body(config, system, user);

        let request = self
            .client
            .post(&url)
            .timeout(request_timeout(config))
            .json(&body);
        let response = Self::authorize(request, config)
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        if config.stream {
            return read_stream(response, parse_stream_line).await;
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        let url = config.endpoint("models");

        let request = self.client.get(&url).timeout(request_timeout(config));
        let response = Self::authorize(request, config)
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let models: Vec<String> = json["data"]
            .as_array()
            .ok_or_else(|| {
                AppError::LLMError("Invalid response format: missing data array".to_string())
            })?
            .iter()
            .filter_map(|m| m["id"].as_str())
            .map(|id| id.to_string())
            .collect();

        // Some proxies list the same model more than once.
        let mut seen = HashSet::new();
        Ok(models
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }
}
