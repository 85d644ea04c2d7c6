use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    Ollama,
    OpenAI,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    #[serde(default)]
    pub stream: bool,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "deepseek-r1:latest".to_string(),
            api_key: None,
            max_tokens: Some(2048),
            temperature: Some(0.7),
            timeout_secs: 60,
            stream: false,
        }
    }
}

impl LLMConfig {
    /// Joins `path` onto `base_url` with exactly one separating slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LLMConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let config = LLMConfig {
            temperature: Some(3.5),
            ..LLMConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_joins_single_slash() {
        let config = LLMConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..LLMConfig::default()
        };
        assert_eq!(config.endpoint("/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(config.endpoint("api/tags"), "http://localhost:11434/api/tags");
    }
}
