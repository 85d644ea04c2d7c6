use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::reasoning_marker::ReasoningMarker;
use crate::domain::test_case::TestType;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "casegen.toml";
const ENV_PREFIX: &str = "CASEGEN_";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub llm: LLMConfig,
    pub output_dir: PathBuf,
    #[validate(length(min = 1))]
    pub test_types: Vec<TestType>,
    pub reasoning_markers: Vec<ReasoningMarker>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            output_dir: PathBuf::from("testcases"),
            test_types: vec![TestType::Functional, TestType::Api],
            reasoning_markers: ReasoningMarker::defaults(),
        }
    }
}

pub struct ConfigService;

impl ConfigService {
    /// Defaults, then the TOML file (`casegen.toml` unless given), then
    /// `CASEGEN_*` environment variables, with `__` separating nested keys.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "Loaded .env file");
        }

        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(env_prefix).split("__"))
            .extract()?;

        config.validate()?;
        if config.test_types.contains(&TestType::Unresolved) {
            return Err(AppError::ConfigError(
                "test_types may not contain 'unresolved'".to_string(),
            ));
        }

        debug!(
            provider = ?config.llm.provider,
            model = %config.llm.model,
            output_dir = %config.output_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ConfigService::load_with_prefix(&dir.path().join("missing.toml"), "CASEGEN_T0_")
                .unwrap();
        assert_eq!(config.llm.provider, LLMProvider::Ollama);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.output_dir, PathBuf::from("testcases"));
        assert_eq!(config.test_types, vec![TestType::Functional, TestType::Api]);
        assert_eq!(config.reasoning_markers.len(), 2);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casegen.toml");
        fs::write(
            &path,
            r#"
output_dir = "out"
test_types = ["automation"]

[llm]
provider = "OpenAI"
base_url = "https://api.example.com/v1"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let config = ConfigService::load_with_prefix(&path, "CASEGEN_T1_").unwrap();
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.test_types, vec![TestType::Automation]);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casegen.toml");
        fs::write(&path, "[llm]\nmodel = \"from-file\"\n").unwrap();

        std::env::set_var("CASEGEN_T2_LLM__MODEL", "qwen3");
        let config = ConfigService::load_with_prefix(&path, "CASEGEN_T2_").unwrap();
        std::env::remove_var("CASEGEN_T2_LLM__MODEL");

        assert_eq!(config.llm.model, "qwen3");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casegen.toml");
        fs::write(&path, "[llm]\nbase_url = \"not a url\"\n").unwrap();
        assert!(matches!(
            ConfigService::load_with_prefix(&path, "CASEGEN_T3_"),
            Err(AppError::ValidationError(_))
        ));

        fs::write(&path, "test_types = [\"unresolved\"]\n").unwrap();
        assert!(matches!(
            ConfigService::load_with_prefix(&path, "CASEGEN_T3_"),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casegen.toml");
        fs::write(&path, "[llm\nmodel = ").unwrap();
        assert!(matches!(
            ConfigService::load_with_prefix(&path, "CASEGEN_T4_"),
            Err(AppError::ConfigError(_))
        ));
    }
}
