use crate::application::use_cases::templates::format_prompt;
use crate::application::use_cases::test_case_pipeline::{TestCasePipeline, Terminal};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::{Prompt, TemplateType};
use crate::domain::test_case::{TestCaseRecord, TestType};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::storage::TestCaseStore;
use crate::shared::token_counter::TokenCounter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

static LIST_MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*+•]\s+|\d+(?:[.)\-]\s+|、\s*))").unwrap());

#[derive(Debug, Clone)]
pub struct GeneratedTestCase {
    pub record: TestCaseRecord,
    pub path: PathBuf,
    pub terminal: Terminal,
}

pub struct TestCaseGenerationUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    store: Arc<TestCaseStore>,
    pipeline: TestCasePipeline,
}

impl TestCaseGenerationUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        store: Arc<TestCaseStore>,
        pipeline: TestCasePipeline,
    ) -> Self {
        Self {
            llm_client,
            store,
            pipeline,
        }
    }

    /// Asks the model for the key features of a requirements document, one per line.
    pub async fn analyze_requirements(
        &self,
        config: &LLMConfig,
        requirements_text: &str,
    ) -> Result<Vec<String>> {
        if requirements_text.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Requirements text is empty".to_string(),
            ));
        }

        let prompt = format_prompt(
            TemplateType::Analyzer,
            &[("requirements_text", requirements_text)],
        )?;
        let raw = self.complete(config, &prompt).await?;
        let features = split_features(&self.pipeline.sanitizer().sanitize(&raw));

        info!(count = features.len(), "Extracted features from requirements");
        Ok(features)
    }

    pub fn build_prompt(&self, feature: &str, test_type: TestType) -> Result<Prompt> {
        if test_type == TestType::Unresolved {
            return Err(AppError::ValidationError(
                "Cannot generate test cases of type 'unresolved'".to_string(),
            ));
        }

        let content = match test_type {
            TestType::Api => format_prompt(TemplateType::ApiTestcase, &[("feature", feature)])?,
            _ => format_prompt(
                TemplateType::CommonTestcase,
                &[("test_type", test_type.as_str()), ("feature", feature)],
            )?,
        };
        let wrapped = format_prompt(TemplateType::Testcase, &[("content", &content)])?;

        let prompt = Prompt::new(feature.trim().to_string(), test_type, wrapped);
        prompt.validate()?;
        Ok(prompt)
    }

    /// Backend errors propagate; an unusable answer still yields a stored
    /// record (marked unresolved).
    pub async fn generate_test_case(
        &self,
        config: &LLMConfig,
        feature: &str,
        test_type: TestType,
    ) -> Result<GeneratedTestCase> {
        let prompt = self.build_prompt(feature, test_type)?;
        info!(feature = %prompt.feature, test_type = %test_type, "Generating test case");

        let raw = self.complete(config, &prompt.content).await?;
        self.extract_and_store(&raw, Some(&prompt.feature))
    }

    /// Runs the pipeline over already captured model output and persists the result.
    pub fn extract_and_store(&self, raw: &str, title_hint: Option<&str>) -> Result<GeneratedTestCase> {
        let outcome = self.pipeline.run(raw, title_hint);
        debug!(trace = ?outcome.trace, "Pipeline finished");

        let path = self.store.save(&outcome.record)?;
        Ok(GeneratedTestCase {
            record: outcome.record,
            path,
            terminal: outcome.terminal,
        })
    }

    async fn complete(&self, config: &LLMConfig, prompt: &str) -> Result<String> {
        debug!(
            model = %config.model,
            prompt_tokens = TokenCounter::estimate_messages_tokens(&[("user", prompt)]),
            "Sending prompt"
        );

        let raw = self.llm_client.generate(config, "", prompt).await?;
        if raw.trim().is_empty() {
            return Err(AppError::LLMError("Model returned an empty response".to_string()));
        }

        debug!(
            response_tokens = TokenCounter::estimate_tokens(&raw),
            "Received model response"
        );
        Ok(raw)
    }
}

/// Turns the analyzer's markdown answer into a list of feature lines.
pub fn split_features(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut features = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with("```") {
            continue;
        }
        // Section labels such as "Key features:".
        if line.ends_with(':') || line.ends_with('：') {
            continue;
        }

        let stripped = LIST_MARKER_PATTERN.replace(line, "");
        let feature = stripped.replace("**", "").trim().to_string();
        if feature.is_empty() {
            continue;
        }
        if seen.insert(feature.clone()) {
            features.push(feature);
        }
    }

    features
}
