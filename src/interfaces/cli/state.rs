use crate::application::{TestCaseGenerationUseCase, TestCasePipeline};
use crate::domain::error::Result;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::infrastructure::response::ResponseSanitizer;
use crate::infrastructure::storage::TestCaseStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub pipeline: TestCasePipeline,
    pub generation_use_case: TestCaseGenerationUseCase,
}

impl AppState {
    pub fn load(config_path: Option<&Path>, output_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = ConfigService::load(config_path)?;
        if let Some(dir) = output_dir {
            config.output_dir = dir;
        }
        Ok(Self::with_client(config, Arc::new(RouterClient::new())))
    }

    pub fn with_client(config: AppConfig, llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        let pipeline = TestCasePipeline::new(ResponseSanitizer::new(&config.reasoning_markers));
        let store = Arc::new(TestCaseStore::new(config.output_dir.clone()));
        let generation_use_case =
            TestCaseGenerationUseCase::new(llm_client.clone(), store, pipeline.clone());

        Self {
            config,
            llm_client,
            pipeline,
            generation_use_case,
        }
    }
}
