pub mod error;
pub mod llm_config;
pub mod prompt;
pub mod reasoning_marker;
pub mod test_case;
