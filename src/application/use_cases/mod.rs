pub mod templates;
pub mod test_case_generation;
pub mod test_case_pipeline;
