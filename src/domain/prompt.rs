use crate::domain::test_case::TestType;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Analyzer,
    Testcase,
    ApiTestcase,
    CommonTestcase,
}

/// A fully rendered prompt for one (feature, test type) pair.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Prompt {
    #[validate(length(min = 1))]
    pub feature: String,
    pub test_type: TestType,
    #[validate(length(min = 1))]
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Prompt {
    pub fn new(feature: String, test_type: TestType, content: String) -> Self {
        Self {
            feature,
            test_type,
            content,
            created_at: chrono::Utc::now(),
        }
    }
}
