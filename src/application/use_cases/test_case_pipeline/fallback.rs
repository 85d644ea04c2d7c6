use crate::domain::test_case::{TestCaseRecord, TestType};
use serde_json::Map;

pub(crate) const UNRESOLVED_TITLE: &str = "Unresolved test case";

/// Builds the degraded record for text the pipeline could not structure.
/// The sanitized text is kept verbatim as the description.
pub(crate) fn synthesize_fallback(sanitized: &str, title_hint: Option<&str>) -> TestCaseRecord {
    let title = title_hint
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .unwrap_or(UNRESOLVED_TITLE)
        .to_string();

    TestCaseRecord {
        title,
        description: sanitized.to_string(),
        test_type: TestType::Unresolved,
        prerequisites: Vec::new(),
        steps: Vec::new(),
        expected_results: Vec::new(),
        test_data: Map::new(),
    }
}
