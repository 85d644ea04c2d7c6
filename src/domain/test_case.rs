use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

pub const RECORD_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Functional,
    Api,
    Automation,
    /// Only ever assigned to fallback records.
    Unresolved,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Functional => "functional",
            TestType::Api => "api",
            TestType::Automation => "automation",
            TestType::Unresolved => "unresolved",
        }
    }

    /// Maps a model-supplied label onto a type a generated record may carry.
    /// Anything unrecognized, including `unresolved`, becomes `Api`.
    pub fn coerce(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "functional" => TestType::Functional,
            "automation" => TestType::Automation,
            _ => TestType::Api,
        }
    }
}

impl Default for TestType {
    fn default() -> Self {
        TestType::Api
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    /// Strict parse for user input; only requestable types are accepted.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "functional" => Ok(TestType::Functional),
            "api" => Ok(TestType::Api),
            "automation" => Ok(TestType::Automation),
            other => Err(format!(
                "unknown test type '{}' (expected functional, api or automation)",
                other
            )),
        }
    }
}

/// One test step. `index` is 1-based and positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepKind {
    StructuredAction {
        action: String,
        data: BTreeMap<String, String>,
    },
    ActionOnly {
        action: String,
    },
}

impl StepRecord {
    pub fn action(&self) -> &str {
        match &self.kind {
            StepKind::StructuredAction { action, .. } | StepKind::ActionOnly { action } => action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    /// Remaining fields of a structured source object, kept untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultRecord {
    pub fn from_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            conditions: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TestCaseRecord {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub expected_results: Vec<ResultRecord>,
    #[serde(default)]
    pub test_data: Map<String, Value>,
}

impl TestCaseRecord {
    pub fn is_unresolved(&self) -> bool {
        self.test_type == TestType::Unresolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseMeta {
    pub generated_at: String,
    pub version: String,
}

/// On-disk shape: the record with an injected `_meta` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTestCase {
    #[serde(flatten)]
    pub record: TestCaseRecord,
    #[serde(rename = "_meta")]
    pub meta: TestCaseMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_unknown_type_defaults_to_api() {
        assert_eq!(TestType::coerce("Functional "), TestType::Functional);
        assert_eq!(TestType::coerce("performance"), TestType::Api);
        assert_eq!(TestType::coerce("unresolved"), TestType::Api);
    }

    #[test]
    fn test_from_str_rejects_unresolved() {
        assert!("unresolved".parse::<TestType>().is_err());
        assert_eq!("API".parse::<TestType>(), Ok(TestType::Api));
    }

    #[test]
    fn test_step_serialization_shapes() {
        let plain = StepRecord {
            index: 1,
            kind: StepKind::ActionOnly {
                action: "Open app".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"index": 1, "action": "Open app"})
        );

        let mut data = BTreeMap::new();
        data.insert("username".to_string(), "alice".to_string());
        let structured = StepRecord {
            index: 2,
            kind: StepKind::StructuredAction {
                action: "Log in".to_string(),
                data,
            },
        };
        let value = serde_json::to_value(&structured).unwrap();
        assert_eq!(
            value,
            json!({"index": 2, "action": "Log in", "data": {"username": "alice"}})
        );
        let back: StepRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, structured);
    }

    #[test]
    fn test_result_record_keeps_extra_fields() {
        let value = json!({"description": "ok", "status_code": 200});
        let record: ResultRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.description, "ok");
        assert_eq!(record.extra.get("status_code"), Some(&json!(200)));
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_empty_title_fails_validation() {
        let record = TestCaseRecord {
            title: String::new(),
            description: String::new(),
            test_type: TestType::Api,
            prerequisites: Vec::new(),
            steps: Vec::new(),
            expected_results: Vec::new(),
            test_data: Map::new(),
        };
        assert!(record.validate().is_err());
    }
}
