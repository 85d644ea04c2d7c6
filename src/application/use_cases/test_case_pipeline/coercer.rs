use crate::domain::test_case::{ResultRecord, StepKind, StepRecord, TestCaseRecord, TestType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

static LEADING_NUMBERING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)](\s*)").unwrap());

const REQUIRED_FIELDS: [&str; 4] = ["title", "prerequisites", "steps", "expected_results"];
const STEP_ACTION_KEYS: [&str; 4] = ["action", "description", "name", "step"];
const STEP_DATA_KEYS: [&str; 3] = ["test_data", "input", "data"];
const STEP_POSITION_KEYS: [&str; 2] = ["step", "index"];
const RESULT_DESCRIPTION_KEYS: [&str; 4] = ["description", "result", "expected", "expected_result"];

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The candidate is not a JSON object.
    Syntax(String),
    /// Parsed, but required fields are missing.
    Schema(Vec<String>),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax(msg) => write!(f, "syntax error: {}", msg),
            ParseError::Schema(fields) => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
        }
    }
}

pub(crate) fn coerce_record(candidate: &str) -> Result<TestCaseRecord, ParseError> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|err| ParseError::Syntax(err.to_string()))?;
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ParseError::Syntax(format!(
                "expected a JSON object, found {}",
                value_kind(&other)
            )))
        }
    };

    let title = object
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty());

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| match **field {
            "title" => title.is_none(),
            other => !object.contains_key(other),
        })
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::Schema(missing));
    }

    let record = TestCaseRecord {
        title: title.unwrap_or_default().to_string(),
        description: object
            .get("description")
            .and_then(value_to_text)
            .unwrap_or_default(),
        test_type: object
            .get("test_type")
            .and_then(Value::as_str)
            .map(TestType::coerce)
            .unwrap_or_default(),
        prerequisites: elements(object.get("prerequisites"))
            .filter_map(value_to_text)
            .filter(|text| !text.is_empty())
            .collect(),
        steps: coerce_steps(object.get("steps")),
        expected_results: coerce_results(object.get("expected_results")),
        test_data: coerce_test_data(object.get("test_data")),
    };

    record.validate().map_err(schema_error)?;
    Ok(record)
}

fn schema_error(errors: validator::ValidationErrors) -> ParseError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    ParseError::Schema(fields)
}

fn coerce_steps(value: Option<&Value>) -> Vec<StepRecord> {
    elements(value)
        .filter_map(|element| match element {
            Value::Object(fields) => structured_step(fields),
            other => value_to_text(other)
                .map(|text| strip_numbering(&text).to_string())
                .filter(|action| !action.is_empty())
                .map(|action| StepKind::ActionOnly { action }),
        })
        .enumerate()
        .map(|(position, kind)| StepRecord {
            index: position + 1,
            kind,
        })
        .collect()
}

fn structured_step(fields: &Map<String, Value>) -> Option<StepKind> {
    let action_key = STEP_ACTION_KEYS
        .iter()
        .copied()
        .find(|key| fields.get(*key).and_then(Value::as_str).is_some());
    let action = action_key
        .and_then(|key| fields.get(key))
        .and_then(value_to_text)
        .unwrap_or_default();

    let mut data = BTreeMap::new();
    for key in STEP_DATA_KEYS {
        match fields.get(key) {
            Some(Value::Object(entries)) => {
                for (name, entry) in entries {
                    if let Some(text) = value_to_text(entry) {
                        data.insert(name.clone(), text);
                    }
                }
            }
            Some(other) => {
                if let Some(text) = value_to_text(other) {
                    data.insert(key.to_string(), text);
                }
            }
            None => {}
        }
    }
    for (name, entry) in fields {
        let reserved = Some(name.as_str()) == action_key
            || STEP_DATA_KEYS.contains(&name.as_str())
            || STEP_POSITION_KEYS.contains(&name.as_str());
        if reserved {
            continue;
        }
        if let Some(text) = value_to_text(entry) {
            data.insert(name.clone(), text);
        }
    }

    if action.is_empty() && data.is_empty() {
        return None;
    }
    if data.is_empty() {
        return Some(StepKind::ActionOnly { action });
    }
    Some(StepKind::StructuredAction { action, data })
}

fn coerce_results(value: Option<&Value>) -> Vec<ResultRecord> {
    elements(value)
        .filter_map(|element| match element {
            Value::Object(fields) => structured_result(fields),
            other => value_to_text(other)
                .map(|text| strip_numbering(&text).to_string())
                .filter(|description| !description.is_empty())
                .map(ResultRecord::from_description),
        })
        .collect()
}

fn structured_result(fields: &Map<String, Value>) -> Option<ResultRecord> {
    if fields.is_empty() {
        return None;
    }
    let description_key = RESULT_DESCRIPTION_KEYS
        .iter()
        .copied()
        .find(|key| fields.get(*key).and_then(Value::as_str).is_some());
    let description = description_key
        .and_then(|key| fields.get(key))
        .and_then(value_to_text)
        .unwrap_or_default();
    let conditions = fields.get("conditions").and_then(|value| match value {
        Value::Null => None,
        other => Some(
            elements(Some(other))
                .filter_map(value_to_text)
                .filter(|text| !text.is_empty())
                .collect(),
        ),
    });
    // `description` and `conditions` are record fields; leaving either in
    // `extra` would serialize the key twice.
    let extra = fields
        .iter()
        .filter(|(name, _)| {
            let name = name.as_str();
            Some(name) != description_key && !matches!(name, "description" | "conditions")
        })
        .map(|(name, entry)| (name.clone(), entry.clone()))
        .collect();

    Some(ResultRecord {
        description,
        conditions,
        extra,
    })
}

fn coerce_test_data(value: Option<&Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(entries)) => entries.clone(),
        Some(other) => {
            let mut wrapped = Map::new();
            wrapped.insert("value".to_string(), other.clone());
            wrapped
        }
    }
}

/// Array elements; `null` is empty and a lone scalar counts as one element.
fn elements(value: Option<&Value>) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        None | Some(Value::Null) => Box::new(std::iter::empty()),
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(other) => Box::new(std::iter::once(other)),
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.trim().to_string()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Strips a leading `1.` / `2)` marker. `1.5 kg` keeps its number.
pub(crate) fn strip_numbering(text: &str) -> &str {
    let Some(caps) = LEADING_NUMBERING_PATTERN.captures(text) else {
        return text;
    };
    let (Some(whole), Some(gap)) = (caps.get(0), caps.get(1)) else {
        return text;
    };
    let rest = &text[whole.end()..];
    if gap.as_str().is_empty() && rest.starts_with(|c: char| c.is_ascii_digit()) {
        return text;
    }
    rest.trim_end()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
