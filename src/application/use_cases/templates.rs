use crate::domain::error::{AppError, Result};
use crate::domain::prompt::TemplateType;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static TEMPLATES: Lazy<HashMap<TemplateType, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            TemplateType::Analyzer,
            r#"You are a professional test analyst. Help analyze the requirements document and extract its key features.

Analyze the following requirements document and list the key features:

{requirements_text}

Please provide:
1- One feature per line, as a Markdown list, each part clear and unambiguous

Output only the final answer. Do not include internal reasoning markers such as <think>."#,
        ),
        (
            TemplateType::Testcase,
            r#"Respond strictly in the following JSON format:
{{
    "title": "Test case title",
    "description": "Test case description",
    "test_type": "api",
    "prerequisites": ["Prerequisite 1", "Prerequisite 2"],
    "steps": ["Step 1", "Step 2"],
    "expected_results": ["Expected result 1", "Expected result 2"],
    "test_data": {{
        "key1": "value1",
        "key2": "value2"
    }}
}}

Generate the test case from the following content (make sure the output is valid JSON):
{content}"#,
        ),
        (
            TemplateType::ApiTestcase,
            r#"Generate test cases for the following API feature:
Feature: {feature}

Include the following information:
 1. API name and path
 2. Request method (GET/POST, ...)
 3. Request parameters and format
 4. Expected response and status code
 5. Error scenarios
 6. Example test data

Make sure the response is valid JSON."#,
        ),
        (
            TemplateType::CommonTestcase,
            r#"Generate {test_type} test cases for the following feature:
Feature: {feature}

Include the following information:
 1. Test case title
 2. Test description
 3. Prerequisites
 4. Test steps
 5. Expected results
 6. Test data

Make sure the response is valid JSON."#,
        ),
    ])
});

pub fn get_template(template_type: TemplateType) -> Result<&'static str> {
    TEMPLATES
        .get(&template_type)
        .copied()
        .ok_or_else(|| AppError::Internal(format!("Template {:?} does not exist", template_type)))
}

/// Renders a template. `{name}` is replaced by the matching argument, `{{` and
/// `}}` are literal braces, and arguments the template does not use are ignored.
pub fn format_prompt(template_type: TemplateType, args: &[(&str, &str)]) -> Result<String> {
    render(get_template(template_type)?, args)
}

fn render(template: &str, args: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }
                if !closed {
                    return Err(AppError::ValidationError(format!(
                        "Unterminated placeholder '{{{}' in template",
                        name
                    )));
                }
                let value = args
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or(AppError::MissingPlaceholder(name))?;
                out.push_str(value);
            }
            _ => out.push(ch),
        }
    }

    Ok(out)
}
