use super::repair::repair_json;
use once_cell::sync::Lazy;
use regex::Regex;

static JSON_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```[ \t]*json\b(.*?)```").unwrap());

/// Finds the span of the JSON object embedded in sanitized model output.
///
/// Order of preference:
/// 1. the interior of the first ```json fenced block that holds a `{`
/// 2. the longest brace-balanced span that reads as an object once repaired
/// 3. the first brace-balanced span
/// 4. first `{` to last `}`, for truncated or unbalanced output
pub(crate) fn locate_json_object(text: &str) -> Option<&str> {
    if let Some(inner) = fenced_json_block(text) {
        return Some(inner);
    }

    let spans = balanced_object_spans(text);
    let best = spans
        .iter()
        .filter(|span| reads_as_object(span))
        .fold(None::<&str>, |best, span| match best {
            Some(current) if current.len() >= span.len() => Some(current),
            _ => Some(span),
        });
    if let Some(span) = best {
        return Some(span);
    }
    if let Some(first) = spans.first() {
        return Some(first);
    }

    naive_brace_span(text)
}

fn fenced_json_block(text: &str) -> Option<&str> {
    JSON_FENCE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|inner| inner.contains('{'))
}

/// Top-level `{...}` spans, tracking nesting depth plus string and escape
/// state so braces inside string literals do not count. Only `"` opens a
/// string, and only inside an object. A span whose string never closes is
/// rescanned from its next `{`, so a stray quote in prose cannot hide a
/// later object.
fn balanced_object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut offset = 0usize;
    while let Some(unclosed) = scan_spans(text, offset, &mut spans) {
        offset = unclosed + 1;
    }
    spans
}

/// Scans `text[offset..]`, pushing each balanced span. Returns the start of
/// the open span when the text ends inside a string literal.
fn scan_spans<'a>(text: &'a str, offset: usize, spans: &mut Vec<&'a str>) -> Option<usize> {
    let mut depth = 0usize;
    let mut start = offset;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[offset..].char_indices() {
        let i = offset + i;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            '"' if depth > 0 => in_string = true,
            _ => {}
        }
    }

    in_string.then_some(start)
}

fn reads_as_object(span: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(&repair_json(span))
        .map(|value| value.is_object())
        .unwrap_or(false)
}

fn naive_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_fenced_block() {
        let text = "Intro {not this}\n```json\n{\"a\": 1}\n```\nOutro";
        assert_eq!(locate_json_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_fence_tag_is_case_insensitive() {
        let text = "```JSON\n{\"a\": [1, 2]}\n```";
        assert_eq!(locate_json_object(text), Some("{\"a\": [1, 2]}"));
    }

    #[test]
    fn test_skips_fence_without_object() {
        let text = "```json\n[]\n```\nthen {\"b\": true}";
        assert_eq!(locate_json_object(text), Some("{\"b\": true}"));
    }

    #[test]
    fn test_prefix_and_suffix_are_excluded() {
        let object = r#"{"title": "Login", "steps": ["a", "b"], "test_data": {"k": "v"}}"#;
        let text = format!("Here is the result: {} Hope this helps!", object);
        assert_eq!(locate_json_object(&text), Some(object));
    }

    #[test]
    fn test_braces_inside_strings_do_not_end_span() {
        let object = r#"{"title": "use } and { freely", "n": "\"}\""}"#;
        let text = format!("prefix {} suffix }}", object);
        assert_eq!(locate_json_object(&text), Some(object));
    }

    #[test]
    fn test_prose_braces_lose_to_real_object() {
        let object = r#"{"title": "Checkout", "steps": []}"#;
        let text = format!("Use {{placeholders}} like {{}} then: {} and {{\"x\": 1}}", object);
        assert_eq!(locate_json_object(&text), Some(object));
    }

    #[test]
    fn test_repairable_object_beats_small_valid_one() {
        let object = r#"{"title": "T", "steps": ["a",],}"#;
        let text = format!("{} note: {{\"ok\": 1}}", object);
        assert_eq!(locate_json_object(&text), Some(object));
    }

    #[test]
    fn test_unmatched_quote_in_prose_is_ignored() {
        let text = r#"The user said "hi and then {"a": 1}"#;
        assert_eq!(locate_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_apostrophe_in_prose_braces() {
        let object = r#"{"title": "Profile", "prerequisites": [], "steps": ["Open"], "expected_results": []}"#;
        let text = format!("Fill in {{the user's name}} first. Result: {}", object);
        assert_eq!(locate_json_object(&text), Some(object));
    }

    #[test]
    fn test_unclosed_quote_in_prose_braces_is_rescanned() {
        let text = r#"Use {the "quoted name} here: {"a": 1}"#;
        assert_eq!(locate_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_unbalanced_falls_back_to_naive_span() {
        let text = "{\"a\": {\"b\": 1} trailing";
        assert_eq!(locate_json_object(text), Some("{\"a\": {\"b\": 1}"));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(locate_json_object("no json here"), None);
        assert_eq!(locate_json_object("} backwards {"), None);
        assert_eq!(locate_json_object(""), None);
    }
}
