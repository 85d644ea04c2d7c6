use crate::domain::reasoning_marker::ReasoningMarker;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

// A newline followed by two or more whitespace-only lines.
static BLANK_LINE_RUN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t\r]*\n){2,}").unwrap());

static DEFAULT_SANITIZER: Lazy<ResponseSanitizer> =
    Lazy::new(|| ResponseSanitizer::new(&ReasoningMarker::defaults()));

/// Strips reasoning blocks and excess blank lines from raw model output.
#[derive(Debug, Clone)]
pub struct ResponseSanitizer {
    marker_patterns: Vec<Regex>,
}

impl ResponseSanitizer {
    pub fn new(markers: &[ReasoningMarker]) -> Self {
        let mut marker_patterns = Vec::with_capacity(markers.len());
        for marker in markers.iter().filter(|m| m.is_usable()) {
            let mut patterns = vec![format!(
                "(?s){}.*?{}",
                regex::escape(&marker.open),
                regex::escape(&marker.close)
            )];
            if let Some(tag) = marker.tag_name() {
                patterns.push(format!(r"<{}\s*/>", regex::escape(tag)));
            }
            for pattern in patterns {
                match Regex::new(&pattern) {
                    Ok(regex) => marker_patterns.push(regex),
                    Err(err) => warn!(
                        error = %err,
                        open = %marker.open,
                        close = %marker.close,
                        "Skipping reasoning marker that does not compile"
                    ),
                }
            }
        }
        Self { marker_patterns }
    }

    pub fn sanitize(&self, response: &str) -> String {
        let mut cleaned = response.to_string();

        // Removing one block can splice a new marker together from the text
        // around it, so strip until nothing matches. Every pass shrinks the text.
        loop {
            let mut next = cleaned.clone();
            for pattern in &self.marker_patterns {
                next = pattern.replace_all(&next, "").into_owned();
            }
            if next == cleaned {
                break;
            }
            cleaned = next;
        }

        cleaned = BLANK_LINE_RUN_PATTERN
            .replace_all(&cleaned, "\n\n")
            .into_owned();

        cleaned.trim().to_string()
    }
}

impl Default for ResponseSanitizer {
    fn default() -> Self {
        DEFAULT_SANITIZER.clone()
    }
}

/// Cleans an LLM response with the default marker vocabulary.
pub fn clean_llm_response(response: &str) -> String {
    DEFAULT_SANITIZER.sanitize(response)
}

/// Decodes backend bytes as UTF-8, dropping invalid sequences instead of
/// substituting replacement characters.
pub fn decode_model_bytes(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
