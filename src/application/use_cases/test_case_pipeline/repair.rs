/// Applies a bounded set of syntactic fixes to a candidate JSON span.
///
/// - drops U+FFFD, BOMs and non-whitespace control characters
/// - drops trailing commas before `}` or `]`
/// - rewrites single-quoted and typographic-quoted strings with `"`
/// - quotes bare identifier keys
/// - escapes raw newlines/tabs and stray inner quotes inside strings
///
/// Valid JSON passes through unchanged apart from dropped artifacts.
pub(crate) fn repair_json(candidate: &str) -> String {
    let chars: Vec<char> = candidate
        .chars()
        .filter(|ch| !is_encoding_artifact(*ch))
        .collect();
    let mut out = String::with_capacity(candidate.len());
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => {
                i = copy_string(&chars, i + 1, StringQuote::Double, &mut out);
            }
            '\u{201C}' | '\u{201D}' | '\u{201E}' => {
                i = copy_string(&chars, i + 1, StringQuote::Typographic, &mut out);
            }
            '\'' => {
                i = copy_string(&chars, i + 1, StringQuote::Single, &mut out);
            }
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if is_identifier_start(c) => {
                let end = identifier_end(&chars, i);
                let word: String = chars[i..end].iter().collect();
                let is_key = matches!(last_significant(&out), Some('{') | Some(','))
                    && next_significant(&chars, end) == Some(':');
                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
                i = end;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StringQuote {
    Double,
    Typographic,
    Single,
}

impl StringQuote {
    fn closes(self, ch: char) -> bool {
        match self {
            // Typographic quotes inside an ASCII-quoted string are plain text.
            StringQuote::Double => ch == '"',
            StringQuote::Typographic => matches!(ch, '\u{201C}' | '\u{201D}'),
            StringQuote::Single => ch == '\'',
        }
    }
}

/// Copies a string body starting after its opening quote and writes it out
/// as a double-quoted JSON string. Returns the index after the closing quote.
fn copy_string(chars: &[char], mut i: usize, quote: StringQuote, out: &mut String) -> usize {
    out.push('"');
    while i < chars.len() {
        let ch = chars[i];
        if ch == '\\' {
            match chars.get(i + 1) {
                Some('\'') if quote == StringQuote::Single => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(*next);
                }
                None => out.push_str("\\\\"),
            }
            i += 2;
            continue;
        }
        if quote.closes(ch) {
            // A real closing quote is followed by structure, never by text.
            if is_string_terminator(next_significant(chars, i + 1)) {
                out.push('"');
                return i + 1;
            }
            if ch == '"' {
                out.push_str("\\\"");
            } else {
                out.push(ch);
            }
            i += 1;
            continue;
        }
        match ch {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
        i += 1;
    }
    i
}

fn is_string_terminator(next: Option<char>) -> bool {
    matches!(next, None | Some(',') | Some('}') | Some(']') | Some(':'))
}

fn is_encoding_artifact(ch: char) -> bool {
    ch == '\u{FFFD}' || ch == '\u{FEFF}' || (ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn identifier_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len()
        && (chars[end].is_alphanumeric() || matches!(chars[end], '_' | '$' | '-'))
    {
        end += 1;
    }
    end
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|ch| !ch.is_whitespace())
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|ch| !ch.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parse(text: &str) -> Value {
        serde_json::from_str(&repair_json(text)).unwrap()
    }

    #[test]
    fn test_trailing_comma_object() {
        assert_eq!(repair_json(r#"{"a": 1, "b": 2,}"#), r#"{"a": 1, "b": 2}"#);
        assert_eq!(parse(r#"{"a": 1, "b": 2,}"#), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_trailing_comma_array_with_whitespace() {
        assert_eq!(
            repair_json("{\"steps\": [\"1. Open app\", \"2. Tap login\",\n ]}"),
            "{\"steps\": [\"1. Open app\", \"2. Tap login\"\n ]}"
        );
    }

    #[test]
    fn test_comma_inside_string_untouched() {
        let text = r#"{"a": "x, }", "b": "[1,]"}"#;
        assert_eq!(repair_json(text), text);
    }

    #[test]
    fn test_valid_json_is_unchanged() {
        let text = r#"{"title": "Ünïcode ✓", "n": -1.5e3, "ok": true, "none": null, "esc": "a\"b\\c\n", "arr": [{}, []]}"#;
        assert_eq!(repair_json(text), text);
    }

    #[test]
    fn test_single_quoted_keys_and_values() {
        assert_eq!(
            parse("{'title': 'Don't panic', 'say': 'he said \"hi\"'}"),
            json!({"title": "Don't panic", "say": "he said \"hi\""})
        );
    }

    #[test]
    fn test_typographic_quotes() {
        assert_eq!(
            parse("{\u{201C}title\u{201D}: \u{201C}Login\u{201D}}"),
            json!({"title": "Login"})
        );
    }

    #[test]
    fn test_typographic_quotes_inside_ascii_string_are_text() {
        let text = "{\"title\": \"Save\", \"description\": \"Press \u{201C}OK\u{201D}, then close\", \"steps\": [\"1. Open\",]}";
        assert_eq!(
            parse(text),
            json!({
                "title": "Save",
                "description": "Press \u{201C}OK\u{201D}, then close",
                "steps": ["1. Open"]
            })
        );
    }

    #[test]
    fn test_bare_keys_are_quoted() {
        assert_eq!(
            parse("{title: \"Login\", test_type: \"api\", flag: true, nested: {max-retries: 3}}"),
            json!({"title": "Login", "test_type": "api", "flag": true, "nested": {"max-retries": 3}})
        );
    }

    #[test]
    fn test_literals_are_not_quoted() {
        assert_eq!(repair_json("[true, false, null]"), "[true, false, null]");
    }

    #[test]
    fn test_raw_newlines_and_inner_quotes_in_strings() {
        assert_eq!(
            parse("{\"description\": \"line one\nClick \"Login\" now\"}"),
            json!({"description": "line one\nClick \"Login\" now"})
        );
    }

    #[test]
    fn test_encoding_artifacts_are_dropped() {
        assert_eq!(
            repair_json("\u{FEFF}{\"a\": \"b\u{FFFD}c\u{0007}\"}"),
            "{\"a\": \"bc\"}"
        );
    }

    #[test]
    fn test_hopeless_input_does_not_panic() {
        for input in ["", "{", "\"", "'", "{\"a\": \"unterminated", "\\", ",,,]"] {
            let _ = repair_json(input);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "{a: 'x',}";
        assert_eq!(repair_json(text), repair_json(text));
    }
}
