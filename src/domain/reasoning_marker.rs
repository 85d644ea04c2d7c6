use serde::{Deserialize, Serialize};

/// An opening/closing token pair that wraps model-internal reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningMarker {
    pub open: String,
    pub close: String,
}

impl ReasoningMarker {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn defaults() -> Vec<ReasoningMarker> {
        vec![
            ReasoningMarker::new("<think>", "</think>"),
            ReasoningMarker::new("[内部思考]", "[/内部思考]"),
        ]
    }

    pub fn is_usable(&self) -> bool {
        !self.open.is_empty() && !self.close.is_empty()
    }

    /// Tag name of an XML-style opening marker (`<think>` gives `think`),
    /// whose self-closing form `<think/>` is stripped as well.
    pub fn tag_name(&self) -> Option<&str> {
        let name = self.open.strip_prefix('<')?.strip_suffix('>')?;
        let is_tag = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'));
        is_tag.then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_name() {
        assert_eq!(ReasoningMarker::new("<think>", "</think>").tag_name(), Some("think"));
        assert_eq!(ReasoningMarker::new("[内部思考]", "[/内部思考]").tag_name(), None);
        assert_eq!(ReasoningMarker::new("<a b>", "</a>").tag_name(), None);
        assert_eq!(ReasoningMarker::new("<>", "</>").tag_name(), None);
    }
}
