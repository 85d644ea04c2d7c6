//! Rough token estimates for logging prompt and response sizes.
//!
//! Approximation: ~4 ASCII characters per token, one token per non-ASCII
//! character (CJK text tokenizes close to one token per character).

pub struct TokenCounter;

impl TokenCounter {
    pub fn estimate_tokens(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let (ascii, other) = text.chars().fold((0usize, 0usize), |(ascii, other), ch| {
            if ch.is_ascii() {
                (ascii + 1, other)
            } else {
                (ascii, other + 1)
            }
        });
        (ascii + 3) / 4 + other
    }

    /// Estimate for a chat exchange, adding ~4 tokens of wrapper per message.
    pub fn estimate_messages_tokens(messages: &[(&str, &str)]) -> usize {
        messages
            .iter()
            .filter(|(_, content)| !content.is_empty())
            .map(|(role, content)| 4 + Self::estimate_tokens(role) + Self::estimate_tokens(content))
            .sum()
    }
}
