//! Text chunking for TTS processing.
//!
//! The token estimate is a character-length heuristic, not a real tokenizer:
//! `(chunk_len + word_len) * tokens_per_word`. It has never been checked against
//! the API's actual input limits, so treat the budget as approximate.

use serde::{Deserialize, Serialize};

/// Default maximum estimated tokens per chunk.
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Default multiplier applied to character length to estimate tokens.
pub const DEFAULT_TOKENS_PER_WORD: f64 = 1.33;

/// Upper bound on the estimated size of one synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Maximum estimated tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Estimated tokens per character of text
    #[serde(default = "default_tokens_per_word")]
    pub tokens_per_word: f64,
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_tokens_per_word() -> f64 {
    DEFAULT_TOKENS_PER_WORD
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, DEFAULT_TOKENS_PER_WORD)
    }
}

impl TokenBudget {
    pub fn new(max_tokens: usize, tokens_per_word: f64) -> Self {
        Self {
            max_tokens,
            tokens_per_word,
        }
    }

    /// Estimated tokens for `len` bytes of text.
    pub fn estimate(&self, len: usize) -> f64 {
        len as f64 * self.tokens_per_word
    }

    /// Whether `len` bytes of text fit; reaching the budget exactly still fits.
    pub fn fits(&self, len: usize) -> bool {
        self.estimate(len) <= self.max_tokens as f64
    }
}

/// Split text into chunks that fit the token budget.
///
/// Words are never split. A word too large for the budget on its own still
/// gets a chunk to itself. Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, budget: &TokenBudget) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        // The joining space is not part of the estimate
        if budget.fits(current.len() + word.len()) {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(word);
        }
    }

    // Don't forget the last chunk
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_short_text() {
        let chunks = chunk_text("a b", &TokenBudget::default());
        assert_eq!(chunks, vec!["a b"]);
    }

    #[test]
    fn test_forced_split() {
        // "a" costs exactly the budget, so "b" can't join it
        let budget = TokenBudget::new(1, 1.0);
        assert_eq!(chunk_text("a b", &budget), vec!["a", "b"]);
    }

    #[test]
    fn test_budget_reached_exactly() {
        // "ab" + "cd" estimates (2 + 2) * 1.0 = 4, equal to the budget
        let budget = TokenBudget::new(4, 1.0);
        assert_eq!(chunk_text("ab cd ef", &budget), vec!["ab cd", "ef"]);
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", &TokenBudget::default()).is_empty());
    }

    #[test]
    fn test_chunk_whitespace_only() {
        assert!(chunk_text("   \n\n \t  ", &TokenBudget::default()).is_empty());
    }

    #[test]
    fn test_whitespace_normalized() {
        let chunks = chunk_text("  Hello,\n\tworld!   How\r\nare you? ", &TokenBudget::default());
        assert_eq!(chunks, vec!["Hello, world! How are you?"]);
    }

    #[test]
    fn test_oversized_first_word() {
        let budget = TokenBudget::new(3, 1.0);
        let chunks = chunk_text("enormous a b", &budget);
        assert_eq!(chunks, vec!["enormous", "a b"]);
    }

    #[test]
    fn test_oversized_middle_word() {
        let budget = TokenBudget::new(3, 1.0);
        let chunks = chunk_text("a enormous b", &budget);
        assert_eq!(chunks, vec!["a", "enormous", "b"]);
    }

    #[test]
    fn test_default_budget_matches_heuristic() {
        // 512 / 1.33 = 384.96, so up to 384 non-space bytes across chunk + next word
        let word = "x".repeat(9);
        let text = vec![word.as_str(); 100].join(" ");
        let chunks = chunk_text(&text, &TokenBudget::default());
        // Chunk of n words has len 10n - 1; the next word fits while 10n - 1 + 9 <= 384
        assert_eq!(chunks[0].split(' ').count(), 38);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_estimate() {
        let budget = TokenBudget::default();
        assert!((budget.estimate(100) - 133.0).abs() < 1e-9);
        assert!(budget.fits(384));
        assert!(!budget.fits(385));
    }

    proptest! {
        #[test]
        fn prop_chunks_preserve_words(
            words in prop::collection::vec("[a-zA-Z]{1,12}", 0..200),
            max_tokens in 1usize..200,
        ) {
            let text = words.join("  \n");
            let budget = TokenBudget::new(max_tokens, 1.33);
            let chunks = chunk_text(&text, &budget);

            let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
            let original: Vec<&str> = text.split_whitespace().collect();
            prop_assert_eq!(rejoined, original);
        }

        #[test]
        fn prop_chunks_respect_budget(
            words in prop::collection::vec("[a-z]{1,15}", 1..200),
            max_tokens in 1usize..200,
        ) {
            let text = words.join(" ");
            let budget = TokenBudget::new(max_tokens, 1.33);

            for chunk in chunk_text(&text, &budget) {
                prop_assert!(!chunk.is_empty());
                if chunk.contains(' ') {
                    // The last join was checked without its space
                    prop_assert!(budget.fits(chunk.len() - 1));
                }
            }
        }

        #[test]
        fn prop_whitespace_yields_nothing(ws in "[ \t\r\n]{0,50}") {
            prop_assert!(chunk_text(&ws, &TokenBudget::default()).is_empty());
        }
    }
}
