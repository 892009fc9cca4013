//! Text processing module for TTS: splitting source text into budgeted chunks.

pub mod chunker;

pub use chunker::{TokenBudget, chunk_text};

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position in the document, starting at 1
    pub index: usize,
    /// The text content
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }
}

/// Split text into numbered chunks, first chunk numbered 1.
pub fn split_into_chunks(text: &str, budget: &TokenBudget) -> Vec<TextChunk> {
    chunk_text(text, budget)
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextChunk::new(i + 1, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunk_creation() {
        let chunk = TextChunk::new(1, "Hello world".to_string());
        assert_eq!(chunk.index, 1);
        assert_eq!(chunk.text, "Hello world");
    }

    #[test]
    fn test_split_into_chunks_is_one_indexed() {
        let budget = TokenBudget::new(4, 1.0);
        let chunks = split_into_chunks("one two three", &budget);
        let indexes: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(chunks[2].text, "three");
    }
}
