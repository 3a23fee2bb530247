//! Sentence-based chunking strategy.
//!
//! Accumulates Unicode sentences until the target size is reached. Used
//! for shorter content where paragraph structure is too coarse.

use super::traits::{Chunker, ChunkerConfig};
use crate::text::sentences;

/// Chunker that groups whole sentences up to the size target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceChunker;

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str, config: &ChunkerConfig) -> Vec<String> {
        let sentences = sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            let projected = current.len() + sentence.len() + 1;
            if current.is_empty() {
                current.push_str(sentence);
            } else if projected <= config.max_chunk_size {
                current.push(' ');
                current.push_str(sentence);
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(sentence);
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}
