//! Paragraph-based chunking strategy.
//!
//! Long-form content splits on blank lines first; paragraphs are packed
//! into chunks up to the size target. Oversized paragraphs are handled by
//! the shared sizing pass, not here.

use super::traits::{Chunker, ChunkerConfig};

/// Chunker that packs whole paragraphs up to the size target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphChunker;

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str, config: &ChunkerConfig) -> Vec<String> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if paragraphs.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for paragraph in paragraphs {
            let projected = current.len() + paragraph.len() + 1;
            if current.is_empty() {
                current.push_str(paragraph);
            } else if projected <= config.max_chunk_size {
                current.push(' ');
                current.push_str(paragraph);
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(paragraph);
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "paragraph"
    }
}
