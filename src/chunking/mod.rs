//! Semantic chunking for document indexing.
//!
//! Strategy selection is content-driven: structure-based chunking when raw
//! HTML is available, paragraph-based for long-form cleaned text, sentence-
//! based otherwise. All strategies feed one sizing pass (split oversized
//! chunks at sentence boundaries, merge undersized neighbors) and an
//! optional context-overlap pass.

pub mod paragraph;
pub mod sentence;
pub mod structure;
pub mod traits;

pub use paragraph::ParagraphChunker;
pub use sentence::SentenceChunker;
pub use structure::StructureChunker;
pub use traits::{Chunker, ChunkerConfig};

use crate::text::sentences;

/// Overlap may push a chunk this far past the configured maximum.
const OVERLAP_OVERFLOW: f32 = 1.1;

/// Minimum size for a chunk that cannot be merged anywhere.
const ABSOLUTE_MIN_CHARS: usize = 50;

/// Chunks cleaned content, preferring document structure when available.
///
/// Returns chunks in document order. The result may be empty when the
/// content is too small to produce a single viable chunk.
#[must_use]
pub fn chunk_content(cleaned: &str, raw_html: Option<&str>, config: &ChunkerConfig) -> Vec<String> {
    if cleaned.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = raw_html
        .map(|html| StructureChunker.chunk_html(html, config))
        .unwrap_or_default();

    if chunks.is_empty() {
        chunks = if cleaned.len() >= config.long_form_threshold {
            ParagraphChunker.chunk(cleaned, config)
        } else {
            SentenceChunker.chunk(cleaned, config)
        };
    }

    let chunks = enforce_sizes(chunks, config);

    if config.preserve_context && chunks.len() > 1 {
        add_overlap(chunks, config)
    } else {
        chunks
    }
}

/// Applies the sizing rules: oversized chunks split by sentences, undersized
/// chunks merged with a neighbor when the pair fits, tiny leftovers dropped.
#[must_use]
pub fn enforce_sizes(chunks: Vec<String>, config: &ChunkerConfig) -> Vec<String> {
    let mut sized: Vec<String> = Vec::new();
    for chunk in chunks {
        if chunk.len() > config.max_chunk_size {
            sized.extend(split_by_sentences(&chunk, config.max_chunk_size));
        } else {
            sized.push(chunk);
        }
    }

    let mut merged: Vec<String> = Vec::new();
    for chunk in sized {
        if chunk.len() >= config.min_chunk_size {
            merged.push(chunk);
            continue;
        }
        match merged.last_mut() {
            Some(prev) if prev.len() + chunk.len() + 1 <= config.max_chunk_size => {
                prev.push(' ');
                prev.push_str(&chunk);
            }
            _ if chunk.len() >= ABSOLUTE_MIN_CHARS => merged.push(chunk),
            _ => {}
        }
    }

    merged
}

/// Splits a chunk at sentence boundaries so each piece fits `max_size`.
///
/// A single sentence longer than `max_size` is kept whole; splitting
/// mid-sentence is never allowed.
#[must_use]
pub fn split_by_sentences(text: &str, max_size: usize) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        if current.is_empty() {
            current.push_str(sentence);
        } else if current.len() + sentence.len() + 1 <= max_size {
            current.push(' ');
            current.push_str(sentence);
        } else {
            pieces.push(std::mem::take(&mut current));
            current.push_str(sentence);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

/// Prepends the last one or two sentences of each chunk's predecessor.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn add_overlap(chunks: Vec<String>, config: &ChunkerConfig) -> Vec<String> {
    let overflow_limit = (config.max_chunk_size as f32 * OVERLAP_OVERFLOW) as usize;
    let mut result: Vec<String> = Vec::with_capacity(chunks.len());

    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            result.push(chunk.clone());
            continue;
        }

        let prev_sentences = sentences(&chunks[i - 1]);
        let mut take = 2.min(prev_sentences.len());
        let mut combined = chunk.clone();

        while take > 0 {
            let overlap = prev_sentences[prev_sentences.len() - take..].join(" ");
            if overlap.len() + 1 + chunk.len() <= overflow_limit {
                combined = format!("{overlap} {chunk}");
                break;
            }
            take -= 1;
        }

        result.push(combined);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_text(count: usize) -> String {
        (0..count)
            .map(|i| format!("Sentence number {i} talks about topic {i} in detail."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_chunk_content_empty() {
        assert!(chunk_content("", None, &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn test_chunk_content_sentence_path() {
        let config = ChunkerConfig::with_sizes(200, 50).without_context();
        let text = sentence_text(12);
        let chunks = chunk_content(&text, None, &config);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 200);
        }
    }

    #[test]
    fn test_chunk_content_paragraph_path_for_long_form() {
        let mut config = ChunkerConfig::with_sizes(1_500, 200).without_context();
        config.long_form_threshold = 1_000;
        let paragraph = sentence_text(8);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = chunk_content(&text, None, &config);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_chunk_content_structure_path() {
        let para = "Structured body paragraph with many distinct informative \
                    words covering installation and usage in equal measure.";
        let html = format!(
            "<html><body><h2>Install</h2><p>{para} {para}</p>\
             <h2>Usage</h2><p>{para} {para}</p></body></html>"
        );
        let config = ChunkerConfig::with_sizes(2_000, 100).without_context();
        let chunks = chunk_content("irrelevant cleaned text here", Some(&html), &config);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("Install"));
    }

    #[test]
    fn test_oversized_chunk_split_at_sentences() {
        let config = ChunkerConfig::with_sizes(120, 30).without_context();
        let oversized = vec![sentence_text(8)];
        let sized = enforce_sizes(oversized, &config);
        assert!(sized.len() > 1);
        for chunk in &sized {
            assert!(chunk.ends_with('.'));
        }
    }

    #[test]
    fn test_boundary_exactly_max_is_kept() {
        let config = ChunkerConfig::with_sizes(100, 10).without_context();
        let exact = "x".repeat(100);
        let sized = enforce_sizes(vec![exact.clone()], &config);
        assert_eq!(sized, vec![exact]);
    }

    #[test]
    fn test_boundary_over_max_triggers_split() {
        let config = ChunkerConfig::with_sizes(100, 10).without_context();
        let over = format!("{}. {}.", "A".repeat(60), "B".repeat(60));
        let sized = enforce_sizes(vec![over], &config);
        assert_eq!(sized.len(), 2);
    }

    #[test]
    fn test_undersized_merged_with_neighbor() {
        let config = ChunkerConfig::with_sizes(500, 100).without_context();
        let chunks = vec![
            "A first chunk easily long enough to stand on its own for this merge test case right here.".to_string(),
            "Short tail under the minimum size that merges.".to_string(),
        ];
        let sized = enforce_sizes(chunks, &config);
        assert_eq!(sized.len(), 1);
        assert!(sized[0].contains("Short tail"));
    }

    #[test]
    fn test_undersized_kept_when_merge_would_overflow() {
        let config = ChunkerConfig::with_sizes(100, 80).without_context();
        let chunks = vec![
            "x".repeat(95),
            "A leftover chunk of some sixty characters keeps itself.".to_string(),
        ];
        let sized = enforce_sizes(chunks, &config);
        assert_eq!(sized.len(), 2);
    }

    #[test]
    fn test_tiny_unmergeable_dropped() {
        let config = ChunkerConfig::with_sizes(100, 80).without_context();
        let chunks = vec!["x".repeat(95), "tiny".to_string()];
        let sized = enforce_sizes(chunks, &config);
        assert_eq!(sized.len(), 1);
    }

    #[test]
    fn test_overlap_prepends_previous_sentences() {
        let config = ChunkerConfig::with_sizes(300, 50);
        let text = sentence_text(10);
        let chunks = chunk_content(&text, None, &config);
        assert!(chunks.len() > 1);
        // The second chunk starts with the tail of the first.
        let first_sentences = sentences(&chunks[0]);
        let last = first_sentences[first_sentences.len() - 1];
        assert!(chunks[1].contains(last));
    }

    #[test]
    fn test_overlap_respects_overflow_bound() {
        let config = ChunkerConfig::with_sizes(200, 50);
        let text = sentence_text(12);
        let chunks = chunk_content(&text, None, &config);
        for chunk in &chunks {
            assert!(chunk.len() <= 220 + 1, "chunk len {} over bound", chunk.len());
        }
    }

    #[test]
    fn test_split_by_sentences_single_long_sentence() {
        let long = format!("{} end.", "word ".repeat(100));
        let pieces = split_by_sentences(&long, 50);
        assert_eq!(pieces.len(), 1);
    }
}
