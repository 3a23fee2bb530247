//! Indexable chunk record: a bounded contiguous span of cleaned text.

use serde::{Deserialize, Serialize};

use super::{Document, MAX_CHUNK_CHARS};

/// An indexable chunk of a document.
///
/// Every chunk references an existing parent document; orphan chunks are
/// rejected at the indexer boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable identity: hex MD5 of `{document_id}_chunk_{index}`.
    pub chunk_id: String,
    /// Identity of the parent document.
    pub document_id: String,
    /// Cleaned chunk text.
    pub text_chunk: String,
    /// JSON-encoded heading list (`[{"level":N,"text":"..."}]`, at most 10).
    pub headings: String,
    /// Domain authority score in [0, 1].
    pub domain_score: f32,
    /// Bounded weighted quality score.
    pub quality_score: f32,
    /// Word count of `text_chunk`.
    pub word_count: usize,
    /// Category labels, same vocabulary as the parent document.
    pub content_categories: Vec<String>,
    /// Chunk-specialized keywords.
    pub keywords: Vec<String>,
    /// Parent document URL, denormalized for chunk-first retrieval.
    #[serde(default)]
    pub url: String,
    /// Parent document title, denormalized for chunk-first retrieval.
    #[serde(default)]
    pub title: String,
    /// Parent document domain, denormalized for diversification.
    #[serde(default)]
    pub domain: String,
}

impl DocumentChunk {
    /// Builds chunk `index` of a document, deriving identity and word count.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        document_id: &str,
        index: usize,
        text_chunk: String,
        headings: String,
        domain_score: f32,
        quality_score: f32,
        content_categories: Vec<String>,
        keywords: Vec<String>,
    ) -> Self {
        let word_count = text_chunk.split_whitespace().count();
        Self {
            chunk_id: super::chunk_id(document_id, index),
            document_id: document_id.to_string(),
            text_chunk,
            headings,
            domain_score,
            quality_score,
            word_count,
            content_categories,
            keywords,
            url: String::new(),
            title: String::new(),
            domain: String::new(),
        }
    }

    /// Builds chunk `index` of `document`, denormalizing the parent's URL,
    /// title, domain, and categories onto the chunk.
    #[must_use]
    pub fn for_document(
        document: &Document,
        index: usize,
        text_chunk: String,
        headings: String,
        domain_score: f32,
        quality_score: f32,
        keywords: Vec<String>,
    ) -> Self {
        let mut chunk = Self::new(
            &document.document_id,
            index,
            text_chunk,
            headings,
            domain_score,
            quality_score,
            document.categories.clone(),
            keywords,
        );
        chunk.url = document.url.clone();
        chunk.title = document.title.clone();
        chunk.domain = document.domain.clone();
        chunk
    }

    /// Checks the indexer-boundary size invariant.
    #[must_use]
    pub fn within_size_bounds(&self, min_words: usize) -> bool {
        self.word_count >= min_words && self.text_chunk.len() <= MAX_CHUNK_CHARS
    }
}
