//! Core domain types shared by the pipeline, indexer, and query service.
//!
//! Documents and chunks are addressed by stable MD5 identities so that
//! re-processing the same URL overwrites the stored copy in place.

mod chunk;
mod document;

pub use chunk::DocumentChunk;
pub use document::{AuthorInfo, Document, IconSet, ImageInfo, SemanticInfo, TocEntry};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Maximum number of keywords kept on a document.
pub const MAX_DOCUMENT_KEYWORDS: usize = 10;

/// Maximum chunk size in characters accepted at the indexer boundary.
pub const MAX_CHUNK_CHARS: usize = 8_000;

/// Computes the stable document identity for a URL.
///
/// The identity is the hex MD5 of the raw URL string, so re-processing the
/// same URL always maps to the same stored document.
#[must_use]
pub fn document_id(url: &str) -> String {
    hex::encode(Md5::digest(url.as_bytes()))
}

/// Computes the identity of chunk `index` of a document.
#[must_use]
pub fn chunk_id(document_id: &str, index: usize) -> String {
    hex::encode(Md5::digest(format!("{document_id}_chunk_{index}").as_bytes()))
}

/// Content classification for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Long-form editorial content (the default).
    #[default]
    Article,
    /// Personal or company blog posts.
    Blog,
    /// Reference documentation.
    Documentation,
    /// Step-by-step instructional content.
    Tutorial,
    /// News coverage.
    News,
    /// Forum and Q&A threads.
    Forum,
    /// Academic papers and preprints.
    Academic,
    /// Anything that fits no other bucket.
    General,
}

impl ContentType {
    /// Returns the wire representation of the content type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Blog => "blog",
            Self::Documentation => "documentation",
            Self::Tutorial => "tutorial",
            Self::News => "news",
            Self::Forum => "forum",
            Self::Academic => "academic",
            Self::General => "general",
        }
    }

    /// Minimum words a chunk of this content type must carry to be indexed.
    ///
    /// Editorial and instructional content is held to a higher bar than
    /// forum threads or short news items.
    #[must_use]
    pub const fn min_chunk_words(self) -> usize {
        match self {
            Self::Article | Self::Blog | Self::Documentation | Self::Tutorial => 50,
            Self::News | Self::Forum | Self::Academic | Self::General => 30,
        }
    }
}

/// A record on the pipeline-to-indexer wire: one JSON line per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueRecord {
    /// A document metadata record.
    Document(Document),
    /// An indexable chunk record.
    Chunk(DocumentChunk),
}

impl QueueRecord {
    /// Returns the identity the record is stored under.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Document(doc) => &doc.document_id,
            Self::Chunk(chunk) => &chunk.chunk_id,
        }
    }
}

/// A raw crawled record as produced by the external crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Absolute HTTP(S) URL of the page.
    #[serde(default)]
    pub url: String,
    /// Full raw HTML string.
    #[serde(default)]
    pub content: String,
    /// Crawler-supplied title, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Crawler-supplied domain, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Crawl timestamp, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl RawRecord {
    /// Checks the record's URL invariant: absolute HTTP(S) and length > 10.
    #[must_use]
    pub fn has_valid_url(&self) -> bool {
        self.url.len() > 10
            && (self.url.starts_with("http://") || self.url.starts_with("https://"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_document_id_deterministic() {
        let a = document_id("https://example.com/post");
        let b = document_id("https://example.com/post");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_document_id_distinct_urls() {
        let a = document_id("https://example.com/post");
        let b = document_id("https://example.com/other");
        assert_ne!(a, b);
    }

    #[test]
    fn test_chunk_id_varies_by_index() {
        let doc = document_id("https://example.com/post");
        let first = chunk_id(&doc, 0);
        let second = chunk_id(&doc, 1);
        assert_ne!(first, second);
        assert_eq!(first, chunk_id(&doc, 0));
    }

    #[test_case("article", ContentType::Article)]
    #[test_case("documentation", ContentType::Documentation)]
    #[test_case("general", ContentType::General)]
    fn test_content_type_round_trip(name: &str, expected: ContentType) {
        let json = format!("\"{name}\"");
        let parsed: ContentType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.as_str(), name);
    }

    #[test]
    fn test_min_chunk_words_by_type() {
        assert_eq!(ContentType::Article.min_chunk_words(), 50);
        assert_eq!(ContentType::Documentation.min_chunk_words(), 50);
        assert_eq!(ContentType::Forum.min_chunk_words(), 30);
        assert_eq!(ContentType::General.min_chunk_words(), 30);
    }

    #[test]
    fn test_raw_record_url_validation() {
        let record = RawRecord {
            url: "https://example.com/a".to_string(),
            content: "<html></html>".to_string(),
            title: None,
            domain: None,
            timestamp: None,
        };
        assert!(record.has_valid_url());

        let short = RawRecord {
            url: "http://a.b".to_string(),
            ..record.clone()
        };
        assert!(!short.has_valid_url());

        let relative = RawRecord {
            url: "/relative/path/only".to_string(),
            ..record
        };
        assert!(!relative.has_valid_url());
    }

    #[test]
    fn test_queue_record_tagging() {
        let chunk = DocumentChunk::new(
            &document_id("https://example.com/post"),
            0,
            "Enough words to be a chunk body.".to_string(),
            "[]".to_string(),
            0.5,
            1.0,
            vec!["general".to_string()],
            vec![],
        );
        let line = serde_json::to_string(&QueueRecord::Chunk(chunk)).unwrap();
        assert!(line.contains("\"type\":\"chunk\""));

        let parsed: QueueRecord = serde_json::from_str(&line).unwrap();
        assert!(matches!(parsed, QueueRecord::Chunk(_)));
    }
}
