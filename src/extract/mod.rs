//! HTML extraction: parse once, traverse once.
//!
//! [`Extractor::extract`] parses the page a single time, fills a
//! [`facts::RawFacts`] record in one traversal, and derives everything else
//! (title, dates, author, TOC, images, main content) through pure functions
//! over that record. Failures surface as empty values; nothing in this
//! module panics across its boundary.

pub mod content;
pub mod dates;
pub mod facts;
pub mod meta;
pub mod toc;

pub use facts::RawFacts;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use crate::model::{AuthorInfo, ContentType, IconSet, ImageInfo, TocEntry};
use crate::score::ContentMetrics;
use crate::text::{sentences, static_regex};

/// Distinct technical keyword hits needed to flag a page as technical.
const TECHNICAL_HIT_THRESHOLD: usize = 4;

/// Keywords whose presence marks technical content.
const TECH_KEYWORDS: &[&str] = &[
    "api", "function", "class", "method", "algorithm", "compiler", "database", "server",
    "framework", "library", "protocol", "kernel", "runtime", "repository", "deployment",
    "container", "encryption", "middleware", "debugging", "refactoring",
];

static TECH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    static_regex(&format!(r"(?i)\b(?:{})\b", TECH_KEYWORDS.join("|")))
});

/// Everything the extractor derives from one page.
#[derive(Debug, Default)]
pub struct Extracted {
    /// Consolidated title (OpenGraph, JSON-LD, `<title>`).
    pub title: Option<String>,
    /// Best metadata description, when one qualifies.
    pub description: Option<String>,
    /// Main textual content; at least fifty characters or empty.
    pub main_content: String,
    /// Canonical URL resolved against the page URL.
    pub canonical_url: Option<String>,
    /// Headings h1-h6 in document order.
    pub headings: Vec<TocEntry>,
    /// Table of contents.
    pub table_of_contents: Vec<TocEntry>,
    /// Top images with resolved URLs.
    pub images: Vec<ImageInfo>,
    /// Icon links.
    pub icons: Option<IconSet>,
    /// Author details.
    pub author: Option<AuthorInfo>,
    /// RFC-3339 publication date.
    pub published_date: Option<String>,
    /// RFC-3339 modification date.
    pub modified_date: Option<String>,
    /// Raw JSON-LD blocks.
    pub structured_data: Vec<Value>,
    /// Author-declared keywords from the keywords meta tag.
    pub author_keywords: Vec<String>,
    /// Content classification.
    pub content_type: ContentType,
    /// Content-shape metrics for scoring.
    pub metrics: ContentMetrics,
    /// Whether the page reads as technical content.
    pub is_technical: bool,
}

/// Single-pass HTML extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    /// Creates an extractor. Static pattern tables are shared per process.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extracts all facts and derived fields from a raw HTML page.
    ///
    /// Never panics: parse problems degrade to empty fields, and malformed
    /// structured data is skipped.
    #[must_use]
    pub fn extract(&self, html: &str, url: &str) -> Extracted {
        let document = Html::parse_document(html);
        let facts = facts::collect_facts(&document);
        let main_content = content::extract_main_content(&document);

        let metrics = build_metrics(&facts, &main_content);
        let (published_date, modified_date) = dates::derive_dates(&facts);
        let is_technical = is_technical_content(&main_content, &facts.headings);

        Extracted {
            title: meta::derive_title(&facts),
            description: meta::derive_description(&facts),
            canonical_url: meta::derive_canonical_url(&facts, url),
            table_of_contents: toc::derive_toc(&facts),
            images: meta::derive_images(&facts, url),
            icons: meta::derive_icons(&facts, url),
            author: meta::derive_author(&facts),
            author_keywords: meta::derive_author_keywords(&facts),
            content_type: meta::derive_content_type(&facts, url),
            structured_data: facts.json_ld.clone(),
            headings: facts.headings,
            published_date,
            modified_date,
            metrics,
            is_technical,
            main_content,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_metrics(facts: &RawFacts, main_content: &str) -> ContentMetrics {
    let word_count = main_content.split_whitespace().count();
    let sentence_count = sentences(main_content).len();
    let avg_sentence_length = if sentence_count == 0 {
        0.0
    } else {
        word_count as f32 / sentence_count as f32
    };

    ContentMetrics {
        word_count,
        avg_sentence_length,
        heading_count: facts.headings.len(),
        has_code_blocks: facts.has_code_blocks,
        has_lists: facts.has_lists,
        has_tables: facts.has_tables,
        has_semantic_tags: facts.has_semantic_tags,
    }
}

/// Classifies content as technical by distinct keyword hits over the
/// content and headings.
fn is_technical_content(main_content: &str, headings: &[TocEntry]) -> bool {
    let heading_text: String = headings
        .iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let mut distinct: std::collections::HashSet<String> = std::collections::HashSet::new();
    for haystack in [main_content, heading_text.as_str()] {
        for hit in TECH_PATTERN.find_iter(haystack) {
            distinct.insert(hit.as_str().to_lowercase());
        }
    }
    distinct.len() >= TECHNICAL_HIT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY_PARA: &str = "This body paragraph describes the subject matter of \
                             the page in enough words to clear the extraction \
                             minimums that apply to the main content path.";

    fn page(head_extra: &str, body: &str) -> String {
        format!(
            "<html><head><title>Sample Page</title>{head_extra}</head>\
             <body>{body}</body></html>"
        )
    }

    #[test]
    fn test_extract_happy_path() {
        let html = page(
            r#"<meta name="description" content="A sample description of the page."/>
               <meta name="keywords" content="rust, indexing"/>
               <link rel="canonical" href="/post"/>"#,
            &format!(
                "<article><h1>Sample Page</h1><p>{BODY_PARA}</p><p>{BODY_PARA}</p></article>"
            ),
        );
        let extracted = Extractor::new().extract(&html, "https://example.com/post?utm=1");

        assert_eq!(extracted.title.as_deref(), Some("Sample Page"));
        assert_eq!(
            extracted.description.as_deref(),
            Some("A sample description of the page.")
        );
        assert_eq!(
            extracted.canonical_url.as_deref(),
            Some("https://example.com/post")
        );
        assert_eq!(extracted.author_keywords, vec!["rust", "indexing"]);
        assert!(extracted.main_content.len() >= 200);
        assert_eq!(extracted.headings.len(), 1);
        assert!(extracted.metrics.word_count > 40);
        assert!(extracted.metrics.has_semantic_tags);
    }

    #[test]
    fn test_extract_unparseable_input_degrades() {
        let extracted = Extractor::new().extract("<<<<not html at all", "https://example.com/x");
        assert!(extracted.main_content.is_empty());
        assert!(extracted.title.is_none());
        assert!(extracted.structured_data.is_empty());
    }

    #[test]
    fn test_extract_malformed_json_ld_tolerated() {
        let html = page(
            r#"<script type="application/ld+json">{"broken": </script>"#,
            &format!("<p>{BODY_PARA}</p><p>{BODY_PARA}</p>"),
        );
        let extracted = Extractor::new().extract(&html, "https://example.com/x");
        assert!(extracted.structured_data.is_empty());
        assert!(!extracted.main_content.is_empty());
    }

    #[test]
    fn test_technical_classification() {
        let technical = format!(
            "<h2>API reference</h2><p>The function takes a class instance and \
             the algorithm updates the database through the framework layer. \
             {BODY_PARA}</p>"
        );
        let extracted =
            Extractor::new().extract(&page("", &technical), "https://example.com/docs/api");
        assert!(extracted.is_technical);
        assert_eq!(extracted.content_type, ContentType::Documentation);

        let plain = format!("<p>{BODY_PARA}</p><p>{BODY_PARA}</p>");
        let extracted = Extractor::new().extract(&page("", &plain), "https://example.com/essay");
        assert!(!extracted.is_technical);
    }

    #[test]
    fn test_metrics_sentence_stats() {
        let body = "<p>One short sentence here. Another short sentence follows it. \
                    And a third one completes the tiny paragraph nicely for us all.</p>";
        let extracted = Extractor::new().extract(&page("", body), "https://example.com/x");
        // Content may be empty (short page) but metrics still reflect it.
        if !extracted.main_content.is_empty() {
            assert!(extracted.metrics.avg_sentence_length > 0.0);
        }
    }

    #[test]
    fn test_dates_flow_through() {
        let html = page(
            r#"<meta property="article:published_time" content="2025-02-03T12:00:00Z"/>"#,
            &format!("<p>{BODY_PARA}</p>"),
        );
        let extracted = Extractor::new().extract(&html, "https://example.com/x");
        assert!(extracted.published_date.unwrap().starts_with("2025-02-03"));
    }
}
