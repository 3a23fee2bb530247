//! Per-document processing orchestrator.
//!
//! Validates a raw record, runs extraction, cleaning, scoring, and
//! chunking in order with early exits, and emits one document plus its
//! chunks. A processor owns no shared mutable state: every worker holds
//! its own instance, so the pipeline can run any number of them in
//! parallel.

use tracing::{debug, error};

use crate::chunking::{chunk_content, split_by_sentences, ChunkerConfig};
use crate::error::PipelineError;
use crate::extract::{Extracted, Extractor};
use crate::lang;
use crate::model::{
    document_id, Document, DocumentChunk, RawRecord, SemanticInfo, MAX_CHUNK_CHARS,
    MAX_DOCUMENT_KEYWORDS,
};
use crate::score::{self, ScoringMetadata};
use crate::text;

/// Minimum raw HTML size worth processing, in bytes.
const MIN_HTML_BYTES: usize = 500;

/// Titles matching any of these fragments are considered generic.
const GENERIC_TITLES: &[&str] = &[
    "untitled", "home", "index", "main", "welcome", "page not found", "404", "error", "loading",
];

/// Fallback title when every candidate is missing or generic.
const FALLBACK_TITLE: &str = "Untitled Document";

/// Per-worker processing counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Records seen.
    pub processed: u64,
    /// Records that produced output.
    pub successful: u64,
    /// Records rejected by validation.
    pub skipped: u64,
    /// Records rejected by the language filter.
    pub language_filtered: u64,
    /// Records rejected for insufficient content.
    pub content_too_short: u64,
    /// Records that failed during processing.
    pub failed: u64,
}

impl ProcessorStats {
    /// Folds another worker's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.processed += other.processed;
        self.successful += other.successful;
        self.skipped += other.skipped;
        self.language_filtered += other.language_filtered;
        self.content_too_short += other.content_too_short;
        self.failed += other.failed;
    }
}

/// One accepted record's output.
#[derive(Debug)]
pub struct ProcessorOutput {
    /// The document metadata record.
    pub document: Document,
    /// The document's chunks, never empty.
    pub chunks: Vec<DocumentChunk>,
}

/// Transforms raw records into documents and chunks.
#[derive(Debug)]
pub struct Processor {
    min_content_length: usize,
    chunker: ChunkerConfig,
    extractor: Extractor,
    stats: ProcessorStats,
}

impl Processor {
    /// Creates a processor with the given content and chunking settings.
    #[must_use]
    pub fn new(min_content_length: usize, chunker: ChunkerConfig) -> Self {
        Self {
            min_content_length,
            chunker,
            extractor: Extractor::new(),
            stats: ProcessorStats::default(),
        }
    }

    /// Returns this worker's counters.
    #[must_use]
    pub const fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    /// Processes one raw record.
    ///
    /// Returns `None` when the record is rejected or fails; the reason is
    /// recorded in the stats counters and a failed record never affects
    /// any other record in the batch.
    pub fn process(&mut self, record: &RawRecord) -> Option<ProcessorOutput> {
        self.stats.processed += 1;

        match self.process_inner(record) {
            Ok(output) => {
                self.stats.successful += 1;
                Some(output)
            }
            Err(err) => {
                match &err {
                    PipelineError::InvalidRecord { reason } => {
                        debug!(url = %record.url, reason, "skipping record");
                        self.stats.skipped += 1;
                    }
                    PipelineError::NonEnglish { url } => {
                        debug!(%url, "skipping non-English record");
                        self.stats.language_filtered += 1;
                    }
                    PipelineError::ContentTooShort { .. } | PipelineError::NoChunks { .. } => {
                        debug!(url = %record.url, %err, "skipping thin record");
                        self.stats.content_too_short += 1;
                    }
                    _ => {
                        error!(url = %record.url, %err, "processing failed");
                        self.stats.failed += 1;
                    }
                }
                None
            }
        }
    }

    fn process_inner(&self, record: &RawRecord) -> Result<ProcessorOutput, PipelineError> {
        // Step 1: basic validation.
        if !record.has_valid_url() {
            return Err(PipelineError::InvalidRecord {
                reason: "missing or invalid URL".to_string(),
            });
        }
        if record.content.is_empty() {
            return Err(PipelineError::InvalidRecord {
                reason: "empty content".to_string(),
            });
        }
        if record.content.len() < MIN_HTML_BYTES {
            return Err(PipelineError::ContentTooShort {
                length: record.content.len(),
                minimum: MIN_HTML_BYTES,
            });
        }

        // Step 2: language filter, before any parsing work.
        if !lang::is_english(&record.content, &record.url) {
            return Err(PipelineError::NonEnglish {
                url: record.url.clone(),
            });
        }

        // Steps 3-4: one parse, one traversal, both extraction paths.
        let extracted = self.extractor.extract(&record.content, &record.url);

        // Step 5: content floor.
        if extracted.main_content.len() < self.min_content_length {
            return Err(PipelineError::ContentTooShort {
                length: extracted.main_content.len(),
                minimum: self.min_content_length,
            });
        }

        // Step 7: clean.
        let cleaned = text::clean_text(&extracted.main_content);
        if cleaned.is_empty() {
            return Err(PipelineError::ContentTooShort {
                length: 0,
                minimum: self.min_content_length,
            });
        }

        // Steps 6, 8: title and description consolidation.
        let title = consolidate_title(&extracted, record.title.as_deref());
        let description = extracted
            .description
            .clone()
            .unwrap_or_else(|| text::create_description(&cleaned, 300));

        // Step 9: keyword merge, author-declared first. Generated keywords
        // combine frequency ranking, named entities, and topic hits.
        let mut generated = text::extract_keywords(&cleaned, 20);
        for entity in text::entity_keywords(&cleaned, 5) {
            if !generated.iter().any(|k| k.eq_ignore_ascii_case(&entity)) {
                generated.push(entity);
            }
        }
        for topic in text::topic_keywords(&cleaned) {
            if !generated.contains(&topic) {
                generated.push(topic);
            }
        }
        let keywords = text::combine_keywords(
            &extracted.author_keywords,
            &generated,
            MAX_DOCUMENT_KEYWORDS,
        );

        // Step 10: scores and labels.
        let categories = derive_categories(&extracted, &cleaned, &title);
        let domain_score = score::domain_score(&record.url);
        let quality = score::quality_score(
            &cleaned,
            &ScoringMetadata {
                title: title.clone(),
                description: description.clone(),
                has_author: extracted.author.is_some(),
                has_date: extracted.published_date.is_some(),
            },
            &extracted.metrics,
        );

        // Step 11: the document record.
        let doc_id = document_id(&record.url);
        let domain = record
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| host_of(&record.url))
            .unwrap_or_else(|| "unknown".to_string());

        let document = Document {
            document_id: doc_id.clone(),
            url: record.url.clone(),
            canonical_url: extracted.canonical_url.clone(),
            domain,
            title,
            description,
            content_type: extracted.content_type,
            categories: categories.clone(),
            keywords: keywords.clone(),
            published_date: extracted.published_date.clone(),
            modified_date: extracted.modified_date.clone(),
            author_info: extracted.author.clone(),
            images: extracted.images.clone(),
            table_of_contents: extracted.table_of_contents.clone(),
            semantic_info: Some(semantic_info(&extracted, &cleaned)),
            structured_data: extracted.structured_data.clone(),
            icons: extracted.icons.clone(),
            word_count: extracted.metrics.word_count,
        };

        // Steps 12-13: chunk, filter, emit.
        let chunks = self.build_chunks(
            &document,
            &record.content,
            &cleaned,
            &extracted,
            domain_score,
            quality,
            &keywords,
        );
        if chunks.is_empty() {
            return Err(PipelineError::NoChunks {
                url: record.url.clone(),
            });
        }

        Ok(ProcessorOutput { document, chunks })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_chunks(
        &self,
        document: &Document,
        raw_html: &str,
        cleaned: &str,
        extracted: &Extracted,
        domain_score: f32,
        quality_score: f32,
        doc_keywords: &[String],
    ) -> Vec<DocumentChunk> {
        let min_words = extracted.content_type.min_chunk_words();
        let headings = text::format_headings_for_index(&extracted.headings);
        let top_doc_keywords: Vec<String> = doc_keywords.iter().take(5).cloned().collect();

        let mut texts: Vec<String> = Vec::new();
        for chunk in chunk_content(cleaned, Some(raw_html), &self.chunker) {
            if chunk.len() > MAX_CHUNK_CHARS {
                texts.extend(split_by_sentences(&chunk, MAX_CHUNK_CHARS));
            } else {
                texts.push(chunk);
            }
        }

        texts
            .into_iter()
            .filter(|text| {
                text.split_whitespace().count() >= min_words && text.len() <= MAX_CHUNK_CHARS
            })
            .enumerate()
            .map(|(index, text)| {
                let chunk_keywords =
                    text::combine_keywords(&text::extract_keywords(&text, 8), &top_doc_keywords, 10);
                DocumentChunk::for_document(
                    document,
                    index,
                    text,
                    headings.clone(),
                    domain_score,
                    // Chunks inherit the document score; re-scoring each
                    // chunk is not worth the throughput cost.
                    quality_score,
                    chunk_keywords,
                )
            })
            .collect()
    }
}

/// Title priority: OpenGraph / JSON-LD / page title (already consolidated
/// by the extractor), then the crawler-supplied title, skipping generic
/// candidates.
fn consolidate_title(extracted: &Extracted, crawler_title: Option<&str>) -> String {
    let candidates = [extracted.title.as_deref(), crawler_title];
    for candidate in candidates.into_iter().flatten() {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !is_generic_title(candidate) {
            return candidate.to_string();
        }
    }
    FALLBACK_TITLE.to_string()
}

fn is_generic_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    GENERIC_TITLES.iter().any(|generic| lower.contains(generic))
}

fn derive_categories(extracted: &Extracted, cleaned: &str, title: &str) -> Vec<String> {
    let mut categories = score::content_categories(cleaned, title);
    if extracted.is_technical && !categories.iter().any(|c| c == "technical") {
        categories.push("technical".to_string());
    }
    categories
}

#[allow(clippy::cast_precision_loss)]
fn semantic_info(extracted: &Extracted, cleaned: &str) -> SemanticInfo {
    let paragraph_count = cleaned.split("\n\n").filter(|p| !p.trim().is_empty()).count();
    SemanticInfo {
        word_count: extracted.metrics.word_count,
        sentence_count: text::sentences(&extracted.main_content).len(),
        paragraph_count: paragraph_count.max(1),
        reading_time_minutes: (extracted.metrics.word_count as f32 / 200.0).max(1.0),
        headings_count: extracted.metrics.heading_count,
        is_technical_content: extracted.is_technical,
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> Processor {
        Processor::new(400, ChunkerConfig::default())
    }

    fn record(url: &str, content: String) -> RawRecord {
        RawRecord {
            url: url.to_string(),
            content,
            title: None,
            domain: None,
            timestamp: None,
        }
    }

    fn article_html(words: usize) -> String {
        let body = "word ".repeat(words);
        format!(
            "<html><head><title>Hello</title>\
             <meta name=\"description\" content=\"A post about interesting things\"/>\
             </head><body><article><h1>Hello</h1><p>{body}</p></article></body></html>"
        )
    }

    fn prose_html(sentences: usize) -> String {
        let body: String = (0..sentences)
            .map(|i| {
                format!(
                    "Sentence number {i} explains the topic of searching \
                     documents with ranked retrieval and inverted indexes. "
                )
            })
            .collect();
        format!(
            "<html><head><title>Search Explained</title></head>\
             <body><article><h1>Search Explained</h1><p>{body}</p></article></body></html>"
        )
    }

    #[test]
    fn test_happy_path() {
        let mut processor = processor();
        let output = processor
            .process(&record("https://example.com/post", article_html(500)))
            .unwrap();

        assert_eq!(output.document.title, "Hello");
        assert_eq!(output.document.description, "A post about interesting things");
        assert_eq!(output.document.domain, "example.com");
        assert!(!output.chunks.is_empty());
        for chunk in &output.chunks {
            assert_eq!(chunk.document_id, output.document.document_id);
            assert!(chunk.word_count >= 50);
            assert!(chunk.text_chunk.len() <= MAX_CHUNK_CHARS);
        }
        assert_eq!(processor.stats().successful, 1);
    }

    #[test]
    fn test_document_id_stable_across_runs() {
        let mut a = processor();
        let mut b = processor();
        let rec = record("https://example.com/post", prose_html(60));
        let out_a = a.process(&rec).unwrap();
        let out_b = b.process(&rec).unwrap();
        assert_eq!(out_a.document.document_id, out_b.document.document_id);
        assert_eq!(out_a.document.url, out_b.document.url);
        assert_eq!(out_a.document.categories, out_b.document.categories);
    }

    #[test]
    fn test_missing_url_skipped() {
        let mut processor = processor();
        assert!(processor.process(&record("", article_html(200))).is_none());
        assert_eq!(processor.stats().skipped, 1);
    }

    #[test]
    fn test_tiny_html_rejected() {
        let mut processor = processor();
        let rec = record("https://example.com/x", "<html><body>hi</body></html>".to_string());
        assert!(processor.process(&rec).is_none());
        assert_eq!(processor.stats().content_too_short, 1);
    }

    #[test]
    fn test_language_filter() {
        let mut processor = processor();
        let html = format!(
            "<html lang=\"ja\"><body><p>{}</p></body></html>",
            "日本語 ".repeat(200)
        );
        assert!(processor.process(&record("https://ex.com/x", html)).is_none());
        assert_eq!(processor.stats().language_filtered, 1);
    }

    #[test]
    fn test_content_length_boundary() {
        // Short main content is rejected even when the raw HTML is large.
        let mut processor = Processor::new(400, ChunkerConfig::default());
        let padding = " ".repeat(600);
        let html = format!(
            "<html><head><title>Thin</title>{padding}</head><body>\
             <p>Too little visible text to matter for anyone reading this.</p>\
             </body></html>"
        );
        assert!(processor.process(&record("https://example.com/thin", html)).is_none());
        assert_eq!(processor.stats().content_too_short, 1);
    }

    #[test]
    fn test_generic_title_falls_back() {
        let mut processor = processor();
        let body = "word ".repeat(500);
        let html = format!(
            "<html><head><title>404</title></head>\
             <body><article><p>{body}</p></article></body></html>"
        );
        let mut rec = record("https://example.com/post", html);
        rec.title = Some("Crawler Title".to_string());
        let output = processor.process(&rec).unwrap();
        assert_eq!(output.document.title, "Crawler Title");
    }

    #[test]
    fn test_all_generic_titles_use_fallback() {
        let mut processor = processor();
        let body = "word ".repeat(500);
        let html = format!(
            "<html><head><title>Home</title></head>\
             <body><article><p>{body}</p></article></body></html>"
        );
        let output = processor.process(&record("https://example.com/post", html)).unwrap();
        assert_eq!(output.document.title, FALLBACK_TITLE);
    }

    #[test]
    fn test_author_keywords_lead() {
        let mut processor = processor();
        let body = "retrieval ranking retrieval ranking indexing searching \
                    documents queries relevance scoring "
            .repeat(30);
        let html = format!(
            "<html><head><title>Ranking</title>\
             <meta name=\"keywords\" content=\"Learning to Rank, BM25\"/></head>\
             <body><article><p>{body}</p></article></body></html>"
        );
        let output = processor.process(&record("https://example.com/rank", html)).unwrap();
        assert_eq!(output.document.keywords[0], "Learning to Rank");
        assert_eq!(output.document.keywords[1], "BM25");
        assert!(output.document.keywords.len() <= MAX_DOCUMENT_KEYWORDS);
    }

    #[test]
    fn test_chunks_respect_type_minimum() {
        let mut processor = processor();
        let output = processor
            .process(&record("https://example.com/post", prose_html(80)))
            .unwrap();
        let min_words = output.document.content_type.min_chunk_words();
        for chunk in &output.chunks {
            assert!(chunk.word_count >= min_words);
        }
    }

    #[test]
    fn test_stats_merge() {
        let mut total = ProcessorStats::default();
        let worker = ProcessorStats {
            processed: 10,
            successful: 7,
            skipped: 1,
            language_filtered: 1,
            content_too_short: 1,
            failed: 0,
        };
        total.merge(&worker);
        total.merge(&worker);
        assert_eq!(total.processed, 20);
        assert_eq!(total.successful, 14);
    }
}
