//! Batch quality reports.
//!
//! After a batch, the pipeline can write a human-readable quality report
//! and a machine-readable JSON summary next to the processed output, so
//! operators can inspect what a crawl produced without querying the
//! index. Reporting is best-effort: a failed write is logged, never
//! fatal.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::runner::BatchSummary;
use crate::model::{Document, DocumentChunk, QueueRecord};

/// Aggregate quality metrics over one batch's output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    /// Documents observed.
    pub documents: usize,
    /// Chunks observed.
    pub chunks: usize,
    /// Mean title length in characters.
    pub avg_title_length: f64,
    /// Mean keywords per document.
    pub avg_keywords_per_document: f64,
    /// Documents carrying at least one category label.
    pub documents_with_categories: usize,
    /// Mean chunk length in characters.
    pub avg_chunk_length: f64,
    /// Mean chunk word count.
    pub avg_chunk_word_count: f64,
    /// Mean chunk quality score.
    pub avg_quality_score: f64,
    /// Mean chunk domain score.
    pub avg_domain_score: f64,
    /// Chunks per document.
    pub chunks_per_document: f64,
    /// Distinct domains, sorted.
    pub domains: Vec<String>,
    /// Distinct content types observed, sorted.
    pub content_types: Vec<String>,
}

impl QualityReport {
    /// Builds the report from a batch's output records.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records(records: impl Iterator<Item = QueueRecord>) -> Self {
        let mut documents: Vec<Document> = Vec::new();
        let mut chunks: Vec<DocumentChunk> = Vec::new();
        for record in records {
            match record {
                QueueRecord::Document(doc) => documents.push(doc),
                QueueRecord::Chunk(chunk) => chunks.push(chunk),
            }
        }

        let doc_count = documents.len().max(1) as f64;
        let chunk_count = chunks.len().max(1) as f64;

        let domains: BTreeSet<String> = documents.iter().map(|d| d.domain.clone()).collect();
        let content_types: BTreeSet<String> = documents
            .iter()
            .map(|d| d.content_type.as_str().to_string())
            .collect();

        Self {
            documents: documents.len(),
            chunks: chunks.len(),
            avg_title_length: documents.iter().map(|d| d.title.len()).sum::<usize>() as f64
                / doc_count,
            avg_keywords_per_document: documents.iter().map(|d| d.keywords.len()).sum::<usize>()
                as f64
                / doc_count,
            documents_with_categories: documents
                .iter()
                .filter(|d| !d.categories.is_empty())
                .count(),
            avg_chunk_length: chunks.iter().map(|c| c.text_chunk.len()).sum::<usize>() as f64
                / chunk_count,
            avg_chunk_word_count: chunks.iter().map(|c| c.word_count).sum::<usize>() as f64
                / chunk_count,
            avg_quality_score: chunks.iter().map(|c| f64::from(c.quality_score)).sum::<f64>()
                / chunk_count,
            avg_domain_score: chunks.iter().map(|c| f64::from(c.domain_score)).sum::<f64>()
                / chunk_count,
            chunks_per_document: chunks.len() as f64 / doc_count,
            domains: domains.into_iter().collect(),
            content_types: content_types.into_iter().collect(),
        }
    }

    /// Renders the human-readable report text.
    #[must_use]
    pub fn render(&self, summary: &BatchSummary) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "DOCUMENT PROCESSING QUALITY REPORT");
        let _ = writeln!(out, "==================================");
        let _ = writeln!(out);
        let _ = writeln!(out, "Batch:");
        let _ = writeln!(out, "  Files processed:   {}", summary.files_processed);
        let _ = writeln!(out, "  Output files:      {}", summary.output_files.len());
        let _ = writeln!(out, "  Documents:         {}", self.documents);
        let _ = writeln!(out, "  Chunks:            {}", self.chunks);
        let _ = writeln!(out, "  Docs/sec:          {:.1}", summary.docs_per_sec());
        let _ = writeln!(out, "  Language filtered: {}", summary.stats.language_filtered);
        let _ = writeln!(out, "  Too short:         {}", summary.stats.content_too_short);
        let _ = writeln!(out, "  Failed:            {}", summary.stats.failed);
        let _ = writeln!(out);
        let _ = writeln!(out, "Document quality:");
        let _ = writeln!(out, "  Avg title length:  {:.1} chars", self.avg_title_length);
        let _ = writeln!(out, "  Avg keywords/doc:  {:.1}", self.avg_keywords_per_document);
        let _ = writeln!(out, "  With categories:   {}", self.documents_with_categories);
        let _ = writeln!(out, "  Content types:     {}", self.content_types.join(", "));
        let _ = writeln!(out);
        let _ = writeln!(out, "Chunk quality:");
        let _ = writeln!(out, "  Avg length:        {:.0} chars", self.avg_chunk_length);
        let _ = writeln!(out, "  Avg word count:    {:.0}", self.avg_chunk_word_count);
        let _ = writeln!(out, "  Avg quality score: {:.2}", self.avg_quality_score);
        let _ = writeln!(out, "  Avg domain score:  {:.2}", self.avg_domain_score);
        let _ = writeln!(out, "  Chunks/document:   {:.1}", self.chunks_per_document);
        let _ = writeln!(out);
        let _ = writeln!(out, "Domains ({}):", self.domains.len());
        for domain in &self.domains {
            let _ = writeln!(out, "  - {domain}");
        }
        out
    }
}

/// Writes the text report and JSON summary for a finished batch.
///
/// Reads the batch's own output files back; returns the report paths.
pub fn write_batch_report(summary: &BatchSummary, report_dir: &Path) -> Option<(PathBuf, PathBuf)> {
    if summary.output_files.is_empty() {
        return None;
    }
    if let Err(err) = std::fs::create_dir_all(report_dir) {
        warn!(dir = %report_dir.display(), %err, "cannot create report directory");
        return None;
    }

    let records = summary.output_files.iter().flat_map(|path| {
        std::fs::read_to_string(path)
            .map(|contents| {
                contents
                    .lines()
                    .filter_map(|line| serde_json::from_str::<QueueRecord>(line).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    });
    let report = QualityReport::from_records(records);

    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let text_path = report_dir.join(format!("quality_report_{stamp}.txt"));
    let json_path = report_dir.join(format!("quality_report_{stamp}.json"));

    let rendered = report.render(summary);
    if let Err(err) = std::fs::File::create(&text_path)
        .and_then(|mut file| file.write_all(rendered.as_bytes()))
    {
        warn!(path = %text_path.display(), %err, "failed to write quality report");
        return None;
    }

    let payload = json!({
        "report": report,
        "batch": {
            "files_processed": summary.files_processed,
            "documents": summary.documents,
            "chunks": summary.chunks,
            "malformed_records": summary.malformed_records,
            "elapsed_secs": summary.elapsed.as_secs_f64(),
        },
    });
    if let Err(err) = std::fs::write(
        &json_path,
        serde_json::to_string_pretty(&payload).unwrap_or_default(),
    ) {
        warn!(path = %json_path.display(), %err, "failed to write report JSON");
        return None;
    }

    info!(
        text = %text_path.display(),
        json = %json_path.display(),
        "quality report written"
    );
    Some((text_path, json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document_id;
    use crate::pipeline::ProcessorStats;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_document(url: &str, title: &str) -> Document {
        Document {
            document_id: document_id(url),
            url: url.to_string(),
            domain: url.split('/').nth(2).unwrap_or("unknown").to_string(),
            title: title.to_string(),
            description: "d".to_string(),
            keywords: vec!["one".to_string(), "two".to_string()],
            categories: vec!["general".to_string()],
            ..Document::default()
        }
    }

    fn sample_chunk(url: &str, index: usize) -> DocumentChunk {
        DocumentChunk::new(
            &document_id(url),
            index,
            "word ".repeat(80).trim().to_string(),
            "[]".to_string(),
            0.5,
            1.2,
            vec!["general".to_string()],
            vec![],
        )
    }

    fn records() -> Vec<QueueRecord> {
        vec![
            QueueRecord::Document(sample_document("https://a.com/1", "First")),
            QueueRecord::Chunk(sample_chunk("https://a.com/1", 0)),
            QueueRecord::Chunk(sample_chunk("https://a.com/1", 1)),
            QueueRecord::Document(sample_document("https://b.com/2", "Second Title")),
            QueueRecord::Chunk(sample_chunk("https://b.com/2", 0)),
        ]
    }

    fn summary(output_files: Vec<PathBuf>) -> BatchSummary {
        BatchSummary {
            files_processed: 1,
            output_files,
            documents: 2,
            chunks: 3,
            stats: ProcessorStats::default(),
            malformed_records: 0,
            elapsed: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_report_aggregates() {
        let report = QualityReport::from_records(records().into_iter());
        assert_eq!(report.documents, 2);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.domains, vec!["a.com".to_string(), "b.com".to_string()]);
        assert!((report.chunks_per_document - 1.5).abs() < f64::EPSILON);
        assert!((report.avg_quality_score - 1.2).abs() < 0.001);
        assert_eq!(report.documents_with_categories, 2);
        assert!(report.avg_chunk_word_count > 70.0);
    }

    #[test]
    fn test_report_render_contains_sections() {
        let report = QualityReport::from_records(records().into_iter());
        let rendered = report.render(&summary(vec![]));
        assert!(rendered.contains("QUALITY REPORT"));
        assert!(rendered.contains("Chunk quality:"));
        assert!(rendered.contains("- a.com"));
    }

    #[test]
    fn test_report_empty_batch() {
        let report = QualityReport::from_records(std::iter::empty());
        assert_eq!(report.documents, 0);
        assert_eq!(report.chunks, 0);
        assert!(report.domains.is_empty());
    }

    #[test]
    fn test_write_batch_report_files() {
        let out = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();

        // Write one output file the report reads back.
        let output = out.path().join("batch_part_000.jsonl");
        let lines: String = records()
            .iter()
            .map(|r| format!("{}\n", serde_json::to_string(r).unwrap()))
            .collect();
        std::fs::write(&output, lines).unwrap();

        let (text_path, json_path) =
            write_batch_report(&summary(vec![output]), reports.path()).unwrap();
        let text = std::fs::read_to_string(text_path).unwrap();
        assert!(text.contains("Documents:         2"));

        let payload: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(payload["report"]["documents"], 2);
        assert_eq!(payload["batch"]["files_processed"], 1);
    }

    #[test]
    fn test_write_batch_report_skips_empty() {
        let reports = TempDir::new().unwrap();
        assert!(write_batch_report(&summary(vec![]), reports.path()).is_none());
    }
}
