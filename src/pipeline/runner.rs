//! Pipeline orchestration: discovery, worker pool, bounded output files.
//!
//! Raw files are distributed over a rayon pool; every worker runs its own
//! [`Processor`] so there is no shared mutable state. Results stream back
//! to a single writer that flushes one JSONL output file per
//! `max_items_per_file` records into the indexer's fresh directory.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::processor::{Processor, ProcessorStats};
use super::reader::{discover_input_files, ReaderStats, RecordReader};
use crate::chunking::ChunkerConfig;
use crate::config::PipelineConfig;
use crate::error::{Error, IoError, Result};
use crate::model::QueueRecord;

/// One worker's output for one input file.
struct FileOutput {
    records: Vec<QueueRecord>,
    stats: ProcessorStats,
    reader: ReaderStats,
}

/// Summary of one batch run.
#[derive(Debug)]
pub struct BatchSummary {
    /// Input files consumed.
    pub files_processed: usize,
    /// Output files written to the indexer queue.
    pub output_files: Vec<PathBuf>,
    /// Documents emitted.
    pub documents: usize,
    /// Chunks emitted.
    pub chunks: usize,
    /// Aggregated processing counters.
    pub stats: ProcessorStats,
    /// Malformed input entries across all files.
    pub malformed_records: usize,
    /// Wall-clock duration of the batch.
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Documents per second over the batch.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn docs_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64().max(0.001);
        self.documents as f64 / secs
    }
}

/// Runs the document-processing pipeline.
pub struct PipelineRunner {
    config: PipelineConfig,
    shutdown: Arc<AtomicBool>,
}

impl PipelineRunner {
    /// Creates a runner observing the shared shutdown flag.
    #[must_use]
    pub const fn new(config: PipelineConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self { config, shutdown }
    }

    /// Processes every input file currently present, once.
    pub fn run_once(&self) -> Result<BatchSummary> {
        let files = discover_input_files(&self.config.raw_data_dir)?;
        if files.is_empty() {
            info!(dir = %self.config.raw_data_dir.display(), "no input files found");
        }
        self.run_files(&files)
    }

    /// Re-scans the raw directory on an interval until shutdown.
    pub fn run_continuous(&self) -> Result<()> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        info!(
            interval_secs = self.config.check_interval.as_secs(),
            "pipeline entering continuous mode"
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            let files = discover_input_files(&self.config.raw_data_dir)?;
            let new_files: Vec<PathBuf> = files
                .into_iter()
                .filter(|f| !seen.contains(f))
                .collect();

            if new_files.is_empty() {
                info!("no new files, waiting");
            } else {
                let summary = self.run_files(&new_files)?;
                log_summary(&summary);
                seen.extend(new_files);
            }

            self.interruptible_sleep(self.config.check_interval);
        }

        info!("pipeline continuous mode stopped");
        Ok(())
    }

    /// Processes the given files through the worker pool.
    pub fn run_files(&self, files: &[PathBuf]) -> Result<BatchSummary> {
        let started = Instant::now();
        std::fs::create_dir_all(&self.config.output_dir).map_err(|e| IoError::DirectoryFailed {
            path: self.config.output_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build worker pool: {e}"),
            })?;

        let (tx, rx) = mpsc::channel::<FileOutput>();
        let writer_dir = self.config.output_dir.clone();
        let max_items = self.config.max_items_per_file;

        // Single writer drains results while workers are still running.
        let writer = std::thread::spawn(move || -> Result<WriterSummary> {
            let mut output = OutputWriter::new(writer_dir, max_items);
            let mut stats = ProcessorStats::default();
            let mut malformed = 0usize;

            for file_output in rx {
                stats.merge(&file_output.stats);
                malformed += file_output.reader.malformed;
                for record in file_output.records {
                    output.push(record)?;
                }
            }

            let (output_files, documents, chunks) = output.finish()?;
            Ok(WriterSummary {
                output_files,
                documents,
                chunks,
                stats,
                malformed,
            })
        });

        let min_content_length = self.config.min_content_length;
        let chunker = ChunkerConfig::with_sizes(
            self.config.max_chunk_size,
            self.config.min_chunk_size,
        );
        let shutdown = Arc::clone(&self.shutdown);

        pool.install(|| {
            use rayon::prelude::*;
            files.par_iter().for_each_with(tx, |tx, path| {
                let output = process_file(path, min_content_length, &chunker, &shutdown);
                // Receiver outlives the pool; a send failure means the
                // writer already stopped, which only happens on error.
                let _ = tx.send(output);
            });
        });

        let writer_summary = writer.join().map_err(|_| Error::Config {
            message: "output writer thread panicked".to_string(),
        })??;

        let summary = BatchSummary {
            files_processed: files.len(),
            output_files: writer_summary.output_files,
            documents: writer_summary.documents,
            chunks: writer_summary.chunks,
            stats: writer_summary.stats,
            malformed_records: writer_summary.malformed,
            elapsed: started.elapsed(),
        };

        if let Some(report_dir) = &self.config.report_dir {
            let _ = super::report::write_batch_report(&summary, report_dir);
        }

        Ok(summary)
    }

    /// Sleeps in small slices so shutdown is honored promptly.
    fn interruptible_sleep(&self, total: Duration) {
        let slice = Duration::from_millis(250);
        let mut remaining = total;
        while !self.shutdown.load(Ordering::Relaxed) && remaining > Duration::ZERO {
            let nap = slice.min(remaining);
            std::thread::sleep(nap);
            remaining = remaining.saturating_sub(nap);
        }
    }
}

struct WriterSummary {
    output_files: Vec<PathBuf>,
    documents: usize,
    chunks: usize,
    stats: ProcessorStats,
    malformed: usize,
}

fn process_file(
    path: &Path,
    min_content_length: usize,
    chunker: &ChunkerConfig,
    shutdown: &AtomicBool,
) -> FileOutput {
    let mut processor = Processor::new(min_content_length, chunker.clone());
    let mut records: Vec<QueueRecord> = Vec::new();

    let reader = match RecordReader::open(path) {
        Ok(reader) => reader,
        Err(err) => {
            error!(path = %path.display(), %err, "failed to open input file");
            return FileOutput {
                records,
                stats: ProcessorStats::default(),
                reader: ReaderStats::default(),
            };
        }
    };

    let reader_stats = reader.read_records(|raw| {
        // Drain the file but stop spending CPU once shutdown is requested.
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        if let Some(output) = processor.process(&raw) {
            records.push(QueueRecord::Document(output.document));
            records.extend(output.chunks.into_iter().map(QueueRecord::Chunk));
        }
    });

    info!(
        path = %path.display(),
        records = reader_stats.records,
        emitted = records.len(),
        "file processed"
    );

    FileOutput {
        records,
        stats: processor.stats().clone(),
        reader: reader_stats,
    }
}

/// Logs a finished batch at info level.
pub fn log_summary(summary: &BatchSummary) {
    info!(
        files = summary.files_processed,
        output_files = summary.output_files.len(),
        documents = summary.documents,
        chunks = summary.chunks,
        failed = summary.stats.failed,
        language_filtered = summary.stats.language_filtered,
        malformed = summary.malformed_records,
        docs_per_sec = format!("{:.1}", summary.docs_per_sec()),
        elapsed_secs = format!("{:.1}", summary.elapsed.as_secs_f64()),
        "batch complete"
    );
}

/// Bounded JSONL output writer for the indexer queue.
struct OutputWriter {
    dir: PathBuf,
    batch: String,
    max_items: usize,
    part: usize,
    buffer: Vec<QueueRecord>,
    written: Vec<PathBuf>,
    documents: usize,
    chunks: usize,
}

impl OutputWriter {
    fn new(dir: PathBuf, max_items: usize) -> Self {
        Self {
            dir,
            batch: chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string(),
            max_items: max_items.max(1),
            part: 0,
            buffer: Vec::new(),
            written: Vec::new(),
            documents: 0,
            chunks: 0,
        }
    }

    fn push(&mut self, record: QueueRecord) -> Result<()> {
        match &record {
            QueueRecord::Document(_) => self.documents += 1,
            QueueRecord::Chunk(_) => self.chunks += 1,
        }
        self.buffer.push(record);
        if self.buffer.len() >= self.max_items {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let name = format!("{}_part_{:03}.jsonl", self.batch, self.part);
        let path = self.dir.join(&name);
        let file = std::fs::File::create(&path).map_err(|e| IoError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut writer = std::io::BufWriter::new(file);

        for record in self.buffer.drain(..) {
            let line = serde_json::to_string(&record).map_err(|e| IoError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            writeln!(writer, "{line}").map_err(|e| IoError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        writer.flush().map_err(|e| IoError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.part += 1;
        self.written.push(path);
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<PathBuf>, usize, usize)> {
        self.flush()?;
        Ok((self.written, self.documents, self.chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{document_id, Document, DocumentChunk};
    use std::io::Write as _;
    use tempfile::TempDir;

    fn sample_record(i: usize) -> QueueRecord {
        QueueRecord::Chunk(DocumentChunk::new(
            &document_id(&format!("https://example.com/{i}")),
            0,
            format!("chunk body {i}"),
            "[]".to_string(),
            0.5,
            1.0,
            vec![],
            vec![],
        ))
    }

    #[test]
    fn test_output_writer_bounds_files() {
        let dir = TempDir::new().unwrap();
        let mut writer = OutputWriter::new(dir.path().to_path_buf(), 3);
        for i in 0..7 {
            writer.push(sample_record(i)).unwrap();
        }
        let (files, documents, chunks) = writer.finish().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(documents, 0);
        assert_eq!(chunks, 7);

        // Each file holds at most three JSON lines, named by part.
        let first = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(first.lines().count(), 3);
        assert!(files[0].file_name().unwrap().to_str().unwrap().contains("_part_000"));
        assert!(files[2].file_name().unwrap().to_str().unwrap().contains("_part_002"));
    }

    #[test]
    fn test_output_writer_lines_are_tagged() {
        let dir = TempDir::new().unwrap();
        let mut writer = OutputWriter::new(dir.path().to_path_buf(), 10);
        writer
            .push(QueueRecord::Document(Document {
                document_id: "d1".to_string(),
                url: "https://example.com/".to_string(),
                domain: "example.com".to_string(),
                title: "T".to_string(),
                description: "D".to_string(),
                ..Document::default()
            }))
            .unwrap();
        writer.push(sample_record(1)).unwrap();
        let (files, documents, chunks) = writer.finish().unwrap();
        assert_eq!(documents, 1);
        assert_eq!(chunks, 1);

        let contents = std::fs::read_to_string(&files[0]).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().contains("\"type\":\"document\""));
        assert!(lines.next().unwrap().contains("\"type\":\"chunk\""));
    }

    #[test]
    fn test_empty_raw_dir_clean_run() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let config = PipelineConfig {
            raw_data_dir: raw.path().to_path_buf(),
            output_dir: out.path().to_path_buf(),
            max_workers: 2,
            ..PipelineConfig::default()
        };
        let runner = PipelineRunner::new(config, Arc::new(AtomicBool::new(false)));
        let summary = runner.run_once().unwrap();
        assert_eq!(summary.files_processed, 0);
        assert_eq!(summary.documents, 0);
        assert_eq!(summary.stats.failed, 0);
        assert!(summary.output_files.is_empty());
    }

    #[test]
    fn test_end_to_end_batch() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let body = "word ".repeat(600);
        let html = format!(
            "<html><head><title>Hello</title>\
             <meta name=\"description\" content=\"A post\"/></head>\
             <body><article><h1>Hello</h1><p>{body}</p></article></body></html>"
        );
        let record = serde_json::json!({
            "url": "https://example.com/post",
            "content": html,
        });
        let mut file = std::fs::File::create(raw.path().join("input.jsonl")).unwrap();
        writeln!(file, "{record}").unwrap();

        let config = PipelineConfig {
            raw_data_dir: raw.path().to_path_buf(),
            output_dir: out.path().to_path_buf(),
            max_workers: 2,
            ..PipelineConfig::default()
        };
        let runner = PipelineRunner::new(config, Arc::new(AtomicBool::new(false)));
        let summary = runner.run_once().unwrap();

        assert_eq!(summary.documents, 1);
        assert!(summary.chunks >= 1);
        assert_eq!(summary.stats.successful, 1);
        assert_eq!(summary.output_files.len(), 1);

        let contents = std::fs::read_to_string(&summary.output_files[0]).unwrap();
        assert!(contents.lines().next().unwrap().contains("\"type\":\"document\""));
    }

    #[test]
    fn test_shutdown_prevents_processing() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let mut file = std::fs::File::create(raw.path().join("input.jsonl")).unwrap();
        writeln!(
            file,
            "{}",
            serde_json::json!({"url": "https://example.com/post", "content": "<html>x</html>"})
        )
        .unwrap();

        let config = PipelineConfig {
            raw_data_dir: raw.path().to_path_buf(),
            output_dir: out.path().to_path_buf(),
            max_workers: 1,
            ..PipelineConfig::default()
        };
        let shutdown = Arc::new(AtomicBool::new(true));
        let runner = PipelineRunner::new(config, shutdown);
        let summary = runner.run_once().unwrap();
        assert_eq!(summary.documents, 0);
        assert_eq!(summary.stats.processed, 0);
    }
}
