//! The indexer service: directory scanner and bulk flusher.
//!
//! One control loop scans `fresh/` (and `backlog/` when idle) and admits
//! JSONL lines into the dual-priority queue; one flusher consumes the
//! queue and commits batches with a single bulk call each. When the index
//! store is unreachable the service runs in offline mode: files keep
//! moving to `processed/`, no index call is attempted, and health checks
//! probe for recovery.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::admin;
use super::client::{BulkAction, OsClient};
use super::queue::{DualPriorityQueue, Priority, QueueItem};
use crate::config::IndexerConfig;
use crate::error::{IoError, Result};

/// Initial bulk retry backoff in seconds.
const INITIAL_BACKOFF_SECS: u64 = 2;

/// Backoff ceiling in seconds.
const MAX_BACKOFF_SECS: u64 = 600;

/// Malformed queue-file lines logged per file.
const MALFORMED_LOG_SAMPLE: usize = 3;

/// Result of one directory scan.
#[derive(Debug, Clone, Copy)]
struct DrainOutcome {
    /// Files present in the directory this pass (bounded by the scan
    /// limit), whether or not they produced items.
    files_seen: usize,
    /// Files that produced at least one admitted item.
    files_admitted: usize,
}

/// Cross-task counters for the indexer.
#[derive(Debug, Default)]
pub struct IndexerStats {
    /// Documents committed via bulk calls.
    pub documents_processed: AtomicU64,
    /// Chunks committed via bulk calls.
    pub chunks_processed: AtomicU64,
    /// Files fully admitted and moved to `processed/`.
    pub files_processed: AtomicU64,
    /// Files moved to `failed/`.
    pub files_failed: AtomicU64,
    /// Fresh files among `files_processed`.
    pub fresh_files: AtomicU64,
    /// Backlog files among `files_processed`.
    pub backlog_files: AtomicU64,
    /// Bulk calls issued.
    pub bulk_operations: AtomicU64,
    /// Item-level bulk failures.
    pub item_failures: AtomicU64,
    /// Items consumed while offline (not indexed).
    pub offline_skipped: AtomicU64,
    /// Batch-level errors after retry exhaustion.
    pub errors: AtomicU64,
}

impl IndexerStats {
    fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Long-running indexer service.
pub struct IndexerService {
    config: IndexerConfig,
    queue: Arc<DualPriorityQueue>,
    stats: Arc<IndexerStats>,
    online: Arc<AtomicBool>,
    client: Option<OsClient>,
    shutdown: watch::Receiver<bool>,
}

impl IndexerService {
    /// Creates the service; the index store is contacted in [`Self::run`].
    #[must_use]
    pub fn new(config: IndexerConfig, shutdown: watch::Receiver<bool>) -> Self {
        let queue = Arc::new(DualPriorityQueue::new(
            config.high_queue_capacity,
            config.standard_queue_capacity,
        ));
        Self {
            config,
            queue,
            stats: Arc::new(IndexerStats::default()),
            online: Arc::new(AtomicBool::new(false)),
            client: None,
            shutdown,
        }
    }

    /// Shared counters, for tests and introspection.
    #[must_use]
    pub fn stats(&self) -> Arc<IndexerStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the control loop until shutdown, then drains the flusher.
    pub async fn run(mut self) -> Result<()> {
        self.ensure_directories()?;
        self.connect().await;

        let flusher = tokio::spawn(run_flusher(
            Arc::clone(&self.queue),
            self.client.clone(),
            Arc::clone(&self.online),
            self.config.clone(),
            Arc::clone(&self.stats),
            self.shutdown.clone(),
        ));

        let mode = if self.online.load(Ordering::Relaxed) {
            "online"
        } else {
            "offline"
        };
        info!(mode, "indexer running");

        let mut last_stats = Instant::now();
        let mut last_health = Instant::now();

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let fresh_dir = self.config.fresh_dir.clone();
            let fresh = self
                .drain_directory(&fresh_dir, Priority::High, usize::MAX)
                .await;
            if fresh.files_admitted > 0 {
                debug!(files = fresh.files_admitted, "fresh files admitted");
            }
            // Backlog only runs on iterations where fresh/ held no files
            // at all; fresh files that fail still claim the iteration.
            if fresh.files_seen == 0 {
                let backlog_dir = self.config.backlog_dir.clone();
                self.drain_directory(&backlog_dir, Priority::Standard, self.config.backlog_batch_size)
                    .await;
            }

            if last_stats.elapsed() >= self.config.stats_interval {
                self.log_stats();
                last_stats = Instant::now();
            }
            if last_health.elapsed() >= self.config.health_check_interval {
                self.health_check().await;
                last_health = Instant::now();
            }

            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!("indexer shutting down, draining queue");
        if tokio::time::timeout(self.config.shutdown_grace, flusher)
            .await
            .is_err()
        {
            let (high, standard) = self.queue.qsize();
            warn!(high, standard, "flusher did not drain within the grace period");
        }
        self.log_stats();
        info!("indexer stopped");
        Ok(())
    }

    fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config.fresh_dir,
            &self.config.backlog_dir,
            &self.config.processed_dir,
            &self.config.failed_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| IoError::DirectoryFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn connect(&mut self) {
        match OsClient::new(&self.config) {
            Ok(client) => {
                if client.ping().await {
                    self.online.store(true, Ordering::Relaxed);
                    if let Err(err) = admin::initialize(&client, &self.config).await {
                        warn!(%err, "index initialization incomplete");
                    }
                } else {
                    warn!(
                        host = %self.config.opensearch_host,
                        "index store unreachable, running in offline mode"
                    );
                }
                self.client = Some(client);
            }
            Err(err) => {
                error!(%err, "failed to build index store client, running in offline mode");
            }
        }
    }

    /// Scans a queue directory and admits its files' lines.
    ///
    /// Reports how many files were present as well as how many produced
    /// at least one admitted item: the scheduler cares about presence,
    /// not success. Unreadable files go to `failed/`; consumed files go
    /// to `processed/` with a timestamped name.
    async fn drain_directory(&self, dir: &Path, priority: Priority, max_files: usize) -> DrainOutcome {
        let files = scan_jsonl(dir);
        let mut outcome = DrainOutcome {
            files_seen: files.len().min(max_files),
            files_admitted: 0,
        };

        for file in files.into_iter().take(max_files) {
            if *self.shutdown.borrow() {
                break;
            }

            let items_added = self.admit_file(&file, priority).await;
            if items_added > 0 {
                if self.move_file(&file, &self.config.processed_dir).await {
                    IndexerStats::add(&self.stats.files_processed, 1);
                    match priority {
                        Priority::High => IndexerStats::add(&self.stats.fresh_files, 1),
                        Priority::Standard => IndexerStats::add(&self.stats.backlog_files, 1),
                    }
                    outcome.files_admitted += 1;
                    info!(file = %file.display(), items = items_added, "file admitted");
                }
            } else {
                self.move_file(&file, &self.config.failed_dir).await;
                IndexerStats::add(&self.stats.files_failed, 1);
                warn!(file = %file.display(), "file produced no items, moved to failed");
            }
        }

        outcome
    }

    /// Streams one file's lines into the queue in file order.
    async fn admit_file(&self, file: &Path, priority: Priority) -> usize {
        let contents = match tokio::fs::read_to_string(file).await {
            Ok(contents) => contents,
            Err(err) => {
                error!(file = %file.display(), %err, "failed to read queue file");
                return 0;
            }
        };

        let mut added = 0usize;
        let mut malformed = 0usize;

        for (line_no, line) in contents.lines().enumerate() {
            if *self.shutdown.borrow() {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut data: Value = match serde_json::from_str(line) {
                Ok(data) => data,
                Err(err) => {
                    if malformed < MALFORMED_LOG_SAMPLE {
                        warn!(file = %file.display(), line = line_no + 1, %err, "invalid JSON line");
                    }
                    malformed += 1;
                    continue;
                }
            };
            stamp_timestamps(&mut data);

            let item = QueueItem {
                data,
                file_path: file.to_path_buf(),
                priority,
            };
            if self.queue.put(item, self.config.queue_put_timeout).await {
                added += 1;
            } else {
                warn!(
                    file = %file.display(),
                    line = line_no + 1,
                    "queue refused admission, aborting file"
                );
                break;
            }
        }

        added
    }

    async fn move_file(&self, source: &Path, dest_dir: &Path) -> bool {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed.jsonl".to_string());
        let stamped = format!("{}_{name}", Utc::now().format("%Y%m%d_%H%M%S"));
        let dest = dest_dir.join(stamped);

        match tokio::fs::rename(source, &dest).await {
            Ok(()) => {
                debug!(from = %source.display(), to = %dest.display(), "moved file");
                true
            }
            Err(err) => {
                error!(from = %source.display(), to = %dest.display(), %err, "failed to move file");
                false
            }
        }
    }

    async fn health_check(&self) {
        let Some(client) = &self.client else {
            return;
        };
        let was_online = self.online.load(Ordering::Relaxed);

        match client.cluster_health().await {
            Ok(status) => {
                if status == "red" {
                    error!("cluster health is red");
                } else if status == "yellow" {
                    warn!("cluster health is yellow");
                }
                if !was_online {
                    info!("index store reachable again, leaving offline mode");
                    self.online.store(true, Ordering::Relaxed);
                    if let Err(err) = admin::initialize(client, &self.config).await {
                        warn!(%err, "re-initialization after recovery incomplete");
                    }
                }
            }
            Err(err) => {
                if was_online {
                    error!(%err, "health check failed, entering offline mode");
                    self.online.store(false, Ordering::Relaxed);
                } else {
                    debug!(%err, "index store still unreachable");
                }
            }
        }
    }

    fn log_stats(&self) {
        let (high, standard) = self.queue.qsize();
        info!(
            documents = IndexerStats::get(&self.stats.documents_processed),
            chunks = IndexerStats::get(&self.stats.chunks_processed),
            files = IndexerStats::get(&self.stats.files_processed),
            files_failed = IndexerStats::get(&self.stats.files_failed),
            fresh = IndexerStats::get(&self.stats.fresh_files),
            backlog = IndexerStats::get(&self.stats.backlog_files),
            bulk_ops = IndexerStats::get(&self.stats.bulk_operations),
            item_failures = IndexerStats::get(&self.stats.item_failures),
            offline_skipped = IndexerStats::get(&self.stats.offline_skipped),
            errors = IndexerStats::get(&self.stats.errors),
            queue_high = high,
            queue_standard = standard,
            online = self.online.load(Ordering::Relaxed),
            "indexer statistics"
        );
    }
}

/// Stamps `indexed_at` and `@timestamp` at enqueue time, UTC.
fn stamp_timestamps(data: &mut Value) {
    if let Value::Object(map) = data {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        map.insert("indexed_at".to_string(), Value::String(now.clone()));
        map.insert("@timestamp".to_string(), Value::String(now));
    }
}

fn scan_jsonl(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"))
        })
        .collect();
    files.sort();
    files
}

/// Single consumer of the queue; batches and commits items.
async fn run_flusher(
    queue: Arc<DualPriorityQueue>,
    client: Option<OsClient>,
    online: Arc<AtomicBool>,
    config: IndexerConfig,
    stats: Arc<IndexerStats>,
    shutdown: watch::Receiver<bool>,
) {
    info!("flusher started");
    let mut batch: Vec<QueueItem> = Vec::new();
    let mut last_flush = Instant::now();

    loop {
        let stopping = *shutdown.borrow();

        if let Some(item) = queue.get(Duration::from_secs(1)).await {
            batch.push(item);
        }

        let should_flush = batch.len() >= config.bulk_chunk_size
            || (!batch.is_empty() && last_flush.elapsed() >= config.batch_timeout)
            || (stopping && !batch.is_empty());

        if should_flush {
            flush_batch(&mut batch, client.as_ref(), &online, &config, &stats, &shutdown).await;
            last_flush = Instant::now();
        }

        if stopping && batch.is_empty() && queue.is_empty() {
            break;
        }
    }
    info!("flusher drained and stopped");
}

/// Commits one batch with a single bulk call, retrying with exponential
/// backoff. High-priority items are ordered before standard ones so fresh
/// work commits first under backpressure.
async fn flush_batch(
    batch: &mut Vec<QueueItem>,
    client: Option<&OsClient>,
    online: &AtomicBool,
    config: &IndexerConfig,
    stats: &IndexerStats,
    shutdown: &watch::Receiver<bool>,
) {
    if batch.is_empty() {
        return;
    }
    batch.sort_by_key(|item| match item.priority {
        Priority::High => 0u8,
        Priority::Standard => 1u8,
    });

    let mut actions: Vec<BulkAction> = Vec::with_capacity(batch.len());
    let mut doc_count = 0u64;
    let mut chunk_count = 0u64;

    for item in batch.iter() {
        match translate(item, config) {
            Some((action, is_document)) => {
                if is_document {
                    doc_count += 1;
                } else {
                    chunk_count += 1;
                }
                actions.push(action);
            }
            None => {
                IndexerStats::add(&stats.item_failures, 1);
            }
        }
    }

    let items: Vec<QueueItem> = std::mem::take(batch);

    if client.is_none() || !online.load(Ordering::Relaxed) {
        IndexerStats::add(&stats.offline_skipped, actions.len() as u64);
        debug!(
            items = actions.len(),
            "offline mode, batch consumed without indexing"
        );
        return;
    }
    let Some(client) = client else { return };

    let mut attempt = 0u32;
    loop {
        match client.bulk(&actions).await {
            Ok(outcome) => {
                IndexerStats::add(&stats.bulk_operations, 1);
                IndexerStats::add(&stats.documents_processed, doc_count);
                IndexerStats::add(&stats.chunks_processed, chunk_count);
                IndexerStats::add(&stats.item_failures, outcome.failed as u64);
                debug!(
                    documents = doc_count,
                    chunks = chunk_count,
                    failed = outcome.failed,
                    "batch flushed"
                );
                return;
            }
            Err(err) => {
                attempt += 1;
                if attempt > config.max_retries || *shutdown.borrow() {
                    IndexerStats::add(&stats.errors, 1);
                    error!(%err, attempts = attempt, "bulk flush exhausted retries, dropping batch");
                    if config.requeue_failed_batches {
                        requeue_batch(&items, &config.backlog_dir);
                    }
                    return;
                }
                let backoff = (INITIAL_BACKOFF_SECS << (attempt - 1)).min(MAX_BACKOFF_SECS);
                warn!(%err, attempt, backoff_secs = backoff, "bulk flush failed, retrying");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
            }
        }
    }
}

/// Translates a queue item into a bulk action.
///
/// Orphan chunks (no parent `document_id`) are rejected here, at the
/// indexer boundary.
fn translate(item: &QueueItem, config: &IndexerConfig) -> Option<(BulkAction, bool)> {
    let data = &item.data;
    match data.get("type").and_then(Value::as_str) {
        Some("document") => {
            let id = data.get("document_id").and_then(Value::as_str)?;
            Some((
                BulkAction {
                    index: admin::daily_index_name(&config.documents_index_base),
                    id: id.to_string(),
                    source: data.clone(),
                },
                true,
            ))
        }
        Some("chunk") => {
            let id = data.get("chunk_id").and_then(Value::as_str)?;
            let parent = data.get("document_id").and_then(Value::as_str);
            if parent.is_none_or(str::is_empty) {
                warn!(chunk_id = id, "orphan chunk rejected");
                return None;
            }
            Some((
                BulkAction {
                    index: admin::daily_index_name(&config.chunks_index_base),
                    id: id.to_string(),
                    source: data.clone(),
                },
                false,
            ))
        }
        other => {
            warn!(?other, "unknown record type in queue file");
            None
        }
    }
}

/// Writes a failed batch back to the backlog directory as a new JSONL
/// file so it is retried on a later pass.
fn requeue_batch(items: &[QueueItem], backlog_dir: &Path) {
    let name = format!("requeue_{}.jsonl", Utc::now().format("%Y%m%d_%H%M%S%f"));
    let path = backlog_dir.join(name);
    let mut body = String::new();
    for item in items {
        body.push_str(&item.data.to_string());
        body.push('\n');
    }
    match std::fs::write(&path, body) {
        Ok(()) => info!(path = %path.display(), items = items.len(), "failed batch requeued"),
        Err(err) => error!(path = %path.display(), %err, "failed to requeue batch"),
    }
}
