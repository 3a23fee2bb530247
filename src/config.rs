//! Environment-driven configuration.
//!
//! Every service reads its settings from environment variables at startup
//! (`dotenvy` loads a `.env` file first when present). Each config struct
//! has sensible defaults and a `from_env` constructor; the lookup seam is
//! injectable so tests never mutate process-wide state.

use std::path::PathBuf;
use std::time::Duration;

/// Default maximum items written to one pipeline output file.
pub const DEFAULT_MAX_ITEMS_PER_FILE: usize = 1_000;

/// Default minimum cleaned-content length accepted by the processor.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 400;

/// Default retention for daily indices, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

fn lookup_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    lookup(name)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Authentication mode for the index store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// No authentication (local development clusters).
    #[default]
    None,
    /// HTTP basic authentication.
    Basic,
}

impl AuthType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "basic" => Self::Basic,
            _ => Self::None,
        }
    }
}

/// Settings for the document-processing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding raw crawler output (JSON / JSONL files).
    pub raw_data_dir: PathBuf,
    /// Directory the pipeline writes grouped output files into. This is the
    /// indexer's `fresh/` directory.
    pub output_dir: PathBuf,
    /// Worker pool size.
    pub max_workers: usize,
    /// Maximum records per output file.
    pub max_items_per_file: usize,
    /// Minimum cleaned-content length for a document to be kept.
    pub min_content_length: usize,
    /// Target maximum chunk size in characters.
    pub max_chunk_size: usize,
    /// Minimum chunk size in characters.
    pub min_chunk_size: usize,
    /// Re-scan interval in continuous mode.
    pub check_interval: Duration,
    /// Directory for batch quality reports; reporting is off when unset.
    pub report_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("raw_data"),
            output_dir: PathBuf::from("toIndex/fresh"),
            max_workers: default_workers(),
            max_items_per_file: DEFAULT_MAX_ITEMS_PER_FILE,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            max_chunk_size: 2_000,
            min_chunk_size: 400,
            check_interval: Duration::from_secs(600),
            report_dir: None,
        }
    }
}

fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism().map_or(2, std::num::NonZeroUsize::get);
    cpus.saturating_sub(1).max(2)
}

impl PipelineConfig {
    /// Builds the config from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&lookup_env)
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            raw_data_dir: PathBuf::from(string_or(lookup, "RAW_DATA_DIR", "raw_data")),
            output_dir: PathBuf::from(string_or(lookup, "PIPELINE_OUTPUT_DIR", "toIndex/fresh")),
            max_workers: parse_or(lookup, "MAX_WORKERS", defaults.max_workers),
            max_items_per_file: parse_or(lookup, "BATCH_SIZE", defaults.max_items_per_file),
            min_content_length: parse_or(lookup, "MIN_CONTENT_LENGTH", defaults.min_content_length),
            max_chunk_size: parse_or(lookup, "MAX_CHUNK_SIZE", defaults.max_chunk_size),
            min_chunk_size: parse_or(lookup, "MIN_CHUNK_SIZE", defaults.min_chunk_size),
            check_interval: Duration::from_secs(parse_or(
                lookup,
                "CHECK_INTERVAL_SECONDS",
                defaults.check_interval.as_secs(),
            )),
            report_dir: lookup("PIPELINE_REPORT_DIR")
                .filter(|raw| !raw.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Settings for the indexer service.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Index store base URL.
    pub opensearch_host: String,
    /// Authentication mode.
    pub auth_type: AuthType,
    /// Basic-auth user, when `auth_type` is `Basic`.
    pub username: Option<String>,
    /// Basic-auth password, when `auth_type` is `Basic`.
    pub password: Option<String>,
    /// Directory of freshly produced pipeline output.
    pub fresh_dir: PathBuf,
    /// Directory of older output drained during idle capacity.
    pub backlog_dir: PathBuf,
    /// Directory successful files are moved into (timestamped).
    pub processed_dir: PathBuf,
    /// Directory unreadable files are moved into.
    pub failed_dir: PathBuf,
    /// High-priority queue capacity.
    pub high_queue_capacity: usize,
    /// Standard-priority queue capacity.
    pub standard_queue_capacity: usize,
    /// Maximum items per bulk call.
    pub bulk_chunk_size: usize,
    /// Flush a partial batch after this long with items pending.
    pub batch_timeout: Duration,
    /// Maximum time a producer blocks waiting for queue space.
    pub queue_put_timeout: Duration,
    /// Control-loop sleep between scans.
    pub poll_interval: Duration,
    /// Maximum backlog files consumed per idle iteration.
    pub backlog_batch_size: usize,
    /// Interval between statistics log lines.
    pub stats_interval: Duration,
    /// Interval between cluster health checks.
    pub health_check_interval: Duration,
    /// Maximum retry attempts for a failed bulk call.
    pub max_retries: u32,
    /// Days daily indices are retained before deletion.
    pub retention_days: u32,
    /// Whether files whose bulk batch ultimately failed are moved back to
    /// `backlog/` instead of staying in `processed/`.
    pub requeue_failed_batches: bool,
    /// Grace period for draining the queue at shutdown.
    pub shutdown_grace: Duration,
    /// Base name for document indices and their alias.
    pub documents_index_base: String,
    /// Base name for chunk indices and their alias.
    pub chunks_index_base: String,
    /// Per-request timeout against the index store.
    pub request_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            opensearch_host: "http://localhost:9200".to_string(),
            auth_type: AuthType::None,
            username: None,
            password: None,
            fresh_dir: PathBuf::from("toIndex/fresh"),
            backlog_dir: PathBuf::from("toIndex/backlog"),
            processed_dir: PathBuf::from("toIndex/processed"),
            failed_dir: PathBuf::from("toIndex/failed"),
            high_queue_capacity: 1_000,
            standard_queue_capacity: 5_000,
            bulk_chunk_size: 500,
            batch_timeout: Duration::from_secs(5),
            queue_put_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            backlog_batch_size: 3,
            stats_interval: Duration::from_secs(60),
            health_check_interval: Duration::from_secs(300),
            max_retries: 3,
            retention_days: DEFAULT_RETENTION_DAYS,
            requeue_failed_batches: false,
            shutdown_grace: Duration::from_secs(30),
            documents_index_base: "documents".to_string(),
            chunks_index_base: "chunks".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl IndexerConfig {
    /// Builds the config from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&lookup_env)
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            opensearch_host: string_or(lookup, "OPENSEARCH_HOST", &defaults.opensearch_host),
            auth_type: lookup("OPENSEARCH_AUTH_TYPE")
                .map_or(AuthType::None, |raw| AuthType::parse(&raw)),
            username: lookup("OPENSEARCH_USER"),
            password: lookup("OPENSEARCH_PASSWORD"),
            fresh_dir: PathBuf::from(string_or(lookup, "INDEXER_FRESH_DIR", "toIndex/fresh")),
            backlog_dir: PathBuf::from(string_or(lookup, "INDEXER_BACKLOG_DIR", "toIndex/backlog")),
            processed_dir: PathBuf::from(string_or(
                lookup,
                "INDEXER_PROCESSED_DIR",
                "toIndex/processed",
            )),
            failed_dir: PathBuf::from(string_or(lookup, "INDEXER_FAILED_DIR", "toIndex/failed")),
            high_queue_capacity: parse_or(
                lookup,
                "HIGH_PRIORITY_QUEUE_SIZE",
                defaults.high_queue_capacity,
            ),
            standard_queue_capacity: parse_or(
                lookup,
                "STANDARD_PRIORITY_QUEUE_SIZE",
                defaults.standard_queue_capacity,
            ),
            bulk_chunk_size: parse_or(lookup, "BULK_CHUNK_SIZE", defaults.bulk_chunk_size),
            batch_timeout: Duration::from_secs(parse_or(
                lookup,
                "BATCH_TIMEOUT_SECONDS",
                defaults.batch_timeout.as_secs(),
            )),
            queue_put_timeout: Duration::from_secs(parse_or(
                lookup,
                "QUEUE_PUT_TIMEOUT_SECONDS",
                defaults.queue_put_timeout.as_secs(),
            )),
            poll_interval: Duration::from_secs(parse_or(
                lookup,
                "POLL_INTERVAL_SECONDS",
                defaults.poll_interval.as_secs(),
            )),
            backlog_batch_size: parse_or(lookup, "BACKLOG_BATCH_SIZE", defaults.backlog_batch_size),
            stats_interval: Duration::from_secs(parse_or(
                lookup,
                "STATS_INTERVAL_SECONDS",
                defaults.stats_interval.as_secs(),
            )),
            health_check_interval: Duration::from_secs(parse_or(
                lookup,
                "HEALTH_CHECK_INTERVAL_SECONDS",
                defaults.health_check_interval.as_secs(),
            )),
            max_retries: parse_or(lookup, "MAX_RETRIES", defaults.max_retries),
            retention_days: parse_or(lookup, "RETENTION_DAYS", defaults.retention_days),
            requeue_failed_batches: parse_or(
                lookup,
                "REQUEUE_FAILED_BATCHES",
                defaults.requeue_failed_batches,
            ),
            shutdown_grace: Duration::from_secs(parse_or(
                lookup,
                "SHUTDOWN_GRACE_SECONDS",
                defaults.shutdown_grace.as_secs(),
            )),
            documents_index_base: string_or(
                lookup,
                "DOCUMENTS_INDEX_BASE",
                &defaults.documents_index_base,
            ),
            chunks_index_base: string_or(lookup, "CHUNKS_INDEX_BASE", &defaults.chunks_index_base),
            request_timeout: Duration::from_secs(parse_or(
                lookup,
                "OPENSEARCH_TIMEOUT_SECONDS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }
}

/// Settings for the query-service HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Allowed CORS origins; empty means allow any.
    pub cors_origins: Vec<String>,
    /// Base URL of the summarizer endpoint.
    pub summarizer_url: String,
    /// Query cache capacity (entries).
    pub cache_capacity: usize,
    /// Default result limit when the caller does not specify one.
    pub default_limit: usize,
    /// Hard maximum result limit.
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
            summarizer_url: "http://127.0.0.1:8001".to_string(),
            cache_capacity: 1_000,
            default_limit: 10,
            max_limit: 50,
        }
    }
}

impl ServerConfig {
    /// Builds the config from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&lookup_env)
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: string_or(lookup, "BACKEND_HOST", &defaults.host),
            port: parse_or(lookup, "BACKEND_PORT", defaults.port),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            summarizer_url: string_or(lookup, "AI_RUNNER_URL", &defaults.summarizer_url),
            cache_capacity: parse_or(lookup, "QUERY_CACHE_CAPACITY", defaults.cache_capacity),
            default_limit: parse_or(lookup, "SEARCH_LIMIT_DEFAULT", defaults.default_limit),
            max_limit: parse_or(lookup, "SEARCH_LIMIT_MAX", defaults.max_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| map.get(name).map(std::string::ToString::to_string)
    }

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::from_lookup(&|_| None);
        assert_eq!(config.max_items_per_file, 1_000);
        assert_eq!(config.min_content_length, 400);
        assert_eq!(config.max_chunk_size, 2_000);
        assert!(config.max_workers >= 2);
    }

    #[test]
    fn test_pipeline_env_overrides() {
        let vars = HashMap::from([
            ("MAX_WORKERS", "8"),
            ("BATCH_SIZE", "250"),
            ("MIN_CONTENT_LENGTH", "600"),
            ("CHECK_INTERVAL_SECONDS", "60"),
        ]);
        let config = PipelineConfig::from_lookup(&lookup_from(&vars));
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.max_items_per_file, 250);
        assert_eq!(config.min_content_length, 600);
        assert_eq!(config.check_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_pipeline_report_dir_optional() {
        let config = PipelineConfig::from_lookup(&|_| None);
        assert!(config.report_dir.is_none());

        let vars = HashMap::from([("PIPELINE_REPORT_DIR", "reports")]);
        let config = PipelineConfig::from_lookup(&lookup_from(&vars));
        assert_eq!(config.report_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn test_pipeline_ignores_unparseable_values() {
        let vars = HashMap::from([("MAX_WORKERS", "not-a-number")]);
        let config = PipelineConfig::from_lookup(&lookup_from(&vars));
        assert_eq!(config.max_workers, PipelineConfig::default().max_workers);
    }

    #[test]
    fn test_indexer_defaults() {
        let config = IndexerConfig::from_lookup(&|_| None);
        assert_eq!(config.opensearch_host, "http://localhost:9200");
        assert_eq!(config.auth_type, AuthType::None);
        assert_eq!(config.bulk_chunk_size, 500);
        assert_eq!(config.retention_days, 90);
        assert!(!config.requeue_failed_batches);
        assert_eq!(config.queue_put_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_indexer_basic_auth() {
        let vars = HashMap::from([
            ("OPENSEARCH_HOST", "https://search.internal:9200"),
            ("OPENSEARCH_AUTH_TYPE", "basic"),
            ("OPENSEARCH_USER", "indexer"),
            ("OPENSEARCH_PASSWORD", "hunter2"),
        ]);
        let config = IndexerConfig::from_lookup(&lookup_from(&vars));
        assert_eq!(config.auth_type, AuthType::Basic);
        assert_eq!(config.username.as_deref(), Some("indexer"));
        assert_eq!(config.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_indexer_requeue_knob() {
        let vars = HashMap::from([("REQUEUE_FAILED_BATCHES", "true")]);
        let config = IndexerConfig::from_lookup(&lookup_from(&vars));
        assert!(config.requeue_failed_batches);
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::from_lookup(&|_| None);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_limit, 50);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_server_cors_list() {
        let vars = HashMap::from([(
            "CORS_ORIGINS",
            "https://search.example.com, https://admin.example.com",
        )]);
        let config = ServerConfig::from_lookup(&lookup_from(&vars));
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.cors_origins[0], "https://search.example.com");
    }

    #[test]
    fn test_auth_type_parse() {
        assert_eq!(AuthType::parse("basic"), AuthType::Basic);
        assert_eq!(AuthType::parse("BASIC"), AuthType::Basic);
        assert_eq!(AuthType::parse("none"), AuthType::None);
        assert_eq!(AuthType::parse("aws"), AuthType::None);
    }
}
