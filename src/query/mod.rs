//! Query service core: chunk-first retrieval with diversification.
//!
//! The search path is cache, primary chunk search, fallback search,
//! domain diversification, one multi-get for parent documents, merge,
//! smart preview, response shaping. Everything after the index calls is
//! synchronous in-memory work.

pub mod cache;
pub mod diversify;
pub mod preview;

pub use cache::{cache_key, QueryCache};
pub use diversify::diversify_by_domain;
pub use preview::{smart_preview, DEFAULT_PREVIEW_LENGTH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::index::OsClient;

/// Search method reported for primary chunk search results.
const METHOD_PRIMARY: &str = "opensearch-chunks";

/// Search method reported when the relaxed fallback produced the hits.
const METHOD_FALLBACK: &str = "opensearch-fallback";

/// One formatted search result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    /// Parent document identity.
    pub id: String,
    /// Document URL.
    pub url: String,
    /// Document title.
    pub title: String,
    /// Query-aware excerpt of the matched chunk.
    pub content_preview: String,
    /// Document domain.
    pub domain: String,
    /// Retrieval score of the matched chunk.
    pub relevance_score: f32,
    /// Domain authority score.
    pub domain_score: f32,
    /// Content quality score.
    pub quality_score: f32,
    /// Category labels.
    pub content_categories: Vec<String>,
    /// Keywords.
    pub keywords: Vec<String>,
}

/// The full search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// The query as received.
    pub query: String,
    /// Ranked, diversified results.
    pub results: Vec<SearchHit>,
    /// Number of results returned.
    pub total_found: usize,
    /// Wall-clock search time in milliseconds.
    pub search_time_ms: f64,
    /// Which search path produced the results.
    pub search_method: String,
    /// Error message, when the search failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when served from the cache.
    #[serde(default)]
    pub from_cache: bool,
    /// Identity of the asynchronous summary task, when one was scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary_request_id: Option<String>,
}

/// Chunk-first search over the index store.
pub struct SearchService {
    client: OsClient,
    cache: QueryCache,
    documents_alias: String,
    chunks_alias: String,
    max_limit: usize,
}

impl SearchService {
    /// Creates a search service over the base aliases.
    #[must_use]
    pub fn new(client: OsClient, cache_capacity: usize, max_limit: usize) -> Self {
        Self {
            client,
            cache: QueryCache::new(cache_capacity),
            documents_alias: "documents".to_string(),
            chunks_alias: "chunks".to_string(),
            max_limit: max_limit.max(1),
        }
    }

    /// Overrides the index aliases.
    #[must_use]
    pub fn with_aliases(mut self, documents: &str, chunks: &str) -> Self {
        self.documents_alias = documents.to_string();
        self.chunks_alias = chunks.to_string();
        self
    }

    /// Number of cached queries, for introspection.
    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    /// True when the index store answers.
    pub async fn healthy(&self) -> bool {
        self.client.ping().await
    }

    /// Runs one search end to end.
    pub async fn search(&self, query: &str, limit: usize) -> SearchResult {
        let started = Instant::now();
        let trimmed = query.trim();

        if trimmed.is_empty() {
            return error_result(query, "empty query", started);
        }
        let limit = limit.clamp(1, self.max_limit);

        let key = cache_key(trimmed, limit);
        if let Some(hit) = self.cache.get(&key) {
            debug!(query = trimmed, "cache hit");
            return hit;
        }

        // Primary chunk search, then the relaxed fallback.
        let mut method = METHOD_PRIMARY;
        let hits = match self.client.search(&self.chunks_alias, primary_query(trimmed, limit)).await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!(query = trimmed, %err, "primary search failed");
                return error_result(query, &err.to_string(), started);
            }
        };
        let hits = if hits.is_empty() {
            method = METHOD_FALLBACK;
            match self
                .client
                .search(&self.chunks_alias, fallback_query(trimmed, limit))
                .await
            {
                Ok(hits) => hits,
                Err(err) => {
                    warn!(query = trimmed, %err, "fallback search failed");
                    Vec::new()
                }
            }
        } else {
            hits
        };

        let diversified = diversify_by_domain(hits, limit);

        // One multi-get covers every distinct parent document.
        let mut ids: Vec<String> = Vec::new();
        for hit in &diversified {
            if let Some(id) = hit["_source"]["document_id"].as_str()
                && !ids.iter().any(|seen| seen == id)
            {
                ids.push(id.to_string());
            }
        }
        let documents = match self.client.mget(&self.documents_alias, &ids).await {
            Ok(documents) => documents,
            Err(err) => {
                warn!(query = trimmed, %err, "document fetch failed");
                return error_result(query, &err.to_string(), started);
            }
        };

        let results: Vec<SearchHit> = diversified
            .iter()
            .filter_map(|hit| {
                let merged = merge_hit(hit, &documents)?;
                Some(format_hit(&merged, trimmed))
            })
            .collect();

        let result = SearchResult {
            query: query.to_string(),
            total_found: results.len(),
            results,
            search_time_ms: elapsed_ms(started),
            search_method: method.to_string(),
            error: None,
            from_cache: false,
            ai_summary_request_id: None,
        };

        info!(
            query = trimmed,
            results = result.total_found,
            time_ms = result.search_time_ms,
            method,
            "search complete"
        );
        self.cache.put(key, &result);
        result
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

fn error_result(query: &str, message: &str, started: Instant) -> SearchResult {
    SearchResult {
        query: query.to_string(),
        results: Vec::new(),
        total_found: 0,
        search_time_ms: elapsed_ms(started),
        search_method: METHOD_PRIMARY.to_string(),
        error: Some(message.to_string()),
        from_cache: false,
        ai_summary_request_id: None,
    }
}

/// The primary bool-should query over the chunks alias.
fn primary_query(query: &str, limit: usize) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    {
                        "multi_match": {
                            "query": query,
                            "fields": ["text_chunk^1.5", "headings^3.0", "keywords^2.0", "title^2.5"],
                            "fuzziness": "AUTO",
                            "operator": "or"
                        }
                    },
                    {
                        "match_phrase": {
                            "text_chunk": { "query": query, "boost": 2.0 }
                        }
                    }
                ]
            }
        },
        "sort": [
            { "_score": { "order": "desc" } },
            { "quality_score": { "order": "desc" } },
            { "domain_score": { "order": "desc" } }
        ],
        "size": limit * 3,
        "_source": [
            "document_id", "text_chunk", "headings", "keywords", "title", "url",
            "domain", "quality_score", "domain_score", "content_categories", "word_count"
        ]
    })
}

/// The relaxed fallback query used when the primary search is empty.
fn fallback_query(query: &str, limit: usize) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    { "match": { "title": { "query": query, "boost": 2.0 } } },
                    { "match": { "text_chunk": query } },
                    { "wildcard": { "url": format!("*{}*", query.to_lowercase()) } }
                ],
                "minimum_should_match": 1
            }
        },
        "sort": [{ "_score": { "order": "desc" } }],
        "size": limit,
        "_source": [
            "document_id", "text_chunk", "headings", "keywords", "title", "url",
            "domain", "quality_score", "domain_score", "content_categories", "word_count"
        ]
    })
}

/// Shallow-merges the parent document with the chunk source.
///
/// Chunk fields win on conflict; the chunk's retrieval score is preserved
/// as both `_score` and `chunk_score`. Chunks without a stored parent are
/// dropped.
fn merge_hit(hit: &Value, documents: &std::collections::HashMap<String, Value>) -> Option<Value> {
    let source = hit.get("_source")?;
    let document_id = source.get("document_id").and_then(Value::as_str)?;
    let document = documents.get(document_id)?;

    let mut merged: Map<String, Value> = document.as_object().cloned().unwrap_or_default();
    if let Some(chunk_fields) = source.as_object() {
        for (key, value) in chunk_fields {
            merged.insert(key.clone(), value.clone());
        }
    }

    let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0);
    merged.insert("_score".to_string(), json!(score));
    merged.insert("chunk_score".to_string(), json!(score));
    merged.insert("document_id".to_string(), json!(document_id));
    Some(Value::Object(merged))
}

#[allow(clippy::cast_possible_truncation)]
fn format_hit(merged: &Value, query: &str) -> SearchHit {
    let text_chunk = merged["text_chunk"].as_str().unwrap_or_default();
    let string_list = |value: &Value| -> Vec<String> {
        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    SearchHit {
        id: merged["document_id"].as_str().unwrap_or_default().to_string(),
        url: merged["url"].as_str().unwrap_or_default().to_string(),
        title: merged["title"].as_str().unwrap_or_default().to_string(),
        content_preview: smart_preview(text_chunk, query, DEFAULT_PREVIEW_LENGTH),
        domain: merged["domain"].as_str().unwrap_or_default().to_string(),
        relevance_score: merged["_score"].as_f64().unwrap_or(0.0) as f32,
        domain_score: merged["domain_score"].as_f64().unwrap_or(0.0) as f32,
        quality_score: merged["quality_score"].as_f64().unwrap_or(0.0) as f32,
        content_categories: string_list(&merged["content_categories"]),
        keywords: string_list(&merged["keywords"]),
    }
}
