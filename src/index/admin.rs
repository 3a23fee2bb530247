//! Index administration at indexer startup.
//!
//! Idempotent: templates are upserted, today's daily indices are created
//! when absent, base aliases repointed, and the retention policy installed.
//! Clusters without lifecycle-policy support fall back to a manual sweep
//! that deletes daily indices older than the retention window.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::client::OsClient;
use crate::config::IndexerConfig;
use crate::error::IndexError;

/// Lifecycle policy identity.
const POLICY_ID: &str = "daily-search-retention";

/// Returns today's daily index name for a base.
#[must_use]
pub fn daily_index_name(base: &str) -> String {
    format!("{base}-{}", Utc::now().format("%Y-%m-%d"))
}

/// Shared index settings, including the chunk search analyzer.
fn index_settings() -> Value {
    json!({
        "number_of_shards": 1,
        "number_of_replicas": 1,
        "refresh_interval": "30s",
        "analysis": {
            "analyzer": {
                "chunk_search": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "stop", "porter_stem", "word_delimiter_graph", "unique"]
                }
            }
        }
    })
}

/// Field mappings for document indices.
fn document_mappings() -> Value {
    json!({
        "properties": {
            "document_id": { "type": "keyword" },
            "url": { "type": "keyword" },
            "title": {
                "type": "text",
                "fields": {
                    "raw": { "type": "keyword" },
                    "suggest": { "type": "completion" }
                }
            },
            "domain": { "type": "keyword" },
            "description": { "type": "text" },
            "content_type": { "type": "keyword" },
            "categories": { "type": "keyword" },
            "keywords": { "type": "keyword" },
            "canonical_url": { "type": "keyword", "index": false },
            "published_date": { "type": "date", "format": "strict_date_optional_time||epoch_millis" },
            "modified_date": { "type": "date", "format": "strict_date_optional_time||epoch_millis" },
            "author_info": { "type": "object", "enabled": false },
            "structured_data": { "type": "object", "enabled": false },
            "images": { "type": "object", "enabled": false },
            "table_of_contents": { "type": "object", "enabled": false },
            "semantic_info": { "type": "object", "enabled": false },
            "icons": { "type": "object", "enabled": false },
            "word_count": { "type": "integer" },
            "indexed_at": { "type": "date" },
            "@timestamp": { "type": "date" }
        }
    })
}

/// Field mappings for chunk indices.
fn chunk_mappings() -> Value {
    json!({
        "properties": {
            "chunk_id": { "type": "keyword" },
            "document_id": { "type": "keyword" },
            "text_chunk": { "type": "text", "search_analyzer": "chunk_search" },
            "headings": { "type": "text" },
            "url": { "type": "keyword" },
            "title": { "type": "text" },
            "domain": { "type": "keyword" },
            "domain_score": { "type": "half_float" },
            "quality_score": { "type": "half_float" },
            "word_count": { "type": "integer" },
            "content_categories": { "type": "keyword" },
            "keywords": { "type": "keyword" },
            "indexed_at": { "type": "date" },
            "@timestamp": { "type": "date" }
        }
    })
}

/// Prepares templates, daily indices, aliases, and retention.
///
/// Every step is idempotent; partial failures are logged and do not stop
/// the remaining steps.
pub async fn initialize(client: &OsClient, config: &IndexerConfig) -> Result<(), IndexError> {
    let doc_pattern = format!("{}-*", config.documents_index_base);
    let chunk_pattern = format!("{}-*", config.chunks_index_base);

    client
        .put_index_template(
            "documents-template",
            &doc_pattern,
            index_settings(),
            document_mappings(),
        )
        .await?;
    client
        .put_index_template(
            "chunks-template",
            &chunk_pattern,
            index_settings(),
            chunk_mappings(),
        )
        .await?;

    let doc_index = daily_index_name(&config.documents_index_base);
    let chunk_index = daily_index_name(&config.chunks_index_base);
    for index in [&doc_index, &chunk_index] {
        if client.create_index_if_absent(index).await? {
            info!(index, "created daily index");
        }
    }

    client.put_alias(&doc_index, &config.documents_index_base).await?;
    client.put_alias(&chunk_index, &config.chunks_index_base).await?;

    let supported = client
        .put_lifecycle_policy(
            POLICY_ID,
            &[&doc_pattern, &chunk_pattern],
            config.retention_days,
        )
        .await?;
    if supported {
        info!(policy = POLICY_ID, days = config.retention_days, "retention policy active");
    } else {
        retention_sweep(client, config).await;
    }

    Ok(())
}

/// Deletes daily indices older than the retention window.
pub async fn retention_sweep(client: &OsClient, config: &IndexerConfig) {
    for base in [&config.documents_index_base, &config.chunks_index_base] {
        let pattern = format!("{base}-*");
        let indices = match client.list_indices(&pattern).await {
            Ok(indices) => indices,
            Err(err) => {
                warn!(%pattern, %err, "retention sweep could not list indices");
                continue;
            }
        };

        for index in indices {
            if let Some(age_days) = index_age_days(&index, base)
                && age_days > i64::from(config.retention_days)
            {
                match client.delete_index(&index).await {
                    Ok(()) => info!(index, age_days, "deleted expired daily index"),
                    Err(err) => warn!(index, %err, "failed to delete expired index"),
                }
            }
        }
    }
}

/// Parses the date suffix of a daily index and returns its age in days.
fn index_age_days(index: &str, base: &str) -> Option<i64> {
    let suffix = index.strip_prefix(base)?.strip_prefix('-')?;
    let date = NaiveDate::parse_from_str(suffix, "%Y-%m-%d").ok()?;
    let today = Utc::now().date_naive();
    Some((today - date).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_index_name_format() {
        let name = daily_index_name("documents");
        assert!(name.starts_with("documents-"));
        let suffix = name.strip_prefix("documents-").unwrap();
        assert!(NaiveDate::parse_from_str(suffix, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn test_index_age_days() {
        let today = Utc::now().date_naive();
        let recent = format!("chunks-{}", today.format("%Y-%m-%d"));
        assert_eq!(index_age_days(&recent, "chunks"), Some(0));

        let old = "chunks-2020-01-01";
        assert!(index_age_days(old, "chunks").unwrap() > 1_000);

        assert!(index_age_days("chunks-not-a-date", "chunks").is_none());
        assert!(index_age_days("documents-2020-01-01", "chunks").is_none());
    }

    #[test]
    fn test_chunk_mappings_shape() {
        let mappings = chunk_mappings();
        assert_eq!(mappings["properties"]["domain_score"]["type"], "half_float");
        assert_eq!(mappings["properties"]["word_count"]["type"], "integer");
        assert_eq!(
            mappings["properties"]["text_chunk"]["search_analyzer"],
            "chunk_search"
        );
    }

    #[test]
    fn test_document_mappings_shape() {
        let mappings = document_mappings();
        assert_eq!(mappings["properties"]["url"]["type"], "keyword");
        assert_eq!(mappings["properties"]["canonical_url"]["index"], false);
        assert_eq!(
            mappings["properties"]["title"]["fields"]["suggest"]["type"],
            "completion"
        );
        assert_eq!(mappings["properties"]["author_info"]["enabled"], false);
    }

    #[test]
    fn test_settings_include_search_analyzer() {
        let settings = index_settings();
        let filters = settings["analysis"]["analyzer"]["chunk_search"]["filter"]
            .as_array()
            .unwrap();
        let names: Vec<&str> = filters.iter().filter_map(Value::as_str).collect();
        assert_eq!(
            names,
            vec!["lowercase", "stop", "porter_stem", "word_delimiter_graph", "unique"]
        );
    }
}
