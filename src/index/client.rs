//! Minimal OpenSearch REST client.
//!
//! The core issues a fixed set of operations against the index store:
//! templates, index/alias creation, lifecycle policy, bulk, multi-get,
//! and search. Everything goes through one `reqwest` client with a
//! request timeout; transport failures surface as [`IndexError`] so
//! callers can degrade to offline mode.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::{AuthType, IndexerConfig};
use crate::error::IndexError;

/// Per-item bulk failures logged per flush.
const BULK_FAILURE_LOG_SAMPLE: usize = 5;

/// One bulk index action.
#[derive(Debug, Clone)]
pub struct BulkAction {
    /// Target index name.
    pub index: String,
    /// Document identity.
    pub id: String,
    /// Document body.
    pub source: Value,
}

/// Outcome of one bulk call.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOutcome {
    /// Items accepted by the store.
    pub succeeded: usize,
    /// Items rejected item-level.
    pub failed: usize,
}

/// HTTP client for the index store.
#[derive(Debug, Clone)]
pub struct OsClient {
    http: reqwest::Client,
    base: String,
    credentials: Option<(String, String)>,
}

impl OsClient {
    /// Builds a client from the indexer configuration.
    pub fn new(config: &IndexerConfig) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        let credentials = match config.auth_type {
            AuthType::Basic => match (&config.username, &config.password) {
                (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
                _ => {
                    warn!("basic auth requested without credentials, connecting anonymously");
                    None
                }
            },
            AuthType::None => None,
        };

        Ok(Self {
            http,
            base: config.opensearch_host.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Builds a client for the query service against the same store.
    pub fn with_host(host: &str, timeout: Duration) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base: host.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), IndexError> {
        let url = format!("{}{path}", self.base);
        let mut request = self.http.request(method, &url);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let value = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, value))
    }

    /// True when the store answers at all.
    pub async fn ping(&self) -> bool {
        matches!(
            self.request(Method::GET, "/", None).await,
            Ok((status, _)) if status.is_success()
        )
    }

    /// Returns the cluster health status string (green/yellow/red).
    pub async fn cluster_health(&self) -> Result<String, IndexError> {
        let (status, body) = self.request(Method::GET, "/_cluster/health", None).await?;
        if !status.is_success() {
            return Err(IndexError::Rejected {
                operation: "cluster health".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// Creates or updates an index template.
    pub async fn put_index_template(
        &self,
        name: &str,
        pattern: &str,
        settings: Value,
        mappings: Value,
    ) -> Result<(), IndexError> {
        let body = json!({
            "index_patterns": [pattern],
            "template": {
                "settings": settings,
                "mappings": mappings,
            }
        });
        let path = format!("/_index_template/{name}");
        let (status, response) = self.request(Method::PUT, &path, Some(body)).await?;
        if status.is_success() {
            debug!(template = name, "index template applied");
            Ok(())
        } else {
            error!(template = name, %response, "index template rejected");
            Err(IndexError::Rejected {
                operation: format!("put template {name}"),
                status: status.as_u16(),
            })
        }
    }

    /// Creates an index when it does not already exist.
    pub async fn create_index_if_absent(&self, index: &str) -> Result<bool, IndexError> {
        let path = format!("/{index}");
        let (status, _) = self.request(Method::HEAD, &path, None).await?;
        if status.is_success() {
            return Ok(false);
        }

        let (status, response) = self.request(Method::PUT, &path, None).await?;
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::BAD_REQUEST
            && response["error"]["type"]
                .as_str()
                .is_some_and(|t| t.contains("already_exists"))
        {
            Ok(false)
        } else {
            Err(IndexError::Rejected {
                operation: format!("create index {index}"),
                status: status.as_u16(),
            })
        }
    }

    /// Points `alias` at `index`.
    pub async fn put_alias(&self, index: &str, alias: &str) -> Result<(), IndexError> {
        let path = format!("/{index}/_alias/{alias}");
        let (status, _) = self.request(Method::PUT, &path, None).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(IndexError::Rejected {
                operation: format!("alias {alias} -> {index}"),
                status: status.as_u16(),
            })
        }
    }

    /// Installs the retention lifecycle policy.
    ///
    /// Returns `Ok(false)` when the cluster does not support ISM policies;
    /// callers fall back to a manual retention sweep.
    pub async fn put_lifecycle_policy(
        &self,
        policy_id: &str,
        index_patterns: &[&str],
        retention_days: u32,
    ) -> Result<bool, IndexError> {
        let path = format!("/_plugins/_ism/policies/{policy_id}");

        let (status, _) = self.request(Method::GET, &path, None).await?;
        if status.is_success() {
            debug!(policy = policy_id, "lifecycle policy already exists");
            return Ok(true);
        }

        let body = json!({
            "policy": {
                "policy_id": policy_id,
                "description": format!("Deletes daily indices after {retention_days} days."),
                "default_state": "hot",
                "states": [
                    {
                        "name": "hot",
                        "actions": [],
                        "transitions": [{
                            "state_name": "delete",
                            "conditions": { "min_index_age": format!("{retention_days}d") }
                        }]
                    },
                    {
                        "name": "delete",
                        "actions": [{ "delete": {} }],
                        "transitions": []
                    }
                ],
                "ism_template": [{
                    "index_patterns": index_patterns,
                    "priority": 100
                }]
            }
        });

        let (status, _) = self.request(Method::PUT, &path, Some(body)).await?;
        if status.is_success() {
            Ok(true)
        } else {
            warn!(
                policy = policy_id,
                status = status.as_u16(),
                "lifecycle policies unsupported, falling back to manual retention"
            );
            Ok(false)
        }
    }

    /// Lists index names matching a pattern.
    pub async fn list_indices(&self, pattern: &str) -> Result<Vec<String>, IndexError> {
        let path = format!("/_cat/indices/{pattern}?format=json");
        let (status, body) = self.request(Method::GET, &path, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(IndexError::Rejected {
                operation: format!("list indices {pattern}"),
                status: status.as_u16(),
            });
        }
        Ok(body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("index").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Deletes an index.
    pub async fn delete_index(&self, index: &str) -> Result<(), IndexError> {
        let path = format!("/{index}");
        let (status, _) = self.request(Method::DELETE, &path, None).await?;
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(IndexError::Rejected {
                operation: format!("delete index {index}"),
                status: status.as_u16(),
            })
        }
    }

    /// Issues one bulk call for the given actions.
    ///
    /// Item-level failures never fail the batch; the first few are logged
    /// and the rest counted.
    pub async fn bulk(&self, actions: &[BulkAction]) -> Result<BulkOutcome, IndexError> {
        if actions.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut body = String::new();
        for action in actions {
            let header = json!({ "index": { "_index": action.index, "_id": action.id } });
            body.push_str(&header.to_string());
            body.push('\n');
            body.push_str(&action.source.to_string());
            body.push('\n');
        }

        let url = format!("{}/_bulk", self.base);
        let mut request = self
            .http
            .post(&url)
            .header("content-type", "application/x-ndjson")
            .body(body);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Rejected {
                operation: "bulk".to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IndexError::MalformedResponse(e.to_string()))?;
        Ok(Self::bulk_outcome(&body, actions.len()))
    }

    fn bulk_outcome(body: &Value, total: usize) -> BulkOutcome {
        if body.get("errors").and_then(Value::as_bool) != Some(true) {
            return BulkOutcome {
                succeeded: total,
                failed: 0,
            };
        }

        let mut outcome = BulkOutcome::default();
        let mut logged = 0usize;
        if let Some(items) = body.get("items").and_then(Value::as_array) {
            for item in items {
                let result = item.get("index").unwrap_or(item);
                let failed = result.get("error").is_some();
                if failed {
                    outcome.failed += 1;
                    if logged < BULK_FAILURE_LOG_SAMPLE {
                        error!(item = %result, "bulk item failed");
                        logged += 1;
                    }
                } else {
                    outcome.succeeded += 1;
                }
            }
        }
        outcome
    }

    /// Multi-get by id, returning a map of found documents.
    pub async fn mget(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Value>, IndexError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let path = format!("/{index}/_mget");
        let body = json!({ "ids": ids });
        let (status, response) = self.request(Method::POST, &path, Some(body)).await?;
        if !status.is_success() {
            return Err(IndexError::Rejected {
                operation: "mget".to_string(),
                status: status.as_u16(),
            });
        }

        let mut found = HashMap::new();
        if let Some(docs) = response.get("docs").and_then(Value::as_array) {
            for doc in docs {
                if doc.get("found").and_then(Value::as_bool) == Some(true)
                    && let (Some(id), Some(source)) =
                        (doc.get("_id").and_then(Value::as_str), doc.get("_source"))
                {
                    found.insert(id.to_string(), source.clone());
                }
            }
        }
        Ok(found)
    }

    /// Runs a search and returns the raw hit objects.
    pub async fn search(&self, index: &str, body: Value) -> Result<Vec<Value>, IndexError> {
        let path = format!("/{index}/_search");
        let (status, response) = self.request(Method::POST, &path, Some(body)).await?;
        if !status.is_success() {
            return Err(IndexError::Rejected {
                operation: "search".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_outcome_all_succeeded() {
        let body = json!({ "errors": false, "items": [] });
        let outcome = OsClient::bulk_outcome(&body, 7);
        assert_eq!(outcome.succeeded, 7);
        assert_eq!(outcome.failed, 0);
    }

    #[test]
    fn test_bulk_outcome_partial_failures() {
        let body = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": { "_id": "b", "status": 400, "error": { "type": "mapper_parsing_exception" } } },
                { "index": { "_id": "c", "status": 200 } }
            ]
        });
        let outcome = OsClient::bulk_outcome(&body, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_client_construction() {
        let config = IndexerConfig::default();
        let client = OsClient::new(&config).unwrap();
        assert_eq!(client.base, "http://localhost:9200");
        assert!(client.credentials.is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let config = IndexerConfig {
            opensearch_host: "http://search:9200/".to_string(),
            ..IndexerConfig::default()
        };
        let client = OsClient::new(&config).unwrap();
        assert_eq!(client.base, "http://search:9200");
    }

    #[test]
    fn test_basic_auth_requires_credentials() {
        let config = IndexerConfig {
            auth_type: AuthType::Basic,
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            ..IndexerConfig::default()
        };
        let client = OsClient::new(&config).unwrap();
        assert!(client.credentials.is_some());

        let config = IndexerConfig {
            auth_type: AuthType::Basic,
            ..IndexerConfig::default()
        };
        let client = OsClient::new(&config).unwrap();
        assert!(client.credentials.is_none());
    }
}
