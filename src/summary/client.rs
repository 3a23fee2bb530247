//! Summarizer endpoint client.
//!
//! The summarizer is a black-box HTTP service returning a summary for a
//! `(query, results)` pair. Any downstream failure degrades to a
//! deterministic template summary, so callers always get text back.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::query::SearchHit;

/// Timeout for summary generation calls.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for quick calls (health checks).
const FAST_TIMEOUT: Duration = Duration::from_secs(5);

/// Model name reported for the template fallback.
const FALLBACK_MODEL: &str = "fallback_template";

/// Outcome of one summarization request.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    /// The summary text; never empty.
    pub summary: String,
    /// Model that produced the summary, or the fallback marker.
    pub model_used: String,
    /// Generation time in milliseconds.
    pub generation_time_ms: f64,
    /// The downstream error, when the template fallback was used.
    pub error: Option<String>,
}

/// HTTP client for the summarizer endpoint.
#[derive(Debug, Clone)]
pub struct SummarizerClient {
    http: reqwest::Client,
    base: String,
}

impl SummarizerClient {
    /// Creates a client for the given base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Requests a summary, falling back to the template on any failure.
    pub async fn generate_summary(
        &self,
        query: &str,
        results: &[SearchHit],
        max_length: usize,
    ) -> SummaryOutcome {
        let started = Instant::now();

        if results.is_empty() {
            return SummaryOutcome {
                summary: "No results found for your query.".to_string(),
                model_used: "none".to_string(),
                generation_time_ms: elapsed_ms(started),
                error: None,
            };
        }

        let body = json!({
            "query": query,
            "results": results,
            "max_length": max_length,
        });

        let response = self
            .http
            .post(format!("{}/summarize", self.base))
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<Value>().await {
                    Ok(payload) => {
                        let summary = payload["summary"].as_str().unwrap_or_default().to_string();
                        if summary.is_empty() {
                            return self.template_summary(
                                query,
                                results,
                                "summarizer returned an empty summary",
                                started,
                            );
                        }
                        info!(
                            model = payload["model_used"].as_str().unwrap_or("unknown"),
                            "summary generated"
                        );
                        SummaryOutcome {
                            summary,
                            model_used: payload["model_used"]
                                .as_str()
                                .unwrap_or("unknown")
                                .to_string(),
                            generation_time_ms: payload["generation_time_ms"]
                                .as_f64()
                                .unwrap_or_else(|| elapsed_ms(started)),
                            error: payload["error"].as_str().map(str::to_string),
                        }
                    }
                    Err(err) => self.template_summary(
                        query,
                        results,
                        &format!("invalid summarizer response: {err}"),
                        started,
                    ),
                }
            }
            Ok(response) => self.template_summary(
                query,
                results,
                &format!("summarizer returned status {}", response.status()),
                started,
            ),
            Err(err) => {
                self.template_summary(query, results, &format!("summarizer error: {err}"), started)
            }
        }
    }

    /// True when the summarizer answers its health endpoint.
    pub async fn healthy(&self) -> bool {
        self.http
            .get(format!("{}/health", self.base))
            .timeout(FAST_TIMEOUT)
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }

    /// The deterministic fallback summary.
    fn template_summary(
        &self,
        query: &str,
        results: &[SearchHit],
        error: &str,
        started: Instant,
    ) -> SummaryOutcome {
        warn!(error, "falling back to template summary");
        SummaryOutcome {
            summary: template_text(query, results),
            model_used: FALLBACK_MODEL.to_string(),
            generation_time_ms: elapsed_ms(started),
            error: Some(error.to_string()),
        }
    }
}

/// Builds the template text: result count, query, and top result title.
fn template_text(query: &str, results: &[SearchHit]) -> String {
    let mut summary = if results.len() == 1 {
        format!("Found 1 result for '{query}'.")
    } else {
        format!("Found {} results for '{query}'.", results.len())
    };

    if let Some(top) = results.first() {
        let title = top.title.trim();
        if !title.is_empty() {
            summary.push_str(&format!(" Top result: '{title}'."));
        }
    }

    summary.push_str(" (AI summarization unavailable)");
    summary
}

fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(n: usize) -> Vec<SearchHit> {
        (0..n)
            .map(|i| SearchHit {
                id: format!("d{i}"),
                title: format!("Result {i}"),
                ..SearchHit::default()
            })
            .collect()
    }

    #[test]
    fn test_template_text_plural() {
        let text = template_text("rust indexing", &hits(3));
        assert_eq!(
            text,
            "Found 3 results for 'rust indexing'. Top result: 'Result 0'. \
             (AI summarization unavailable)"
        );
    }

    #[test]
    fn test_template_text_singular() {
        let text = template_text("rust", &hits(1));
        assert!(text.starts_with("Found 1 result for 'rust'."));
    }

    #[test]
    fn test_template_text_untitled_top_result() {
        let mut results = hits(2);
        results[0].title = String::new();
        let text = template_text("rust", &results);
        assert!(!text.contains("Top result"));
        assert!(text.ends_with("(AI summarization unavailable)"));
    }

    #[tokio::test]
    async fn test_empty_results_short_circuit() {
        let client = SummarizerClient::new("http://127.0.0.1:1");
        let outcome = client.generate_summary("rust", &[], 300).await;
        assert_eq!(outcome.summary, "No results found for your query.");
        assert_eq!(outcome.model_used, "none");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        // Nothing listens on port 1; the client must degrade to the
        // template instead of erroring out.
        let client = SummarizerClient::new("http://127.0.0.1:1");
        let outcome = client.generate_summary("rust", &hits(2), 300).await;
        assert!(outcome.summary.contains("Found 2 results for 'rust'"));
        assert_eq!(outcome.model_used, FALLBACK_MODEL);
        assert!(outcome.error.is_some());
    }
}
